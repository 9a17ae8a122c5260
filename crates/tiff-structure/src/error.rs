//! Error types for tiff-structure.

use thiserror::Error;

/// Errors produced while opening a container or navigating its IFD tree.
#[derive(Debug, Error)]
#[must_use]
pub enum Error {
    /// Header bytes did not decode as a TIFF byte-order marker + magic 42.
    #[error("not a TIFF file: bad byte-order marker or magic number")]
    NotTiff,

    /// An operation was attempted on a container whose source was closed.
    #[error("container is not open")]
    NotOpen,

    /// A count, offset or index fell outside the structurally valid range.
    #[error("range error: {0}")]
    RangeError(&'static str),

    /// A caller-supplied argument was structurally invalid (e.g. a buffer
    /// too small to synthesise even one IFD entry).
    #[error("bad argument: {0}")]
    BadArgument(&'static str),

    /// No tag with the requested id exists in the IFD.
    #[error("tag not found")]
    TagNotFound,

    /// The underlying byte source could not be opened.
    #[error("file not found")]
    FileNotFound,

    /// A read ran past the end of the available data.
    #[error("unexpected end of data: need {need} bytes, have {have}")]
    EndOfFile { need: usize, have: usize },

    /// A computed allocation size exceeded a sane bound before it was made.
    #[error("refusing to allocate {0} bytes")]
    NoMemory(usize),

    /// A tag's wire type id is outside the 1..=12 TIFF 6.0 range.
    #[error("unknown tag type: {0}")]
    UnknownType(u16),

    /// The IFD lacks ImageWidth/ImageLength and so is not an image IFD.
    #[error("IFD does not describe an image")]
    IfdNotImage,

    /// A tag's stored offset/value field could not be resolved (e.g. a
    /// zero out-of-line offset).
    #[error("tag data malformed")]
    TagMalformed,

    /// I/O error from the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for container/IFD operations.
pub type Result<T> = std::result::Result<T, Error>;
