//! The byte source abstraction and the `Container` that owns one.
//!
//! A byte source is anything that implements [`Read`] + [`Seek`] —
//! `std::fs::File` for on-disk TIFFs, `std::io::Cursor<&[u8]>` for
//! in-memory buffers and tests. There is no bespoke capability trait: a
//! generic bound over the standard library's own traits is the idiomatic
//! equivalent of the open/close/read/seek function-pointer table a C
//! library would need to define for itself.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::{ByteOrder, Error, Result};

/// An opened TIFF container: an underlying byte source, its detected byte
/// order and the absolute offset of its root IFD.
///
/// `Container` takes ownership of its source on [`open`](Container::open).
/// [`close`](Container::close) is an explicit, fallible operation that
/// drops the source and marks the handle unusable — every other method
/// rejects a closed container with [`Error::NotOpen`], re-deriving the
/// C API's explicit lifecycle (and its rejection of a second close) on top
/// of Rust's ownership model rather than relying on it alone.
#[derive(Debug)]
#[must_use]
pub struct Container<S> {
    source: Option<S>,
    byte_order: ByteOrder,
    root_ifd_offset: u32,
}

const HEADER_LEN: usize = 8;
const TIFF_MAGIC: u16 = 42;

impl<S: Read + Seek> Container<S> {
    /// Detect a TIFF header and take ownership of `source`.
    ///
    /// Reads the 8-byte header: a 2-byte byte-order marker (`II` or `MM`),
    /// a 16-bit magic number (must be 42) and the 32-bit offset of the
    /// root IFD. Any failure leaves `source` dropped rather than returning
    /// a half-open handle.
    pub fn open(mut source: S) -> Result<Self> {
        let mut header = [0u8; HEADER_LEN];
        source.seek(SeekFrom::Start(0))?;
        read_exact_checked(&mut source, &mut header)?;

        let byte_order = ByteOrder::from_marker([header[0], header[1]])?;

        let magic = byte_order.read_u16([header[2], header[3]]);
        if magic != TIFF_MAGIC {
            return Err(Error::NotTiff);
        }

        let root_ifd_offset = byte_order.read_u32([header[4], header[5], header[6], header[7]]);

        Ok(Container {
            source: Some(source),
            byte_order,
            root_ifd_offset,
        })
    }

    /// Byte order fixed at [`open`](Container::open) time.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Absolute offset of the root IFD, as declared in the header.
    pub fn root_ifd_offset(&self) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.root_ifd_offset)
    }

    /// Close the container. A second call (or any other operation after
    /// this one) returns [`Error::NotOpen`].
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.source = None;
        Ok(())
    }

    /// Read `buf.len()` bytes starting at the absolute file `offset`,
    /// bypassing any IFD interpretation. Exposed for callers that need
    /// raw access (e.g. dumping a MakerNote blob before synthesising an
    /// IFD from it).
    pub fn raw_read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let source = self.source.as_mut().ok_or(Error::NotOpen)?;
        source.seek(SeekFrom::Start(offset as u64))?;
        Ok(source.read(buf)?)
    }

    pub(crate) fn seek_and_read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let source = self.source.as_mut().ok_or(Error::NotOpen)?;
        source.seek(SeekFrom::Start(offset))?;
        read_exact_checked(source, buf)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.source.is_some() {
            Ok(())
        } else {
            Err(Error::NotOpen)
        }
    }
}

impl Container<BufReader<File>> {
    /// Open a TIFF file by path, the default local-file byte source.
    ///
    /// A missing file is reported as [`Error::FileNotFound`] rather than
    /// the generic [`Error::Io`] wrapper, matching spec's distinct
    /// `FileNotFound` kind for a byte source that couldn't be opened at
    /// all, as opposed to one that opened but whose contents aren't a
    /// valid TIFF.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound
            } else {
                Error::Io(e)
            }
        })?;
        Container::open(BufReader::new(file))
    }
}

/// Like `Read::read_exact`, but reports a structured `EndOfFile` with the
/// requested and actually-available byte counts instead of
/// `std::io::ErrorKind::UnexpectedEof`.
fn read_exact_checked<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut have = 0;
    while have < buf.len() {
        match reader.read(&mut buf[have..]) {
            Ok(0) => {
                return Err(Error::EndOfFile {
                    need: buf.len(),
                    have,
                })
            }
            Ok(n) => have += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
