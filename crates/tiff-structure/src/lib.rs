//! Structure-only reader for the TIFF 6.0 container format.
//!
//! This crate parses TIFF headers and Image File Directories, resolves
//! tag values (inline or out-of-line, byte-swapped per element), and
//! exposes the small catalogue of baseline image-layout tags. It does not
//! decode pixel data, does not write or mutate TIFFs, and does not know
//! anything about EXIF tag catalogues or vendor MakerNote dictionaries —
//! those are a caller's problem, built on top of the directories and tags
//! this crate hands back.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use tiff_structure::Container;
//!
//! let tiff_data = [
//!     0x49, 0x49,             // "II" = little-endian
//!     0x2A, 0x00,             // TIFF magic (42)
//!     0x08, 0x00, 0x00, 0x00, // root IFD offset = 8
//! ];
//!
//! let container = Container::open(Cursor::new(tiff_data)).unwrap();
//! assert_eq!(container.root_ifd_offset().unwrap(), 8);
//! ```

mod byte_order;
mod error;
pub mod ifd;
pub mod image;
mod source;
mod value;

pub use byte_order::ByteOrder;
pub use error::{Error, Result};
pub use ifd::{Ifd, IfdChain, TagDescriptor, MAX_IFD_CHAIN_DEPTH};
pub use image::{image_attribs, image_structure, is_image_ifd, sample_info, ImageAttribs, ImageStructure, SampleFormat, SampleInfo};
pub use source::Container;
pub use value::{SRational, TagType, TypedValue, URational};
