//! Fixed catalogue of baseline image-layout tags (TIFF 6.0 section 8) and
//! the three accessor functions built on top of them.
//!
//! These are the only tag ids this crate assigns any meaning to. Anything
//! semantic beyond "does this IFD describe an image, and if so what shape"
//! (EXIF catalogues, vendor MakerNote dictionaries, …) is a caller's
//! problem, not this crate's.

use std::io::{Read, Seek};

use crate::{Container, Error, Ifd, Result};

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_SAMPLE_FORMAT: u16 = 339;

/// Sample format values for [`SampleInfo::sample_format`] (tag 339).
/// Absence of the tag defaults to `UInt`, per TIFF 6.0 Supplement 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    UInt = 1,
    Int = 2,
    Float = 3,
    Undefined = 4,
}

impl SampleFormat {
    fn from_u32(value: u32) -> Self {
        match value {
            2 => SampleFormat::Int,
            3 => SampleFormat::Float,
            4 => SampleFormat::Undefined,
            _ => SampleFormat::UInt,
        }
    }
}

/// Width/height/samples-per-pixel, per [`image_attribs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageAttribs {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
}

/// Bits-per-sample and sample format, per [`sample_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInfo {
    pub bits_per_sample: u32,
    pub sample_format: SampleFormat,
}

/// Compression scheme, per [`image_structure`]. Tile-related fields are
/// always reported as absent: this crate draws no distinction between
/// tiled and stripped layout, matching the reference implementation this
/// catalogue is modelled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageStructure {
    pub compression: u32,
}

/// Look up `tag_id` and read it as a scalar `u32`.
///
/// `IfdNotImage` is reserved for the `is_image_ifd` gate each caller
/// already runs before this is called; a tag that's merely missing,
/// truncated or otherwise malformed propagates its real error
/// (`TagNotFound`, `TagMalformed`, `EndOfFile`, `RangeError`, ...) rather
/// than being folded into "this isn't an image", per spec.md §7's
/// propagation policy.
fn require_u32<S: Read + Seek>(container: &mut Container<S>, ifd: &Ifd, tag_id: u16) -> Result<u32> {
    let tag = ifd.get_tag(tag_id)?;
    let value = container.tag_data(ifd, tag)?;
    value.as_u32().ok_or(Error::IfdNotImage)
}

/// `true` iff `ifd` carries both ImageWidth (256) and ImageLength (257).
/// An IFD without both is not an image IFD (e.g. the EXIF sub-IFD).
pub fn is_image_ifd(ifd: &Ifd) -> bool {
    ifd.get_tag(TAG_IMAGE_WIDTH).is_ok() && ifd.get_tag(TAG_IMAGE_LENGTH).is_ok()
}

/// Width, height and samples-per-pixel for an image IFD.
///
/// Returns [`Error::IfdNotImage`] if ImageWidth or ImageLength is absent.
pub fn image_attribs<S: Read + Seek>(
    container: &mut Container<S>,
    ifd: &Ifd,
) -> Result<ImageAttribs> {
    if !is_image_ifd(ifd) {
        return Err(Error::IfdNotImage);
    }

    Ok(ImageAttribs {
        width: require_u32(container, ifd, TAG_IMAGE_WIDTH)?,
        height: require_u32(container, ifd, TAG_IMAGE_LENGTH)?,
        samples_per_pixel: require_u32(container, ifd, TAG_SAMPLES_PER_PIXEL)?,
    })
}

/// Bits per sample and sample format for an image IFD.
///
/// The reference implementation this is modelled on has a bug here: its
/// sample-format branch writes into the bits-per-sample output parameter
/// instead of its own. This crate reads the sample-format tag into
/// `SampleInfo::sample_format`, not into `bits_per_sample`.
pub fn sample_info<S: Read + Seek>(container: &mut Container<S>, ifd: &Ifd) -> Result<SampleInfo> {
    if !is_image_ifd(ifd) {
        return Err(Error::IfdNotImage);
    }

    let bits_per_sample = require_u32(container, ifd, TAG_BITS_PER_SAMPLE)?;

    let sample_format = match ifd.get_tag(TAG_SAMPLE_FORMAT) {
        Ok(tag) => {
            let value = container.tag_data(ifd, tag)?;
            SampleFormat::from_u32(value.as_u32().ok_or(Error::IfdNotImage)?)
        }
        // Missing 339 defaults to UInt (spec.md §4.6) rather than erroring;
        // any other failure reading a *present* tag still propagates above.
        Err(_) => SampleFormat::UInt,
    };

    Ok(SampleInfo {
        bits_per_sample,
        sample_format,
    })
}

/// Compression scheme for an image IFD. Tile geometry is always zero:
/// this crate does not distinguish strip- from tile-organised images.
pub fn image_structure<S: Read + Seek>(
    container: &mut Container<S>,
    ifd: &Ifd,
) -> Result<ImageStructure> {
    if !is_image_ifd(ifd) {
        return Err(Error::IfdNotImage);
    }

    Ok(ImageStructure {
        compression: require_u32(container, ifd, TAG_COMPRESSION)?,
    })
}
