//! Image File Directory parsing: on-disk directories, synthesised
//! (rebased) directories built from a caller-supplied buffer, tag lookup
//! and typed value extraction.

use std::io::{Read, Seek};

use crate::value::TypedValue;
use crate::{ByteOrder, Container, Error, Result, TagType};

const ENTRY_LEN: usize = 12;
const MAX_REASONABLE_ALLOC: usize = 256 * 1024 * 1024;
/// Bound on how many IFDs a chain walk (`Container::ifd_chain`) will
/// follow before giving up, guarding against a cyclic `next_ifd_offset`
/// chain in a hostile or corrupt file.
pub const MAX_IFD_CHAIN_DEPTH: usize = 64;

/// A single 12-byte IFD entry, parsed but not yet interpreted.
///
/// `value_or_offset` is stored exactly as it appeared in the file, in the
/// file's byte order, completely unconverted: the same 4 bytes serve as
/// an inline value, a 32-bit offset, or raw bits, depending on
/// `(type, count)` — the interpretation happens at the point of access in
/// [`Container::tag_data`], not while scanning the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct TagDescriptor {
    pub id: u16,
    /// Wire type id, preserved even when it falls outside 1..=12.
    pub raw_type: u16,
    pub count: u32,
    pub(crate) value_or_offset: [u8; 4],
}

impl TagDescriptor {
    /// Resolve `raw_type` to a known [`TagType`], if it's one of the
    /// twelve TIFF 6.0 base types.
    pub fn tag_type(&self) -> Option<TagType> {
        TagType::from_u16(self.raw_type)
    }

    /// The raw value/offset field, converted to a native `u32` using
    /// `order`. Exposed for callers computing MakerNote-relative offsets
    /// by hand (the value is meaningless as an offset unless the tag's
    /// `(type, count)` actually selects the out-of-line interpretation).
    pub fn raw_offset_field(&self, order: ByteOrder) -> u32 {
        order.read_u32(self.value_or_offset)
    }
}

/// A parsed (or synthesised) Image File Directory: an ordered list of tag
/// entries plus the offset of the next IFD in the chain (0 = none).
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Ifd {
    tags: Vec<TagDescriptor>,
    next_ifd_offset: u32,
    /// Added to every out-of-line tag offset before it's resolved against
    /// the byte source. Zero for directories read directly from the file;
    /// nonzero for directories synthesised from a caller buffer that
    /// itself lives at some offset inside a larger blob (e.g. a MakerNote
    /// payload whose internal offsets are relative to the blob, not the
    /// file).
    tag_base_offset: u32,
    /// Synthesised IFDs don't extend their own chain into the file: their
    /// `next_ifd_offset`, if nonzero, describes a position that only
    /// makes sense relative to the synthesising buffer, not the file.
    synthesised: bool,
}

impl Ifd {
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn next_ifd_offset(&self) -> u32 {
        self.next_ifd_offset
    }

    pub fn tag_base_offset(&self) -> u32 {
        self.tag_base_offset
    }

    pub fn is_synthesised(&self) -> bool {
        self.synthesised
    }

    pub fn tags(&self) -> &[TagDescriptor] {
        &self.tags
    }

    /// Look up a tag by id. IFD entries are not assumed to be sorted, so
    /// this is a linear scan, matching the structural guarantee (TIFF 6.0
    /// recommends but does not require ascending tag order).
    pub fn get_tag(&self, id: u16) -> Result<&TagDescriptor> {
        self.tags.iter().find(|t| t.id == id).ok_or(Error::TagNotFound)
    }

    /// Look up a tag by its position in the directory.
    pub fn get_tag_by_index(&self, index: usize) -> Result<&TagDescriptor> {
        self.tags.get(index).ok_or(Error::RangeError("tag index out of range"))
    }
}

/// Parse `count` 12-byte entries out of `buf`, in file order.
///
/// An entry whose `count` field is 0 is malformed (spec Invariant 2): it
/// is logged and dropped rather than aborting the rest of the directory,
/// the same "warn, skip, keep going" idiom `exiftool-core::ifd::
/// read_ifd_standard` uses for an individual bad entry inside an
/// otherwise-readable IFD.
fn parse_entries(buf: &[u8], count: u16, byte_order: ByteOrder) -> Vec<TagDescriptor> {
    let mut tags = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let entry = &buf[i * ENTRY_LEN..i * ENTRY_LEN + ENTRY_LEN];
        let id = byte_order.read_u16([entry[0], entry[1]]);
        let raw_type = byte_order.read_u16([entry[2], entry[3]]);
        let count = byte_order.read_u32([entry[4], entry[5], entry[6], entry[7]]);
        let value_or_offset = [entry[8], entry[9], entry[10], entry[11]];
        if count == 0 {
            eprintln!(
                "Warning: skipping malformed IFD entry {i} (tag {id:#06x}): zero element count"
            );
            continue;
        }
        tags.push(TagDescriptor {
            id,
            raw_type,
            count,
            value_or_offset,
        });
    }
    tags
}

impl<S: Read + Seek> Container<S> {
    /// Read the IFD at absolute file `offset`.
    ///
    /// Reads a 16-bit entry count (zero is rejected — `RangeError`), then
    /// `count * 12 + 4` bytes (the entries plus the trailing next-IFD
    /// offset), then parses each 12-byte entry.
    pub fn read_ifd(&mut self, offset: u32) -> Result<Ifd> {
        self.ensure_open()?;
        let byte_order = self.byte_order();

        let mut count_buf = [0u8; 2];
        self.seek_and_read_exact(offset as u64, &mut count_buf)?;
        let count = byte_order.read_u16(count_buf);
        if count == 0 {
            return Err(Error::RangeError("IFD has zero entries"));
        }

        let body_len = (count as usize)
            .checked_mul(ENTRY_LEN)
            .and_then(|n| n.checked_add(4))
            .ok_or(Error::RangeError("IFD entry count overflows"))?;
        if body_len > MAX_REASONABLE_ALLOC {
            return Err(Error::NoMemory(body_len));
        }

        let mut buf = vec![0u8; body_len];
        self.seek_and_read_exact(offset as u64 + 2, &mut buf)?;

        let tags = parse_entries(&buf, count, byte_order);
        let next_ifd_offset =
            byte_order.read_u32(buf[count as usize * ENTRY_LEN..][..4].try_into().unwrap());

        Ok(Ifd {
            tags,
            next_ifd_offset,
            tag_base_offset: 0,
            synthesised: false,
        })
    }

    /// Synthesise an IFD from an in-memory buffer rather than a file
    /// offset (the vendor MakerNote case): `tag_base_offset` is added to
    /// every out-of-line tag offset before it's resolved against the
    /// byte source, so offsets recorded relative to the start of `buf`
    /// resolve correctly once `buf`'s own file position is known.
    pub fn make_ifd(&self, buf: &[u8], tag_base_offset: u32) -> Result<Ifd> {
        let byte_order = self.byte_order();

        if buf.len() < 2 + ENTRY_LEN + 4 {
            return Err(Error::BadArgument(
                "buffer too small to hold even one IFD entry",
            ));
        }

        let count = byte_order.read_u16([buf[0], buf[1]]);
        let entries_len = (count as usize).checked_mul(ENTRY_LEN);
        if count == 0 || entries_len.is_none_or(|n| 2 + n + 4 > buf.len()) {
            return Err(Error::RangeError(
                "buffer too small for declared entry count",
            ));
        }
        let entries_len = entries_len.unwrap();

        let tags = parse_entries(&buf[2..2 + entries_len], count, byte_order);
        let next_ifd_offset = byte_order.read_u32(
            buf[2 + entries_len..2 + entries_len + 4]
                .try_into()
                .expect("slice length checked above"),
        );

        Ok(Ifd {
            tags,
            next_ifd_offset,
            tag_base_offset,
            synthesised: true,
        })
    }

    /// Resolve a tag's data, reading it out-of-line if needed.
    ///
    /// A `count` of 0 is malformed (spec Invariant 2) and rejected with
    /// `RangeError` before any further interpretation — `parse_entries`
    /// already filters these out of normally-parsed directories, but this
    /// is the component that owns the invariant, so it's enforced here
    /// too rather than relying solely on the caller having gone through
    /// directory parsing.
    ///
    /// `element_size * count` decides inline-vs-offset (checked
    /// arithmetic; overflow is a `RangeError`, not a panic). An
    /// out-of-line offset of zero is rejected as `TagMalformed` — the
    /// value/offset field can legitimately be a lot of things, but never
    /// a pointer to the very start of the file, which always holds the
    /// TIFF header, never tag data.
    pub fn tag_data(&mut self, ifd: &Ifd, tag: &TagDescriptor) -> Result<TypedValue> {
        self.ensure_open()?;
        if tag.count == 0 {
            return Err(Error::RangeError("tag has zero element count"));
        }
        let byte_order = self.byte_order();
        let tag_type = tag.tag_type().ok_or(Error::UnknownType(tag.raw_type))?;
        let element_size = tag_type.element_size();

        let total_bytes = element_size
            .checked_mul(tag.count as usize)
            .ok_or(Error::RangeError("tag value size overflows"))?;

        if total_bytes <= 4 {
            let raw = &tag.value_or_offset[..total_bytes];
            return Ok(TypedValue::decode(tag_type, tag.count, raw, byte_order));
        }

        if total_bytes > MAX_REASONABLE_ALLOC {
            return Err(Error::NoMemory(total_bytes));
        }

        let stored_offset = tag.raw_offset_field(byte_order);
        if stored_offset == 0 {
            return Err(Error::TagMalformed);
        }
        let absolute_offset = (stored_offset as u64) + (ifd.tag_base_offset as u64);

        let mut raw = vec![0u8; total_bytes];
        self.seek_and_read_exact(absolute_offset, &mut raw)?;

        Ok(TypedValue::decode(tag_type, tag.count, &raw, byte_order))
    }

    /// Iterate the IFD chain starting at `start`, following
    /// `next_ifd_offset` until it hits 0, exceeds
    /// [`MAX_IFD_CHAIN_DEPTH`], or a read fails.
    pub fn ifd_chain(&mut self, start: u32) -> IfdChain<'_, S> {
        IfdChain {
            container: self,
            next: Some(start),
            depth: 0,
        }
    }
}

/// Iterator over `(offset, Ifd)` produced by [`Container::ifd_chain`].
pub struct IfdChain<'a, S> {
    container: &'a mut Container<S>,
    next: Option<u32>,
    depth: usize,
}

impl<'a, S: Read + Seek> Iterator for IfdChain<'a, S> {
    type Item = Result<(u32, Ifd)>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.next?;
        if self.depth >= MAX_IFD_CHAIN_DEPTH {
            self.next = None;
            return Some(Err(Error::RangeError("IFD chain exceeds depth limit")));
        }
        self.depth += 1;

        match self.container.read_ifd(offset) {
            Ok(ifd) => {
                let next = ifd.next_ifd_offset();
                self.next = if next == 0 { None } else { Some(next) };
                Some(Ok((offset, ifd)))
            }
            Err(e) => {
                self.next = None;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn le_ifd_at(offset: usize, entries: &[(u16, u16, u32, [u8; 4])], next: u32) -> Vec<u8> {
        let mut buf = vec![0u8; offset];
        buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (id, ty, count, val) in entries {
            buf.extend_from_slice(&id.to_le_bytes());
            buf.extend_from_slice(&ty.to_le_bytes());
            buf.extend_from_slice(&count.to_le_bytes());
            buf.extend_from_slice(val);
        }
        buf.extend_from_slice(&next.to_le_bytes());
        buf
    }

    fn header_le(ifd_offset: u32) -> Vec<u8> {
        let mut h = b"II".to_vec();
        h.extend_from_slice(&42u16.to_le_bytes());
        h.extend_from_slice(&ifd_offset.to_le_bytes());
        h
    }

    #[test]
    fn reads_inline_short_tag() {
        let mut data = header_le(8);
        let ifd = le_ifd_at(8, &[(256, 3, 1, [7, 0, 0, 0])], 0);
        data.extend_from_slice(&ifd[8..]);
        let mut c = Container::open(Cursor::new(data)).unwrap();
        let ifd = c.read_ifd(8).unwrap();
        assert_eq!(ifd.tag_count(), 1);
        let tag = ifd.get_tag(256).unwrap();
        let v = c.tag_data(&ifd, tag).unwrap();
        assert_eq!(v, TypedValue::Short(vec![7]));
    }

    #[test]
    fn zero_entry_ifd_is_range_error() {
        let mut data = header_le(8);
        data.extend_from_slice(&0u16.to_le_bytes());
        let mut c = Container::open(Cursor::new(data)).unwrap();
        assert!(matches!(c.read_ifd(8), Err(Error::RangeError(_))));
    }

    #[test]
    fn zero_count_tag_is_dropped_during_parse_but_siblings_survive() {
        let mut data = header_le(8);
        let ifd = le_ifd_at(
            8,
            &[(256, 3, 1, [7, 0, 0, 0]), (257, 3, 0, [0, 0, 0, 0])],
            0,
        );
        data.extend_from_slice(&ifd[8..]);
        let mut c = Container::open(Cursor::new(data)).unwrap();
        let ifd = c.read_ifd(8).unwrap();

        // The malformed (count == 0) entry is skipped, not surfaced.
        assert_eq!(ifd.tag_count(), 1);
        assert!(matches!(ifd.get_tag(257), Err(Error::TagNotFound)));

        // The well-formed sibling entry is unaffected.
        let tag = ifd.get_tag(256).unwrap();
        assert_eq!(c.tag_data(&ifd, tag).unwrap(), TypedValue::Short(vec![7]));
    }

    #[test]
    fn tag_data_rejects_zero_count_directly() {
        // Exercises the defensive check in `tag_data` itself, in case a
        // `TagDescriptor` with count == 0 is ever reached some other way
        // than directory parsing (which already filters these out).
        let data = header_le(8);
        let mut c = Container::open(Cursor::new(data)).unwrap();
        let ifd = Ifd {
            tags: vec![TagDescriptor {
                id: 256,
                raw_type: 3,
                count: 0,
                value_or_offset: [0, 0, 0, 0],
            }],
            next_ifd_offset: 0,
            tag_base_offset: 0,
            synthesised: false,
        };
        let tag = ifd.get_tag(256).unwrap();
        assert!(matches!(c.tag_data(&ifd, tag), Err(Error::RangeError(_))));
    }

    #[test]
    fn out_of_line_short_array_reads_from_offset() {
        let mut data = header_le(8);
        let payload_offset = 8 + 2 + ENTRY_LEN + 4;
        let offset_bytes = (payload_offset as u32).to_le_bytes();
        let ifd = le_ifd_at(8, &[(258, 3, 4, offset_bytes)], 0);
        data.truncate(8);
        data.extend_from_slice(&ifd[8..]);
        for v in [1u16, 2, 3, 4] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let mut c = Container::open(Cursor::new(data)).unwrap();
        let ifd = c.read_ifd(8).unwrap();
        let tag = ifd.get_tag(258).unwrap();
        let v = c.tag_data(&ifd, tag).unwrap();
        assert_eq!(v, TypedValue::Short(vec![1, 2, 3, 4]));
    }

    #[test]
    fn zero_out_of_line_offset_is_malformed() {
        let mut data = header_le(8);
        let ifd = le_ifd_at(8, &[(258, 3, 4, [0, 0, 0, 0])], 0);
        data.truncate(8);
        data.extend_from_slice(&ifd[8..]);
        let mut c = Container::open(Cursor::new(data)).unwrap();
        let ifd = c.read_ifd(8).unwrap();
        let tag = ifd.get_tag(258).unwrap();
        assert!(matches!(c.tag_data(&ifd, tag), Err(Error::TagMalformed)));
    }

    #[test]
    fn synthesised_ifd_rebases_offsets() {
        let mut data = header_le(8);
        // root IFD is trivial; the interesting IFD is synthesised below.
        data.extend_from_slice(&le_ifd_at(0, &[(1, 3, 1, [1, 0, 0, 0])], 0));
        let mut c = Container::open(Cursor::new(data)).unwrap();

        let blob_base = 100u32;
        let mut blob = Vec::new();
        let payload_offset_in_blob = 2 + ENTRY_LEN as u32 + 4;
        blob.extend_from_slice(&1u16.to_le_bytes()); // one entry
        blob.extend_from_slice(&0xABCDu16.to_le_bytes()); // tag id
        blob.extend_from_slice(&3u16.to_le_bytes()); // SHORT
        blob.extend_from_slice(&2u32.to_le_bytes()); // count = 2
        blob.extend_from_slice(&payload_offset_in_blob.to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes()); // next ifd
        blob.extend_from_slice(&9u16.to_le_bytes());
        blob.extend_from_slice(&10u16.to_le_bytes());

        // Append the blob to the underlying source at blob_base so the
        // rebased offset resolves to real bytes.
        let ifd = c.make_ifd(&blob, blob_base).unwrap();
        assert!(ifd.is_synthesised());
        let tag = ifd.get_tag(0xABCD).unwrap();
        assert_eq!(
            tag.raw_offset_field(c.byte_order()) as u64 + ifd.tag_base_offset() as u64,
            blob_base as u64 + payload_offset_in_blob as u64
        );
    }

    #[test]
    fn ifd_chain_follows_next_offset_and_caps_depth() {
        // Build two chained IFDs: first at 8, pointing to a second at
        // some later offset, which terminates.
        let second_offset = 8 + 2 + ENTRY_LEN + 4;
        let mut data = header_le(8);
        data.extend_from_slice(&le_ifd_at(0, &[(1, 3, 1, [1, 0, 0, 0])], second_offset as u32)[8..]);
        data.extend_from_slice(&le_ifd_at(0, &[(2, 3, 1, [2, 0, 0, 0])], 0)[8..]);

        let mut c = Container::open(Cursor::new(data)).unwrap();
        let visited: Vec<u32> = c
            .ifd_chain(8)
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(visited, vec![8, second_offset as u32]);
    }
}
