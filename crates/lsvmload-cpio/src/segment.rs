//! Splits an initrd image into the ordered segments the Linux boot
//! protocol concatenates: any mix of plain CPIO archives (early/microcode
//! style) and LZMA/gzip-compressed archives, back to back. Grounded on
//! `original_source/lsvmload/initrd.c`'s `CPIOSplitFile` step, which this
//! crate's pack does not carry the source for; a compressed segment's
//! extent is recovered here by actually decompressing it and noting how
//! many bytes the decoder consumed, since neither format's header alone
//! says where the stream ends.

use std::vec::Vec;

use crate::error::CpioError;
use crate::newc;

pub const MAX_SUBFILES: usize = 16;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Lzma,
    Gzip,
    Cpio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub offset: usize,
    pub len: usize,
}

fn detect_kind(data: &[u8]) -> Option<SegmentKind> {
    if data.len() >= XZ_MAGIC.len() && data[..XZ_MAGIC.len()] == XZ_MAGIC {
        Some(SegmentKind::Lzma)
    } else if data.len() >= GZIP_MAGIC.len() && data[..GZIP_MAGIC.len()] == GZIP_MAGIC {
        Some(SegmentKind::Gzip)
    } else if data.len() >= newc::MAGIC.len() && &data[..newc::MAGIC.len()] == newc::MAGIC {
        Some(SegmentKind::Cpio)
    } else {
        None
    }
}

/// How many bytes of `data` a gzip member occupies, found by actually
/// running it through [`flate2::bufread::GzDecoder`]: that decoder reads
/// from its `BufRead` via `fill_buf`/`consume`, so it only ever takes the
/// bytes that belong to this member, leaving `remaining` positioned right
/// after the trailer regardless of what (if anything) follows.
fn gzip_len(data: &[u8]) -> Result<usize, CpioError> {
    let mut remaining: &[u8] = data;
    {
        let mut decoder = flate2::bufread::GzDecoder::new(&mut remaining);
        let mut sink = std::io::sink();
        std::io::copy(&mut decoder, &mut sink).map_err(|_| CpioError::Decompress)?;
    }
    Ok(data.len() - remaining.len())
}

/// Same idea as [`gzip_len`], for an XZ/LZMA member via `lzma_rs`, which
/// likewise drives decompression off a `BufRead` and stops consuming once
/// its footer is reached.
fn xz_len(data: &[u8]) -> Result<usize, CpioError> {
    let mut remaining: &[u8] = data;
    let mut sink = Vec::new();
    lzma_rs::xz_decompress(&mut remaining, &mut sink).map_err(|_| CpioError::Decompress)?;
    Ok(data.len() - remaining.len())
}

/// Walks `data` from offset zero, identifying each segment's kind and
/// extent. Plain CPIO segments are measured exactly (by parsing through
/// their trailer); a compressed segment's length is recovered by
/// decompressing it and observing how much of the input the decoder
/// actually consumed, so a trailing compressed segment is never confused
/// with one that has more segments packed after it.
pub fn split_segments(data: &[u8]) -> Result<Vec<Segment>, CpioError> {
    let mut segments = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        if segments.len() >= MAX_SUBFILES {
            return Err(CpioError::TooManySegments);
        }

        let kind = detect_kind(&data[offset..]).ok_or_else(|| {
            log::warn!("unrecognized segment magic at offset {offset}");
            CpioError::UnknownSegment
        })?;
        let len = match kind {
            SegmentKind::Cpio => newc::parse_with_len(&data[offset..])?.1,
            SegmentKind::Gzip => gzip_len(&data[offset..])?,
            SegmentKind::Lzma => xz_len(&data[offset..])?,
        };
        segments.push(Segment { kind, offset, len });
        offset += len;
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newc::CpioEntry;

    #[test]
    fn splits_two_plain_cpio_segments() {
        let mut data = newc::write(&[CpioEntry::new_file("a", 0o644, b"1".to_vec())]);
        let first_len = data.len();
        data.extend_from_slice(&newc::write(&[CpioEntry::new_file("b", 0o644, b"2".to_vec())]));

        let segments = split_segments(&data).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].kind, SegmentKind::Cpio);
        assert_eq!(segments[0].offset, 0);
        assert_eq!(segments[0].len, first_len);
        assert_eq!(segments[1].offset, first_len);
    }

    fn gzip_of(bytes: &[u8]) -> Vec<u8> {
        use std::io::Write;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn xz_of(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        lzma_rs::xz_compress(&mut &bytes[..], &mut out).unwrap();
        out
    }

    #[test]
    fn treats_trailing_gzip_as_one_segment_to_eof() {
        let mut data = newc::write(&[CpioEntry::new_file("a", 0o644, b"1".to_vec())]);
        let cpio_len = data.len();
        data.extend_from_slice(&gzip_of(b"inner cpio bytes"));

        let segments = split_segments(&data).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].kind, SegmentKind::Gzip);
        assert_eq!(segments[1].offset, cpio_len);
        assert_eq!(segments[1].len, data.len() - cpio_len);
    }

    #[test]
    fn splits_a_cpio_then_lzma_then_gzip_image_into_three_segments() {
        let mut data = newc::write(&[CpioEntry::new_file("early", 0o644, b"microcode".to_vec())]);
        let cpio_len = data.len();

        let lzma_seg = xz_of(b"middle segment payload");
        let lzma_len = lzma_seg.len();
        data.extend_from_slice(&lzma_seg);

        let gzip_seg = gzip_of(b"trailing segment payload");
        let gzip_len = gzip_seg.len();
        data.extend_from_slice(&gzip_seg);

        let segments = split_segments(&data).unwrap();
        assert_eq!(segments.len(), 3);

        assert_eq!(segments[0].kind, SegmentKind::Cpio);
        assert_eq!(segments[0].offset, 0);
        assert_eq!(segments[0].len, cpio_len);

        assert_eq!(segments[1].kind, SegmentKind::Lzma);
        assert_eq!(segments[1].offset, cpio_len);
        assert_eq!(segments[1].len, lzma_len);

        assert_eq!(segments[2].kind, SegmentKind::Gzip);
        assert_eq!(segments[2].offset, cpio_len + lzma_len);
        assert_eq!(segments[2].len, gzip_len);
    }

    #[test]
    fn rejects_unrecognized_leading_bytes() {
        let data = [0u8; 16];
        assert_eq!(split_segments(&data), Err(CpioError::UnknownSegment));
    }
}
