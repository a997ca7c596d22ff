//! Idempotent key injection into a single CPIO archive, and the
//! segment-aware driver that applies it across a whole initrd image.

use std::io::Read;
use std::vec::Vec;

use crate::error::CpioError;
use crate::newc::{self, CpioEntry};
use crate::segment::{self, SegmentKind};

pub const HYPERV_KEYBOARD_BASENAME: &str = "hyperv-keyboard.ko";
const BOOTKEY_PATH: &str = "etc/lsvmload/bootkey";
const ROOTKEY_PATH: &str = "etc/lsvmload/rootkey";
const SPECIALIZE_PATH: &str = "etc/lsvmload/specialize";

fn ensure_dir(entries: &mut Vec<CpioEntry>, path: &str) {
    if !entries.iter().any(|e| e.name == path && e.is_dir()) {
        entries.push(CpioEntry::new_dir(path, 0o755));
    }
}

fn replace_file(entries: &mut Vec<CpioEntry>, path: &str, data: &[u8]) {
    entries.retain(|e| e.name != path);
    entries.push(CpioEntry::new_file(path, 0o755, data.to_vec()));
}

fn remove_path(entries: &mut Vec<CpioEntry>, path: &str) {
    entries.retain(|e| e.name != path);
}

fn remove_by_basename(entries: &mut Vec<CpioEntry>, basename: &str) {
    entries.retain(|e| e.basename() != basename);
}

/// Applies the six-step key injection to one archive's entry list. Safe to
/// run repeatedly over the same archive: every step either no-ops when
/// already applied or replaces the prior result outright.
pub fn inject_files(entries: &mut Vec<CpioEntry>, bootkey: &[u8], rootkey: &[u8]) {
    ensure_dir(entries, "etc");
    ensure_dir(entries, "etc/lsvmload");
    replace_file(entries, BOOTKEY_PATH, bootkey);
    replace_file(entries, ROOTKEY_PATH, rootkey);
    remove_path(entries, SPECIALIZE_PATH);
    remove_by_basename(entries, HYPERV_KEYBOARD_BASENAME);
}

fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>, CpioError> {
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|_| CpioError::Decompress)?;
    Ok(out)
}

fn decompress_xz(data: &[u8]) -> Result<Vec<u8>, CpioError> {
    let mut out = Vec::new();
    let mut reader = std::io::BufReader::new(data);
    lzma_rs::xz_decompress(&mut reader, &mut out).map_err(|_| CpioError::Decompress)?;
    Ok(out)
}

fn inject_segment(kind: SegmentKind, bytes: &[u8], bootkey: &[u8], rootkey: &[u8]) -> Result<Vec<u8>, CpioError> {
    let raw = match kind {
        SegmentKind::Cpio => bytes.to_vec(),
        SegmentKind::Gzip => {
            log::trace!("decompressing gzip initrd segment ({} bytes)", bytes.len());
            decompress_gzip(bytes)?
        }
        SegmentKind::Lzma => {
            log::trace!("decompressing xz initrd segment ({} bytes)", bytes.len());
            decompress_xz(bytes)?
        }
    };

    let mut entries = newc::parse(&raw)?;
    inject_files(&mut entries, bootkey, rootkey);
    Ok(newc::write(&entries))
}

/// Splits `image` into its segments, injects the boot/root keys into every
/// CPIO-bearing segment (decompressing and re-emitting uncompressed where
/// needed, since the Linux initrd loader tolerates mixed segments), and
/// concatenates the results back together in original order.
pub fn patch_initrd(image: &[u8], bootkey: &[u8], rootkey: &[u8]) -> Result<Vec<u8>, CpioError> {
    let segments = segment::split_segments(image)?;
    log::debug!("initrd has {} segment(s)", segments.len());
    let mut out = Vec::new();
    for seg in segments {
        let bytes = &image[seg.offset..seg.offset + seg.len];
        out.extend_from_slice(&inject_segment(seg.kind, bytes, bootkey, rootkey)?);
    }
    Ok(out)
}

/// Builds a brand-new single-segment archive holding only the injected
/// keys, for the case where an initrd has no pre-existing CPIO segment to
/// patch.
pub fn make_archive(bootkey: &[u8], rootkey: &[u8]) -> Vec<u8> {
    let mut entries: Vec<CpioEntry> = Vec::new();
    inject_files(&mut entries, bootkey, rootkey);
    newc::write(&entries)
}
