//! Directory body parsing and the linked-list rebuild rule from spec.md
//! §4.L4: entries are packed back-to-back, each `rec_len` rounded up to a
//! 4-byte boundary, and the last entry in each block is stretched so its
//! `rec_len` reaches the block boundary exactly.

use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;

use lsvmload_common::types::{Endian, LittleEndian, U16, U32};

use crate::error::Ext2Error;
use crate::structures::{min_rec_len, DirEntryHeader, DIR_ENTRY_HEADER_LEN};

/// One parsed directory entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub inode: u32,
    pub file_type: u8,
    pub name: String,
}

/// Parses every live entry (`inode != 0`) out of a directory's block-sized
/// body, validating that `rec_len` values tile the block exactly.
pub fn parse_entries(body: &[u8]) -> Result<Vec<DirEntry>, Ext2Error> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < body.len() {
        if pos + DIR_ENTRY_HEADER_LEN > body.len() {
            return Err(Ext2Error::BadRecLen);
        }
        let header: DirEntryHeader = *bytemuck::from_bytes(&body[pos..pos + DIR_ENTRY_HEADER_LEN]);
        let rec_len = header.rec_len.get() as usize;
        if rec_len < DIR_ENTRY_HEADER_LEN || pos + rec_len > body.len() {
            return Err(Ext2Error::BadRecLen);
        }
        let name_len = header.name_len as usize;
        if DIR_ENTRY_HEADER_LEN + name_len > rec_len {
            return Err(Ext2Error::BadRecLen);
        }
        let inode = header.inode.get();
        if inode != 0 {
            let name_bytes = &body[pos + DIR_ENTRY_HEADER_LEN..pos + DIR_ENTRY_HEADER_LEN + name_len];
            let name = core::str::from_utf8(name_bytes)
                .map_err(|_| Ext2Error::BadRecLen)?
                .to_string();
            out.push(DirEntry { inode, file_type: header.file_type, name });
        }
        pos += rec_len;
    }
    Ok(out)
}

/// Repacks a directory's live entries into `block_size`-sized blocks,
/// stretching each block's final `rec_len` to the block boundary.
pub fn rebuild_blocks(entries: &[DirEntry], block_size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    if entries.is_empty() {
        out.resize(block_size, 0);
        return out;
    }

    let mut block_start = 0usize;
    let mut last_header_pos: Option<usize> = None;

    for entry in entries {
        let want = min_rec_len(entry.name.len()) as usize;
        let used = out.len() - block_start;
        if used + want > block_size {
            stretch_last(&mut out, block_start, last_header_pos, block_size);
            block_start = out.len();
            last_header_pos = None;
        }

        let header_pos = out.len();
        let header = DirEntryHeader {
            inode: U32::<LittleEndian>::new(entry.inode),
            rec_len: U16::<LittleEndian>::new(want as u16),
            name_len: entry.name.len() as u8,
            file_type: entry.file_type,
        };
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(entry.name.as_bytes());
        out.resize(header_pos + want, 0);
        last_header_pos = Some(header_pos);
    }

    stretch_last(&mut out, block_start, last_header_pos, block_size);
    out
}

/// Pads `out` up to the current block's end, widening the last entry's
/// `rec_len` field in place to absorb the padding (so the block's entries
/// still tile it exactly, per the on-disk invariant).
fn stretch_last(out: &mut Vec<u8>, block_start: usize, last_header_pos: Option<usize>, block_size: usize) {
    let Some(header_pos) = last_header_pos else {
        out.resize(block_start + block_size, 0);
        return;
    };
    let new_len = block_start + block_size;
    let stretched = (new_len - header_pos) as u16;
    out.resize(new_len, 0);
    // `rec_len` sits right after the 4-byte `inode` field in `DirEntryHeader`.
    let rec_len_offset = header_pos + 4;
    out[rec_len_offset..rec_len_offset + 2].copy_from_slice(&stretched.to_le_bytes());
}
