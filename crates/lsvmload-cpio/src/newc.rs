//! The "newc" (SVR4, no checksum) CPIO archive format: a 110-byte ASCII-hex
//! header per entry, followed by the (NUL-terminated) name and the file
//! body, each padded to a 4-byte boundary.

use std::string::{String, ToString};
use std::vec::Vec;

use crate::error::CpioError;

pub const MAGIC: &[u8; 6] = b"070701";
const HEADER_LEN: usize = 110;
const TRAILER_NAME: &str = "TRAILER!!!";

pub const MODE_IFDIR: u32 = 0o040000;
pub const MODE_IFREG: u32 = 0o100000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpioEntry {
    pub name: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub devmajor: u32,
    pub devminor: u32,
    pub rdevmajor: u32,
    pub rdevminor: u32,
    pub data: Vec<u8>,
}

impl CpioEntry {
    pub fn new_dir(name: impl Into<String>, mode: u32) -> Self {
        Self {
            name: name.into(),
            mode: MODE_IFDIR | mode,
            uid: 0,
            gid: 0,
            nlink: 2,
            mtime: 0,
            devmajor: 0,
            devminor: 0,
            rdevmajor: 0,
            rdevminor: 0,
            data: Vec::new(),
        }
    }

    pub fn new_file(name: impl Into<String>, mode: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mode: MODE_IFREG | mode,
            uid: 0,
            gid: 0,
            nlink: 1,
            mtime: 0,
            devmajor: 0,
            devminor: 0,
            rdevmajor: 0,
            rdevminor: 0,
            data,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & 0o170000 == MODE_IFDIR
    }

    pub fn basename(&self) -> &str {
        match self.name.rsplit_once('/') {
            Some((_, base)) => base,
            None => &self.name,
        }
    }
}

fn align4(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

fn hex_field(bytes: &[u8]) -> Result<u32, CpioError> {
    let text = core::str::from_utf8(bytes).map_err(|_| CpioError::BadHeaderField)?;
    u32::from_str_radix(text, 16).map_err(|_| CpioError::BadHeaderField)
}

fn write_hex_field(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(format!("{value:08x}").as_bytes());
}

/// Parses a single newc archive (no further segments after it) starting at
/// `data[0]`, returning its entries and the total byte length the archive
/// occupies (through the 4-aligned trailer), so the caller can locate the
/// next segment in a multi-segment initrd.
pub fn parse_with_len(data: &[u8]) -> Result<(Vec<CpioEntry>, usize), CpioError> {
    let mut entries = Vec::new();
    let mut pos = 0usize;

    loop {
        if data.len() < pos + HEADER_LEN {
            return Err(CpioError::Truncated);
        }
        let header = &data[pos..pos + HEADER_LEN];
        if &header[0..6] != MAGIC {
            return Err(CpioError::BadMagic);
        }

        let mode = hex_field(&header[14..22])?;
        let uid = hex_field(&header[22..30])?;
        let gid = hex_field(&header[30..38])?;
        let nlink = hex_field(&header[38..46])?;
        let mtime = hex_field(&header[46..54])?;
        let filesize = hex_field(&header[54..62])? as usize;
        let devmajor = hex_field(&header[62..70])?;
        let devminor = hex_field(&header[70..78])?;
        let rdevmajor = hex_field(&header[78..86])?;
        let rdevminor = hex_field(&header[86..94])?;
        let namesize = hex_field(&header[94..102])? as usize;

        let name_start = pos + HEADER_LEN;
        let name_end = name_start + namesize;
        if data.len() < name_end {
            return Err(CpioError::Truncated);
        }
        let raw_name = &data[name_start..name_start + namesize.saturating_sub(1)];
        let name = core::str::from_utf8(raw_name)
            .map_err(|_| CpioError::BadHeaderField)?
            .to_string();

        let data_start = name_end + align4(name_end - pos);
        let data_end = data_start + filesize;
        if data.len() < data_end {
            return Err(CpioError::Truncated);
        }

        let entry_len = (data_end - pos) + align4(data_end - pos);
        let next_pos = pos + entry_len;

        if name == TRAILER_NAME {
            pos = next_pos;
            break;
        }

        entries.push(CpioEntry {
            name,
            mode,
            uid,
            gid,
            nlink,
            mtime,
            devmajor,
            devminor,
            rdevmajor,
            rdevminor,
            data: data[data_start..data_end].to_vec(),
        });

        pos = next_pos;
    }

    Ok((entries, pos))
}

pub fn parse(data: &[u8]) -> Result<Vec<CpioEntry>, CpioError> {
    parse_with_len(data).map(|(entries, _)| entries)
}

fn write_entry(out: &mut Vec<u8>, ino: u32, entry: &CpioEntry) {
    let start = out.len();
    out.extend_from_slice(MAGIC);
    write_hex_field(out, ino);
    write_hex_field(out, entry.mode);
    write_hex_field(out, entry.uid);
    write_hex_field(out, entry.gid);
    write_hex_field(out, entry.nlink);
    write_hex_field(out, entry.mtime);
    write_hex_field(out, entry.data.len() as u32);
    write_hex_field(out, entry.devmajor);
    write_hex_field(out, entry.devminor);
    write_hex_field(out, entry.rdevmajor);
    write_hex_field(out, entry.rdevminor);
    write_hex_field(out, (entry.name.len() + 1) as u32);
    write_hex_field(out, 0); // check

    out.extend_from_slice(entry.name.as_bytes());
    out.push(0);
    for _ in 0..align4(out.len() - start) {
        out.push(0);
    }

    out.extend_from_slice(&entry.data);
    for _ in 0..align4(out.len() - start) {
        out.push(0);
    }
}

pub fn write(entries: &[CpioEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        write_entry(&mut out, (i + 1) as u32, entry);
    }
    let trailer = CpioEntry {
        name: TRAILER_NAME.to_string(),
        mode: 0,
        uid: 0,
        gid: 0,
        nlink: 1,
        mtime: 0,
        devmajor: 0,
        devminor: 0,
        rdevmajor: 0,
        rdevminor: 0,
        data: Vec::new(),
    };
    write_entry(&mut out, 0, &trailer);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_small_archive() {
        let entries = vec![
            CpioEntry::new_dir("etc", 0o755),
            CpioEntry::new_file("etc/motd", 0o644, b"hello\n".to_vec()),
        ];
        let bytes = write(&entries);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "etc");
        assert!(parsed[0].is_dir());
        assert_eq!(parsed[1].name, "etc/motd");
        assert_eq!(parsed[1].data, b"hello\n");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = write(&[CpioEntry::new_dir("etc", 0o755)]);
        bytes[0] = b'x';
        assert_eq!(parse(&bytes), Err(CpioError::BadMagic));
    }

    #[test]
    fn parse_with_len_stops_at_trailer_for_multi_segment_buffers() {
        let entries = vec![CpioEntry::new_file("a", 0o644, b"x".to_vec())];
        let mut bytes = write(&entries);
        let first_len = bytes.len();
        bytes.extend_from_slice(&write(&[CpioEntry::new_file("b", 0o644, b"y".to_vec())]));

        let (parsed, len) = parse_with_len(&bytes).unwrap();
        assert_eq!(len, first_len);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "a");
    }

    #[test]
    fn empty_archive_round_trips() {
        let bytes = write(&[]);
        assert_eq!(parse(&bytes).unwrap(), Vec::new());
    }
}
