//! The ESP file-I/O interposer (spec.md §4.I3): replaces the firmware's
//! `OpenVolume`/`Open` so that opening `grubx64.efi` or `grub.efi` by
//! basename returns a RAM-resident shim file instead of touching the real
//! ESP, while every other path reports not-found. Grounded on the same
//! decorator shape as [`crate::rootbio::InterposedBdev`], specialized to
//! a `EFI_FILE_PROTOCOL`-shaped capability instead of `Bdev`.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::InterposeError;

const PRELOADABLE_NAMES: [&str; 2] = ["grubx64.efi", "grub.efi"];

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// The subset of `EFI_FILE_PROTOCOL` the shim needs to answer.
pub trait EspFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, InterposeError>;
    fn write(&mut self, buf: &[u8]) -> Result<usize, InterposeError>;
    fn set_position(&mut self, position: u64) -> Result<(), InterposeError>;
    fn size(&self) -> Result<u64, InterposeError>;
    fn set_info(&mut self) -> Result<(), InterposeError>;
    fn delete(&mut self) -> Result<(), InterposeError>;
}

/// A read-only, RAM-resident file: the entire content of a preloaded
/// GRUB image.
pub struct RamFile {
    bytes: Vec<u8>,
    position: usize,
}

impl RamFile {
    fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, position: 0 }
    }
}

impl EspFile for RamFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, InterposeError> {
        let remaining = &self.bytes[self.position.min(self.bytes.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize, InterposeError> {
        Err(InterposeError::Unsupported)
    }

    fn set_position(&mut self, position: u64) -> Result<(), InterposeError> {
        self.position = position as usize;
        Ok(())
    }

    fn size(&self) -> Result<u64, InterposeError> {
        Ok(self.bytes.len() as u64)
    }

    fn set_info(&mut self) -> Result<(), InterposeError> {
        Err(InterposeError::Unsupported)
    }

    fn delete(&mut self) -> Result<(), InterposeError> {
        Err(InterposeError::Unsupported)
    }
}

/// Holds the preloaded GRUB images, keyed by basename, and answers
/// `Open` requests against them.
#[derive(Default)]
pub struct EspInterposer {
    files: Vec<(String, Vec<u8>)>,
}

impl EspInterposer {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Registers `bytes` to be served whenever `name` (one of
    /// [`PRELOADABLE_NAMES`]) is opened. `name` is matched case-sensitively
    /// against the request's basename, as the original ESP layout does.
    pub fn preload(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), InterposeError> {
        if !PRELOADABLE_NAMES.contains(&name) {
            return Err(InterposeError::NotFound);
        }
        self.files.retain(|(n, _)| n != name);
        self.files.push((String::from(name), bytes));
        log::debug!("preloaded ESP shim file {name} ({} bytes)", self.files.last().unwrap().1.len());
        Ok(())
    }

    /// Opens `path`, matching its basename against the preloaded set.
    pub fn open(&self, path: &str) -> Result<RamFile, InterposeError> {
        let name = basename(path);
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| RamFile::new(bytes.clone()))
            .ok_or(InterposeError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn opens_a_preloaded_file_by_basename() {
        let mut esp = EspInterposer::new();
        esp.preload("grubx64.efi", vec![1, 2, 3, 4]).unwrap();

        let mut file = esp.open("\\EFI\\BOOT\\grubx64.efi").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(file.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn rejects_unknown_names() {
        let mut esp = EspInterposer::new();
        esp.preload("grubx64.efi", vec![0u8; 8]).unwrap();
        assert_eq!(esp.open("\\EFI\\BOOT\\bootx64.efi").err(), Some(InterposeError::NotFound));
    }

    #[test]
    fn refuses_to_preload_an_unlisted_name() {
        let mut esp = EspInterposer::new();
        assert_eq!(esp.preload("malicious.efi", vec![0u8; 1]).err(), Some(InterposeError::NotFound));
    }

    #[test]
    fn write_and_delete_are_unsupported() {
        let mut esp = EspInterposer::new();
        esp.preload("grub.efi", vec![0u8; 4]).unwrap();
        let mut file = esp.open("grub.efi").unwrap();
        assert_eq!(file.write(&[1]).err(), Some(InterposeError::Unsupported));
        assert_eq!(file.delete().err(), Some(InterposeError::Unsupported));
    }

    #[test]
    fn size_reflects_preloaded_length() {
        let mut esp = EspInterposer::new();
        esp.preload("grub.efi", vec![0u8; 77]).unwrap();
        let file = esp.open("grub.efi").unwrap();
        assert_eq!(file.size().unwrap(), 77);
    }
}
