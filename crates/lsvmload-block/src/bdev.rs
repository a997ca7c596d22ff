/// Every block transferred by a [`Bdev`] is exactly this many bytes.
pub const BLOCK_SIZE: usize = 512;

/// A single fixed-size block, identified by an LBA.
pub type Block = [u8; BLOCK_SIZE];

/// The one `set_flags` value every [`Bdev`] implementation must recognize:
/// consumed by [`crate::cache::CacheBdev`] to switch from write-through to
/// write-absorbing mode. Every other flag bit is opaque to the caller.
pub const ENABLE_CACHING: u32 = 1 << 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BdevError {
    #[error("I/O error")]
    Io,
    #[error("device is write protected")]
    WriteProtected,
    #[error("block index out of bounds")]
    OutOfBounds,
}

/// A uniform, composable block-I/O interface.
///
/// A `Bdev` exclusively owns its backing resource (a firmware protocol
/// handle, an in-memory buffer, or another `Bdev`). Implementations form a
/// chain by wrapping an inner `Bdev` by value; dropping (or calling
/// [`Bdev::close`] on) the outermost handle releases the whole chain.
pub trait Bdev {
    /// Reads exactly one 512-byte block. No partial reads: any underlying
    /// failure is reported as [`BdevError::Io`].
    fn get(&mut self, lba: u64) -> Result<Block, BdevError>;

    /// Writes exactly one 512-byte block.
    fn put(&mut self, lba: u64, block: &Block) -> Result<(), BdevError>;

    /// Sets implementation-defined flags. Only [`ENABLE_CACHING`] has a
    /// universally defined meaning; unrecognized bits are ignored.
    fn set_flags(&mut self, flags: u32);

    /// Releases this device and, transitively, everything it owns.
    /// Idempotent only at the top of the chain — calling it twice on an
    /// inner device is a logic error, not something this trait guards
    /// against (ownership by value already prevents it in practice).
    fn close(&mut self) -> Result<(), BdevError> {
        Ok(())
    }
}

/// Byte-granular I/O composed from whole-block `get`/`put`, provided once
/// for every [`Bdev`] rather than reimplemented per layer.
pub trait BdevExt: Bdev {
    /// Reads `buf.len()` bytes starting at byte offset `offset`, spanning
    /// as many blocks as needed.
    fn read_bytes(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), BdevError> {
        if buf.is_empty() {
            return Ok(());
        }
        let start_block = offset / BLOCK_SIZE as u64;
        let start_off = (offset % BLOCK_SIZE as u64) as usize;
        let end = offset + buf.len() as u64;
        let end_block = (end - 1) / BLOCK_SIZE as u64;

        let mut written = 0usize;
        for lba in start_block..=end_block {
            let block = self.get(lba)?;
            let lo = if lba == start_block { start_off } else { 0 };
            let hi = if lba == end_block {
                ((end - 1) % BLOCK_SIZE as u64) as usize + 1
            } else {
                BLOCK_SIZE
            };
            let chunk_len = hi - lo;
            buf[written..written + chunk_len].copy_from_slice(&block[lo..hi]);
            written += chunk_len;
        }
        Ok(())
    }

    /// Writes `buf.len()` bytes starting at byte offset `offset`, doing a
    /// read-modify-write on any partial first/last block.
    fn write_bytes(&mut self, offset: u64, buf: &[u8]) -> Result<(), BdevError> {
        if buf.is_empty() {
            return Ok(());
        }
        let start_block = offset / BLOCK_SIZE as u64;
        let start_off = (offset % BLOCK_SIZE as u64) as usize;
        let end = offset + buf.len() as u64;
        let end_block = (end - 1) / BLOCK_SIZE as u64;

        let mut read = 0usize;
        for lba in start_block..=end_block {
            let lo = if lba == start_block { start_off } else { 0 };
            let hi = if lba == end_block {
                ((end - 1) % BLOCK_SIZE as u64) as usize + 1
            } else {
                BLOCK_SIZE
            };
            let chunk_len = hi - lo;
            let mut block = if lo == 0 && hi == BLOCK_SIZE {
                [0u8; BLOCK_SIZE]
            } else {
                self.get(lba)?
            };
            block[lo..hi].copy_from_slice(&buf[read..read + chunk_len]);
            self.put(lba, &block)?;
            read += chunk_len;
        }
        Ok(())
    }
}

impl<T: Bdev + ?Sized> BdevExt for T {}

/// Lets a boxed trait object close a `Bdev` chain (spec.md §9's
/// `BootContext` threading a device whose concrete type varies boot to
/// boot — LUKS-wrapped or not, cached or not — through code that wants a
/// single owned value rather than a generic parameter).
#[cfg(feature = "alloc")]
impl Bdev for alloc::boxed::Box<dyn Bdev + Send> {
    fn get(&mut self, lba: u64) -> Result<Block, BdevError> {
        (**self).get(lba)
    }

    fn put(&mut self, lba: u64, block: &Block) -> Result<(), BdevError> {
        (**self).put(lba, block)
    }

    fn set_flags(&mut self, flags: u32) {
        (**self).set_flags(flags);
    }

    fn close(&mut self) -> Result<(), BdevError> {
        (**self).close()
    }
}

/// Always-failing `Bdev`, useful as a test double for error-path coverage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBdev;

impl Bdev for NullBdev {
    fn get(&mut self, _lba: u64) -> Result<Block, BdevError> {
        Err(BdevError::Io)
    }

    fn put(&mut self, _lba: u64, _block: &Block) -> Result<(), BdevError> {
        Err(BdevError::Io)
    }

    fn set_flags(&mut self, _flags: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mem(std::vec::Vec<Block>);

    impl Bdev for Mem {
        fn get(&mut self, lba: u64) -> Result<Block, BdevError> {
            self.0.get(lba as usize).copied().ok_or(BdevError::OutOfBounds)
        }
        fn put(&mut self, lba: u64, block: &Block) -> Result<(), BdevError> {
            *self.0.get_mut(lba as usize).ok_or(BdevError::OutOfBounds)? = *block;
            Ok(())
        }
        fn set_flags(&mut self, _flags: u32) {}
    }

    #[test]
    fn read_bytes_spans_blocks() {
        let mut dev = Mem(vec![[0xAAu8; BLOCK_SIZE], [0xBBu8; BLOCK_SIZE]]);
        let mut buf = [0u8; 8];
        dev.read_bytes(BLOCK_SIZE as u64 - 4, &mut buf).unwrap();
        assert_eq!(&buf[..4], &[0xAA; 4]);
        assert_eq!(&buf[4..], &[0xBB; 4]);
    }

    #[test]
    fn write_bytes_does_read_modify_write() {
        let mut dev = Mem(vec![[0x00u8; BLOCK_SIZE]]);
        dev.write_bytes(10, &[1, 2, 3]).unwrap();
        let block = dev.get(0).unwrap();
        assert_eq!(&block[10..13], &[1, 2, 3]);
        assert_eq!(block[0], 0);
        assert_eq!(block[13], 0);
    }

    #[test]
    fn null_bdev_always_errors() {
        let mut dev = NullBdev;
        assert_eq!(dev.get(0), Err(BdevError::Io));
        assert_eq!(dev.put(0, &[0; BLOCK_SIZE]), Err(BdevError::Io));
    }
}
