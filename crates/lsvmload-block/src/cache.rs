use crate::bdev::{Bdev, BdevError, Block, ENABLE_CACHING};
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Number of hash chains backing a [`CacheBdev`] (spec.md §4.L2).
pub const MAX_CHAINS: usize = 65536;

struct Node {
    lba: u64,
    block: Block,
    next: Option<Box<Node>>,
}

/// A write-back cache that fronts any [`Bdev`].
///
/// In the default mode (flags == 0) reads are served from cache when
/// present and otherwise fall through to `child` and populate the cache;
/// writes go through to `child` and update the cache. Setting
/// [`ENABLE_CACHING`] switches to write-absorbing mode: `put` only updates
/// the cache and never reaches `child`. This is the mechanism the
/// orchestrator uses to make the downstream loader's writes to the boot
/// volume ephemeral once handoff is near (spec.md §4.O1 `S6`).
pub struct CacheBdev<D: Bdev> {
    child: D,
    chains: Vec<Option<Box<Node>>>,
    absorb_writes: bool,
}

impl<D: Bdev> CacheBdev<D> {
    pub fn new(child: D) -> Self {
        let mut chains = Vec::with_capacity(MAX_CHAINS);
        chains.resize_with(MAX_CHAINS, || None);
        Self {
            child,
            chains,
            absorb_writes: false,
        }
    }

    fn chain_index(lba: u64) -> usize {
        (lba as usize) % MAX_CHAINS
    }

    fn find(&self, lba: u64) -> Option<&Block> {
        let mut node = self.chains[Self::chain_index(lba)].as_deref();
        while let Some(n) = node {
            if n.lba == lba {
                return Some(&n.block);
            }
            node = n.next.as_deref();
        }
        None
    }

    fn insert(&mut self, lba: u64, block: Block) {
        let idx = Self::chain_index(lba);
        let mut node = self.chains[idx].as_deref_mut();
        while let Some(n) = node {
            if n.lba == lba {
                n.block = block;
                return;
            }
            node = n.next.as_deref_mut();
        }
        let head = self.chains[idx].take();
        self.chains[idx] = Some(Box::new(Node {
            lba,
            block,
            next: head,
        }));
    }

    /// Disables absorb mode for the duration of `f`, restoring the prior
    /// mode afterward. This is the only sanctioned way to bypass absorb
    /// mode for an intentional persistent write (spec.md §4.L2).
    pub fn with_persistent_write<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_absorbing = self.absorb_writes;
        self.absorb_writes = false;
        let result = f(self);
        self.absorb_writes = was_absorbing;
        result
    }

    pub fn into_child(self) -> D {
        self.child
    }

    pub fn child_mut(&mut self) -> &mut D {
        &mut self.child
    }
}

impl<D: Bdev> Bdev for CacheBdev<D> {
    fn get(&mut self, lba: u64) -> Result<Block, BdevError> {
        if let Some(block) = self.find(lba) {
            return Ok(*block);
        }
        let block = self.child.get(lba)?;
        self.insert(lba, block);
        Ok(block)
    }

    fn put(&mut self, lba: u64, block: &Block) -> Result<(), BdevError> {
        self.insert(lba, *block);
        if self.absorb_writes {
            return Ok(());
        }
        self.child.put(lba, block)
    }

    fn set_flags(&mut self, flags: u32) {
        self.absorb_writes = flags & ENABLE_CACHING != 0;
        self.child.set_flags(flags);
    }

    fn close(&mut self) -> Result<(), BdevError> {
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vecdev::VecBdev;

    #[test]
    fn write_through_mode_updates_child_and_cache() {
        let mut cache = CacheBdev::new(VecBdev::new(4));
        cache.put(0, &[7u8; 512]).unwrap();
        assert_eq!(cache.child_mut().get(0).unwrap(), [7u8; 512]);
        assert_eq!(cache.get(0).unwrap(), [7u8; 512]);
    }

    #[test]
    fn absorb_mode_hides_writes_from_child() {
        let mut cache = CacheBdev::new(VecBdev::new(4));
        cache.set_flags(ENABLE_CACHING);
        cache.put(1, &[9u8; 512]).unwrap();
        assert_eq!(cache.get(1).unwrap(), [9u8; 512]);
        assert_eq!(cache.child_mut().get(1).unwrap(), [0u8; 512]);
    }

    #[test]
    fn persistent_write_bypasses_absorb_mode_and_restores_it() {
        let mut cache = CacheBdev::new(VecBdev::new(4));
        cache.set_flags(ENABLE_CACHING);
        cache.with_persistent_write(|c| c.put(2, &[3u8; 512]).unwrap());
        assert_eq!(cache.child_mut().get(2).unwrap(), [3u8; 512]);
        // Absorb mode resumed afterward.
        cache.put(2, &[4u8; 512]).unwrap();
        assert_eq!(cache.child_mut().get(2).unwrap(), [3u8; 512]);
    }

    #[test]
    fn read_populates_cache_from_child() {
        let mut child = VecBdev::new(4);
        child.put(3, &[1u8; 512]).unwrap();
        let mut cache = CacheBdev::new(child);
        assert_eq!(cache.get(3).unwrap(), [1u8; 512]);
    }
}
