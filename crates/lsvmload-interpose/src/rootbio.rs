//! The root BIO interposer (spec.md §4.I1): wraps the original boot disk
//! and serves installed regions in its place, forwarding everything else
//! straight through. Grounded on `lsvmload-luks`'s `LuksBdev<D: Bdev>`
//! decorator — a `Bdev` that owns a child `Bdev` and answers `get`/`put`
//! itself rather than delegating unconditionally.

use lsvmload_block::{Bdev, BdevError, Block};

use crate::region::RegionTable;

fn to_bdev_error(err: crate::error::InterposeError) -> BdevError {
    match err {
        crate::error::InterposeError::WriteProtected => BdevError::WriteProtected,
        crate::error::InterposeError::OutOfBounds => BdevError::OutOfBounds,
        _ => BdevError::Io,
    }
}

/// A `Bdev` that answers `get`/`put` from its [`RegionTable`] whenever the
/// requested LBA falls inside an installed region, and otherwise forwards
/// to `child` unchanged.
///
/// `enable_hooks` exists because region lookups themselves may need to do
/// I/O against `child` (or log, which may itself touch disk) — while that
/// I/O is in flight, hooks are disabled so the nested call passes straight
/// through instead of recursing back into region lookup.
pub struct InterposedBdev<D: Bdev> {
    child: D,
    regions: RegionTable,
    enable_hooks: bool,
}

impl<D: Bdev> InterposedBdev<D> {
    pub fn new(child: D) -> Self {
        Self {
            child,
            regions: RegionTable::new(),
            enable_hooks: true,
        }
    }

    pub fn regions_mut(&mut self) -> &mut RegionTable {
        &mut self.regions
    }

    pub fn set_hooks_enabled(&mut self, enabled: bool) {
        self.enable_hooks = enabled;
    }

    pub fn into_child(self) -> D {
        let Self { child, .. } = self;
        child
    }
}

impl<D: Bdev> Bdev for InterposedBdev<D> {
    fn get(&mut self, lba: u64) -> Result<Block, BdevError> {
        if self.enable_hooks {
            if let Some(region) = self.regions.lookup(lba) {
                return region.get(lba).map_err(to_bdev_error);
            }
        }
        self.child.get(lba)
    }

    fn put(&mut self, lba: u64, block: &Block) -> Result<(), BdevError> {
        if self.enable_hooks {
            if let Some(region) = self.regions.lookup(lba) {
                return region.put(lba, block).map_err(to_bdev_error);
            }
        }
        self.child.put(lba, block)
    }

    fn set_flags(&mut self, flags: u32) {
        self.child.set_flags(flags);
    }

    fn close(&mut self) -> Result<(), BdevError> {
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsvmload_block::{BdevExt, VecBdev};

    use crate::region::{Region, RegionId};

    #[test]
    fn serves_installed_region_instead_of_child() {
        let child = VecBdev::new(16);
        let mut dev = InterposedBdev::new(child);
        dev.regions_mut()
            .install(Region::ram(RegionId::Gpt, 1, true, &[0x42u8; 512]))
            .unwrap();

        let block = dev.get(1).unwrap();
        assert_eq!(block, [0x42u8; 512]);
    }

    #[test]
    fn forwards_lbas_outside_any_region_to_child() {
        let mut child = VecBdev::new(16);
        child.put(5, &[0x7Au8; 512]).unwrap();
        let mut dev = InterposedBdev::new(child);
        dev.regions_mut()
            .install(Region::ram(RegionId::Gpt, 0, true, &[0u8; 512]))
            .unwrap();

        let block = dev.get(5).unwrap();
        assert_eq!(block, [0x7Au8; 512]);
    }

    #[test]
    fn disabling_hooks_bypasses_regions() {
        let mut child = VecBdev::new(16);
        child.put(1, &[0x11u8; 512]).unwrap();
        let mut dev = InterposedBdev::new(child);
        dev.regions_mut()
            .install(Region::ram(RegionId::Gpt, 1, true, &[0x42u8; 512]))
            .unwrap();
        dev.set_hooks_enabled(false);

        let block = dev.get(1).unwrap();
        assert_eq!(block, [0x11u8; 512]);
    }

    #[test]
    fn writes_to_a_read_only_region_fail() {
        let child = VecBdev::new(16);
        let mut dev = InterposedBdev::new(child);
        dev.regions_mut()
            .install(Region::ram(RegionId::Gpt, 0, true, &[0u8; 512]))
            .unwrap();

        assert_eq!(dev.put(0, &[1u8; 512]), Err(BdevError::WriteProtected));
    }
}
