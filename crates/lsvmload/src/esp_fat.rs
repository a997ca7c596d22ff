//! Synthetic ESP FAT shell (spec.md §4.L5, §6): a small fixed-size FAT12
//! image carrying a patched `GRUB.CFG`, installed as `RegionId::Esp` over
//! the leading sectors of the real ESP. Grounded on
//! `lsvmload-vfat/src/fs.rs`'s own `format_volume` test helper for the
//! `Bpb` layout, mounted and written to with the same
//! `Vfat::open`/`mkdir`/`put_file` surface that crate exposes elsewhere.

use bytemuck::Zeroable;

use lsvmload_block::{BdevExt, VecBdev};
use lsvmload_common::part::Guid;
use lsvmload_common::types::{LittleEndian, U16};
use lsvmload_gpt::GptImage;
use lsvmload_vfat::structures::Bpb;
use lsvmload_vfat::Vfat;

use crate::error::OrchestratorError;

type LE16 = U16<LittleEndian>;

/// Sectors the shell occupies at the front of the ESP's LBA range. A real
/// ESP's cluster count would blow past FAT12's 4085-cluster ceiling, so
/// the shell only ever covers this small leading slice; reads past it
/// fall through to the real on-disk ESP bytes (the root-BIO interposer
/// only overlays what a region actually spans — spec.md §4.I1).
const SHELL_SECTORS: u32 = 2048;
const SECTORS_PER_FAT: u32 = 8;
const ROOT_ENTRIES: u16 = 16;

fn format_shell() -> VecBdev {
    let mut dev = VecBdev::new(SHELL_SECTORS as usize);

    let mut bpb = Bpb::zeroed();
    bpb.bytes_per_sector = LE16::new(512);
    bpb.sectors_per_cluster = 1;
    bpb.reserved_sector_count = LE16::new(1);
    bpb.fat_count = 2;
    bpb.root_entry_count = LE16::new(ROOT_ENTRIES);
    bpb.total_sectors_16 = LE16::new(SHELL_SECTORS as u16);
    bpb.media_type = 0xF8;
    bpb.sectors_per_fat_16 = LE16::new(SECTORS_PER_FAT);

    let mut raw = vec![0u8; 512];
    raw[..core::mem::size_of::<Bpb>()].copy_from_slice(bytemuck::bytes_of(&bpb));
    raw[510] = 0x55;
    raw[511] = 0xAA;
    dev.write_bytes(0, &raw).expect("a fresh 2048-sector VecBdev always accepts sector 0");
    dev
}

/// Builds the synthetic FAT shell's serialized bytes, with `grub_cfg`
/// dropped at `/EFI/<vendor>/GRUB.CFG` and a second copy at `/<vendor>/
/// GRUB.CFG` (spec.md §6's "vendor-specific current-working-directory
/// location" — resolved as the FAT root, alongside `EFI`, rather than
/// inside it; see DESIGN.md).
pub fn build_grub_cfg_shell(vendor: &str, grub_cfg: &[u8]) -> Result<Vec<u8>, OrchestratorError> {
    let mut vfat = Vfat::open(format_shell())?;

    vfat.mkdir("/EFI")?;
    vfat.mkdir(&format!("/EFI/{vendor}"))?;
    vfat.put_file(&format!("/EFI/{vendor}/GRUB.CFG"), grub_cfg)?;

    vfat.mkdir(&format!("/{vendor}"))?;
    vfat.put_file(&format!("/{vendor}/GRUB.CFG"), grub_cfg)?;

    Ok(vfat.into_device().into_bytes())
}

/// Locates the real ESP's starting LBA in a parsed GPT, by its type GUID
/// (spec.md §4.I3 operates "on the ESP's `SIMPLE_FILE_SYSTEM` protocol",
/// which firmware resolves from exactly this entry).
pub fn find_esp_start_lba(gpt: &GptImage) -> Result<u64, OrchestratorError> {
    gpt.entries
        .iter()
        .find(|e| !e.is_unused() && e.type_guid == Guid::EFI_SYSTEM_PART)
        .map(|e| e.starting_lba.get())
        .ok_or(OrchestratorError::InterposerInstall)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_carries_grub_cfg_at_both_locations() {
        let bytes = build_grub_cfg_shell("Contoso", b"set default=0\n").unwrap();
        let dev = VecBdev::from_bytes(&bytes);
        let mut vfat = Vfat::open(dev).unwrap();
        assert_eq!(vfat.get_file("/EFI/Contoso/GRUB.CFG").unwrap().as_slice(), b"set default=0\n");
        assert_eq!(vfat.get_file("/Contoso/GRUB.CFG").unwrap().as_slice(), b"set default=0\n");
    }

    #[test]
    fn shell_is_exactly_the_fixed_sector_count() {
        let bytes = build_grub_cfg_shell("Contoso", b"x").unwrap();
        assert_eq!(bytes.len(), SHELL_SECTORS as usize * 512);
    }
}
