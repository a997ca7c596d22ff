#![cfg_attr(not(feature = "std"), no_std)]

//! A synthetic, in-RAM FAT12/16/32 reader/writer: the L5 component that
//! patches a boot configuration file into the EFI System Partition shell
//! image without a general-purpose FAT driver's fragmentation handling.

extern crate alloc;

pub mod error;
pub mod fat;
pub mod fs;
pub mod structures;

pub use error::VfatError;
pub use fs::{FatEntry, Vfat};
pub use structures::{denormalize_short_name, normalize_short_name, FatType, FileAttributes};
