#![cfg_attr(not(feature = "std"), no_std)]

//! LUKS1 header parsing, master-key recovery, and the per-sector cipher
//! that together implement spec.md's L3 component: the layer between the
//! raw encrypted boot device and the EXT2 file system mounted on top of
//! it.
//!
//! Grounded on `hadris-fat`'s raw on-disk struct style for [`header`] and
//! on `original_source/lsvmutils/luks.{c,h}` and `lukscrypto.c` for the
//! key-recovery and sector-cipher semantics.

extern crate alloc;

pub mod bdev;
pub mod cipher;
pub mod error;
pub mod header;
pub mod masterkey;

pub use bdev::LuksBdev;
pub use error::LuksError;
pub use header::{HeaderError, KeySlot, LuksHeader};
pub use masterkey::{recover_master_key, verify_master_key, HashAlg};
