#![cfg_attr(not(feature = "std"), no_std)]

//! GPT parsing and the pseudo-partition patch that implements spec.md's
//! I2 component: reading the primary GPT off a [`lsvmload_block::Bdev`],
//! extending it with a synthetic `BOOTFS` entry, and editing the matching
//! EFI device path so the interposer can advertise the new partition.
//!
//! Grounded on `hadris-common`'s raw-struct GPT layout (adapted into
//! `lsvmload_common::part::gpt`) and on
//! `original_source/lsvmload/devpath.{c,h}` for the device-path half.

extern crate alloc;

pub mod devpath;
pub mod error;
pub mod image;
pub mod patch;

pub use devpath::{clone_with_pseudo_partition, DevicePathPlacement};
pub use error::GptError;
pub use image::GptImage;
pub use patch::{add_bootfs_partition, BootfsPlacement};
