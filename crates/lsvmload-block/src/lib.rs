#![cfg_attr(not(feature = "std"), no_std)]

//! The block-device abstraction (spec.md §4.L1) and the write-back cache
//! device that fronts it (§4.L2).
//!
//! Every layer above this crate — LUKS, EXT2, VFAT — is written against the
//! [`Bdev`] trait rather than any concrete backing store, so the same code
//! runs against a real firmware block-I/O handle, an in-memory test image,
//! or another `Bdev` in a chain.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod bdev;
#[cfg(feature = "alloc")]
pub mod cache;
#[cfg(feature = "alloc")]
pub mod vecdev;

pub use bdev::{Bdev, BdevError, BdevExt, Block, BLOCK_SIZE, ENABLE_CACHING};
#[cfg(feature = "alloc")]
pub use cache::CacheBdev;
#[cfg(feature = "alloc")]
pub use vecdev::VecBdev;
