#![cfg_attr(not(feature = "std"), no_std)]

//! Read/write EXT2 (revision 1) file system support for lsvmload: the L4
//! component that mutates the LUKS-decrypted root volume to inject a
//! measured, re-specialized boot configuration.

extern crate alloc;

pub mod bitmap;
pub mod dirent;
pub mod error;
pub mod fs;
pub mod structures;

pub use dirent::DirEntry;
pub use error::Ext2Error;
pub use fs::Ext2;
pub use structures::{GroupDesc, Inode, Superblock, ROOT_INO};
