#![cfg_attr(not(feature = "std"), no_std)]

//! Primitives shared by every lsvmload crate: endianness-tagged integers for
//! on-disk structs, fixed-width strings, GUIDs, and a hex-dump helper used by
//! debug logging.

#[cfg(feature = "alloc")]
extern crate alloc;

/// Endianness-tagged number wrappers (`U16<E>`, `U32<E>`, `U64<E>`).
pub mod types;

/// Fixed-width on-disk string helpers (ASCII and UTF-16).
pub mod str;

/// GUID/partition-table primitives shared by the GPT and LUKS codecs.
pub mod part;

/// Small debug-only helpers (hex dump).
pub mod dump;

/// Checksum algorithms used by on-disk formats (GPT's CRC-32).
pub mod alg;
