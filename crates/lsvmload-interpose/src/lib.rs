#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod console;
mod error;
mod esp;
mod region;
mod rootbio;

pub use console::{Console, FakeConsole, Key};
pub use error::InterposeError;
pub use esp::{EspFile, EspInterposer, RamFile};
pub use region::{Region, RegionBacking, RegionId, RegionTable, MAX_REGIONS};
pub use rootbio::InterposedBdev;
