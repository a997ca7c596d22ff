#![cfg_attr(not(feature = "std"), no_std)]

//! TPM 2.0 PCR/sealing policy interface and the PE/scenario measurement
//! pipeline that together implement spec.md's M1 and M2 components: the
//! abstraction a hardware-backed implementation would marshal through
//! `tss-esapi`, and the shim/GRUB/capping measurement sequence built on
//! top of it.
//!
//! Grounded on `original_source/lsvmload/measure.{c,h}` for the PCR
//! assignments and event sequencing, and on the published Windows
//! Authenticode Portable Executable Signature Format for [`peimage`].

extern crate alloc;

pub mod error;
pub mod event;
pub mod peimage;
pub mod tpm;

pub use error::TpmError;
pub use event::{event_type, TcgPcrEvent};
pub use peimage::authenticode_hash;
pub use tpm::{SoftwareTpm, SrkHandle, Tpm, CAPPING_PCR, GRUB_PCR, PCR_COUNT, SCENARIO_PCR, SHIM_PCR, WELL_KNOWN_SRK_HANDLE};
