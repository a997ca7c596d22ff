//! The legacy `TCG_PCR_EVENT` log entry (SHA-1 digest, per spec.md §6's
//! wire-format note), and the `EV_*` event types `measure.c` submits.

use alloc::string::String;
use alloc::vec::Vec;

pub mod event_type {
    pub const EV_SEPARATOR: u32 = 0x4;
    pub const EV_COMPACT_HASH: u32 = 0xC;
    pub const EV_IPL: u32 = 0xD;
}

/// One entry in the in-memory event log a [`crate::tpm::Tpm`] implementor
/// accumulates alongside its PCR extends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcgPcrEvent {
    pub pcr_index: u32,
    pub event_type: u32,
    pub digest: [u8; 20],
    pub event_data: Vec<u8>,
}

impl TcgPcrEvent {
    pub fn new(pcr_index: u32, event_type: u32, digest: [u8; 20], event_data: Vec<u8>) -> Self {
        Self {
            pcr_index,
            event_type,
            digest,
            event_data,
        }
    }

    /// Serializes to the on-the-wire `TCG_PCR_EVENT` layout: two `u32`
    /// fields, a 20-byte SHA-1 digest, a `u32` event size, then the event
    /// bytes themselves.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 4 + 20 + 4 + self.event_data.len());
        out.extend_from_slice(&self.pcr_index.to_le_bytes());
        out.extend_from_slice(&self.event_type.to_le_bytes());
        out.extend_from_slice(&self.digest);
        out.extend_from_slice(&(self.event_data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.event_data);
        out
    }
}

pub fn separator_event(pcr_index: u32, digest: [u8; 20]) -> TcgPcrEvent {
    TcgPcrEvent::new(pcr_index, event_type::EV_SEPARATOR, digest, alloc::vec![0u8; 4])
}

pub fn compact_hash_event(pcr_index: u32, digest: [u8; 20], description: &str) -> TcgPcrEvent {
    let mut data = String::from(description).into_bytes();
    data.push(0);
    TcgPcrEvent::new(pcr_index, event_type::EV_COMPACT_HASH, digest, data)
}

pub fn ipl_event(pcr_index: u32, digest: [u8; 20], description: &str) -> TcgPcrEvent {
    let mut data = String::from(description).into_bytes();
    data.push(0);
    TcgPcrEvent::new(pcr_index, event_type::EV_IPL, digest, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_fixed_and_variable_fields() {
        let event = compact_hash_event(11, [0x42; 20], "Capping measurement");
        let bytes = event.to_bytes();
        assert_eq!(&bytes[0..4], &11u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &event_type::EV_COMPACT_HASH.to_le_bytes());
        assert_eq!(&bytes[8..28], &[0x42u8; 20]);
        let size = u32::from_le_bytes(bytes[28..32].try_into().unwrap()) as usize;
        assert_eq!(size, event.event_data.len());
        assert_eq!(&bytes[32..], &event.event_data[..]);
    }
}
