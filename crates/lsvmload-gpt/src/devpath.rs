//! EFI device-path editing for the synthesized boot partition (spec.md
//! §4.I2's "Device-path construction"): clone the first hard-drive device
//! path and edit its final `HardDrive` node to describe the new partition.
//!
//! Grounded directly on `original_source/lsvmload/devpath.{c,h}`'s
//! `HardDriveDevicePathPacked` layout and `DevPathCreatePseudoPartition`'s
//! algorithm (bump the partition number by one, place the new partition
//! immediately after the one with the highest start LBA, stamp a fixed
//! signature) — reimplemented here as pure byte editing of a caller-
//! supplied device-path buffer rather than a firmware-handle walk, since
//! locating `SCSI(0,0)`'s handle is out of scope for this crate.

use alloc::vec::Vec;

use crate::error::GptError;

const HARDDRIVE_TYPE: u8 = 4;
const HARDDRIVE_SUBTYPE: u8 = 1;
const DEVNODE_TYPE_END: u8 = 0x7F;

/// `HardDriveDevicePathPacked`'s total size: 4-byte node header, then
/// `partitionNumber` (u32), `partitionStart`/`partitionSize` (u64 each),
/// a 16-byte `signature`, `mbrType` (u8), `signatureType` (u8).
const HARD_DRIVE_NODE_LEN: usize = 4 + 4 + 8 + 8 + 16 + 1 + 1;

/// The fixed partition signature `DevPathCreatePseudoPartition` stamps
/// into the cloned HardDrive node, ported byte-for-byte from `devpath.c`.
const PSEUDO_PARTITION_SIGNATURE: [u8; 16] = [
    0x1b, 0x00, 0xc2, 0x41, 0xee, 0xb3, 0x46, 0x34, 0xb3, 0x3a, 0x35, 0x30, 0x6c, 0xc2, 0x63, 0xfe,
];

fn node_length(dp: &[u8], offset: usize) -> Result<usize, GptError> {
    let len_bytes = dp.get(offset + 2..offset + 4).ok_or(GptError::TruncatedDevicePath)?;
    Ok(u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize)
}

fn find_hard_drive_node(dp: &[u8]) -> Result<usize, GptError> {
    let mut offset = 0;
    while offset + 4 <= dp.len() {
        let node_type = dp[offset];
        if node_type == DEVNODE_TYPE_END {
            break;
        }
        let subtype = dp[offset + 1];
        let len = node_length(dp, offset)?;
        if len < 4 {
            return Err(GptError::TruncatedDevicePath);
        }
        if node_type == HARDDRIVE_TYPE && subtype == HARDDRIVE_SUBTYPE {
            if offset + HARD_DRIVE_NODE_LEN > dp.len() {
                return Err(GptError::TruncatedDevicePath);
            }
            return Ok(offset);
        }
        offset += len;
    }
    Err(GptError::NoHardDriveNode)
}

/// The new partition's placement, mirroring `DevPathCreatePseudoPartition`'s
/// `firstLBA`/`lastLBA` out-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePathPlacement {
    pub first_lba: u64,
    pub last_lba: u64,
}

/// Clones `device_path` (the first hard-drive device path found on the
/// firmware's root disk) and edits its `HardDrive` node to describe a new
/// partition of `partition_size_sectors` sectors placed immediately after
/// the node's current partition.
pub fn clone_with_pseudo_partition(
    device_path: &[u8],
    partition_size_sectors: u64,
) -> Result<(Vec<u8>, DevicePathPlacement), GptError> {
    let mut out = device_path.to_vec();
    let node = find_hard_drive_node(&out)?;

    let partition_number = u32::from_le_bytes(out[node + 4..node + 8].try_into().unwrap());
    let partition_start = u64::from_le_bytes(out[node + 8..node + 16].try_into().unwrap());
    let partition_size = u64::from_le_bytes(out[node + 16..node + 24].try_into().unwrap());

    let new_number = partition_number + 1;
    let new_start = partition_start + partition_size;
    let new_end = new_start
        .checked_add(partition_size_sectors)
        .and_then(|v| v.checked_sub(1))
        .ok_or(GptError::Overflow)?;

    out[node + 4..node + 8].copy_from_slice(&new_number.to_le_bytes());
    out[node + 8..node + 16].copy_from_slice(&new_start.to_le_bytes());
    out[node + 16..node + 24].copy_from_slice(&partition_size_sectors.to_le_bytes());
    out[node + 24..node + 40].copy_from_slice(&PSEUDO_PARTITION_SIGNATURE);

    Ok((
        out,
        DevicePathPlacement {
            first_lba: new_start,
            last_lba: new_end,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn scsi_node(pun: u16, lun: u16) -> Vec<u8> {
        let mut node = vec![3u8, 2, 8, 0];
        node.extend_from_slice(&pun.to_le_bytes());
        node.extend_from_slice(&lun.to_le_bytes());
        node
    }

    fn hard_drive_node(number: u32, start: u64, size: u64) -> Vec<u8> {
        let mut node = vec![HARDDRIVE_TYPE, HARDDRIVE_SUBTYPE, HARD_DRIVE_NODE_LEN as u8, 0];
        node.extend_from_slice(&number.to_le_bytes());
        node.extend_from_slice(&start.to_le_bytes());
        node.extend_from_slice(&size.to_le_bytes());
        node.extend_from_slice(&[0u8; 16]);
        node.push(2); // mbrType = GPT
        node.push(2); // signatureType = GUID
        node
    }

    fn end_node() -> Vec<u8> {
        vec![DEVNODE_TYPE_END, 0xFF, 4, 0]
    }

    fn sample_path() -> Vec<u8> {
        let mut dp = scsi_node(0, 0);
        dp.extend(hard_drive_node(1, 34, 999));
        dp.extend(end_node());
        dp
    }

    #[test]
    fn bumps_partition_number_and_places_after_existing() {
        let (patched, placement) = clone_with_pseudo_partition(&sample_path(), 500).unwrap();
        let node = find_hard_drive_node(&patched).unwrap();
        let number = u32::from_le_bytes(patched[node + 4..node + 8].try_into().unwrap());
        assert_eq!(number, 2);
        assert_eq!(placement.first_lba, 1033);
        assert_eq!(placement.last_lba, 1532);
    }

    #[test]
    fn stamps_the_fixed_signature() {
        let (patched, _) = clone_with_pseudo_partition(&sample_path(), 500).unwrap();
        let node = find_hard_drive_node(&patched).unwrap();
        assert_eq!(&patched[node + 24..node + 40], &PSEUDO_PARTITION_SIGNATURE);
    }

    #[test]
    fn leaves_the_input_buffer_untouched() {
        let original = sample_path();
        let snapshot = original.clone();
        let _ = clone_with_pseudo_partition(&original, 500).unwrap();
        assert_eq!(original, snapshot);
    }

    #[test]
    fn rejects_a_path_with_no_hard_drive_node() {
        let dp = [scsi_node(0, 0), end_node()].concat();
        assert!(matches!(clone_with_pseudo_partition(&dp, 500), Err(GptError::NoHardDriveNode)));
    }
}
