//! Endian-tagged primitive types for on-disk structures.
//!
//! LUKS headers are big-endian; GPT, EXT2, and VFAT structures are
//! little-endian. Rather than byte-swap at parse time, every on-disk
//! struct field is typed with the endianness it is actually stored in, so
//! a misplaced byte-swap shows up as a type error instead of a silent bug.

/// A type that represents the endianness of a type at the type level.
///
/// This trait shouldn't be implemented directly outside this module; see
/// [`LittleEndian`] and [`BigEndian`].
pub trait Endianness: Copy + Sized {
    fn get_u16(bytes: [u8; 2]) -> u16;
    fn set_u16(value: u16, bytes: &mut [u8; 2]);
    fn get_u32(bytes: [u8; 4]) -> u32;
    fn set_u32(value: u32, bytes: &mut [u8; 4]);
    fn get_u64(bytes: [u8; 8]) -> u64;
    fn set_u64(value: u64, bytes: &mut [u8; 8]);
}

/// Little-endian marker type.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, bytemuck::Zeroable, bytemuck::Pod)]
pub struct LittleEndian;

/// Big-endian marker type.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, bytemuck::Zeroable, bytemuck::Pod)]
pub struct BigEndian;

impl Endianness for LittleEndian {
    #[inline]
    fn get_u16(bytes: [u8; 2]) -> u16 {
        u16::from_le_bytes(bytes)
    }
    #[inline]
    fn set_u16(value: u16, bytes: &mut [u8; 2]) {
        *bytes = value.to_le_bytes();
    }
    #[inline]
    fn get_u32(bytes: [u8; 4]) -> u32 {
        u32::from_le_bytes(bytes)
    }
    #[inline]
    fn set_u32(value: u32, bytes: &mut [u8; 4]) {
        *bytes = value.to_le_bytes();
    }
    #[inline]
    fn get_u64(bytes: [u8; 8]) -> u64 {
        u64::from_le_bytes(bytes)
    }
    #[inline]
    fn set_u64(value: u64, bytes: &mut [u8; 8]) {
        *bytes = value.to_le_bytes();
    }
}

impl Endianness for BigEndian {
    #[inline]
    fn get_u16(bytes: [u8; 2]) -> u16 {
        u16::from_be_bytes(bytes)
    }
    #[inline]
    fn set_u16(value: u16, bytes: &mut [u8; 2]) {
        *bytes = value.to_be_bytes();
    }
    #[inline]
    fn get_u32(bytes: [u8; 4]) -> u32 {
        u32::from_be_bytes(bytes)
    }
    #[inline]
    fn set_u32(value: u32, bytes: &mut [u8; 4]) {
        *bytes = value.to_be_bytes();
    }
    #[inline]
    fn get_u64(bytes: [u8; 8]) -> u64 {
        u64::from_be_bytes(bytes)
    }
    #[inline]
    fn set_u64(value: u64, bytes: &mut [u8; 8]) {
        *bytes = value.to_be_bytes();
    }
}

/// A generic accessor for an endian-tagged number (`U16<E>`/`U32<E>`/`U64<E>`).
pub trait Endian {
    type Output;
    fn new(value: Self::Output) -> Self;
    fn get(&self) -> Self::Output;
    fn set(&mut self, value: Self::Output);
}
