use crate::types::{Endian, LittleEndian, U16};

/// A fixed-width UTF-16LE string as embedded in a GPT partition entry's
/// `partition_name` field.
#[repr(transparent)]
#[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
pub struct FixedUtf16Str<const N: usize> {
    data: [U16<LittleEndian>; N],
}

impl<const N: usize> FixedUtf16Str<N> {
    pub fn zeroed() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    #[cfg(feature = "alloc")]
    pub fn set(&mut self, value: &str) {
        for (slot, unit) in self
            .data
            .iter_mut()
            .zip(value.encode_utf16().chain(core::iter::repeat(0)))
        {
            slot.set(unit);
        }
    }

    #[cfg(feature = "alloc")]
    pub fn to_string_lossy(&self) -> alloc::string::String {
        let units: alloc::vec::Vec<u16> = self
            .data
            .iter()
            .map(|u| u.get())
            .take_while(|&u| u != 0)
            .collect();
        alloc::string::String::from_utf16_lossy(&units)
    }
}

impl<const N: usize> core::fmt::Debug for FixedUtf16Str<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        #[cfg(feature = "alloc")]
        {
            f.debug_tuple("FixedUtf16Str")
                .field(&self.to_string_lossy())
                .finish()
        }
        #[cfg(not(feature = "alloc"))]
        {
            f.debug_struct("FixedUtf16Str").finish()
        }
    }
}
