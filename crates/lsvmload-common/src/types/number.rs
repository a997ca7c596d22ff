use crate::types::endian::{Endian, Endianness};
use core::marker::PhantomData;

macro_rules! endian_number_impl {
    ($name:ident, $prim:ty, $bytes:literal, $get:ident, $set:ident, $hexw:literal) => {
        #[repr(transparent)]
        #[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
        pub struct $name<E: Endianness> {
            bytes: [u8; $bytes],
            _marker: PhantomData<E>,
        }

        impl<E: Endianness> Endian for $name<E> {
            type Output = $prim;

            fn new(value: $prim) -> Self {
                let mut bytes = [0u8; $bytes];
                E::$set(value, &mut bytes);
                Self {
                    bytes,
                    _marker: PhantomData,
                }
            }

            fn get(&self) -> $prim {
                E::$get(self.bytes)
            }

            fn set(&mut self, value: $prim) {
                E::$set(value, &mut self.bytes);
            }
        }

        impl<E: Endianness> core::fmt::Debug for $name<E> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.get()).finish()
            }
        }

        impl<E: Endianness> core::fmt::LowerHex for $name<E> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!("0x{:0", $hexw, "x}"), self.get())
            }
        }

        impl<E: Endianness> PartialEq for $name<E> {
            fn eq(&self, other: &Self) -> bool {
                self.get() == other.get()
            }
        }
        impl<E: Endianness> Eq for $name<E> {}

        impl<E: Endianness> Default for $name<E> {
            fn default() -> Self {
                Self::new(0)
            }
        }
    };
}

endian_number_impl!(U16, u16, 2, get_u16, set_u16, 4);
endian_number_impl!(U32, u32, 4, get_u32, set_u32, 8);
endian_number_impl!(U64, u64, 8, get_u64, set_u64, 16);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::endian::{BigEndian, LittleEndian};

    #[test]
    fn round_trips_little_endian() {
        let v = U32::<LittleEndian>::new(0x1234_5678);
        assert_eq!(v.get(), 0x1234_5678);
    }

    #[test]
    fn round_trips_big_endian() {
        let v = U32::<BigEndian>::new(0x1234_5678);
        assert_eq!(v.get(), 0x1234_5678);
    }

    #[test]
    fn stores_bytes_in_declared_order() {
        let le = U16::<LittleEndian>::new(0x1234);
        let be = U16::<BigEndian>::new(0x1234);
        assert_eq!(bytemuck::bytes_of(&le), &[0x34, 0x12]);
        assert_eq!(bytemuck::bytes_of(&be), &[0x12, 0x34]);
    }
}
