//! Property tests for the endian-specified primitive accessors: write/read
//! round trips per width, and the byte-swap relation between the two orders.

use buffer::BufAllocator;
use proptest::prelude::*;

macro_rules! round_trip {
    ($name:ident, $ty:ty, $write_be:ident, $read_be:ident, $write_le:ident, $read_le:ident,
     $get_be:ident, $get_le:ident) => {
        proptest! {
            #[test]
            fn $name(value in any::<$ty>()) {
                let alloc = BufAllocator::new();

                let mut buf = alloc.buffer(16);
                buf.$write_be(value).unwrap();
                prop_assert_eq!(buf.$read_be().unwrap(), value);

                let mut buf = alloc.buffer(16);
                buf.$write_le(value).unwrap();
                prop_assert_eq!(buf.$read_le().unwrap(), value);

                // Reading the opposite order yields the byte-swapped value.
                let mut buf = alloc.buffer(16);
                buf.$write_be(value).unwrap();
                prop_assert_eq!(buf.$get_le(0).unwrap(), value.swap_bytes());
                prop_assert_eq!(buf.$get_be(0).unwrap(), value);
            }
        }
    };
}

round_trip!(u16_round_trip, u16, write_u16, read_u16, write_u16_le, read_u16_le, get_u16, get_u16_le);
round_trip!(i16_round_trip, i16, write_i16, read_i16, write_i16_le, read_i16_le, get_i16, get_i16_le);
round_trip!(u32_round_trip, u32, write_u32, read_u32, write_u32_le, read_u32_le, get_u32, get_u32_le);
round_trip!(i32_round_trip, i32, write_i32, read_i32, write_i32_le, read_i32_le, get_i32, get_i32_le);
round_trip!(u64_round_trip, u64, write_u64, read_u64, write_u64_le, read_u64_le, get_u64, get_u64_le);
round_trip!(i64_round_trip, i64, write_i64, read_i64, write_i64_le, read_i64_le, get_i64, get_i64_le);

proptest! {
    #[test]
    fn u24_round_trip(value in 0u32..0x0100_0000) {
        let alloc = BufAllocator::new();

        let mut buf = alloc.buffer(8);
        buf.write_u24(value).unwrap();
        prop_assert_eq!(buf.read_u24().unwrap(), value);

        let mut buf = alloc.buffer(8);
        buf.write_u24_le(value).unwrap();
        prop_assert_eq!(buf.read_u24_le().unwrap(), value);
    }

    #[test]
    fn i24_sign_extension(value in -0x0080_0000i32..0x0080_0000) {
        let mut buf = BufAllocator::new().buffer(8);
        buf.write_u24(value as u32).unwrap();
        prop_assert_eq!(buf.get_i24(0).unwrap(), value);
    }

    #[test]
    fn byte_round_trip(value in any::<u8>()) {
        let mut buf = BufAllocator::new().buffer(4);
        buf.write_u8(value).unwrap();
        prop_assert_eq!(buf.get_u8(0).unwrap(), value);
        prop_assert_eq!(buf.get_i8(0).unwrap(), value as i8);
    }
}
