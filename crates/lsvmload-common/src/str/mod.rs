pub mod ascii;
pub mod utf16;

pub use ascii::FixedAsciiStr;
pub use utf16::FixedUtf16Str;
