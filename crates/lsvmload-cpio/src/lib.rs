//! CPIO newc archive codec and the initrd segment patcher: splits a
//! multi-segment initrd (plain CPIO and/or LZMA/gzip-compressed CPIO),
//! injects the boot/root partition keys into every segment, and
//! re-concatenates them in original order.

pub mod error;
pub mod inject;
pub mod newc;
pub mod segment;

pub use error::CpioError;
pub use inject::{inject_files, make_archive, patch_initrd, HYPERV_KEYBOARD_BASENAME};
pub use newc::CpioEntry;
pub use segment::{split_segments, Segment, SegmentKind, MAX_SUBFILES};
