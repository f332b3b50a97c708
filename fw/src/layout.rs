// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Fixed memory layout of the PX41CX firmware image.
//!
//! Addresses are byte addresses in the flat space of the Intel HEX image.
//! The layout is identical across supported firmware builds; only the
//! locale string tables move, which is why those are found by content
//! search rather than listed here.

/// Magic byte pair at image addresses 0 and 1.
pub const MAGIC: [u8; 2] = [0x0C, 0x94];

/// ROM slot table base.  [`SLOT_COUNT`] entries of [`SLOT_ENTRY_LEN`] bytes:
/// page, bank (0-based), bank group, mod group.
pub const SLOT_TABLE_ADDR: u32 = 0xF800;
pub const SLOT_COUNT: usize = 18;
pub const SLOT_ENTRY_LEN: u32 = 4;

/// ROM name table base.  One entry per slot: [`NAME_LEN`] characters plus a
/// null terminator.
pub const NAME_TABLE_ADDR: u32 = 0xF848;
pub const NAME_LEN: usize = 6;
pub const NAME_ENTRY_LEN: u32 = 7;

/// Load address of each slot's packed ROM payload.
pub const ROM_ADDRS: [u32; SLOT_COUNT] = [
    0x8000, 0x9400, 0xAB00, 0xBC00, 0xD000, 0xE400, 0x10000, 0x11400, 0x12800, 0x13C00, 0x15000,
    0x16400, 0x18000, 0x19400, 0x1A800, 0x1BC00, 0x1D000, 0x1E400,
];

/// A raw ROM dump holds 4096 10-bit words, two bytes per word.
pub const ROM_DUMP_LEN: usize = 8192;
/// Packed payload: 4096 low bytes then 1024 bytes of packed high bit pairs.
pub const ROM_PAYLOAD_LEN: usize = 5120;

/// User text fields: [`USER_TEXT_COUNT`] fields of [`USER_TEXT_LEN`]
/// characters plus a null terminator, [`USER_TEXT_STRIDE`] bytes apart.
pub const USER_TEXT_ADDR: u32 = 0xF8C6;
pub const USER_TEXT_STRIDE: u32 = 0x20;
pub const USER_TEXT_LEN: usize = 31;
pub const USER_TEXT_COUNT: usize = 4;

/// Splash screen region: an RLE stream, zero padded to [`SPLASH_SIZE`].
pub const SPLASH_ADDR: u32 = 0x1F800;
pub const SPLASH_SIZE: usize = 2048;

/// Display dimensions the splash stream encodes.
pub const SPLASH_WIDTH: usize = 250;
pub const SPLASH_HEIGHT: usize = 122;

/// Slots 0-5 hold the OS and built-in modules; only these may be patched.
pub const USER_SLOT_FIRST: usize = 6;
pub const USER_SLOT_LAST: usize = 17;

/// Most ROM updates accepted in a single run.
pub const MAX_ROM_REQUESTS: usize = 12;

/// Pages the OS claims for itself; a module mapped here would be shadowed.
pub const RESERVED_PAGES: [u8; 5] = [0, 1, 2, 3, 5];
/// Highest addressable page.
pub const PAGE_MAX: u8 = 15;

/// Slot-table byte marking an empty slot (all four entry bytes).
pub const SLOT_EMPTY_BYTE: u8 = 255;
/// Name written for an emptied slot.
pub const EMPTY_NAME: &str = "EMPTY ";

/// Marker preceding the version string, located by content search.
pub const VERSION_PREFIX: &[u8] = b"VER: ";

/// The OS reports its built-in function catalogue under this synthetic
/// index, outside the slot table.
pub const CXFUNS_INDEX: usize = 55;
pub const CXFUNS_NAME: &str = "CXFUNS1";
