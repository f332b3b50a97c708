// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! PX41CX firmware image patching.
//!
//! The PX41CX stores its firmware as an Intel HEX image with a fixed memory
//! layout: an OS region, 18 ROM module slots (12 of them user-assignable),
//! a table of slot names, four user text fields, locale-specific date
//! strings and a run-length-encoded splash screen.  This crate understands
//! that layout and patches it:
//!
//! - [`rom`] packs raw 10-bit-word ROM dumps into the firmware's split
//!   payload format;
//! - [`map`] wraps an image and exposes the fixed regions as typed
//!   accessors;
//! - [`locale`] finds and replaces the date/day string tables;
//! - [`splash`] converts a 1-bit BMP into the display's RLE stream;
//! - [`plan`] validates a batch of requested changes and applies them
//!   all-or-nothing;
//! - [`report`] renders a human-readable summary of an image.
//!
//! All validation happens before any write: a failed run leaves the image
//! exactly as it was loaded.

pub mod layout;
pub mod locale;
pub mod map;
pub mod plan;
pub mod report;
pub mod rom;
pub mod splash;

pub use locale::{Locale, LocaleStrings, PatternKind};
pub use map::{Firmware, RomSlot, UserField};
pub use plan::{LocaleOutcome, PatchReport, RomRequest, UpdateRequest};
pub use report::FirmwareSummary;
pub use rom::RomPayload;
pub use splash::SplashImage;

use std::path::PathBuf;

/// Everything that can stop a firmware update.  Each variant names the
/// offending file, slot or value so the message stands on its own.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read {what} file '{}': {source}", path.display())]
    FileNotReadable {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "ROM file '{}' for slot {slot} is too short: {actual} bytes, need {expected}",
        path.display()
    )]
    RomFileTooShort {
        slot: usize,
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("not a PX41CX firmware image (magic bytes {found:02x?})")]
    UnrecognizedFirmware { found: [u8; 2] },

    #[error(
        "ROM slot {slot} out of range: user slots are {}-{}",
        layout::USER_SLOT_FIRST,
        layout::USER_SLOT_LAST
    )]
    InvalidSlot { slot: usize },

    #[error("ROM slot {slot} requested more than once")]
    DuplicateSlotRequest { slot: usize },

    #[error("{count} ROM updates requested, at most {max} supported")]
    TooManyRequests { count: usize, max: usize },

    #[error("ROM slot {slot}: invalid {field} value '{value}'")]
    InvalidArgument {
        slot: usize,
        field: &'static str,
        value: String,
    },

    #[error("ROM slot {slot}: page {page:x} is reserved for the OS")]
    ReservedPageSelected { slot: usize, page: u8 },

    #[error(
        "duplicate page map: {occupied} occupied slots share {distinct} distinct assignments"
    )]
    DuplicatePageMap { occupied: usize, distinct: usize },

    #[error("unsupported bitmap '{}': {reason}", path.display())]
    UnsupportedBitmap { path: PathBuf, reason: String },

    #[error(
        "bitmap '{}' is too complex: encoding does not fit the {} byte splash region",
        path.display(),
        layout::SPLASH_SIZE
    )]
    ImageTooComplex { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
