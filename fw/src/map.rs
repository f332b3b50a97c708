// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Typed access to the fixed regions of a firmware image.
//!
//! [`Firmware`] owns the underlying [`HexImage`] and refuses to exist at all
//! for images that do not carry the PX41CX magic bytes - every later
//! accessor can then assume the layout in [`crate::layout`] holds.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use std::fmt;

use px41cx_hex::HexImage;

use crate::layout;
use crate::locale::{self, Locale, LocaleStrings};
use crate::rom::RomPayload;
use crate::{Error, Result};

/// One ROM slot table entry.  `bank` is stored 0-based; it is shown 1-based
/// everywhere the user sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RomSlot {
    pub page: u8,
    pub bank: u8,
    pub bank_group: u8,
    pub mod_group: u8,
}

impl RomSlot {
    /// The table value marking an unoccupied slot.
    pub const EMPTY: RomSlot = RomSlot {
        page: layout::SLOT_EMPTY_BYTE,
        bank: layout::SLOT_EMPTY_BYTE,
        bank_group: layout::SLOT_EMPTY_BYTE,
        mod_group: layout::SLOT_EMPTY_BYTE,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for RomSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page: {:x} Bank: {} Bank Group: {} Mod Group: {:02}",
            self.page,
            u16::from(self.bank) + 1,
            self.bank_group,
            self.mod_group
        )
    }
}

/// Contents of one user text field.
///
/// The field is free-form bytes; firmware shipped by others has been seen
/// carrying non-text data here, so reads keep the raw bytes and only offer
/// decoding as a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserField {
    bytes: Vec<u8>,
}

impl UserField {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The field as text, if it decodes as UTF-8 with no control
    /// characters.
    pub fn as_text(&self) -> Option<String> {
        let text = String::from_utf8(self.bytes.clone()).ok()?;
        if text.chars().all(|c| !c.is_control()) {
            Some(text)
        } else {
            None
        }
    }

    /// Byte-escaped rendering for fields that are not clean text.
    pub fn escaped(&self) -> String {
        self.bytes.escape_ascii().to_string()
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str(&self.escaped()),
        }
    }
}

/// A validated firmware image.
#[derive(Debug, Clone)]
pub struct Firmware {
    image: HexImage,
}

impl Firmware {
    /// Take ownership of an image, checking the magic bytes first.
    pub fn open(image: HexImage) -> Result<Self> {
        let found = [image.get(0), image.get(1)];
        if found != layout::MAGIC {
            return Err(Error::UnrecognizedFirmware { found });
        }
        Ok(Self { image })
    }

    pub fn image(&self) -> &HexImage {
        &self.image
    }

    /// Hand the image back, e.g. for writing out.
    pub fn into_image(self) -> HexImage {
        self.image
    }

    /// The embedded version string, prefix included, if the image carries
    /// one.
    pub fn version(&self) -> Option<String> {
        let addr = self.image.find(layout::VERSION_PREFIX)?;
        Some(String::from_utf8_lossy(&self.image.getsz(addr)).into_owned())
    }

    pub fn slot(&self, index: usize) -> RomSlot {
        debug_assert!(index < layout::SLOT_COUNT);
        let addr = layout::SLOT_TABLE_ADDR + index as u32 * layout::SLOT_ENTRY_LEN;
        RomSlot {
            page: self.image.get(addr),
            bank: self.image.get(addr + 1),
            bank_group: self.image.get(addr + 2),
            mod_group: self.image.get(addr + 3),
        }
    }

    pub fn set_slot(&mut self, index: usize, slot: RomSlot) {
        debug_assert!(index < layout::SLOT_COUNT);
        let addr = layout::SLOT_TABLE_ADDR + index as u32 * layout::SLOT_ENTRY_LEN;
        self.image
            .put_bytes(addr, &[slot.page, slot.bank, slot.bank_group, slot.mod_group]);
    }

    /// Mark a slot unoccupied and name it accordingly.
    pub fn clear_slot(&mut self, index: usize) {
        self.set_slot(index, RomSlot::EMPTY);
        self.set_rom_name(index, layout::EMPTY_NAME);
    }

    /// Name a slot is listed under.  Index [`layout::CXFUNS_INDEX`] is the
    /// OS's built-in catalogue, which has no name table entry.
    pub fn rom_name(&self, index: usize) -> String {
        if index == layout::CXFUNS_INDEX {
            return layout::CXFUNS_NAME.to_string();
        }
        let addr = layout::NAME_TABLE_ADDR + index as u32 * layout::NAME_ENTRY_LEN;
        String::from_utf8_lossy(&self.image.getsz(addr)).into_owned()
    }

    pub fn set_rom_name(&mut self, index: usize, name: &str) {
        debug_assert!(index < layout::SLOT_COUNT);
        let addr = layout::NAME_TABLE_ADDR + index as u32 * layout::NAME_ENTRY_LEN;
        self.image.putsz(addr, &fit_padded(name, layout::NAME_LEN));
    }

    pub fn user_text(&self, field: usize) -> UserField {
        debug_assert!(field < layout::USER_TEXT_COUNT);
        let addr = layout::USER_TEXT_ADDR + field as u32 * layout::USER_TEXT_STRIDE;
        UserField {
            bytes: self.image.getsz(addr),
        }
    }

    pub fn set_user_text(&mut self, field: usize, text: &str) {
        debug_assert!(field < layout::USER_TEXT_COUNT);
        let addr = layout::USER_TEXT_ADDR + field as u32 * layout::USER_TEXT_STRIDE;
        self.image
            .putsz(addr, &fit_padded(text, layout::USER_TEXT_LEN));
    }

    /// Place a packed payload at its slot's load address.
    pub fn write_rom_payload(&mut self, index: usize, payload: &RomPayload) {
        debug_assert!(index < layout::SLOT_COUNT);
        self.image.put_bytes(layout::ROM_ADDRS[index], payload.bytes());
    }

    /// Place an encoded splash stream, zero padded to the full region.
    pub fn write_splash(&mut self, rle: &[u8]) {
        debug_assert!(rle.len() <= layout::SPLASH_SIZE);
        let mut region = vec![0u8; layout::SPLASH_SIZE];
        region[..rle.len()].copy_from_slice(rle);
        self.image.put_bytes(layout::SPLASH_ADDR, &region);
    }

    /// Locale strings the image carries, if recognised.
    pub fn locale_strings(&self) -> Option<LocaleStrings> {
        locale::detect(&self.image)
    }

    /// Switch the image's locale strings.  Returns what was replaced, or
    /// `None` when no tables were found (the image is then untouched).
    pub fn set_locale(&mut self, target: Locale) -> Option<LocaleStrings> {
        locale::apply(&mut self.image, target)
    }
}

/// Fit text into a fixed-width field: truncated on a character boundary and
/// space padded to exactly `width` bytes.
fn fit_padded(text: &str, width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(width);
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let encoded = ch.encode_utf8(&mut buf).as_bytes();
        if out.len() + encoded.len() > width {
            break;
        }
        out.extend_from_slice(encoded);
    }
    out.resize(width, b' ');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_firmware() -> Firmware {
        let mut image = HexImage::new();
        image.put_bytes(0, &layout::MAGIC);
        Firmware::open(image).unwrap()
    }

    #[test]
    fn test_open_checks_both_magic_bytes() {
        let mut image = HexImage::new();
        image.put_bytes(0, &[0x0C, 0x00]);
        match Firmware::open(image) {
            Err(Error::UnrecognizedFirmware { found }) => assert_eq!(found, [0x0C, 0x00]),
            other => panic!("expected UnrecognizedFirmware, got {other:?}"),
        }
        // An empty image reads as pad bytes.
        match Firmware::open(HexImage::new()) {
            Err(Error::UnrecognizedFirmware { found }) => assert_eq!(found, [0xFF, 0xFF]),
            other => panic!("expected UnrecognizedFirmware, got {other:?}"),
        }
    }

    #[test]
    fn test_unset_slot_reads_empty() {
        let fw = bare_firmware();
        assert!(fw.slot(6).is_empty());
        assert_eq!(fw.slot(17), RomSlot::EMPTY);
    }

    #[test]
    fn test_slot_roundtrip() {
        let mut fw = bare_firmware();
        let slot = RomSlot {
            page: 0xA,
            bank: 0,
            bank_group: 1,
            mod_group: 7,
        };
        fw.set_slot(9, slot);
        assert_eq!(fw.slot(9), slot);
        assert!(fw.slot(8).is_empty());
        assert_eq!(slot.to_string(), "Page: a Bank: 1 Bank Group: 1 Mod Group: 07");
    }

    #[test]
    fn test_rom_name_fitting() {
        let mut fw = bare_firmware();
        fw.set_rom_name(7, "HEPAX");
        assert_eq!(fw.rom_name(7), "HEPAX ");
        fw.set_rom_name(7, "NAVIGATION");
        assert_eq!(fw.rom_name(7), "NAVIGA");
    }

    #[test]
    fn test_builtin_catalogue_name() {
        let fw = bare_firmware();
        assert_eq!(fw.rom_name(layout::CXFUNS_INDEX), "CXFUNS1");
    }

    #[test]
    fn test_user_text_roundtrip() {
        let mut fw = bare_firmware();
        fw.set_user_text(0, "Property of Piers");
        let field = fw.user_text(0);
        assert_eq!(field.bytes().len(), layout::USER_TEXT_LEN);
        assert_eq!(field.as_text().unwrap().trim_end(), "Property of Piers");

        // 40 characters truncate to the field width.
        let long = "X".repeat(40);
        fw.set_user_text(1, &long);
        assert_eq!(fw.user_text(1).as_text().unwrap(), "X".repeat(31));
    }

    #[test]
    fn test_user_text_non_printable() {
        let mut fw = bare_firmware();
        let addr = layout::USER_TEXT_ADDR + layout::USER_TEXT_STRIDE;
        fw.image.putsz(addr, &[0x01, 0x42, 0x43]);
        let field = fw.user_text(1);
        assert_eq!(field.as_text(), None);
        assert_eq!(field.escaped(), "\\x01BC");
        assert_eq!(field.to_string(), "\\x01BC");
    }

    #[test]
    fn test_version_lookup() {
        let mut fw = bare_firmware();
        assert_eq!(fw.version(), None);
        fw.image.putsz(0xC000, b"VER: PX41CX 903plus");
        assert_eq!(fw.version().as_deref(), Some("VER: PX41CX 903plus"));
    }

    #[test]
    fn test_write_splash_pads_region() {
        let mut fw = bare_firmware();
        fw.write_splash(&[0x01, 0x20, 0xDA]);
        let region = fw.image().get_bytes(layout::SPLASH_ADDR, layout::SPLASH_SIZE);
        assert_eq!(&region[..3], &[0x01, 0x20, 0xDA]);
        assert!(region[3..].iter().all(|&b| b == 0));
        // The whole region is real data, not pad reads.
        assert_eq!(
            fw.image().try_get(layout::SPLASH_ADDR + layout::SPLASH_SIZE as u32 - 1),
            Some(0)
        );
    }
}
