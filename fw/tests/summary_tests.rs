// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Tests for the firmware summary report.
//!
//! # Test Plan
//!
//! - [x] Version line present when the image carries a version string
//! - [x] Occupied slots listed with page/bank/group fields, empties skipped
//! - [x] Bank shown 1-based
//! - [x] User fields quoted, escaped when not printable
//! - [x] Locale detected from date tables, day tables, or Unknown

#[cfg(test)]
mod tests {
    use px41cx_fw::{Firmware, FirmwareSummary, Locale, RomSlot, layout};
    use px41cx_hex::HexImage;

    fn fixture_firmware() -> Firmware {
        let mut image = HexImage::new();
        image.put_bytes(0, &layout::MAGIC);
        Firmware::open(image).unwrap()
    }

    #[test]
    fn test_summary_lines() {
        let mut fw = fixture_firmware();
        fw.set_slot(
            0,
            RomSlot {
                page: 8,
                bank: 0,
                bank_group: 0,
                mod_group: 0,
            },
        );
        fw.set_rom_name(0, "OS41CX");
        fw.set_slot(
            9,
            RomSlot {
                page: 0xC,
                bank: 1,
                bank_group: 2,
                mod_group: 7,
            },
        );
        fw.set_rom_name(9, "HEPAX");
        fw.set_user_text(0, "Piers");

        let mut image = fw.into_image();
        image.putsz(0xC100, b"VER: PX41CX 903plus");
        image.put_bytes(0xD000, Locale::Spanish.date_table());
        let fw = Firmware::open(image).unwrap();

        let text = FirmwareSummary::collect(&fw).to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "VER: PX41CX 903plus");
        assert_eq!(
            lines[1],
            "ROM[00]: Page: 8 Bank: 1 Bank Group: 0 Mod Group: 00 OS41CX"
        );
        // Bank is stored 0-based but shown 1-based; page prints as a hex
        // digit.
        assert_eq!(
            lines[2],
            "ROM[09]: Page: c Bank: 2 Bank Group: 2 Mod Group: 07 HEPAX "
        );
        assert_eq!(lines[3], format!("User 1: '{:<31}'", "Piers"));
        assert_eq!(lines[4], "User 2: ''");
        assert_eq!(lines[5], "User 3: ''");
        assert_eq!(lines[6], "User 4: ''");
        assert_eq!(lines[7], "Date Format: Spanish");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_summary_without_version_or_locale() {
        let fw = fixture_firmware();
        let summary = FirmwareSummary::collect(&fw);
        assert_eq!(summary.version(), None);
        assert_eq!(summary.locale(), None);

        let text = summary.to_string();
        assert!(!text.contains("VER:"));
        assert!(text.lines().all(|l| !l.starts_with("ROM[")));
        assert!(text.ends_with("Date Format: Unknown\n"));
    }

    #[test]
    fn test_summary_day_table_locale() {
        let mut image = HexImage::new();
        image.put_bytes(0, &layout::MAGIC);
        image.put_bytes(0x9000, Locale::Italian.day_table());
        let fw = Firmware::open(image).unwrap();

        let summary = FirmwareSummary::collect(&fw);
        assert_eq!(summary.locale(), Some(Locale::Italian));
    }

    #[test]
    fn test_summary_escapes_binary_user_field() {
        let mut image = HexImage::new();
        image.put_bytes(0, &layout::MAGIC);
        image.putsz(layout::USER_TEXT_ADDR, &[0x07, b'h', b'i']);
        let fw = Firmware::open(image).unwrap();

        let text = FirmwareSummary::collect(&fw).to_string();
        assert!(text.contains("User 1: '\\x07hi'"), "{text}");
    }
}
