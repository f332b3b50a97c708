// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Human-readable summary of a firmware image: version, occupied ROM
//! slots, user text fields and the detected date locale.

use std::fmt;

use crate::layout;
use crate::locale::Locale;
use crate::map::{Firmware, RomSlot, UserField};

/// Snapshot of everything the summary shows, collected up front so
/// rendering is a pure formatting step.
#[derive(Debug, Clone)]
pub struct FirmwareSummary {
    version: Option<String>,
    slots: Vec<(usize, RomSlot, String)>,
    user_fields: Vec<UserField>,
    locale: Option<Locale>,
}

impl FirmwareSummary {
    pub fn collect(firmware: &Firmware) -> Self {
        let slots = (0..layout::SLOT_COUNT)
            .map(|index| (index, firmware.slot(index)))
            .filter(|(_, slot)| slot.page != layout::SLOT_EMPTY_BYTE)
            .map(|(index, slot)| (index, slot, firmware.rom_name(index)))
            .collect();
        let user_fields = (0..layout::USER_TEXT_COUNT)
            .map(|field| firmware.user_text(field))
            .collect();
        Self {
            version: firmware.version(),
            slots,
            user_fields,
            locale: firmware.locale_strings().map(|found| found.locale),
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn locale(&self) -> Option<Locale> {
        self.locale
    }
}

impl fmt::Display for FirmwareSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(version) = &self.version {
            writeln!(f, "{version}")?;
        }
        for (index, slot, name) in &self.slots {
            writeln!(f, "ROM[{index:02}]: {slot} {name}")?;
        }
        for (field, contents) in self.user_fields.iter().enumerate() {
            writeln!(f, "User {}: '{}'", field + 1, contents)?;
        }
        match self.locale {
            Some(locale) => writeln!(f, "Date Format: {locale}"),
            None => writeln!(f, "Date Format: Unknown"),
        }
    }
}
