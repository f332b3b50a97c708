// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Validates a batch of requested changes and applies them to a firmware
//! image, all or nothing.
//!
//! The pipeline runs every check before the first write: slot ranges,
//! argument parsing, reserved pages, the candidate page map, and every
//! input file read and transcode.  Only then does it touch the image, so a
//! failed run always leaves the firmware exactly as loaded.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::layout;
use crate::locale::Locale;
use crate::map::{Firmware, RomSlot};
use crate::rom::RomPayload;
use crate::splash::SplashImage;
use crate::{Error, Result};

/// One requested ROM slot update, numeric fields still as the raw strings
/// they arrived as: `page` is hexadecimal, `bank` (1-based), `bank_group`
/// and `mod_group` are decimal.
#[derive(Debug, Clone)]
pub struct RomRequest {
    pub slot: usize,
    pub file: PathBuf,
    pub page: String,
    pub bank: String,
    pub bank_group: String,
    pub mod_group: String,
}

/// Everything one run may change.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub roms: Vec<RomRequest>,
    /// Keep ROM slots that are not being updated instead of clearing them.
    pub merge: bool,
    pub user_text: [Option<String>; layout::USER_TEXT_COUNT],
    pub locale: Option<Locale>,
    pub splash: Option<PathBuf>,
}

impl UpdateRequest {
    /// True when the request asks for nothing at all.
    pub fn is_empty(&self) -> bool {
        self.roms.is_empty()
            && self.user_text.iter().all(Option::is_none)
            && self.locale.is_none()
            && self.splash.is_none()
    }
}

/// How the locale part of a request went.  A missing table set is the one
/// soft failure in the pipeline: it is reported, and everything else still
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleOutcome {
    Applied(Locale),
    NotFound,
}

/// What a run actually changed.
#[derive(Debug, Clone, Default)]
pub struct PatchReport {
    pub slots_written: Vec<usize>,
    /// Previously occupied slots emptied because merge was off.
    pub slots_cleared: Vec<usize>,
    pub user_fields_set: Vec<usize>,
    pub locale: Option<LocaleOutcome>,
    pub splash_written: bool,
}

impl PatchReport {
    /// False when nothing was written, e.g. the only request was a locale
    /// switch and the image carries no known string tables.
    pub fn changed(&self) -> bool {
        !self.slots_written.is_empty()
            || !self.slots_cleared.is_empty()
            || !self.user_fields_set.is_empty()
            || matches!(self.locale, Some(LocaleOutcome::Applied(_)))
            || self.splash_written
    }
}

struct PlannedRom {
    slot: usize,
    assignment: RomSlot,
    payload: RomPayload,
}

/// Validate `request` against `firmware`, then apply it.
pub fn apply(firmware: &mut Firmware, request: &UpdateRequest) -> Result<PatchReport> {
    let assignments = validate_requests(request)?;
    check_page_map(firmware, request, &assignments)?;

    let mut planned = Vec::with_capacity(assignments.len());
    for (rom, assignment) in request.roms.iter().zip(assignments) {
        planned.push(PlannedRom {
            slot: rom.slot,
            assignment,
            payload: RomPayload::from_file(rom.slot, &rom.file)?,
        });
    }
    let splash = match &request.splash {
        Some(path) => Some(SplashImage::from_file(path)?.encode()?),
        None => None,
    };

    // Nothing below can fail; the image is only touched from here on.
    let mut report = PatchReport::default();

    for rom in &planned {
        firmware.write_rom_payload(rom.slot, &rom.payload);
        firmware.set_slot(rom.slot, rom.assignment);
        firmware.set_rom_name(rom.slot, rom.payload.name());
        info!("Slot {}: {} {}", rom.slot, rom.assignment, rom.payload.name());
        report.slots_written.push(rom.slot);
    }
    if !planned.is_empty() && !request.merge {
        let touched: BTreeSet<usize> = planned.iter().map(|r| r.slot).collect();
        for slot in layout::USER_SLOT_FIRST..=layout::USER_SLOT_LAST {
            if touched.contains(&slot) {
                continue;
            }
            if !firmware.slot(slot).is_empty() {
                report.slots_cleared.push(slot);
            }
            firmware.clear_slot(slot);
        }
    }

    for (field, text) in request.user_text.iter().enumerate() {
        if let Some(text) = text {
            firmware.set_user_text(field, text);
            report.user_fields_set.push(field);
        }
    }

    if let Some(target) = request.locale {
        match firmware.set_locale(target) {
            Some(replaced) => {
                info!("Set language: {} (was {})", target, replaced.locale);
                report.locale = Some(LocaleOutcome::Applied(target));
            }
            None => {
                warn!("Date strings not found - leaving locale unchanged");
                report.locale = Some(LocaleOutcome::NotFound);
            }
        }
    }

    if let Some(rle) = splash {
        firmware.write_splash(&rle);
        report.splash_written = true;
    }

    Ok(report)
}

/// Per-request checks: slot range, no slot twice, request count, and the
/// numeric fields.  Returns the parsed assignment for each request, in
/// order.
fn validate_requests(request: &UpdateRequest) -> Result<Vec<RomSlot>> {
    if request.roms.len() > layout::MAX_ROM_REQUESTS {
        return Err(Error::TooManyRequests {
            count: request.roms.len(),
            max: layout::MAX_ROM_REQUESTS,
        });
    }
    let mut seen = BTreeSet::new();
    let mut assignments = Vec::with_capacity(request.roms.len());
    for rom in &request.roms {
        if !(layout::USER_SLOT_FIRST..=layout::USER_SLOT_LAST).contains(&rom.slot) {
            return Err(Error::InvalidSlot { slot: rom.slot });
        }
        if !seen.insert(rom.slot) {
            return Err(Error::DuplicateSlotRequest { slot: rom.slot });
        }
        assignments.push(parse_assignment(rom)?);
    }
    Ok(assignments)
}

fn parse_assignment(rom: &RomRequest) -> Result<RomSlot> {
    let invalid = |field: &'static str, value: &str| Error::InvalidArgument {
        slot: rom.slot,
        field,
        value: value.to_string(),
    };

    let page =
        u8::from_str_radix(rom.page.trim(), 16).map_err(|_| invalid("page", &rom.page))?;
    if page > layout::PAGE_MAX {
        return Err(invalid("page", &rom.page));
    }
    if layout::RESERVED_PAGES.contains(&page) {
        return Err(Error::ReservedPageSelected {
            slot: rom.slot,
            page,
        });
    }

    // Banks are 1-based on the command line, 0-based in the table.
    let bank: u8 = rom.bank.trim().parse().map_err(|_| invalid("bank", &rom.bank))?;
    let bank = bank
        .checked_sub(1)
        .ok_or_else(|| invalid("bank", &rom.bank))?;
    let bank_group = rom
        .bank_group
        .trim()
        .parse()
        .map_err(|_| invalid("bank group", &rom.bank_group))?;
    let mod_group = rom
        .mod_group
        .trim()
        .parse()
        .map_err(|_| invalid("mod group", &rom.mod_group))?;

    Ok(RomSlot {
        page,
        bank,
        bank_group,
        mod_group,
    })
}

/// Build the slot table as it would look after this request and reject it
/// if any two occupied slots share an assignment.
///
/// The whole table is checked, untouched and system slots included, so
/// duplicate legacy data also rejects the run - a pre-existing clash only
/// gets worse by writing more ROMs around it.
fn check_page_map(
    firmware: &Firmware,
    request: &UpdateRequest,
    assignments: &[RomSlot],
) -> Result<()> {
    if assignments.is_empty() {
        return Ok(());
    }
    let mut table: Vec<RomSlot> = (0..layout::SLOT_COUNT).map(|s| firmware.slot(s)).collect();
    if !request.merge {
        let requested: BTreeSet<usize> = request.roms.iter().map(|r| r.slot).collect();
        for slot in layout::USER_SLOT_FIRST..=layout::USER_SLOT_LAST {
            if !requested.contains(&slot) {
                table[slot] = RomSlot::EMPTY;
            }
        }
    }
    for (rom, assignment) in request.roms.iter().zip(assignments) {
        table[rom.slot] = *assignment;
    }

    let occupied: Vec<&RomSlot> = table.iter().filter(|s| !s.is_empty()).collect();
    let distinct: BTreeSet<&RomSlot> = occupied.iter().copied().collect();
    if occupied.len() > distinct.len() {
        return Err(Error::DuplicatePageMap {
            occupied: occupied.len(),
            distinct: distinct.len(),
        });
    }
    Ok(())
}
