// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Locale date string tables.
//!
//! The firmware renders dates with three-letter month and day abbreviations
//! stored as consecutive null-terminated entries.  Two generations exist:
//! `fw903plus` builds embed months followed by days (76 bytes), earlier
//! builds embed days only (28 bytes).  The tables move between builds, so
//! they are located by content search rather than by fixed address.
//!
//! All six languages' tables have identical lengths within a generation,
//! which is what makes switching locale an in-place overwrite.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use px41cx_hex::HexImage;
use strum::IntoEnumIterator;

/// Languages the firmware can render dates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum Locale {
    English,
    French,
    Spanish,
    German,
    Italian,
    Portuguese,
}

/// Which table generation a search matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Months and days, `fw903plus` and later.
    DateTable,
    /// Days only, earlier builds.
    DayTable,
}

/// Location of the locale strings an image carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleStrings {
    pub locale: Locale,
    pub addr: u32,
    pub kind: PatternKind,
}

/// 12 month entries of 4 bytes; the day entries follow.
const MONTHS_LEN: usize = 48;

const DATE_ENGLISH: &[u8] =
    b"JAN\0FEB\0MAR\0APR\0MAY\0JUN\0JUL\0AUG\0SEP\0OCT\0NOV\0DEC\0SUN\0MON\0TUE\0WED\0THU\0FRI\0SAT\0";
const DATE_FRENCH: &[u8] =
    b"JAN\0FEV\0MAR\0AVR\0MAI\0JUN\0JUL\0AOU\0SEP\0OCT\0NOV\0DEC\0DIM\0LUN\0MAR\0MER\0JEU\0VEN\0SAM\0";
const DATE_SPANISH: &[u8] =
    b"ENE\0FEB\0MAR\0ABR\0MAY\0JUN\0JUL\0AGO\0SEP\0OCT\0NOV\0DEC\0DOM\0LUN\0MAR\0MIE\0JUE\0VIE\0SAB\0";
const DATE_GERMAN: &[u8] =
    b"JAN\0FEB\0MAR\0APR\0MAI\0JUN\0JUL\0AUG\0SEP\0OKT\0NOV\0DEZ\0SON\0MON\0DIE\0MIT\0DON\0FRE\0SAM\0";
const DATE_ITALIAN: &[u8] =
    b"GEN\0FEB\0MAR\0APR\0MAG\0GIU\0LUG\0AGO\0SET\0OTT\0NOV\0DIC\0DOM\0LUN\0MAR\0MER\0GIO\0VEN\0SAB\0";
const DATE_PORTUGUESE: &[u8] =
    b"JAN\0FEV\0MAR\0ABR\0MAI\0JUN\0JUL\0AGO\0SET\0OCT\0NOV\0DEZ\0DOM\0SEG\0TER\0QUA\0QUI\0SEX\0SAB\0";

impl Locale {
    /// Month-and-day table, the `fw903plus` generation.
    pub fn date_table(self) -> &'static [u8] {
        match self {
            Locale::English => DATE_ENGLISH,
            Locale::French => DATE_FRENCH,
            Locale::Spanish => DATE_SPANISH,
            Locale::German => DATE_GERMAN,
            Locale::Italian => DATE_ITALIAN,
            Locale::Portuguese => DATE_PORTUGUESE,
        }
    }

    /// Day-only table, the earlier generation.
    pub fn day_table(self) -> &'static [u8] {
        &self.date_table()[MONTHS_LEN..]
    }

    pub fn table(self, kind: PatternKind) -> &'static [u8] {
        match kind {
            PatternKind::DateTable => self.date_table(),
            PatternKind::DayTable => self.day_table(),
        }
    }
}

/// Find whichever locale strings the image carries.
///
/// The longer date tables are tried first so a `fw903plus` image is never
/// mistaken for the older generation (its day strings are a suffix of the
/// date table).  Within a generation, languages are tried in declaration
/// order.
pub fn detect(image: &HexImage) -> Option<LocaleStrings> {
    for locale in Locale::iter() {
        if let Some(addr) = image.find(locale.date_table()) {
            return Some(LocaleStrings {
                locale,
                addr,
                kind: PatternKind::DateTable,
            });
        }
    }
    for locale in Locale::iter() {
        if let Some(addr) = image.find(locale.day_table()) {
            return Some(LocaleStrings {
                locale,
                addr,
                kind: PatternKind::DayTable,
            });
        }
    }
    None
}

/// Overwrite the image's locale strings with `target`'s table of the same
/// generation.  Returns what was replaced, or `None` when the image carries
/// no recognisable tables.
pub fn apply(image: &mut HexImage, target: Locale) -> Option<LocaleStrings> {
    let found = detect(image)?;
    debug!(
        "Replacing {} {:?} strings at {:#x} with {}",
        found.locale, found.kind, found.addr, target
    );
    image.put_bytes(found.addr, target.table(found.kind));
    Some(found)
}
