// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Command line definition and its conversion into an update request.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use px41cx_fw::{Locale, RomRequest, UpdateRequest};

/// Update ROMs and options in PX41CX firmware.
///
/// With no options, prints a summary of the firmware instead.
#[derive(Parser, Debug)]
#[command(name = "px41cx-util", version)]
pub struct Args {
    /// Input firmware file (Intel HEX)
    pub infile: PathBuf,

    /// Output firmware file, required when making changes
    pub outfile: Option<PathBuf>,

    /// Keep existing firmware ROMs in slots not being updated
    #[arg(short, long)]
    pub merge: bool,

    /// Load a ROM dump into a user slot (6-17).  PAGE is hex, BANK is
    /// 1-based; may be given up to 12 times
    #[arg(
        long = "rom",
        num_args = 6,
        value_names = ["SLOT", "ROMFILE", "PAGE", "BANK", "BANKGROUP", "MODGROUP"],
        action = clap::ArgAction::Append
    )]
    pub rom: Vec<String>,

    /// Set user text field 1 (up to 31 characters)
    #[arg(long, value_name = "TEXT")]
    pub user1: Option<String>,

    /// Set user text field 2
    #[arg(long, value_name = "TEXT")]
    pub user2: Option<String>,

    /// Set user text field 3
    #[arg(long, value_name = "TEXT")]
    pub user3: Option<String>,

    /// Set user text field 4
    #[arg(long, value_name = "TEXT")]
    pub user4: Option<String>,

    /// Load a splash screen bitmap (250x122, 1-bit BMP)
    #[arg(short, long = "bmp", value_name = "BMPFILE")]
    pub bmp: Option<PathBuf>,

    /// Set the date language to English
    #[arg(long, group = "language")]
    pub eng: bool,

    /// Set the date language to French
    #[arg(long, group = "language")]
    pub fre: bool,

    /// Set the date language to Spanish
    #[arg(long, group = "language")]
    pub spa: bool,

    /// Set the date language to German
    #[arg(long, group = "language")]
    pub ger: bool,

    /// Set the date language to Italian
    #[arg(long, group = "language")]
    pub ita: bool,

    /// Set the date language to Portuguese
    #[arg(long, group = "language")]
    pub por: bool,
}

impl Args {
    pub fn locale(&self) -> Option<Locale> {
        [
            (self.eng, Locale::English),
            (self.fre, Locale::French),
            (self.spa, Locale::Spanish),
            (self.ger, Locale::German),
            (self.ita, Locale::Italian),
            (self.por, Locale::Portuguese),
        ]
        .into_iter()
        .find(|(flag, _)| *flag)
        .map(|(_, locale)| locale)
    }

    /// Gather the option set into an update request.  The slot index is the
    /// only value parsed here; the core parses the rest so its errors can
    /// name the slot they belong to.
    pub fn update_request(&self) -> anyhow::Result<UpdateRequest> {
        let mut roms = Vec::new();
        for group in self.rom.chunks(6) {
            // num_args guarantees whole groups of six.
            let slot: usize = group[0]
                .parse()
                .with_context(|| format!("Invalid ROM slot '{}'", group[0]))?;
            roms.push(RomRequest {
                slot,
                file: PathBuf::from(&group[1]),
                page: group[2].clone(),
                bank: group[3].clone(),
                bank_group: group[4].clone(),
                mod_group: group[5].clone(),
            });
        }
        Ok(UpdateRequest {
            roms,
            merge: self.merge,
            user_text: [
                self.user1.clone(),
                self.user2.clone(),
                self.user3.clone(),
                self.user4.clone(),
            ],
            locale: self.locale(),
            splash: self.bmp.clone(),
        })
    }
}
