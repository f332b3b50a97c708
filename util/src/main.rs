// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! PX41CX firmware utility - patches ROMs, text, language and splash
//! screen into a firmware image, or summarizes one.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use anyhow::Context;
use clap::Parser;

use px41cx_fw::{Firmware, FirmwareSummary, LocaleOutcome, plan};
use px41cx_hex::HexImage;

mod args;

use args::Args;

/// Data bytes per output Intel HEX record.
const HEX_RECORD_LEN: usize = 16;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    // Load the firmware
    let image = HexImage::from_file(&args.infile)
        .with_context(|| format!("Failed to read firmware file {}", args.infile.display()))?;
    let mut firmware = Firmware::open(image)?;

    let request = args.update_request()?;

    // No options - just describe what we were given
    if request.is_empty() {
        println!("PX41CX Firmware: {}", args.infile.display());
        print!("{}", FirmwareSummary::collect(&firmware));
        return Ok(());
    }

    let Some(outfile) = &args.outfile else {
        anyhow::bail!("An output file is required when making changes");
    };

    let report = plan::apply(&mut firmware, &request)?;

    match &report.locale {
        Some(LocaleOutcome::Applied(locale)) => println!("Set language: {locale}"),
        Some(LocaleOutcome::NotFound) => {
            eprintln!("Warning: language strings not found - firmware language unchanged");
        }
        None => {}
    }

    if !report.changed() {
        println!("No change - no output file created");
        return Ok(());
    }

    firmware
        .into_image()
        .write_file(outfile, HEX_RECORD_LEN)
        .with_context(|| format!("Failed to write firmware file {}", outfile.display()))?;
    println!("Created firmware file: {}", outfile.display());

    Ok(())
}
