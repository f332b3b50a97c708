// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Converts a 1-bit BMP into the splash screen's RLE stream.
//!
//! The display driver replays a run-length stream bottom row first.  Each
//! row opens with one byte giving the first run's colour (0 or 1); after
//! that only run lengths are emitted - a length is written each time the
//! colour flips and once more at the end of the row.  The stream ends with
//! ten `00 FA` pairs the driver uses to settle, and the whole thing must
//! fit the fixed 2048 byte region.
//!
//! BMP quirks handled here: rows are stored bottom-up and padded to 32
//! bits, pixels are sampled most significant bit first, and the image's
//! polarity comes from the red channel of the second palette entry (the
//! byte two before the pixel data).

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use std::path::{Path, PathBuf};

use deku::prelude::*;

use crate::layout::{SPLASH_HEIGHT, SPLASH_SIZE, SPLASH_WIDTH};
use crate::{Error, Result};

/// Pairs the display driver expects after the image data.
const TERMINATOR_PAIR: [u8; 2] = [0x00, 0xFA];
const TERMINATOR_REPEATS: usize = 10;

/// BMP file header plus the leading DIB fields the encoder needs.
#[derive(Debug, DekuRead, DekuWrite)]
#[deku(endian = "little", magic = b"BM")]
struct BmpHeader {
    #[deku(endian = "little")]
    file_size: u32,
    #[deku(endian = "little")]
    reserved: u32,
    #[deku(endian = "little")]
    data_offset: u32,
    #[deku(endian = "little")]
    dib_size: u32,
    #[deku(endian = "little")]
    width: i32,
    #[deku(endian = "little")]
    height: i32,
    #[deku(endian = "little")]
    planes: u16,
    #[deku(endian = "little")]
    bit_count: u16,
}

/// A loaded splash bitmap, validated and ready to encode.
#[derive(Debug, Clone)]
pub struct SplashImage {
    path: PathBuf,
    data: Vec<u8>,
    data_offset: usize,
    inverted: bool,
}

impl SplashImage {
    /// Load and validate a splash bitmap file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| Error::FileNotReadable {
            what: "BMP",
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, data)
    }

    fn from_bytes(path: &Path, data: Vec<u8>) -> Result<Self> {
        let unsupported = |reason: String| Error::UnsupportedBitmap {
            path: path.to_path_buf(),
            reason,
        };

        let (_, header) = BmpHeader::from_bytes((&data, 0))
            .map_err(|e| unsupported(format!("not a BMP file ({e})")))?;
        if header.bit_count != 1 {
            return Err(unsupported(format!(
                "bit depth is {}, the splash must be 1-bit",
                header.bit_count
            )));
        }
        if header.width != SPLASH_WIDTH as i32 || header.height != SPLASH_HEIGHT as i32 {
            return Err(unsupported(format!(
                "{}x{} image, the display is {}x{}",
                header.width, header.height, SPLASH_WIDTH, SPLASH_HEIGHT
            )));
        }

        let data_offset = header.data_offset as usize;
        if data_offset < 2 || data_offset > data.len() {
            return Err(unsupported(format!(
                "pixel data offset {data_offset} out of range"
            )));
        }
        if data.len() < data_offset + row_stride() * SPLASH_HEIGHT {
            return Err(unsupported("pixel data is truncated".to_string()));
        }

        // Palette entry 1's red channel doubles as the polarity flag.
        let inverted = data[data_offset - 2] != 0;
        debug!(
            "Loaded splash BMP '{}', inverted: {}",
            path.display(),
            inverted
        );
        Ok(Self {
            path: path.to_path_buf(),
            data,
            data_offset,
            inverted,
        })
    }

    pub fn inverted(&self) -> bool {
        self.inverted
    }

    /// Encode the bitmap as the display's RLE stream, terminator included.
    ///
    /// Fails with [`Error::ImageTooComplex`] the moment the stream would
    /// outgrow the splash region; nothing is ever truncated.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(512);

        // BMP rows are stored bottom-up, and the driver also draws
        // bottom-up, so the last stored row is emitted last.
        for row in (0..SPLASH_HEIGHT).rev() {
            let mut run_len: u8 = 0;
            let mut last_colour: Option<u8> = None;
            for col in 0..SPLASH_WIDTH {
                let colour = self.pixel(row, col);
                if last_colour == Some(colour) {
                    run_len += 1;
                    continue;
                }
                if run_len > 0 {
                    self.push_checked(&mut out, run_len)?;
                }
                if col == 0 {
                    self.push_checked(&mut out, colour)?;
                }
                run_len = 1;
                last_colour = Some(colour);
            }
            self.push_checked(&mut out, run_len)?;
        }

        for _ in 0..TERMINATOR_REPEATS {
            self.push_checked(&mut out, TERMINATOR_PAIR[0])?;
            self.push_checked(&mut out, TERMINATOR_PAIR[1])?;
        }

        debug!("Encoded splash stream: {} bytes", out.len());
        Ok(out)
    }

    fn pixel(&self, row: usize, col: usize) -> u8 {
        let byte = self.data[self.data_offset + row * row_stride() + col / 8];
        let sampled = (byte >> (7 - col % 8)) & 1;
        if self.inverted { sampled ^ 1 } else { sampled }
    }

    fn push_checked(&self, out: &mut Vec<u8>, byte: u8) -> Result<()> {
        if out.len() >= SPLASH_SIZE {
            return Err(Error::ImageTooComplex {
                path: self.path.clone(),
            });
        }
        out.push(byte);
        Ok(())
    }
}

/// Bytes per stored BMP row: the width in bits, padded to 32.
fn row_stride() -> usize {
    SPLASH_WIDTH.div_ceil(32) * 4
}
