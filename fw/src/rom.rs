// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Packs raw HP-41 ROM dumps into the firmware's payload format.
//!
//! A module ROM is 4096 10-bit words.  Dump files store each word as two
//! bytes: the high two bits first, then the low eight.  The firmware keeps
//! the two planes apart to save space: 4096 low bytes followed by 1024
//! bytes each packing the high bits of four consecutive words, lowest word
//! in the least significant pair.
//!
//! Packing is one-way; nothing in the tool ever unpacks a payload.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use std::path::Path;

use crate::layout::{ROM_DUMP_LEN, ROM_PAYLOAD_LEN};
use crate::{Error, Result};

/// A packed ROM payload plus the name it will be listed under, both derived
/// from a dump file.
#[derive(Debug, Clone)]
pub struct RomPayload {
    bytes: Vec<u8>,
    name: String,
}

impl RomPayload {
    /// Read and pack a ROM dump file.
    ///
    /// The file must hold at least [`ROM_DUMP_LEN`] bytes; anything beyond
    /// that (trailer records, duplicated banks) is ignored.  `slot` is only
    /// used to attribute errors.
    pub fn from_file<P: AsRef<Path>>(slot: usize, path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| Error::FileNotReadable {
            what: "ROM",
            path: path.to_path_buf(),
            source,
        })?;
        if raw.len() < ROM_DUMP_LEN {
            return Err(Error::RomFileTooShort {
                slot,
                path: path.to_path_buf(),
                expected: ROM_DUMP_LEN,
                actual: raw.len(),
            });
        }
        let name = display_name(path);
        debug!("Packed ROM '{}' ({} bytes) for slot {}", name, raw.len(), slot);
        Ok(Self {
            bytes: pack(&raw),
            name,
        })
    }

    /// The packed payload, exactly [`ROM_PAYLOAD_LEN`] bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Name the slot will be listed under: the dump's file stem, not yet
    /// fitted to the name table's width.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Split the 10-bit words of `raw` (at least [`ROM_DUMP_LEN`] bytes) into
/// the firmware's low-byte plane and packed high-bit plane.
fn pack(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ROM_PAYLOAD_LEN);
    for word in 0..ROM_DUMP_LEN / 2 {
        out.push(raw[word * 2 + 1]);
    }
    for group in 0..ROM_DUMP_LEN / 8 {
        let base = group * 8;
        let mut packed = 0u8;
        for sub in 0..4 {
            packed |= (raw[base + sub * 2] & 0x3) << (sub * 2);
        }
        out.push(packed);
    }
    out
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("ROM")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned_dump() -> Vec<u8> {
        let mut raw = vec![0u8; ROM_DUMP_LEN];
        for w in 0..ROM_DUMP_LEN / 2 {
            raw[2 * w] = (w & 0x3) as u8;
            raw[2 * w + 1] = (w % 251) as u8;
        }
        raw
    }

    #[test]
    fn test_pack_planes() {
        let packed = pack(&patterned_dump());
        assert_eq!(packed.len(), ROM_PAYLOAD_LEN);
        // Low plane: the second byte of every word, in word order.
        for w in [0usize, 1, 255, 256, 4095] {
            assert_eq!(packed[w], (w % 251) as u8, "low byte of word {w}");
        }
        // High plane: words 4g..4g+3 have high bits 0,1,2,3 here, packed
        // least significant word first.
        for g in [0usize, 100, 1023] {
            assert_eq!(packed[4096 + g], 0b1110_0100, "high bits of group {g}");
        }
    }

    #[test]
    fn test_pack_masks_high_byte() {
        let mut raw = vec![0u8; ROM_DUMP_LEN];
        for b in raw.iter_mut().step_by(2) {
            *b = 0xFF;
        }
        let packed = pack(&raw);
        assert!(packed[..4096].iter().all(|&b| b == 0));
        assert!(packed[4096..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_pack_ignores_trailing_bytes() {
        let mut long = patterned_dump();
        long.extend_from_slice(&[0xAB; 512]);
        assert_eq!(pack(&long), pack(&patterned_dump()));
    }

    #[test]
    fn test_from_file_too_short() {
        let path = std::env::temp_dir().join(format!("px41cx-short-{}.rom", std::process::id()));
        std::fs::write(&path, [0u8; 100]).unwrap();
        let err = RomPayload::from_file(7, &path).unwrap_err();
        std::fs::remove_file(&path).ok();
        match err {
            Error::RomFileTooShort {
                slot,
                expected,
                actual,
                ..
            } => {
                assert_eq!(slot, 7);
                assert_eq!(expected, ROM_DUMP_LEN);
                assert_eq!(actual, 100);
            }
            other => panic!("expected RomFileTooShort, got {other}"),
        }
    }

    #[test]
    fn test_from_file_missing() {
        let err = RomPayload::from_file(6, "/no/such/file.rom").unwrap_err();
        assert!(matches!(err, Error::FileNotReadable { what: "ROM", .. }));
    }

    #[test]
    fn test_display_name_is_file_stem() {
        assert_eq!(display_name(Path::new("roms/HEPAX.mod")), "HEPAX");
        assert_eq!(display_name(Path::new("advantage.rom")), "advantage");
        assert_eq!(display_name(Path::new("noext")), "noext");
    }
}
