// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Sparse Intel HEX image store.
//!
//! Parses Intel HEX text (`:LLAAAATT[DD...]CC`) into a byte-addressed sparse
//! image, provides byte/range/string accessors over it, and writes it back
//! out as Intel HEX with a caller-chosen record size.  Record types 00
//! (data), 01 (EOF), 02 (extended segment address) and 04 (extended linear
//! address) are handled; start-address records (03/05) are skipped.
//!
//! Reads of addresses the image does not contain return [`PAD_BYTE`], the
//! erased-flash value, so callers can treat the image as a flat address
//! space.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Value returned when reading an address the image has no data for.
pub const PAD_BYTE: u8 = 0xFF;

/// Cap on the length of a null-terminated string read, to bound reads from
/// corrupt images.
pub const MAX_SZ_LEN: usize = 1024;

/// Errors produced while parsing Intel HEX text.  Parse errors carry the
/// 1-based line number of the offending record.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: record does not start with ':'")]
    MissingStartCode { line: usize },

    #[error("line {line}: odd number of hex digits")]
    OddLength { line: usize },

    #[error("line {line}: invalid hex character '{found}'")]
    BadCharacter { line: usize, found: char },

    #[error("line {line}: record shorter than its declared length")]
    Truncated { line: usize },

    #[error("line {line}: record checksum mismatch")]
    Checksum { line: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A sparse byte-addressed image, as loaded from an Intel HEX file.
///
/// Addresses run over the full 32-bit space; only bytes a data record set
/// (or a caller wrote) are stored.  Everything else reads as [`PAD_BYTE`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexImage {
    bytes: BTreeMap<u32, u8>,
}

impl HexImage {
    /// Create an empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse Intel HEX text into an image.
    pub fn parse(text: &str) -> Result<Self> {
        let mut image = Self::new();
        let mut base: u32 = 0;
        let mut records = 0usize;

        for (ix, raw) in text.lines().enumerate() {
            let line = ix + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some(body) = trimmed.strip_prefix(':') else {
                return Err(Error::MissingStartCode { line });
            };

            let bytes = decode_pairs(body, line)?;
            if bytes.len() < 5 {
                return Err(Error::Truncated { line });
            }
            let byte_count = bytes[0] as usize;
            if bytes.len() != byte_count + 5 {
                return Err(Error::Truncated { line });
            }
            let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            if sum != 0 {
                return Err(Error::Checksum { line });
            }

            let offset = u32::from(bytes[1]) << 8 | u32::from(bytes[2]);
            let record_type = bytes[3];
            records += 1;

            match record_type {
                0x00 => {
                    for (i, &b) in bytes[4..4 + byte_count].iter().enumerate() {
                        image.bytes.insert(base + offset + i as u32, b);
                    }
                }
                0x01 => break,
                0x02 => {
                    if byte_count >= 2 {
                        base = (u32::from(bytes[4]) << 8 | u32::from(bytes[5])) << 4;
                    }
                }
                0x04 => {
                    if byte_count >= 2 {
                        base = (u32::from(bytes[4]) << 8 | u32::from(bytes[5])) << 16;
                    }
                }
                // Start-address records and anything unknown carry no data.
                _ => {}
            }
        }

        debug!(
            "Parsed {} HEX records, {} data bytes",
            records,
            image.bytes.len()
        );
        Ok(image)
    }

    /// Read and parse an Intel HEX file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Number of data bytes the image holds.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowest populated address, if any.
    pub fn min_addr(&self) -> Option<u32> {
        self.bytes.keys().next().copied()
    }

    /// Highest populated address, if any.
    pub fn max_addr(&self) -> Option<u32> {
        self.bytes.keys().next_back().copied()
    }

    /// Read one byte, substituting [`PAD_BYTE`] for holes.
    pub fn get(&self, addr: u32) -> u8 {
        self.try_get(addr).unwrap_or(PAD_BYTE)
    }

    /// Read one byte, `None` for holes.
    pub fn try_get(&self, addr: u32) -> Option<u8> {
        self.bytes.get(&addr).copied()
    }

    /// Write one byte.
    pub fn set(&mut self, addr: u32, byte: u8) {
        self.bytes.insert(addr, byte);
    }

    /// Read `len` bytes starting at `addr`, substituting [`PAD_BYTE`] for
    /// holes.
    pub fn get_bytes(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len as u32).map(|i| self.get(addr + i)).collect()
    }

    /// Write a run of bytes starting at `addr`, replacing anything already
    /// there.
    pub fn put_bytes(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.bytes.insert(addr + i as u32, b);
        }
    }

    /// Read a null-terminated string starting at `addr`.  The terminator is
    /// not included; a hole also ends the string.  Reads are capped at
    /// [`MAX_SZ_LEN`] bytes.
    pub fn getsz(&self, addr: u32) -> Vec<u8> {
        let mut out = Vec::new();
        for i in 0..MAX_SZ_LEN as u32 {
            match self.try_get(addr + i) {
                Some(0) | None => break,
                Some(b) => out.push(b),
            }
        }
        out
    }

    /// Write `bytes` at `addr` followed by a null terminator.
    pub fn putsz(&mut self, addr: u32, bytes: &[u8]) {
        self.put_bytes(addr, bytes);
        self.set(addr + bytes.len() as u32, 0);
    }

    /// Address of the first occurrence of `needle`, searching only within
    /// contiguous runs of data (a match never spans a hole).
    pub fn find(&self, needle: &[u8]) -> Option<u32> {
        if needle.is_empty() {
            return None;
        }
        let mut run: Vec<u8> = Vec::new();
        let mut run_start: u32 = 0;
        let mut prev: Option<u32> = None;

        for (&addr, &byte) in &self.bytes {
            let contiguous = prev.is_some_and(|p| addr == p.wrapping_add(1));
            if !contiguous {
                if let Some(off) = find_in(&run, needle) {
                    return Some(run_start + off as u32);
                }
                run.clear();
                run_start = addr;
            }
            run.push(byte);
            prev = Some(addr);
        }
        find_in(&run, needle).map(|off| run_start + off as u32)
    }

    /// Render the image as Intel HEX text.
    ///
    /// Data records hold at most `bytes_per_record` bytes and never span a
    /// hole or a 64 KiB boundary.  A type-04 extended linear address record
    /// is emitted whenever the upper 16 address bits change (and suppressed
    /// while they are zero).
    pub fn to_hex_string(&self, bytes_per_record: usize) -> String {
        let per = bytes_per_record.clamp(1, 255);
        let mut out = String::new();
        let mut upper: u16 = 0;
        let mut record: Vec<u8> = Vec::with_capacity(per);
        let mut record_addr: u32 = 0;
        let mut prev: Option<u32> = None;

        for (&addr, &byte) in &self.bytes {
            let split = match prev {
                Some(p) => {
                    addr != p.wrapping_add(1)
                        || record.len() == per
                        || (addr >> 16) != (record_addr >> 16)
                }
                None => false,
            };
            if split {
                emit_data_record(&mut out, &mut upper, record_addr, &record);
                record.clear();
            }
            if record.is_empty() {
                record_addr = addr;
            }
            record.push(byte);
            prev = Some(addr);
        }
        if !record.is_empty() {
            emit_data_record(&mut out, &mut upper, record_addr, &record);
        }
        out.push_str(":00000001FF\n");
        out
    }

    /// Write the image to a file as Intel HEX text.
    pub fn write_file<P: AsRef<Path>>(&self, path: P, bytes_per_record: usize) -> Result<()> {
        std::fs::write(path, self.to_hex_string(bytes_per_record))?;
        Ok(())
    }
}

fn find_in(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_pairs(body: &str, line: usize) -> Result<Vec<u8>> {
    if body.len() % 2 != 0 {
        return Err(Error::OddLength { line });
    }
    let mut out = Vec::with_capacity(body.len() / 2);
    let mut digits = body.chars();
    while let (Some(hi), Some(lo)) = (digits.next(), digits.next()) {
        out.push(hex_digit(hi, line)? << 4 | hex_digit(lo, line)?);
    }
    Ok(out)
}

fn hex_digit(c: char, line: usize) -> Result<u8> {
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or(Error::BadCharacter { line, found: c })
}

fn emit_data_record(out: &mut String, upper: &mut u16, addr: u32, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    let hi = (addr >> 16) as u16;
    if hi != *upper {
        push_record(out, &[0x02, 0x00, 0x00, 0x04, (hi >> 8) as u8, hi as u8]);
        *upper = hi;
    }
    let mut payload = Vec::with_capacity(data.len() + 4);
    payload.push(data.len() as u8);
    payload.push((addr >> 8) as u8);
    payload.push(addr as u8);
    payload.push(0x00);
    payload.extend_from_slice(data);
    push_record(out, &payload);
}

fn push_record(out: &mut String, payload: &[u8]) {
    out.push(':');
    for b in payload {
        let _ = write!(out, "{b:02X}");
    }
    let sum = payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    let _ = writeln!(out, "{:02X}", sum.wrapping_neg());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let hex = ":100000000C9434000C944E000C944E000C944E0052\n:00000001FF\n";
        let image = HexImage::parse(hex).unwrap();
        assert_eq!(image.len(), 16);
        assert_eq!(image.get(0), 0x0C);
        assert_eq!(image.get(1), 0x94);
        assert_eq!(image.get(2), 0x34);
        assert_eq!(image.get(15), 0x00);
    }

    #[test]
    fn test_holes_read_as_pad() {
        let image = HexImage::parse(":0100000042BD\n:00000001FF\n").unwrap();
        assert_eq!(image.get(0), 0x42);
        assert_eq!(image.get(1), PAD_BYTE);
        assert_eq!(image.try_get(1), None);
    }

    #[test]
    fn test_checksum_rejected() {
        let hex = ":100000000C9434000C944E000C944E000C944E00FF\n:00000001FF\n";
        match HexImage::parse(hex) {
            Err(Error::Checksum { line }) => assert_eq!(line, 1),
            other => panic!("expected checksum error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_lines_rejected() {
        assert!(matches!(
            HexImage::parse("0100000042BD\n"),
            Err(Error::MissingStartCode { line: 1 })
        ));
        assert!(matches!(
            HexImage::parse(":010000042BD\n"),
            Err(Error::OddLength { line: 1 })
        ));
        assert!(matches!(
            HexImage::parse(":01000000G2BD\n"),
            Err(Error::BadCharacter { line: 1, found: 'G' })
        ));
        assert!(matches!(
            HexImage::parse(":0500000042BD\n"),
            Err(Error::Truncated { line: 1 })
        ));
    }

    #[test]
    fn test_extended_linear_address() {
        // 0x0001 << 16 base, then one byte at offset 0xF800.
        let hex = ":020000040001F9\n:01F8000055B2\n:00000001FF\n";
        let image = HexImage::parse(hex).unwrap();
        assert_eq!(image.get(0x1F800), 0x55);
        assert_eq!(image.len(), 1);
    }

    #[test]
    fn test_extended_segment_address() {
        // 0x1000 << 4 = 0x10000 base.
        let hex = ":020000021000EC\n:010000007788\n:00000001FF\n";
        let image = HexImage::parse(hex).unwrap();
        assert_eq!(image.get(0x10000), 0x77);
    }

    #[test]
    fn test_roundtrip_across_64k_boundary() {
        let mut image = HexImage::new();
        for i in 0..64u32 {
            image.set(0xFFE0 + i, i as u8);
        }
        let text = image.to_hex_string(16);
        // Upper bits change mid-stream, so exactly one type-04 record.
        let ext: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with(":02000004"))
            .collect();
        assert_eq!(ext, vec![":020000040001F9"]);

        let reparsed = HexImage::parse(&text).unwrap();
        assert_eq!(reparsed, image);
    }

    #[test]
    fn test_emit_respects_record_size_and_holes() {
        let mut image = HexImage::new();
        image.put_bytes(0, &[1, 2, 3]);
        image.put_bytes(0x10, &[4; 20]);
        let text = image.to_hex_string(16);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4, "3-byte, 16-byte, 4-byte, EOF: {text}");
        assert!(lines[0].starts_with(":03000000"));
        assert!(lines[1].starts_with(":10001000"));
        assert!(lines[2].starts_with(":04002000"));
        assert_eq!(lines[3], ":00000001FF");
    }

    #[test]
    fn test_getsz_putsz() {
        let mut image = HexImage::new();
        image.putsz(0x100, b"VER: 903plus");
        assert_eq!(image.getsz(0x100), b"VER: 903plus");
        assert_eq!(image.get(0x100 + 12), 0);
        // A hole ends the string early.
        image.set(0x200, b'A');
        assert_eq!(image.getsz(0x200), b"A");
    }

    #[test]
    fn test_find_respects_holes() {
        let mut image = HexImage::new();
        image.put_bytes(0x40, b"JAN\0FEB");
        assert_eq!(image.find(b"FEB"), Some(0x44));
        assert_eq!(image.find(b"MAR"), None);
        // Pattern broken by a hole must not match.
        image.put_bytes(0x80, b"JU");
        image.put_bytes(0x83, b"L");
        assert_eq!(image.find(b"JUL"), None);
        assert_eq!(image.find(b""), None);
    }

    #[test]
    fn test_put_bytes_replaces_overlap() {
        let mut image = HexImage::new();
        image.put_bytes(0, &[0xAA; 8]);
        image.put_bytes(4, &[0xBB; 8]);
        assert_eq!(image.get_bytes(0, 12), {
            let mut v = vec![0xAA; 4];
            v.extend_from_slice(&[0xBB; 8]);
            v
        });
    }

    #[test]
    fn test_addr_range() {
        let mut image = HexImage::new();
        assert_eq!(image.min_addr(), None);
        image.set(0x8000, 1);
        image.set(0x1F800, 2);
        assert_eq!(image.min_addr(), Some(0x8000));
        assert_eq!(image.max_addr(), Some(0x1F800));
    }
}
