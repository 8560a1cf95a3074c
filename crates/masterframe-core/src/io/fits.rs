//! Minimal FITS image codec.
//!
//! Reads the first image HDU of a file (primary, or the first `IMAGE`
//! extension when the primary array is empty) and writes single-HDU
//! 32-bit float images. Headers are sequences of 80-byte cards padded to
//! 2880-byte blocks; sample data is big-endian.

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::warn;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{MasterFrameError, Result};

const FITS_MAGIC: &[u8; 9] = b"SIMPLE  =";
const MAX_STRING_VALUE: usize = 68;

/// Value of a keyword card.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HeaderValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Card {
    Keyword {
        key: String,
        value: HeaderValue,
        comment: Option<String>,
    },
    Commentary {
        key: String,
        text: String,
    },
}

/// Ordered FITS header cards, excluding `END`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a keyword, replacing an existing card with the same key.
    pub fn set(&mut self, key: &str, value: HeaderValue, comment: Option<&str>) {
        let key = key.to_ascii_uppercase();
        let card = Card::Keyword {
            key: key.clone(),
            value,
            comment: comment.map(str::to_string),
        };
        let existing = self
            .cards
            .iter_mut()
            .find(|c| matches!(c, Card::Keyword { key: k, .. } if *k == key));
        match existing {
            Some(slot) => *slot = card,
            None => self.cards.push(card),
        }
    }

    pub fn add_history(&mut self, text: &str) {
        self.cards.push(Card::Commentary {
            key: "HISTORY".into(),
            text: text.to_string(),
        });
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        let key = key.to_ascii_uppercase();
        self.cards.iter().find_map(|c| match c {
            Card::Keyword { key: k, value, .. } if *k == key => Some(value),
            _ => None,
        })
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(HeaderValue::as_i64)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().filter_map(|c| match c {
            Card::Commentary { key, text } if key == "HISTORY" => Some(text.as_str()),
            _ => None,
        })
    }

    /// Keyword cards in header order.
    pub fn keywords(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().filter_map(|c| match c {
            Card::Keyword { key, value, .. } => Some((key.as_str(), value)),
            Card::Commentary { .. } => None,
        })
    }
}

/// First image plane of a FITS file plus its header.
#[derive(Clone, Debug)]
pub struct FitsImage {
    pub header: FitsHeader,
    pub bitpix: i32,
    /// Axis lengths in NAXISn order (NAXIS1, the row length, first).
    pub axes: Vec<usize>,
    /// First plane, shape = (NAXIS2, NAXIS1). BZERO/BSCALE applied; integer
    /// samples equal to BLANK are NaN.
    pub plane: Array2<f32>,
}

impl FitsImage {
    /// Number of 2D planes stored in the HDU (1 for a plain image).
    pub fn plane_count(&self) -> usize {
        self.axes.iter().skip(2).product::<usize>().max(1)
    }
}

/// Quick check for the mandatory leading `SIMPLE` card.
pub fn is_fits(bytes: &[u8]) -> bool {
    bytes.len() >= FITS_MAGIC.len() && &bytes[..FITS_MAGIC.len()] == FITS_MAGIC
}

/// Memory-map and decode a FITS file.
pub fn read_fits(path: &Path) -> Result<FitsImage> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    parse_fits(&mmap, path)
}

/// Decode the first image HDU found in `bytes`. `path` only labels errors.
pub fn parse_fits(bytes: &[u8], path: &Path) -> Result<FitsImage> {
    if !is_fits(bytes) {
        return Err(MasterFrameError::invalid_frame(
            path,
            "missing SIMPLE card, not a FITS file",
        ));
    }

    let mut offset = 0usize;
    let mut primary = true;
    while offset < bytes.len() {
        let (header, header_len) = parse_header(&bytes[offset..], path)?;
        let layout = HduLayout::from_header(&header, primary, path)?;
        let data_start = offset + header_len;

        if layout.is_image && layout.element_count > 0 {
            let plane = decode_first_plane(&bytes[data_start..], &header, &layout, path)?;
            return Ok(FitsImage {
                header,
                bitpix: layout.bitpix,
                axes: layout.axes,
                plane,
            });
        }

        offset = data_start.saturating_add(layout.data_len);
        primary = false;
    }

    Err(MasterFrameError::invalid_frame(
        path,
        "no numeric image plane",
    ))
}

struct HduLayout {
    bitpix: i32,
    axes: Vec<usize>,
    element_count: usize,
    /// Data unit length including block padding.
    data_len: usize,
    is_image: bool,
}

impl HduLayout {
    fn from_header(header: &FitsHeader, primary: bool, path: &Path) -> Result<Self> {
        let bitpix = header
            .get_int("BITPIX")
            .ok_or_else(|| MasterFrameError::invalid_frame(path, "missing BITPIX"))?
            as i32;
        if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
            return Err(MasterFrameError::invalid_frame(
                path,
                format!("unsupported BITPIX {bitpix}"),
            ));
        }
        let naxis = header
            .get_int("NAXIS")
            .ok_or_else(|| MasterFrameError::invalid_frame(path, "missing NAXIS"))?;
        if !(0..=999).contains(&naxis) {
            return Err(MasterFrameError::invalid_frame(
                path,
                format!("invalid NAXIS {naxis}"),
            ));
        }
        let mut axes = Vec::with_capacity(naxis as usize);
        for i in 1..=naxis {
            let key = format!("NAXIS{i}");
            let len = header
                .get_int(&key)
                .filter(|&v| v >= 0)
                .ok_or_else(|| MasterFrameError::invalid_frame(path, format!("missing {key}")))?;
            axes.push(len as usize);
        }
        let is_image = primary
            || header
                .get_text("XTENSION")
                .is_some_and(|x| x.trim().eq_ignore_ascii_case("IMAGE"));
        let pcount = header.get_int("PCOUNT").unwrap_or(0).max(0) as usize;
        let gcount = header.get_int("GCOUNT").unwrap_or(1).max(1) as usize;

        let overflow = || MasterFrameError::invalid_frame(path, "image dimensions overflow");
        let element_count = if axes.is_empty() {
            0
        } else {
            axes.iter()
                .try_fold(1usize, |acc, &len| acc.checked_mul(len))
                .ok_or_else(overflow)?
        };
        let bytes_per_sample = bitpix.unsigned_abs() as usize / 8;
        let data_len = pcount
            .checked_add(element_count)
            .and_then(|n| n.checked_mul(gcount))
            .and_then(|n| n.checked_mul(bytes_per_sample))
            .and_then(|n| n.checked_next_multiple_of(FITS_BLOCK_SIZE))
            .ok_or_else(overflow)?;

        Ok(Self {
            bitpix,
            axes,
            element_count,
            data_len,
            is_image,
        })
    }

    fn bytes_per_sample(&self) -> usize {
        self.bitpix.unsigned_abs() as usize / 8
    }

    /// (height, width) of one plane. A 1D array is a single row.
    fn plane_dim(&self) -> (usize, usize) {
        match self.axes.as_slice() {
            [w] => (1, *w),
            [w, h, ..] => (*h, *w),
            [] => (0, 0),
        }
    }
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE
}

/// Parse header cards up to END. Returns the header and its padded length.
fn parse_header(bytes: &[u8], path: &Path) -> Result<(FitsHeader, usize)> {
    let mut header = FitsHeader::new();
    let mut pos = 0usize;
    loop {
        let card = bytes
            .get(pos..pos + FITS_CARD_SIZE)
            .ok_or_else(|| MasterFrameError::invalid_frame(path, "truncated header"))?;
        pos += FITS_CARD_SIZE;
        if !card.is_ascii() {
            return Err(MasterFrameError::invalid_frame(path, "non-ASCII header card"));
        }

        let text = String::from_utf8_lossy(card);
        let key = text[..8].trim_end();
        if key == "END" {
            break;
        }
        if key.is_empty() {
            continue;
        }
        if key == "HISTORY" || key == "COMMENT" {
            header.cards.push(Card::Commentary {
                key: key.to_string(),
                text: text[8..].trim().to_string(),
            });
            continue;
        }
        if &text[8..10] == "= " {
            let (value, comment) = parse_value(&text[10..]);
            if let Some(value) = value {
                header.cards.push(Card::Keyword {
                    key: key.to_string(),
                    value,
                    comment,
                });
            }
        }
    }

    let header_len = padded_len(pos);
    if header_len > bytes.len() {
        return Err(MasterFrameError::invalid_frame(path, "truncated header"));
    }
    Ok((header, header_len))
}

fn parse_value(field: &str) -> (Option<HeaderValue>, Option<String>) {
    let trimmed = field.trim_start();

    if let Some(rest) = trimmed.strip_prefix('\'') {
        // Quoted string; '' is an escaped quote.
        let mut value = String::new();
        let mut chars = rest.char_indices().peekable();
        let mut end = rest.len();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    value.push('\'');
                    chars.next();
                } else {
                    end = i + 1;
                    break;
                }
            } else {
                value.push(c);
            }
        }
        let comment = split_comment(&rest[end.min(rest.len())..]).1;
        return (Some(HeaderValue::Text(value.trim_end().to_string())), comment);
    }

    let (raw, comment) = split_comment(trimmed);
    let raw = raw.trim();
    let value = match raw {
        "" => None,
        "T" => Some(HeaderValue::Logical(true)),
        "F" => Some(HeaderValue::Logical(false)),
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                Some(HeaderValue::Integer(i))
            } else if let Ok(f) = raw.replace(['D', 'd'], "E").parse::<f64>() {
                Some(HeaderValue::Float(f))
            } else {
                Some(HeaderValue::Text(raw.to_string()))
            }
        }
    };
    (value, comment)
}

fn split_comment(s: &str) -> (&str, Option<String>) {
    match s.find('/') {
        Some(idx) => {
            let comment = s[idx + 1..].trim();
            (
                &s[..idx],
                (!comment.is_empty()).then(|| comment.to_string()),
            )
        }
        None => (s, None),
    }
}

fn decode_first_plane(
    data: &[u8],
    header: &FitsHeader,
    layout: &HduLayout,
    path: &Path,
) -> Result<Array2<f32>> {
    let (height, width) = layout.plane_dim();
    let count = height
        .checked_mul(width)
        .ok_or_else(|| MasterFrameError::invalid_frame(path, "image dimensions overflow"))?;
    let raw = count
        .checked_mul(layout.bytes_per_sample())
        .and_then(|len| data.get(..len))
        .ok_or_else(|| MasterFrameError::invalid_frame(path, "truncated data unit"))?;

    let bzero = header.get_float("BZERO").unwrap_or(0.0);
    let bscale = header.get_float("BSCALE").unwrap_or(1.0);
    let blank = if layout.bitpix > 0 {
        header.get_int("BLANK")
    } else {
        None
    };
    let physical = |v: f64| (bzero + bscale * v) as f32;
    let integer = |v: i64| {
        if blank == Some(v) {
            f32::NAN
        } else {
            physical(v as f64)
        }
    };

    let mut cursor = Cursor::new(raw);
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match layout.bitpix {
            8 => integer(cursor.read_u8()? as i64),
            16 => integer(cursor.read_i16::<BigEndian>()? as i64),
            32 => integer(cursor.read_i32::<BigEndian>()? as i64),
            64 => integer(cursor.read_i64::<BigEndian>()?),
            -32 => physical(cursor.read_f32::<BigEndian>()? as f64),
            _ => physical(cursor.read_f64::<BigEndian>()?),
        };
        samples.push(value);
    }

    Array2::from_shape_vec((height, width), samples)
        .map_err(|e| MasterFrameError::invalid_frame(path, e.to_string()))
}

/// Write `data` as a single-HDU `BITPIX = -32` FITS file.
///
/// Structural keywords are generated; `extra` cards follow them.
pub fn write_fits(path: &Path, extra: &FitsHeader, data: &Array2<f32>) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_fits(&mut writer, extra, data)?;
    writer.flush()?;
    Ok(())
}

/// Encode a `BITPIX = -32` image into any writer.
pub fn encode_fits(w: &mut impl Write, extra: &FitsHeader, data: &Array2<f32>) -> Result<()> {
    let (height, width) = data.dim();

    let mut header = FitsHeader::new();
    header.set("SIMPLE", HeaderValue::Logical(true), Some("conforms to FITS standard"));
    header.set("BITPIX", HeaderValue::Integer(-32), Some("32-bit IEEE float"));
    header.set("NAXIS", HeaderValue::Integer(2), None);
    header.set("NAXIS1", HeaderValue::Integer(width as i64), None);
    header.set("NAXIS2", HeaderValue::Integer(height as i64), None);
    for card in &extra.cards {
        let reserved = matches!(card, Card::Keyword { key, .. }
            if matches!(key.as_str(), "SIMPLE" | "BITPIX" | "NAXIS" | "NAXIS1" | "NAXIS2" | "BZERO" | "BSCALE"));
        if !reserved {
            header.cards.push(card.clone());
        }
    }

    let mut written = 0usize;
    for card in &header.cards {
        w.write_all(format_card(card).as_bytes())?;
        written += FITS_CARD_SIZE;
    }
    w.write_all(format!("{:<80}", "END").as_bytes())?;
    written += FITS_CARD_SIZE;
    w.write_all(&vec![b' '; padded_len(written) - written])?;

    for &v in data.iter() {
        w.write_f32::<BigEndian>(v)?;
    }
    let data_len = height * width * 4;
    w.write_all(&vec![0u8; padded_len(data_len) - data_len])?;
    Ok(())
}

fn format_card(card: &Card) -> String {
    let mut line = match card {
        Card::Commentary { key, text } => format!("{key:<8}{}", ascii_text(text)),
        Card::Keyword {
            key,
            value,
            comment,
        } => {
            let value = match value {
                HeaderValue::Text(s) => {
                    let (quoted, truncated) = quote_string(&ascii_text(s));
                    if truncated {
                        warn!(key = %key, value = %s, "FITS string value truncated to 68 characters");
                    }
                    format!("'{quoted:<8}'")
                }
                HeaderValue::Float(v) => format!("{:>20}", format_float(*v)),
                other => format!("{:>20}", other.to_string()),
            };
            match comment {
                Some(c) => format!("{key:<8}= {value} / {}", ascii_text(c)),
                None => format!("{key:<8}= {value}"),
            }
        }
    };
    // every char is ASCII here, so byte and char lengths agree
    line.truncate(FITS_CARD_SIZE);
    let line = format!("{line:<80}");
    debug_assert_eq!(line.len(), FITS_CARD_SIZE);
    line
}

/// Printable ASCII only; anything else becomes `?`.
fn ascii_text(s: &str) -> String {
    s.chars()
        .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '?' })
        .collect()
}

/// Escape quotes and fit the result in one card's string field.
///
/// Never splits an escaped `''` pair. Returns whether anything was dropped.
fn quote_string(s: &str) -> (String, bool) {
    let mut out = String::with_capacity(MAX_STRING_VALUE);
    for c in s.chars() {
        let width = if c == '\'' { 2 } else { 1 };
        if out.len() + width > MAX_STRING_VALUE {
            return (out, true);
        }
        out.push(c);
        if c == '\'' {
            out.push('\'');
        }
    }
    (out, false)
}

/// Fixed-format float: always carries a decimal point or an uppercase exponent.
fn format_float(v: f64) -> String {
    let s = format!("{v:?}").to_ascii_uppercase();
    if s.contains(['.', 'E']) || !v.is_finite() {
        s
    } else {
        format!("{s}.0")
    }
}
