#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array2;

use masterframe_core::frame::{Frame, Stack};
use masterframe_core::io::fits::{write_fits, FitsHeader};

pub fn make_frame(h: usize, w: usize, fill: f32) -> Frame {
    Frame::new(Array2::from_elem((h, w), fill))
}

/// Stack of uniform frames, one per entry of `fills`.
pub fn uniform_stack(h: usize, w: usize, fills: &[f32]) -> Stack {
    Stack::new(fills.iter().map(|&v| make_frame(h, w, v)).collect()).expect("same geometry")
}

/// Stack whose single pixel takes the given values, one per frame.
pub fn pixel_stack(values: &[f32]) -> Stack {
    uniform_stack(1, 1, values)
}

/// Write `data` as a float FITS file named `name` inside `dir`.
pub fn write_fits_frame(dir: &Path, name: &str, data: &Array2<f32>) -> PathBuf {
    let path = dir.join(name);
    write_fits(&path, &FitsHeader::new(), data).expect("write FITS frame");
    path
}

/// Write uniform float FITS frames `frame_00.fits`, `frame_01.fits`, ...
pub fn write_uniform_fits(dir: &Path, h: usize, w: usize, fills: &[f32]) -> Vec<PathBuf> {
    fills
        .iter()
        .enumerate()
        .map(|(i, &v)| write_fits_frame(dir, &format!("frame_{i:02}.fits"), &Array2::from_elem((h, w), v)))
        .collect()
}

/// One 80-column header card, `KEY = value`.
pub fn fits_card(key: &str, value: &str) -> String {
    format!("{:<80}", format!("{key:<8}= {value:>20}"))
}

/// Assemble a raw FITS file from header cards (END is appended) and
/// big-endian sample bytes. Both units are padded to 2880 bytes.
pub fn build_raw_fits(cards: &[String], data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    for card in cards {
        assert_eq!(card.len(), 80);
        buf.extend_from_slice(card.as_bytes());
    }
    buf.extend_from_slice(format!("{:<80}", "END").as_bytes());
    pad_to_block(&mut buf, b' ');
    buf.extend_from_slice(data);
    pad_to_block(&mut buf, 0);
    buf
}

fn pad_to_block(buf: &mut Vec<u8>, fill: u8) {
    let rem = buf.len() % 2880;
    if rem != 0 {
        buf.resize(buf.len() + 2880 - rem, fill);
    }
}

/// Header cards for a primary image HDU.
pub fn primary_cards(bitpix: i32, axes: &[usize]) -> Vec<String> {
    let mut cards = vec![
        fits_card("SIMPLE", "T"),
        fits_card("BITPIX", &bitpix.to_string()),
        fits_card("NAXIS", &axes.len().to_string()),
    ];
    for (i, len) in axes.iter().enumerate() {
        cards.push(fits_card(&format!("NAXIS{}", i + 1), &len.to_string()));
    }
    cards
}

pub fn write_bytes(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write test file");
    path
}
