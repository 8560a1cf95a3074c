mod common;

use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use ndarray::{array, Array2};
use tempfile::TempDir;

use common::{build_raw_fits, fits_card, primary_cards, write_bytes};
use masterframe_core::error::MasterFrameError;
use masterframe_core::io::fits::{
    encode_fits, is_fits, parse_fits, read_fits, write_fits, FitsHeader, HeaderValue,
};

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    let mut buf = Vec::new();
    for &v in values {
        buf.write_f32::<BigEndian>(v).unwrap();
    }
    buf
}

fn i16_bytes(values: &[i16]) -> Vec<u8> {
    let mut buf = Vec::new();
    for &v in values {
        buf.write_i16::<BigEndian>(v).unwrap();
    }
    buf
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

#[test]
fn test_write_read_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("master.fits");
    let data = array![[1.0f32, -2.5, 3.25], [1.0e6, 0.0, -7.0]];

    let mut header = FitsHeader::new();
    header.set("IMAGETYP", HeaderValue::Text("bias".into()), Some("calibration stage"));
    header.set("NCOMBINE", HeaderValue::Integer(3), None);
    header.set("LSIGMA", HeaderValue::Float(2.5), None);
    header.add_history("bias master from 3 frames");
    write_fits(&path, &header, &data).unwrap();

    let image = read_fits(&path).unwrap();
    assert_eq!(image.bitpix, -32);
    assert_eq!(image.axes, vec![3, 2]);
    assert_eq!(image.plane, data);
    assert_eq!(image.header.get_text("IMAGETYP"), Some("bias"));
    assert_eq!(image.header.get_int("NCOMBINE"), Some(3));
    assert_eq!(image.header.get_float("LSIGMA"), Some(2.5));
    assert_eq!(
        image.header.history().collect::<Vec<_>>(),
        vec!["bias master from 3 frames"]
    );
}

#[test]
fn test_output_is_block_aligned() {
    let mut buf = Vec::new();
    encode_fits(&mut buf, &FitsHeader::new(), &Array2::zeros((7, 5))).unwrap();
    assert_eq!(buf.len() % 2880, 0);
    assert!(is_fits(&buf));
    // one header block, one data block
    assert_eq!(buf.len(), 2 * 2880);
}

#[test]
fn test_structural_keywords_not_duplicated() {
    let mut extra = FitsHeader::new();
    extra.set("BITPIX", HeaderValue::Integer(16), None);
    extra.set("NAXIS1", HeaderValue::Integer(99), None);
    let mut buf = Vec::new();
    encode_fits(&mut buf, &extra, &Array2::from_elem((2, 3), 4.0)).unwrap();

    let image = parse_fits(&buf, Path::new("mem.fits")).unwrap();
    assert_eq!(image.bitpix, -32);
    assert_eq!(image.plane.dim(), (2, 3));
}

#[test]
fn test_quoted_string_round_trip() {
    let mut header = FitsHeader::new();
    header.set("OBSERVER", HeaderValue::Text("O'Brien".into()), None);
    let mut buf = Vec::new();
    encode_fits(&mut buf, &header, &Array2::zeros((1, 1))).unwrap();
    let image = parse_fits(&buf, Path::new("mem.fits")).unwrap();
    assert_eq!(image.header.get_text("OBSERVER"), Some("O'Brien"));
}

#[test]
fn test_non_ascii_text_keeps_cards_aligned() {
    let mut header = FitsHeader::new();
    header.set("IMAGETYP", HeaderValue::Text("b\u{ed}as".into()), None);
    header.set(
        "IMCMB001",
        HeaderValue::Text(format!("{}\u{20ac}.fits", "a".repeat(67))),
        Some("fr\u{e9}me"),
    );
    header.add_history("d\u{ed}a 1");
    let data = array![[1.0f32, 2.0], [3.0, 4.0]];
    let mut buf = Vec::new();
    encode_fits(&mut buf, &header, &data).unwrap();
    assert_eq!(buf.len(), 2 * 2880);
    assert!(buf[..2880].is_ascii());

    let image = parse_fits(&buf, Path::new("mem.fits")).unwrap();
    assert_eq!(image.plane, data);
    assert_eq!(image.header.get_text("IMAGETYP"), Some("b?as"));
    assert_eq!(
        image.header.get_text("IMCMB001"),
        Some(format!("{}?", "a".repeat(67)).as_str())
    );
    assert_eq!(image.header.history().collect::<Vec<_>>(), vec!["d?a 1"]);
}

#[test]
fn test_long_string_cut_without_splitting_quote() {
    let mut header = FitsHeader::new();
    header.set("LONGNAME", HeaderValue::Text("x".repeat(100)), None);
    header.set(
        "QUOTED",
        HeaderValue::Text(format!("{}'tail", "q".repeat(67))),
        None,
    );
    let mut buf = Vec::new();
    encode_fits(&mut buf, &header, &Array2::zeros((1, 1))).unwrap();
    assert_eq!(buf.len() % 2880, 0);

    let image = parse_fits(&buf, Path::new("mem.fits")).unwrap();
    assert_eq!(image.header.get_text("LONGNAME"), Some("x".repeat(68).as_str()));
    assert_eq!(image.header.get_text("QUOTED"), Some("q".repeat(67).as_str()));
}

#[test]
fn test_header_set_replaces() {
    let mut header = FitsHeader::new();
    header.set("NCOMBINE", HeaderValue::Integer(3), None);
    header.set("NCOMBINE", HeaderValue::Integer(5), None);
    assert_eq!(header.get_int("NCOMBINE"), Some(5));
    assert_eq!(header.keywords().count(), 1);
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[test]
fn test_int16_with_bzero() {
    let mut cards = primary_cards(16, &[2, 1]);
    cards.push(fits_card("BZERO", "32768"));
    cards.push(fits_card("BSCALE", "1"));
    let raw = build_raw_fits(&cards, &i16_bytes(&[-32768, -31768]));

    let image = parse_fits(&raw, Path::new("bias.fits")).unwrap();
    assert_eq!(image.plane, array![[0.0f32, 1000.0]]);
}

#[test]
fn test_integer_blank_is_nan() {
    let mut cards = primary_cards(16, &[3, 1]);
    cards.push(fits_card("BLANK", "-1"));
    let raw = build_raw_fits(&cards, &i16_bytes(&[5, -1, 7]));

    let image = parse_fits(&raw, Path::new("bias.fits")).unwrap();
    assert_eq!(image.plane[[0, 0]], 5.0);
    assert!(image.plane[[0, 1]].is_nan());
    assert_eq!(image.plane[[0, 2]], 7.0);
}

#[test]
fn test_cube_takes_first_plane() {
    let cards = primary_cards(-32, &[2, 2, 3]);
    let samples: Vec<f32> = (0..12).map(|v| v as f32).collect();
    let raw = build_raw_fits(&cards, &f32_bytes(&samples));

    let image = parse_fits(&raw, Path::new("cube.fits")).unwrap();
    assert_eq!(image.plane_count(), 3);
    assert_eq!(image.plane, array![[0.0f32, 1.0], [2.0, 3.0]]);
}

#[test]
fn test_one_dimensional_is_single_row() {
    let raw = build_raw_fits(&primary_cards(-32, &[4]), &f32_bytes(&[1.0, 2.0, 3.0, 4.0]));
    let image = parse_fits(&raw, Path::new("row.fits")).unwrap();
    assert_eq!(image.plane, array![[1.0f32, 2.0, 3.0, 4.0]]);
}

#[test]
fn test_image_extension_after_empty_primary() {
    let mut raw = build_raw_fits(&primary_cards(8, &[]), &[]);
    let ext_cards = vec![
        fits_card("XTENSION", "'IMAGE   '"),
        fits_card("BITPIX", "-32"),
        fits_card("NAXIS", "2"),
        fits_card("NAXIS1", "2"),
        fits_card("NAXIS2", "1"),
        fits_card("PCOUNT", "0"),
        fits_card("GCOUNT", "1"),
    ];
    raw.extend(build_raw_fits(&ext_cards, &f32_bytes(&[9.0, 8.0])));

    let image = parse_fits(&raw, Path::new("ext.fits")).unwrap();
    assert_eq!(image.plane, array![[9.0f32, 8.0]]);
}

#[test]
fn test_empty_primary_only_is_invalid() {
    let raw = build_raw_fits(&primary_cards(8, &[]), &[]);
    assert!(matches!(
        parse_fits(&raw, Path::new("empty.fits")),
        Err(MasterFrameError::InvalidFrame { .. })
    ));
}

#[test]
fn test_truncated_data_is_invalid() {
    let cards = primary_cards(-32, &[100, 100]);
    let mut raw = build_raw_fits(&cards, &[]);
    raw.extend(f32_bytes(&[1.0; 10]));
    assert!(matches!(
        parse_fits(&raw, Path::new("short.fits")),
        Err(MasterFrameError::InvalidFrame { .. })
    ));
}

#[test]
fn test_huge_axes_are_invalid() {
    let huge = 1usize << 33;
    let raw = build_raw_fits(&primary_cards(-32, &[huge, huge]), &f32_bytes(&[1.0; 4]));
    match parse_fits(&raw, Path::new("huge.fits")) {
        Err(MasterFrameError::InvalidFrame { reason, .. }) => {
            assert_eq!(reason, "image dimensions overflow")
        }
        other => panic!("expected InvalidFrame, got {other:?}"),
    }
}

#[test]
fn test_large_axes_without_data_are_invalid() {
    let raw = build_raw_fits(&primary_cards(-64, &[1 << 20, 1 << 20]), &[]);
    assert!(matches!(
        parse_fits(&raw, Path::new("large.fits")),
        Err(MasterFrameError::InvalidFrame { .. })
    ));
}

#[test]
fn test_missing_end_is_invalid() {
    let mut raw = Vec::new();
    for card in primary_cards(-32, &[2, 2]) {
        raw.extend_from_slice(card.as_bytes());
    }
    assert!(matches!(
        parse_fits(&raw, Path::new("noend.fits")),
        Err(MasterFrameError::InvalidFrame { .. })
    ));
}

#[test]
fn test_unsupported_bitpix() {
    let raw = build_raw_fits(&primary_cards(12, &[2, 2]), &[0u8; 6]);
    assert!(matches!(
        parse_fits(&raw, Path::new("odd.fits")),
        Err(MasterFrameError::InvalidFrame { .. })
    ));
}

#[test]
fn test_not_fits() {
    let dir = TempDir::new().unwrap();
    let path = write_bytes(dir.path(), "junk.fits", b"this is not a fits file at all");
    assert!(!is_fits(b"this is not"));
    assert!(matches!(
        read_fits(&path),
        Err(MasterFrameError::InvalidFrame { .. })
    ));
}
