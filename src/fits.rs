//! Minimal FITS support for full-sky HEALPix maps.
//!
//! Reads the first column of the first binary table extension, the layout
//! written by both chealpix (`TFORM1 = '1E'`, one pixel per row) and healpy
//! (`TFORM1 = '1024E'`, 1024 pixels per row). Writes the chealpix layout.

use crate::error::MapError;
use crate::healpix::{self, Ordering};
use crate::map::{CoordSys, HealpixMap};
use std::io::Write;

/// FITS logical record size in bytes.
pub const BLOCK_SIZE: usize = 2880;
/// Header card size in bytes.
pub const CARD_SIZE: usize = 80;

/// Parsed header of one HDU, in card order.
#[derive(Debug, Clone, Default)]
pub struct Header {
    cards: Vec<(String, String)>,
}

impl Header {
    /// Raw value of `keyword` with string quotes removed.
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.cards
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_int(&self, keyword: &str) -> Result<Option<i64>, MapError> {
        self.get(keyword)
            .map(|v| {
                v.parse::<i64>().map_err(|_| MapError::InvalidKeyword {
                    keyword: keyword.to_string(),
                    value: v.to_string(),
                })
            })
            .transpose()
    }

    pub fn get_float(&self, keyword: &str) -> Result<Option<f64>, MapError> {
        self.get(keyword)
            .map(|v| {
                // Fortran-style exponents are legal in FITS
                v.replace(['D', 'd'], "E")
                    .parse::<f64>()
                    .map_err(|_| MapError::InvalidKeyword {
                        keyword: keyword.to_string(),
                        value: v.to_string(),
                    })
            })
            .transpose()
    }

    fn require_int(&self, keyword: &str) -> Result<i64, MapError> {
        self.get_int(keyword)?.ok_or_else(|| MapError::MissingKeyword {
            keyword: keyword.to_string(),
        })
    }

    /// A required non-negative size or count.
    fn require_len(&self, keyword: &str) -> Result<usize, MapError> {
        let value = self.require_int(keyword)?;
        usize::try_from(value).map_err(|_| MapError::InvalidKeyword {
            keyword: keyword.to_string(),
            value: value.to_string(),
        })
    }

    /// Size in bytes of the data unit that follows this header, unpadded.
    fn data_len(&self) -> Result<usize, MapError> {
        let naxis = self.require_len("NAXIS")?;
        if naxis == 0 {
            return Ok(0);
        }
        let bitpix = self.require_int("BITPIX")?;
        let overflow = || MapError::InvalidKeyword {
            keyword: "NAXIS".to_string(),
            value: naxis.to_string(),
        };

        let mut elements: usize = 1;
        for axis in 1..=naxis {
            let len = self.require_len(&format!("NAXIS{axis}"))?;
            elements = elements.checked_mul(len).ok_or_else(overflow)?;
        }
        let pcount = match self.get_int("PCOUNT")? {
            Some(v) => usize::try_from(v).map_err(|_| MapError::InvalidKeyword {
                keyword: "PCOUNT".to_string(),
                value: v.to_string(),
            })?,
            None => 0,
        };
        let gcount = match self.get_int("GCOUNT")? {
            Some(v) => usize::try_from(v).map_err(|_| MapError::InvalidKeyword {
                keyword: "GCOUNT".to_string(),
                value: v.to_string(),
            })?,
            None => 1,
        };
        let width = (bitpix.unsigned_abs() / 8) as usize;

        elements
            .checked_add(pcount)
            .and_then(|n| n.checked_mul(gcount))
            .and_then(|n| n.checked_mul(width))
            .ok_or_else(overflow)
    }
}

fn padded(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Split one 80-byte card into keyword and value.
fn parse_card(card: &[u8]) -> Option<(String, String)> {
    let text = String::from_utf8_lossy(card);
    let keyword = text.get(..8)?.trim().to_string();
    if keyword.is_empty() || text.get(8..10) != Some("= ") {
        return Some((keyword, String::new()));
    }

    let raw = text.get(10..).unwrap_or("").trim_start();
    let value = if let Some(rest) = raw.strip_prefix('\'') {
        // Quoted string; '' is an escaped quote
        let mut out = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    out.push('\'');
                    chars.next();
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        out.trim_end().to_string()
    } else {
        raw.split('/').next().unwrap_or("").trim().to_string()
    };

    Some((keyword, value))
}

/// Parse the header starting at `offset`. Returns it with the data offset.
fn parse_header(bytes: &[u8], offset: usize) -> Result<(Header, usize), MapError> {
    let mut header = Header::default();
    let mut pos = offset;

    loop {
        let card = bytes.get(pos..pos + CARD_SIZE).ok_or(MapError::Truncated {
            needed: pos + CARD_SIZE,
            actual: bytes.len(),
        })?;
        pos += CARD_SIZE;

        if let Some((keyword, value)) = parse_card(card) {
            if keyword == "END" {
                break;
            }
            if !keyword.is_empty() {
                header.cards.push((keyword, value));
            }
        }
    }

    Ok((header, offset + padded(pos - offset)))
}

/// Binary table column element type (`TFORM` letter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl ColumnType {
    fn width(self) -> usize {
        match self {
            ColumnType::Byte => 1,
            ColumnType::Short => 2,
            ColumnType::Int | ColumnType::Float => 4,
            ColumnType::Long | ColumnType::Double => 8,
        }
    }

    fn decode(self, b: &[u8]) -> f64 {
        match self {
            ColumnType::Byte => b[0] as f64,
            ColumnType::Short => i16::from_be_bytes([b[0], b[1]]) as f64,
            ColumnType::Int => i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            ColumnType::Long => i64::from_be_bytes(fixed(b)) as f64,
            ColumnType::Float => f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            ColumnType::Double => f64::from_be_bytes(fixed(b)),
        }
    }
}

fn fixed(b: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&b[..8]);
    out
}

/// Parse a `TFORM` value such as `1E` or `1024D` into (repeat, type).
fn parse_tform(tform: &str) -> Result<(usize, ColumnType), MapError> {
    let unsupported = || MapError::UnsupportedFormat {
        tform: tform.to_string(),
    };
    let tform = tform.trim();
    let split = tform
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(unsupported)?;
    let repeat = match &tform[..split] {
        "" => 1,
        digits => digits.parse::<usize>().map_err(|_| unsupported())?,
    };
    let kind = match tform[split..].chars().next() {
        Some('B') => ColumnType::Byte,
        Some('I') => ColumnType::Short,
        Some('J') => ColumnType::Int,
        Some('K') => ColumnType::Long,
        Some('E') => ColumnType::Float,
        Some('D') => ColumnType::Double,
        _ => return Err(unsupported()),
    };
    if repeat == 0 {
        return Err(unsupported());
    }
    Ok((repeat, kind))
}

/// Decode a full-sky HEALPix map from the bytes of a FITS file.
pub fn parse_healpix(bytes: &[u8]) -> Result<HealpixMap, MapError> {
    if !bytes.starts_with(b"SIMPLE  =") {
        return Err(MapError::NotFits {
            reason: "missing SIMPLE card".to_string(),
        });
    }

    let (primary, mut offset) = parse_header(bytes, 0)?;
    offset += padded(primary.data_len()?);

    let (table, data_start) = loop {
        if offset >= bytes.len() {
            return Err(MapError::NoBinaryTable);
        }
        let (header, data_start) = parse_header(bytes, offset)?;
        if header.get("XTENSION") == Some("BINTABLE") {
            break (header, data_start);
        }
        offset = data_start + padded(header.data_len()?);
    };

    // Map keywords usually live in the extension, sometimes in the primary HDU
    let lookup = |key: &str| table.get(key).or_else(|| primary.get(key));

    if lookup("INDXSCHM").is_some_and(|v| v.eq_ignore_ascii_case("EXPLICIT"))
        || lookup("OBJECT").is_some_and(|v| v.eq_ignore_ascii_case("PARTIAL"))
    {
        return Err(MapError::PartialSky);
    }

    let row_len = table.require_len("NAXIS1")?;
    let rows = table.require_len("NAXIS2")?;
    let tform = table.get("TFORM1").ok_or_else(|| MapError::MissingKeyword {
        keyword: "TFORM1".to_string(),
    })?;
    let (repeat, kind) = parse_tform(tform)?;
    let cell_len = repeat
        .checked_mul(kind.width())
        .filter(|&len| len <= row_len)
        .ok_or_else(|| MapError::UnsupportedFormat {
            tform: tform.to_string(),
        })?;

    let needed = row_len
        .checked_mul(rows)
        .and_then(|len| len.checked_add(data_start))
        .ok_or_else(|| MapError::InvalidKeyword {
            keyword: "NAXIS2".to_string(),
            value: rows.to_string(),
        })?;
    if bytes.len() < needed {
        return Err(MapError::Truncated {
            needed,
            actual: bytes.len(),
        });
    }

    let scale = table.get_float("TSCAL1")?.unwrap_or(1.0);
    let zero = table.get_float("TZERO1")?.unwrap_or(0.0);
    let mut values = Vec::with_capacity(rows * repeat);
    for row in 0..rows {
        let start = data_start + row * row_len;
        for cell in bytes[start..start + cell_len].chunks_exact(kind.width()) {
            values.push(kind.decode(cell) * scale + zero);
        }
    }

    let ordering = lookup("ORDERING")
        .map(str::parse::<Ordering>)
        .transpose()?
        .unwrap_or_default();

    let declared = match table.get_int("NSIDE")? {
        Some(n) => Some(n),
        None => primary.get_int("NSIDE")?,
    };
    let nside = match declared {
        Some(n) => healpix::validate_nside(n.max(0) as u64, ordering)?,
        None => healpix::npix2nside(values.len() as u64)?,
    };

    // Only the last row may carry padding past the final pixel
    let npix = healpix::nside2npix(nside);
    let stored = values.len() as u64;
    if stored < npix || stored - npix >= repeat as u64 {
        return Err(MapError::SizeMismatch {
            nside,
            expected: npix,
            actual: stored,
        });
    }
    values.truncate(npix as usize);

    let coordsys = lookup("COORDSYS").and_then(|v| v.parse::<CoordSys>().ok());

    HealpixMap::new(nside, ordering, coordsys, values)
}

fn format_card(keyword: &str, value: &str, comment: &str) -> [u8; CARD_SIZE] {
    let mut text = if value.is_empty() {
        format!("{keyword:<8}")
    } else {
        format!("{keyword:<8}= {value:>20}")
    };
    if !comment.is_empty() {
        text.push_str(" / ");
        text.push_str(comment);
    }
    let mut card = [b' '; CARD_SIZE];
    for (dst, src) in card.iter_mut().zip(text.bytes()) {
        *dst = src;
    }
    card
}

fn string_value(s: &str) -> String {
    // String values start in column 11 and are padded to 8 characters
    format!("{:<20}", format!("'{:<8}'", s.replace('\'', "''")))
}

fn write_header<W: Write>(out: &mut W, cards: &[[u8; CARD_SIZE]]) -> std::io::Result<()> {
    for card in cards {
        out.write_all(card)?;
    }
    out.write_all(&format_card("END", "", ""))?;
    let written = (cards.len() + 1) * CARD_SIZE;
    out.write_all(&vec![b' '; padded(written) - written])
}

/// Write `map` in the chealpix layout: an empty primary HDU and a binary
/// table with one `SIGNAL` float per row.
pub fn write_healpix<W: Write>(out: &mut W, map: &HealpixMap) -> std::io::Result<()> {
    let npix = map.npix();

    write_header(
        out,
        &[
            format_card("SIMPLE", "T", "file does conform to FITS standard"),
            format_card("BITPIX", "8", "number of bits per data pixel"),
            format_card("NAXIS", "0", "number of data axes"),
            format_card("EXTEND", "T", "FITS dataset may contain extensions"),
        ],
    )?;

    let mut cards = vec![
        format_card("XTENSION", &string_value("BINTABLE"), "binary table extension"),
        format_card("BITPIX", "8", "8-bit bytes"),
        format_card("NAXIS", "2", "2-dimensional binary table"),
        format_card("NAXIS1", "4", "width of table in bytes"),
        format_card("NAXIS2", &npix.to_string(), "number of rows in table"),
        format_card("PCOUNT", "0", "size of special data area"),
        format_card("GCOUNT", "1", "one data group"),
        format_card("TFIELDS", "1", "number of fields in each row"),
        format_card("TTYPE1", &string_value("SIGNAL"), "label for field 1"),
        format_card("TFORM1", &string_value("1E"), "data format of field: 4-byte REAL"),
        format_card("PIXTYPE", &string_value("HEALPIX"), "HEALPIX pixelisation"),
        format_card(
            "ORDERING",
            &string_value(map.ordering.as_str()),
            "pixel ordering scheme",
        ),
        format_card("NSIDE", &map.nside.to_string(), "resolution parameter"),
        format_card("FIRSTPIX", "0", "first pixel # (0 based)"),
        format_card("LASTPIX", &(npix - 1).to_string(), "last pixel # (0 based)"),
        format_card("INDXSCHM", &string_value("IMPLICIT"), "indexing: implicit"),
    ];
    if let Some(coordsys) = map.coordsys {
        cards.push(format_card(
            "COORDSYS",
            &string_value(coordsys.as_str()),
            "pixelisation coordinate system",
        ));
    }
    write_header(out, &cards)?;

    for &v in &map.values {
        out.write_all(&(v as f32).to_be_bytes())?;
    }
    let written = map.values.len() * 4;
    out.write_all(&vec![0u8; padded(written) - written])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(text: &str) -> Vec<u8> {
        format!("{text:<80}").into_bytes()
    }

    #[test]
    fn test_parse_card_values() {
        let (k, v) = parse_card(&card("NSIDE   =                   32 / resolution")).unwrap();
        assert_eq!(k, "NSIDE");
        assert_eq!(v, "32");

        let (k, v) = parse_card(&card("ORDERING= 'RING    '           / scheme")).unwrap();
        assert_eq!(k, "ORDERING");
        assert_eq!(v, "RING");

        let (_, v) = parse_card(&card("OBJECT  = 'it''s    '")).unwrap();
        assert_eq!(v, "it's");

        let (k, v) = parse_card(&card("COMMENT just text")).unwrap();
        assert_eq!(k, "COMMENT");
        assert!(v.is_empty());
    }

    #[test]
    fn test_parse_tform() {
        assert_eq!(parse_tform("1E").unwrap(), (1, ColumnType::Float));
        assert_eq!(parse_tform("1024E").unwrap(), (1024, ColumnType::Float));
        assert_eq!(parse_tform("D").unwrap(), (1, ColumnType::Double));
        assert_eq!(parse_tform("1J").unwrap(), (1, ColumnType::Int));
        assert!(parse_tform("1A").is_err());
        assert!(parse_tform("0E").is_err());
        assert!(parse_tform("42").is_err());
    }

    #[test]
    fn test_written_header_is_block_aligned() {
        let map = HealpixMap::new(1, Ordering::Ring, Some(CoordSys::Galactic), vec![1.0; 12])
            .unwrap();
        let mut buf = Vec::new();
        write_healpix(&mut buf, &map).unwrap();

        assert_eq!(buf.len() % BLOCK_SIZE, 0);
        // Primary header, extension header, one data block
        assert_eq!(buf.len(), 3 * BLOCK_SIZE);
        assert!(buf.starts_with(b"SIMPLE  =                    T"));
    }

    #[test]
    fn test_parse_written_map() {
        let values: Vec<f64> = (0..48).map(|i| i as f64).collect();
        let map =
            HealpixMap::new(2, Ordering::Nested, Some(CoordSys::Ecliptic), values.clone()).unwrap();
        let mut buf = Vec::new();
        write_healpix(&mut buf, &map).unwrap();

        let parsed = parse_healpix(&buf).unwrap();
        assert_eq!(parsed.nside, 2);
        assert_eq!(parsed.ordering, Ordering::Nested);
        assert_eq!(parsed.coordsys, Some(CoordSys::Ecliptic));
        assert_eq!(parsed.values, values);
    }

    #[test]
    fn test_rejects_non_fits() {
        let err = parse_healpix(b"hello world").unwrap_err();
        assert!(matches!(err, MapError::NotFits { .. }));
    }

    #[test]
    fn test_missing_table() {
        let mut buf = Vec::new();
        let primary = [
            format_card("SIMPLE", "T", ""),
            format_card("BITPIX", "8", ""),
            format_card("NAXIS", "0", ""),
        ];
        write_header(&mut buf, &primary).unwrap();
        let err = parse_healpix(&buf).unwrap_err();
        assert!(matches!(err, MapError::NoBinaryTable));
    }

    /// Primary HDU plus one table extension with the given cards and data.
    fn table_file(cards: &[[u8; CARD_SIZE]], data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        let primary = [
            format_card("SIMPLE", "T", ""),
            format_card("BITPIX", "8", ""),
            format_card("NAXIS", "0", ""),
        ];
        write_header(&mut buf, &primary).unwrap();
        write_header(&mut buf, cards).unwrap();
        buf.extend_from_slice(data);
        buf.resize(padded(buf.len()), 0);
        buf
    }

    fn float_table(nside: u32, per_row: usize, rows: usize, naxis1: &str) -> Vec<u8> {
        let cards = [
            format_card("XTENSION", &string_value("BINTABLE"), ""),
            format_card("BITPIX", "8", ""),
            format_card("NAXIS", "2", ""),
            format_card("NAXIS1", naxis1, ""),
            format_card("NAXIS2", &rows.to_string(), ""),
            format_card("TFIELDS", "1", ""),
            format_card("TFORM1", &string_value(&format!("{per_row}E")), ""),
            format_card("NSIDE", &nside.to_string(), ""),
        ];
        let data: Vec<u8> = (0..per_row * rows)
            .flat_map(|i| (i as f32).to_be_bytes())
            .collect();
        table_file(&cards, &data)
    }

    #[test]
    fn test_surplus_pixels_are_rejected() {
        // 48 one-pixel rows declared as nside 1 (12 pixels)
        let buf = float_table(1, 1, 48, "4");
        let err = parse_healpix(&buf).unwrap_err();
        assert!(matches!(
            err,
            MapError::SizeMismatch {
                nside: 1,
                expected: 12,
                actual: 48
            }
        ));
    }

    #[test]
    fn test_last_row_padding_is_dropped() {
        // nside 1 in two rows of 8 values: 4 padding values in the last row
        let map = parse_healpix(&float_table(1, 8, 2, "32")).unwrap();
        assert_eq!(map.values.len(), 12);
        assert_eq!(map.values[11], 11.0);

        // A whole spare row is not padding
        let err = parse_healpix(&float_table(1, 8, 3, "32")).unwrap_err();
        assert!(matches!(err, MapError::SizeMismatch { actual: 24, .. }));
    }

    #[test]
    fn test_negative_row_length() {
        let err = parse_healpix(&float_table(1, 1, 12, "-4")).unwrap_err();
        assert!(matches!(
            err,
            MapError::InvalidKeyword { ref keyword, .. } if keyword == "NAXIS1"
        ));
    }

    #[test]
    fn test_oversized_table_does_not_overflow() {
        let cards = [
            format_card("XTENSION", &string_value("BINTABLE"), ""),
            format_card("BITPIX", "8", ""),
            format_card("NAXIS", "2", ""),
            format_card("NAXIS1", &i64::MAX.to_string(), ""),
            format_card("NAXIS2", &i64::MAX.to_string(), ""),
            format_card("TFIELDS", "1", ""),
            format_card("TFORM1", &string_value("1E"), ""),
        ];
        let err = parse_healpix(&table_file(&cards, &[])).unwrap_err();
        assert!(matches!(err, MapError::InvalidKeyword { .. }));
    }

    #[test]
    fn test_negative_axis_in_skipped_extension() {
        let mut buf = Vec::new();
        let primary = [
            format_card("SIMPLE", "T", ""),
            format_card("BITPIX", "8", ""),
            format_card("NAXIS", "1", ""),
            format_card("NAXIS1", "-2880", ""),
        ];
        write_header(&mut buf, &primary).unwrap();
        let err = parse_healpix(&buf).unwrap_err();
        assert!(matches!(err, MapError::InvalidKeyword { .. }));
    }

    #[test]
    fn test_truncated_data() {
        let map = HealpixMap::new(4, Ordering::Ring, None, vec![0.5; 192]).unwrap();
        let mut buf = Vec::new();
        write_healpix(&mut buf, &map).unwrap();
        buf.truncate(2 * BLOCK_SIZE + 100);

        let err = parse_healpix(&buf).unwrap_err();
        assert!(matches!(err, MapError::Truncated { .. }));
    }
}
