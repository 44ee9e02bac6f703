//! Stream filter decoding.
//!
//! Form templates keep appearance streams, object streams and cross-reference streams compressed.
//! Only the filters that occur in these places are supported: `FlateDecode` (with PNG and TIFF
//! predictors) and `ASCIIHexDecode`. Anything else yields [`crate::Error::UnsupportedFilter`].

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::{
    pdf::{Dictionary, Name},
    Error::{Decode, UnsupportedFilter},
    Result,
};

/// Apply a single decode filter to `data`.
///
/// # Arguments
///
/// * `filter` - The filter name, e.g. `/FlateDecode`
/// * `data` - The encoded bytes
/// * `params` - The matching `/DecodeParms` dictionary, if any
///
/// # Errors
///
/// Returns [`crate::Error::UnsupportedFilter`] for unknown filters and
/// [`crate::Error::Decode`] if the data is corrupt.
pub fn apply(filter: &Name, data: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    match filter.as_bytes() {
        b"FlateDecode" | b"Fl" => {
            let inflated = inflate(data)?;
            predict(inflated, params)
        }
        b"ASCIIHexDecode" | b"AHx" => ascii_hex(data),
        other => Err(UnsupportedFilter(String::from_utf8_lossy(other).into_owned())),
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();

    match decoder.read_to_end(&mut decompressed) {
        Ok(_) => Ok(decompressed),
        // Truncated or padded streams still yield their complete prefix
        Err(_) if !decompressed.is_empty() => Ok(decompressed),
        Err(error) => Err(Decode(error.to_string())),
    }
}

fn ascii_hex(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;

    for &byte in data {
        if byte == b'>' {
            break;
        }
        if crate::file::parser::is_whitespace(byte) {
            continue;
        }
        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => return Err(Decode(format!("invalid hex digit 0x{byte:02X}"))),
        };
        match pending.take() {
            Some(high) => out.push(high << 4 | nibble),
            None => pending = Some(nibble),
        }
    }

    if let Some(high) = pending {
        out.push(high << 4);
    }
    Ok(out)
}

fn param(params: Option<&Dictionary>, key: &str, default: usize) -> usize {
    params
        .and_then(|dict| dict.get(key))
        .and_then(|value| value.as_i64())
        .and_then(|value| usize::try_from(value).ok())
        .unwrap_or(default)
}

fn predict(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let predictor = param(params, "Predictor", 1);
    if predictor < 2 {
        return Ok(data);
    }

    let colors = param(params, "Colors", 1).max(1);
    let bits = param(params, "BitsPerComponent", 8).max(1);
    let columns = param(params, "Columns", 1).max(1);

    let bits_per_pixel = colors * bits;
    let bytes_per_pixel = bits_per_pixel.div_ceil(8).max(1);
    let row_len = (bits_per_pixel * columns).div_ceil(8);

    if predictor == 2 {
        return tiff(data, bits, bytes_per_pixel, row_len);
    }
    png(&data, bytes_per_pixel, row_len)
}

fn tiff(mut data: Vec<u8>, bits: usize, bpp: usize, row_len: usize) -> Result<Vec<u8>> {
    if bits != 8 {
        return Err(Decode(format!(
            "TIFF predictor with {bits} bits per component"
        )));
    }
    for row in data.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(data)
}

fn png(data: &[u8], bpp: usize, row_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut previous = vec![0_u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&kind, encoded) = chunk
            .split_first()
            .ok_or_else(|| Decode("empty predictor row".to_string()))?;
        let mut row = vec![0_u8; row_len];
        row[..encoded.len()].copy_from_slice(encoded);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            row[i] = match kind {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => return Err(Decode(format!("unknown PNG row filter {other}"))),
            };
        }

        out.extend_from_slice(&row[..encoded.len()]);
        previous = row;
    }

    Ok(out)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let estimate = i16::from(left) + i16::from(up) - i16::from(up_left);
    let to_left = (estimate - i16::from(left)).abs();
    let to_up = (estimate - i16::from(up)).abs();
    let to_up_left = (estimate - i16::from(up_left)).abs();
    if to_left <= to_up && to_left <= to_up_left {
        left
    } else if to_up <= to_up_left {
        up
    } else {
        up_left
    }
}
