//! Encoded polyline decoding (signed deltas, 5 decimal places).

use crate::entities::Coordinates;

const PRECISION: f64 = 1e5;

// every chunk carries 5 bits, values never exceed 32 bits
const MAX_SHIFT: u32 = 30;

/// Decodes an encoded polyline. Corrupt input decodes to an empty path.
pub fn decode(encoded: &str) -> Vec<Coordinates> {
    match try_decode(encoded.as_bytes()) {
        Some(points) => points,
        None => {
            tracing::warn!("discarding corrupt polyline of {} bytes", encoded.len());
            vec![]
        }
    }
}

fn try_decode(bytes: &[u8]) -> Option<Vec<Coordinates>> {
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = vec![];

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;

        points.push(Coordinates {
            lat: lat as f64 / PRECISION,
            lng: lng as f64 / PRECISION,
        });
    }

    Some(points)
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes.get(*index)?;
        *index += 1;

        if !(63..=126).contains(&byte) || shift > MAX_SHIFT {
            return None;
        }

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    if result & 1 != 0 {
        Some(!(result >> 1))
    } else {
        Some(result >> 1)
    }
}

#[test]
fn decode_reference_polyline() {
    let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@");

    assert_eq!(
        points,
        vec![
            Coordinates {
                lat: 38.5,
                lng: -120.2
            },
            Coordinates {
                lat: 40.7,
                lng: -120.95
            },
            Coordinates {
                lat: 43.252,
                lng: -126.453
            },
        ]
    );
}

#[test]
fn decode_empty_polyline() {
    assert!(decode("").is_empty());
}

#[test]
fn corrupt_polylines_decode_to_nothing() {
    // latitude without a longitude
    assert!(decode("_p~iF").is_empty());
    // chunk cut off before its final byte
    assert!(decode("_p~iF~ps|").is_empty());
    // byte outside the encoding alphabet
    assert!(decode("_p~iF ~ps|U").is_empty());
    // continuation bytes that never end
    assert!(decode("~~~~~~~~~~~~~~~~").is_empty());
}
