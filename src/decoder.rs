use crate::error::DecodeError;
use crate::types::AccelSample;

const AXIS_FIELDS: usize = 3;

/// Parse a `x,y,z[,...]` reply into a sample.
///
/// Tokens are trimmed before parsing; extra trailing fields are ignored.
/// A line that stops early (or ends in a blank field) is `TooFewFields`; a
/// blank field followed by more fields is `InvalidNumber`.
pub fn decode(line: &str) -> Result<AccelSample, DecodeError> {
    let tokens: Vec<&str> = line.trim().split(',').collect();
    let mut axes = [0.0; AXIS_FIELDS];

    for (index, axis) in axes.iter_mut().enumerate() {
        let token = match tokens.get(index) {
            Some(token) => token.trim(),
            None => return Err(too_few(index)),
        };
        if token.is_empty() && index + 1 == tokens.len() {
            return Err(too_few(index));
        }
        *axis = parse_field(index, token)?;
    }

    Ok(AccelSample::new(axes[0], axes[1], axes[2]))
}

fn too_few(found: usize) -> DecodeError {
    DecodeError::TooFewFields {
        expected: AXIS_FIELDS,
        found,
    }
}

/// Same as [`decode`] for raw bytes read off the wire.
pub fn decode_bytes(raw: &[u8]) -> Result<AccelSample, DecodeError> {
    let line = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
    decode(line)
}

/// Parse field 0 of a status reply (e.g. battery percentage).
pub fn decode_scalar(raw: &[u8]) -> Result<f64, DecodeError> {
    let line = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
    let token = line.trim().split(',').next().unwrap_or("").trim();
    if token.is_empty() {
        return Err(DecodeError::TooFewFields {
            expected: 1,
            found: 0,
        });
    }
    parse_field(0, token)
}

fn parse_field(index: usize, token: &str) -> Result<f64, DecodeError> {
    let token = token.trim();
    let value: f64 = token.parse().map_err(|_| DecodeError::InvalidNumber {
        index,
        token: token.to_string(),
    })?;
    if !value.is_finite() {
        return Err(DecodeError::NonFinite { index });
    }
    Ok(value)
}
