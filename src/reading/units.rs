//! Conversion of raw tenths-encoded measurements to physical units.

use crate::error::ParseError;

/// Raw value denoting a measurement that was not recorded.
pub const MISSING_SENTINEL: i32 = -9999;

/// Converts a raw token in tenths of a unit (°C or mm) to the physical unit.
///
/// The sentinel maps to `None`, never to zero.
pub fn normalise_tenths(token: &str) -> Result<Option<f64>, ParseError> {
    let token = token.trim();
    let raw: i32 = token
        .parse()
        .map_err(|_| ParseError::Measurement(token.to_string()))?;

    match raw {
        MISSING_SENTINEL => Ok(None),
        v => Ok(Some(f64::from(v) / 10.0)),
    }
}

// -- Tests ----------------------------------------------------------------------------
