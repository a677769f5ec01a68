//! Line frame decoder
//!
//! The device sends one reading per line: four comma-separated numeric
//! fields, no header, no checksum.
//!
//! ```text
//! 23.45,24.10,22.98,25.00\n
//! ```
//!
//! [`decode`] is a total function from text to a result; it never panics.
//! It does not stamp the reading with a time, since the payload carries no
//! timestamp. The caller assigns one from the session clock.

use crate::types::{Sample, CHANNEL_COUNT};
use thiserror::Error;

/// Field separator on the wire
pub const FIELD_DELIMITER: char = ',';

/// Why a line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty line")]
    Empty,

    #[error("expected {} fields, found {found}", CHANNEL_COUNT)]
    FieldCount { found: usize },

    #[error("field {index} is not a number: {field:?}")]
    NotNumeric { index: usize, field: String },

    #[error("field {index} is not finite")]
    NotFinite { index: usize },
}

/// Decode one raw line into channel values in wire order
pub fn decode(line: &str) -> Result<[f64; CHANNEL_COUNT], DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }

    let found = line.split(FIELD_DELIMITER).count();
    if found != CHANNEL_COUNT {
        return Err(DecodeError::FieldCount { found });
    }

    let mut values = [0.0; CHANNEL_COUNT];
    for (index, field) in line.split(FIELD_DELIMITER).enumerate() {
        let field = field.trim();
        let value: f64 = field.parse().map_err(|_| DecodeError::NotNumeric {
            index,
            field: field.to_string(),
        })?;
        if !value.is_finite() {
            return Err(DecodeError::NotFinite { index });
        }
        values[index] = value;
    }

    Ok(values)
}

impl Sample {
    /// Decode a line and stamp it with `elapsed_seconds`
    pub fn decode(line: &str, elapsed_seconds: f64) -> Result<Self, DecodeError> {
        decode(line).map(|values| Sample::new(elapsed_seconds, values))
    }
}
