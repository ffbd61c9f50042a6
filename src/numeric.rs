//! Conversions between the remote model's 32-bit floats and the
//! configuration layer's 64-bit decimals.
//!
//! Widening or narrowing a binary float with `as` keeps the exact bit
//! pattern, so `3.14_f32 as f64` is `3.140000104904175`. A user who wrote
//! `3.14` would then see a spurious diff after every read. Both directions go
//! through the shortest decimal text of the source value instead, which makes
//! repeated reads idempotent.

use crate::error::MappingError;

/// Widen a remote `f32` into the configuration layer's `f64`.
pub fn widen_f32(value: f32) -> f64 {
    // Rust prints the shortest text that round-trips the f32, which is always
    // a valid f64 literal.
    value.to_string().parse().unwrap_or(f64::NAN)
}

/// Narrow a configuration `f64` into the remote model's `f32`.
///
/// Fails with [`MappingError::Encoding`] when the value is not finite, does
/// not fit in an `f32`, or is a nonzero value that would round to zero.
pub fn narrow_f64(value: f64, path: &str) -> Result<f32, MappingError> {
    if !value.is_finite() {
        return Err(MappingError::encoding(
            path,
            format!("{} is not a finite number", value),
        ));
    }
    let narrowed: f32 = value
        .to_string()
        .parse()
        .map_err(|e| MappingError::encoding(path, e))?;
    if !narrowed.is_finite() {
        return Err(MappingError::encoding(
            path,
            format!("{} is out of range for a 32-bit float", value),
        ));
    }
    if narrowed == 0.0 && value != 0.0 {
        return Err(MappingError::encoding(
            path,
            format!("{} underflows a 32-bit float", value),
        ));
    }
    Ok(narrowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen_uses_decimal_text() {
        let widened = widen_f32(3.14);
        assert_eq!(widened, 3.14_f64);
        assert_ne!(widened, 3.14_f32 as f64);
    }

    #[test]
    fn test_text_round_trip() {
        for text in ["3.14", "0.1", "50", "99.99", "-2.5", "0"] {
            let entered: f64 = text.parse().unwrap();
            let wire = narrow_f64(entered, "percent").unwrap();
            let back = widen_f32(wire);
            assert_eq!(back.to_string(), entered.to_string(), "for {}", text);
        }
    }

    #[test]
    fn test_repeated_widening_is_idempotent() {
        let first = widen_f32(0.3);
        let second = widen_f32(narrow_f64(first, "v").unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_narrow_rejects_non_finite() {
        let err = narrow_f64(f64::INFINITY, "rules.0.version").unwrap_err();
        assert_eq!(err.path(), "rules.0.version");
        assert!(narrow_f64(f64::NAN, "v").is_err());
    }

    #[test]
    fn test_narrow_rejects_overflow() {
        let err = narrow_f64(1e300, "percent").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_narrow_rejects_underflow() {
        let err = narrow_f64(1e-50, "actions.0.percent").unwrap_err();
        assert_eq!(err.path(), "actions.0.percent");
        assert!(err.to_string().contains("underflows"));
        assert!(narrow_f64(-1e-50, "v").is_err());

        assert_eq!(narrow_f64(0.0, "v").unwrap(), 0.0);
        assert_eq!(narrow_f64(-0.0, "v").unwrap(), 0.0);
        assert!(narrow_f64(1e-40, "v").unwrap() > 0.0);
    }
}
