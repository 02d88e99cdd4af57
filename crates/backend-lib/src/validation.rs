// ============================
// crates/backend-lib/src/validation.rs
// ============================
//! Input validation for journey codes and destinations.

use crate::error::AppError;
use convoy_common::GeoPoint;

const MIN_CODE_LENGTH: usize = 4;
const MAX_CODE_LENGTH: usize = 12;

/// Normalize and validate a journey code as received from a client.
/// Codes are case-insensitive on input, stored uppercase.
pub fn normalize_code(code: &str) -> Result<String, AppError> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() < MIN_CODE_LENGTH || code.len() > MAX_CODE_LENGTH {
        return Err(AppError::Validation(format!(
            "journey code must be {MIN_CODE_LENGTH}-{MAX_CODE_LENGTH} characters"
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(AppError::Validation(
            "journey code must be alphanumeric".to_string(),
        ));
    }
    Ok(code)
}

/// Validate a destination point: finite coordinates within WGS84 bounds.
pub fn validate_destination(point: &GeoPoint) -> Result<(), AppError> {
    let [lng, lat] = point.coordinates;
    if !lng.is_finite() || !lat.is_finite() {
        return Err(AppError::Validation(
            "destination coordinates must be finite numbers".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::Validation(format!(
            "longitude {lng} out of range"
        )));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::Validation(format!("latitude {lat} out of range")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" abc123 ").unwrap(), "ABC123");
        assert_eq!(normalize_code("XY42QP").unwrap(), "XY42QP");
        assert!(normalize_code("ab").is_err());
        assert!(normalize_code("THIRTEENCHARS").is_err());
        assert!(normalize_code("AB-123").is_err());
        assert!(normalize_code("").is_err());
    }

    #[test]
    fn test_validate_destination() {
        assert!(validate_destination(&GeoPoint::new(72.8777, 19.0760)).is_ok());
        assert!(validate_destination(&GeoPoint::new(f64::NAN, 19.0)).is_err());
        assert!(validate_destination(&GeoPoint::new(181.0, 19.0)).is_err());
        assert!(validate_destination(&GeoPoint::new(72.0, -91.0)).is_err());
    }
}
