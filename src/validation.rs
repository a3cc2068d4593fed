// Validation utilities module
// Provides custom validation functions for domain-specific rules.
// Format rules that appear on several fields (time-of-day, postal code)
// live here once so entity definitions cannot drift apart.

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// 24-hour HH:mm, 00:00 through 23:59
fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid time regex"))
}

/// Validates a 24-hour HH:mm time-of-day string
pub fn validate_time_of_day(value: &str) -> Result<(), ValidationError> {
    if time_regex().is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_time_format"))
    }
}

/// Validates a Belgian postal code (four digits)
pub fn validate_postal_code(value: &str) -> Result<(), ValidationError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\d{4}$").expect("valid postal code regex"));
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_postal_code"))
    }
}

/// Validates a license plate: 1-8 uppercase letters or digits
pub fn validate_license_plate(value: &str) -> Result<(), ValidationError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[A-Z0-9]{1,8}$").expect("valid plate regex"));
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_license_plate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_times() {
        for t in ["00:00", "09:30", "10:00", "19:59", "20:00", "23:59"] {
            assert!(validate_time_of_day(t).is_ok(), "{} should be valid", t);
        }
    }

    #[test]
    fn rejects_invalid_times() {
        for t in ["24:00", "9:30", "10:60", "1000", "10:0", "ab:cd", "", "10:00:00"] {
            assert!(validate_time_of_day(t).is_err(), "{} should be invalid", t);
        }
    }

    #[test]
    fn postal_code_must_be_four_digits() {
        assert!(validate_postal_code("1000").is_ok());
        assert!(validate_postal_code("9999").is_ok());
        assert!(validate_postal_code("100").is_err());
        assert!(validate_postal_code("10000").is_err());
        assert!(validate_postal_code("1O00").is_err());
    }

    #[test]
    fn license_plate_format() {
        assert!(validate_license_plate("1ABC123").is_ok());
        assert!(validate_license_plate("X").is_ok());
        assert!(validate_license_plate("").is_err());
        assert!(validate_license_plate("toolong123").is_err());
        assert!(validate_license_plate("abc-123").is_err());
    }
}
