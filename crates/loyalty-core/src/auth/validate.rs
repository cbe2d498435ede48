//! Local input checks run before any network call.

use std::sync::OnceLock;

use regex::Regex;

use super::errors::ValidationError;

/// Minimum number of digits in a phone number (country code included).
pub const MIN_PHONE_DIGITS: usize = 8;
/// Exact length of an OTP code.
pub const OTP_LENGTH: usize = 6;

/// Strips everything but ASCII digits. `+60 12-345 6789` becomes `60123456789`.
pub fn normalize_phone(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Returns the normalized digits if the phone number is long enough.
///
/// # Errors
/// `ValidationError::PhoneTooShort` when fewer than [`MIN_PHONE_DIGITS`] digits remain.
pub fn validate_phone(input: &str) -> Result<String, ValidationError> {
    let digits = normalize_phone(input);
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ValidationError::PhoneTooShort);
    }
    Ok(digits)
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

/// Returns the trimmed email if it looks like `local@domain.tld`.
///
/// # Errors
/// `ValidationError::InvalidEmail` otherwise.
pub fn validate_email(input: &str) -> Result<String, ValidationError> {
    let email = input.trim();
    if email_pattern().is_match(email) {
        Ok(email.to_string())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Returns the trimmed code if it is exactly six ASCII digits.
///
/// # Errors
/// `ValidationError::InvalidOtp` otherwise.
pub fn validate_otp(input: &str) -> Result<String, ValidationError> {
    let code = input.trim();
    if code.len() == OTP_LENGTH && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(code.to_string())
    } else {
        Err(ValidationError::InvalidOtp)
    }
}
