//! Field-level request validation helpers. Each rule returns the first
//! violation as a 400 with a per-field message, mirroring the form schemas the
//! web client enforces before submission.

use crate::error::{AppError, AppResult};

pub fn required_text(field: &str, value: &str, max_len: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn optional_text(field: &str, value: Option<&str>, max_len: usize) -> AppResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.chars().count() > max_len {
                return Err(AppError::bad_request(format!(
                    "{field} must be at most {max_len} characters"
                )));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

pub fn email(field: &str, value: &str) -> AppResult<String> {
    let trimmed = required_text(field, value, 255)?;
    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AppError::bad_request(format!(
            "{field} must be a valid email address"
        )));
    }
    Ok(trimmed)
}

pub fn state_code(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.len() != 2 || !trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(AppError::bad_request(format!(
            "{field} must be a two-letter state code"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub fn non_negative_amount(field: &str, value: f64, max: f64) -> AppResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::bad_request(format!(
            "{field} must be a non-negative amount"
        )));
    }
    if value > max {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {max}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_bounds() {
        assert_eq!(required_text("name", "  Acme  ", 255).unwrap(), "Acme");
        assert!(required_text("name", "   ", 255).is_err());
        assert!(required_text("name", "abcd", 3).is_err());
    }

    #[test]
    fn optional_text_treats_blank_as_absent() {
        assert_eq!(optional_text("city", Some("  "), 100).unwrap(), None);
        assert_eq!(
            optional_text("city", Some("Austin"), 100).unwrap().as_deref(),
            Some("Austin")
        );
        assert_eq!(optional_text("city", None, 100).unwrap(), None);
    }

    #[test]
    fn email_requires_local_and_domain() {
        assert!(email("contact_email", "ops@example.com").is_ok());
        assert!(email("contact_email", "ops@").is_err());
        assert!(email("contact_email", "@example.com").is_err());
        assert!(email("contact_email", "ops@localhost").is_err());
    }

    #[test]
    fn state_code_normalizes_case() {
        assert_eq!(state_code("state", "tx").unwrap(), "TX");
        assert!(state_code("state", "Tex").is_err());
        assert!(state_code("state", "7X").is_err());
    }

    #[test]
    fn amount_bounds() {
        assert!(non_negative_amount("cost", -0.01, 1e12).is_err());
        assert!(non_negative_amount("cost", f64::NAN, 1e12).is_err());
        assert_eq!(non_negative_amount("cost", 1e12, 1e12).unwrap(), 1e12);
        assert!(non_negative_amount("cost", 1e12 + 1.0, 1e12).is_err());
    }
}
