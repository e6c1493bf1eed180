//! Validation utilities shared by profile and threshold configuration

use bigdecimal::BigDecimal;

/// Validate that a bank code is usable as a registry key
pub fn validate_bank_code(code: &str) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("bank code cannot be empty".to_string());
    }

    if code.len() > 16 {
        return Err("bank code cannot exceed 16 characters".to_string());
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(
            "bank code can only contain ASCII alphanumeric characters and dashes".to_string(),
        );
    }

    Ok(())
}

/// Validate that a nisbah rate is a sensible annual fraction
pub fn validate_rate_fraction(rate: &BigDecimal) -> Result<(), String> {
    if *rate <= BigDecimal::from(0) {
        return Err(format!("rate must be positive, got {}", rate));
    }

    // Rates arrive as fractions; anything at or above 1 is almost certainly
    // a percentage that was not divided by 100.
    if *rate >= BigDecimal::from(1) {
        return Err(format!("rate must be a fraction below 1, got {}", rate));
    }

    Ok(())
}

/// Validate the day-count basis
pub fn validate_year_days(days: u32) -> Result<(), String> {
    match days {
        360 | 365 => Ok(()),
        other => Err(format!("year_days must be 360 or 365, got {}", other)),
    }
}

/// Validate that a date format pattern is present
pub fn validate_date_format(format: &str) -> Result<(), String> {
    if format.trim().is_empty() {
        return Err("date format cannot be empty".to_string());
    }

    if !format.contains('%') {
        return Err(format!(
            "date format '{}' has no chrono format specifiers",
            format
        ));
    }

    Ok(())
}
