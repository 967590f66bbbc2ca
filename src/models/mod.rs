//! Data models for the bus-ticketing backend entities

mod billing;
mod bus;
mod chat;
mod trip;
mod user;

pub use billing::*;
pub use bus::*;
pub use chat::*;
pub use trip::*;
pub use user::*;

use chrono::DateTime;

/// Render an RFC 3339 timestamp as `dd/mm/yyyy HH:MM` in its own offset.
/// Anything unparseable is shown as-is.
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%d/%m/%Y %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Render a VND amount with dot thousands separators, e.g. `150.000 đ`.
pub fn format_price(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if whole < 0 { "-" } else { "" };
    format!("{}{} đ", sign, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2026-10-19T07:30:00+07:00"), "19/10/2026 07:30");
        assert_eq!(format_timestamp("tomorrow"), "tomorrow");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(150000.0), "150.000 đ");
        assert_eq!(format_price(999.0), "999 đ");
        assert_eq!(format_price(1234567.4), "1.234.567 đ");
        assert_eq!(format_price(-5000.0), "-5.000 đ");
    }
}
