use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};

use super::errors::DomainError;

/// Rounds to cents, half away from zero.
pub fn round_money(value: BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// `amount` reduced by `percent` percent, rounded to cents.
pub fn percent_off(amount: &BigDecimal, percent: i32) -> BigDecimal {
    let factor = BigDecimal::from(100 - percent.clamp(0, 100)) / BigDecimal::from(100);
    round_money(amount * factor)
}

/// Parses a decimal sent as a string, e.g. "9.99".
pub fn parse_money(field: &str, raw: &str) -> Result<BigDecimal, DomainError> {
    let value = BigDecimal::from_str(raw.trim())
        .map_err(|e| DomainError::InvalidInput(format!("Invalid {field} '{raw}': {e}")))?;
    if value < BigDecimal::zero() {
        return Err(DomainError::InvalidInput(format!(
            "{field} must not be negative"
        )));
    }
    Ok(round_money(value))
}
