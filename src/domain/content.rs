//! Back-office managed store content: banners, promotions, coupons and
//! free-form site settings.

use chrono::{DateTime, Utc};

use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub id: i32,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BannerInput {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub active: bool,
}

impl BannerInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::missing_field("title"));
        }
        if self.image_url.trim().is_empty() {
            return Err(DomainError::missing_field("image_url"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Promotion {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub discount_percent: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.starts_at.map_or(true, |start| start <= now)
            && self.ends_at.map_or(true, |end| now < end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromotionInput {
    pub title: String,
    pub description: String,
    pub discount_percent: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl PromotionInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::missing_field("title"));
        }
        validate_percent(self.discount_percent)?;
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            if end <= start {
                return Err(DomainError::InvalidInput(
                    "ends_at must be after starts_at".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub discount_percent: i32,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Codes are stored upper-cased so lookups ignore case.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map_or(true, |expiry| now < expiry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CouponInput {
    pub code: String,
    pub discount_percent: i32,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CouponInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.code.trim().is_empty() {
            return Err(DomainError::missing_field("code"));
        }
        if self.code.trim().chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidInput(
                "code must not contain spaces".to_string(),
            ));
        }
        validate_percent(self.discount_percent)
    }

    pub fn normalized(self) -> Self {
        Self {
            code: Coupon::normalize_code(&self.code),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

pub fn validate_setting_key(key: &str) -> Result<(), DomainError> {
    if key.trim().is_empty() {
        return Err(DomainError::missing_field("key"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(DomainError::InvalidInput(format!(
            "setting key '{key}' may only contain letters, digits, '_' and '.'"
        )));
    }
    Ok(())
}

fn validate_percent(percent: i32) -> Result<(), DomainError> {
    if (1..=100).contains(&percent) {
        Ok(())
    } else {
        Err(DomainError::InvalidInput(
            "discount_percent must be between 1 and 100".to_string(),
        ))
    }
}
