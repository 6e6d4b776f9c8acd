use std::sync::Arc;

use crate::domain::content::{
    validate_setting_key, Banner, BannerInput, Coupon, CouponInput, Promotion, PromotionInput,
    SiteSetting,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{Clock, ContentRepository};

/// Banners, promotions, coupons and site settings.
#[derive(Clone)]
pub struct ContentService {
    content: Arc<dyn ContentRepository>,
    clock: Arc<dyn Clock>,
}

impl ContentService {
    pub fn new(content: Arc<dyn ContentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { content, clock }
    }

    // ── Banners ──────────────────────────────────────────────────────

    pub fn active_banners(&self) -> Result<Vec<Banner>, DomainError> {
        self.content.list_banners(true)
    }

    pub fn all_banners(&self) -> Result<Vec<Banner>, DomainError> {
        self.content.list_banners(false)
    }

    pub fn create_banner(&self, input: BannerInput) -> Result<Banner, DomainError> {
        input.validate()?;
        let banner = self.content.create_banner(input)?;
        log::info!("Created banner {}", banner.id);
        Ok(banner)
    }

    pub fn update_banner(&self, id: i32, input: BannerInput) -> Result<Banner, DomainError> {
        input.validate()?;
        self.content
            .update_banner(id, input)?
            .ok_or(DomainError::NotFound)
    }

    pub fn delete_banner(&self, id: i32) -> Result<(), DomainError> {
        found(self.content.delete_banner(id)?)
    }

    // ── Promotions ───────────────────────────────────────────────────

    /// Active promotions whose window contains the current instant.
    pub fn running_promotions(&self) -> Result<Vec<Promotion>, DomainError> {
        let now = self.clock.now();
        Ok(self
            .content
            .list_promotions()?
            .into_iter()
            .filter(|p| p.is_running(now))
            .collect())
    }

    pub fn all_promotions(&self) -> Result<Vec<Promotion>, DomainError> {
        self.content.list_promotions()
    }

    pub fn create_promotion(&self, input: PromotionInput) -> Result<Promotion, DomainError> {
        input.validate()?;
        let promotion = self.content.create_promotion(input)?;
        log::info!("Created promotion {}", promotion.id);
        Ok(promotion)
    }

    pub fn update_promotion(
        &self,
        id: i32,
        input: PromotionInput,
    ) -> Result<Promotion, DomainError> {
        input.validate()?;
        self.content
            .update_promotion(id, input)?
            .ok_or(DomainError::NotFound)
    }

    pub fn delete_promotion(&self, id: i32) -> Result<(), DomainError> {
        found(self.content.delete_promotion(id)?)
    }

    // ── Coupons ──────────────────────────────────────────────────────

    pub fn all_coupons(&self) -> Result<Vec<Coupon>, DomainError> {
        self.content.list_coupons()
    }

    /// The coupon for `code` if it can be applied right now.
    pub fn redeemable_coupon(&self, code: &str) -> Result<Coupon, DomainError> {
        let coupon = self
            .content
            .find_coupon_by_code(&Coupon::normalize_code(code))?
            .ok_or(DomainError::NotFound)?;
        if !coupon.is_redeemable(self.clock.now()) {
            return Err(DomainError::InvalidInput(format!(
                "coupon {} is inactive or expired",
                coupon.code
            )));
        }
        Ok(coupon)
    }

    pub fn create_coupon(&self, input: CouponInput) -> Result<Coupon, DomainError> {
        input.validate()?;
        let coupon = self.content.create_coupon(input.normalized())?;
        log::info!("Created coupon {}", coupon.code);
        Ok(coupon)
    }

    pub fn update_coupon(&self, id: i32, input: CouponInput) -> Result<Coupon, DomainError> {
        input.validate()?;
        self.content
            .update_coupon(id, input.normalized())?
            .ok_or(DomainError::NotFound)
    }

    pub fn delete_coupon(&self, id: i32) -> Result<(), DomainError> {
        found(self.content.delete_coupon(id)?)
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn settings(&self) -> Result<Vec<SiteSetting>, DomainError> {
        self.content.list_settings()
    }

    pub fn put_setting(&self, key: &str, value: &str) -> Result<SiteSetting, DomainError> {
        validate_setting_key(key)?;
        self.content.upsert_setting(key, value)
    }

    pub fn delete_setting(&self, key: &str) -> Result<(), DomainError> {
        found(self.content.delete_setting(key)?)
    }
}

fn found(deleted: bool) -> Result<(), DomainError> {
    if deleted {
        Ok(())
    } else {
        Err(DomainError::NotFound)
    }
}
