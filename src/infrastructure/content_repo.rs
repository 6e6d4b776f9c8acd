use diesel::prelude::*;
use diesel::upsert::excluded;

use crate::db::DbPool;
use crate::domain::content::{
    Banner, BannerInput, Coupon, CouponInput, Promotion, PromotionInput, SiteSetting,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::ContentRepository;
use crate::schema::{banners, coupons, promotions, site_settings};

use super::models::{
    BannerChangeset, BannerRow, CouponChangeset, CouponRow, NewSiteSettingRow,
    PromotionChangeset, PromotionRow, SiteSettingRow,
};

impl From<BannerRow> for Banner {
    fn from(row: BannerRow) -> Self {
        Banner {
            id: row.id,
            title: row.title,
            image_url: row.image_url,
            link_url: row.link_url,
            position: row.position,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

impl From<BannerInput> for BannerChangeset {
    fn from(input: BannerInput) -> Self {
        BannerChangeset {
            title: input.title,
            image_url: input.image_url,
            link_url: input.link_url,
            position: input.position,
            active: input.active,
        }
    }
}

impl From<PromotionRow> for Promotion {
    fn from(row: PromotionRow) -> Self {
        Promotion {
            id: row.id,
            title: row.title,
            description: row.description,
            discount_percent: row.discount_percent,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

impl From<PromotionInput> for PromotionChangeset {
    fn from(input: PromotionInput) -> Self {
        PromotionChangeset {
            title: input.title,
            description: input.description,
            discount_percent: input.discount_percent,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            active: input.active,
        }
    }
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            id: row.id,
            code: row.code,
            discount_percent: row.discount_percent,
            active: row.active,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

impl From<CouponInput> for CouponChangeset {
    fn from(input: CouponInput) -> Self {
        CouponChangeset {
            code: Coupon::normalize_code(&input.code),
            discount_percent: input.discount_percent,
            active: input.active,
            expires_at: input.expires_at,
        }
    }
}

impl From<SiteSettingRow> for SiteSetting {
    fn from(row: SiteSettingRow) -> Self {
        SiteSetting {
            key: row.key,
            value: row.value,
            updated_at: row.updated_at,
        }
    }
}

pub struct DieselContentRepository {
    pool: DbPool,
}

impl DieselContentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ContentRepository for DieselContentRepository {
    // ── Banners ──────────────────────────────────────────────────────────────

    fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = banners::table.select(BannerRow::as_select()).into_boxed();
        if active_only {
            query = query.filter(banners::active.eq(true));
        }
        let rows = query
            .order((banners::position.asc(), banners::id.asc()))
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Banner::from).collect())
    }

    fn create_banner(&self, input: BannerInput) -> Result<Banner, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(banners::table)
            .values(&BannerChangeset::from(input))
            .returning(BannerRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_banner(&self, id: i32, input: BannerInput) -> Result<Option<Banner>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(banners::table.find(id))
            .set(&BannerChangeset::from(input))
            .returning(BannerRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(Banner::from))
    }

    fn delete_banner(&self, id: i32) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(diesel::delete(banners::table.find(id)).execute(&mut conn)? > 0)
    }

    // ── Promotions ───────────────────────────────────────────────────────────

    fn list_promotions(&self) -> Result<Vec<Promotion>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = promotions::table
            .select(PromotionRow::as_select())
            .order(promotions::id.desc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Promotion::from).collect())
    }

    fn create_promotion(&self, input: PromotionInput) -> Result<Promotion, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(promotions::table)
            .values(&PromotionChangeset::from(input))
            .returning(PromotionRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_promotion(
        &self,
        id: i32,
        input: PromotionInput,
    ) -> Result<Option<Promotion>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(promotions::table.find(id))
            .set(&PromotionChangeset::from(input))
            .returning(PromotionRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(Promotion::from))
    }

    fn delete_promotion(&self, id: i32) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(diesel::delete(promotions::table.find(id)).execute(&mut conn)? > 0)
    }

    // ── Coupons ──────────────────────────────────────────────────────────────

    fn list_coupons(&self) -> Result<Vec<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = coupons::table
            .select(CouponRow::as_select())
            .order(coupons::code.asc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Coupon::from).collect())
    }

    fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = coupons::table
            .filter(coupons::code.eq(Coupon::normalize_code(code)))
            .select(CouponRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Coupon::from))
    }

    fn create_coupon(&self, input: CouponInput) -> Result<Coupon, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(coupons::table)
            .values(&CouponChangeset::from(input))
            .returning(CouponRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_coupon(&self, id: i32, input: CouponInput) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(coupons::table.find(id))
            .set(&CouponChangeset::from(input))
            .returning(CouponRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(Coupon::from))
    }

    fn delete_coupon(&self, id: i32) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(diesel::delete(coupons::table.find(id)).execute(&mut conn)? > 0)
    }

    // ── Site settings ────────────────────────────────────────────────────────

    fn list_settings(&self) -> Result<Vec<SiteSetting>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = site_settings::table
            .select(SiteSettingRow::as_select())
            .order(site_settings::key.asc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(SiteSetting::from).collect())
    }

    fn upsert_setting(&self, key: &str, value: &str) -> Result<SiteSetting, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(site_settings::table)
            .values(&NewSiteSettingRow { key, value })
            .on_conflict(site_settings::key)
            .do_update()
            .set((
                site_settings::value.eq(excluded(site_settings::value)),
                site_settings::updated_at.eq(diesel::dsl::now),
            ))
            .returning(SiteSettingRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn delete_setting(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(site_settings::table.filter(site_settings::key.eq(key)))
            .execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
