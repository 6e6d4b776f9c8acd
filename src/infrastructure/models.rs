use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{
    banners, coupons, order_lines, order_outbox, orders, products, promotions, site_settings,
};

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub product_type: String,
    pub metal: String,
    pub stone: Option<String>,
    pub discount_percent: Option<i32>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = products)]
#[diesel(treat_none_as_null = true)]
pub struct ProductChangeset {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub product_type: String,
    pub metal: String,
    pub stone: Option<String>,
    pub discount_percent: Option<i32>,
    pub image_urls: Vec<String>,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub status: String,
    pub total: BigDecimal,
    pub payment_method: String,
    pub payment_id: Option<String>,
    pub coupon_code: Option<String>,
    pub customer: Value,
    pub shipping_address: Value,
    pub shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub status: String,
    pub total: BigDecimal,
    pub payment_method: String,
    pub payment_id: Option<String>,
    pub coupon_code: Option<String>,
    pub customer: Value,
    pub shipping_address: Value,
    pub shipped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

// ── Store content ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = banners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BannerRow {
    pub id: i32,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = banners)]
#[diesel(treat_none_as_null = true)]
pub struct BannerChangeset {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = promotions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PromotionRow {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub discount_percent: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = promotions)]
#[diesel(treat_none_as_null = true)]
pub struct PromotionChangeset {
    pub title: String,
    pub description: String,
    pub discount_percent: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CouponRow {
    pub id: i32,
    pub code: String,
    pub discount_percent: i32,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = coupons)]
#[diesel(treat_none_as_null = true)]
pub struct CouponChangeset {
    pub code: String,
    pub discount_percent: i32,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = site_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SiteSettingRow {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = site_settings)]
pub struct NewSiteSettingRow<'a> {
    pub key: &'a str,
    pub value: &'a str,
}
