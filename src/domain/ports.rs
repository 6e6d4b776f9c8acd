use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::{Product, ProductInput, ProductQuery};
use super::content::{
    Banner, BannerInput, Coupon, CouponInput, Promotion, PromotionInput, SiteSetting,
};
use super::errors::DomainError;
use super::order::{ListResult, NewOrder, Order, StatusChange};
use super::payment::{PaymentReceipt, PaymentRequest, PaymentStatus};

pub trait ProductRepository: Send + Sync + 'static {
    fn list(&self, query: &ProductQuery) -> Result<Vec<Product>, DomainError>;
    fn find_by_id(&self, id: i32) -> Result<Option<Product>, DomainError>;
    fn find_many(&self, ids: &[i32]) -> Result<Vec<Product>, DomainError>;
    fn create(&self, input: ProductInput) -> Result<Product, DomainError>;
    fn update(&self, id: i32, input: ProductInput) -> Result<Option<Product>, DomainError>;
    fn delete(&self, id: i32) -> Result<bool, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    fn update_status(&self, change: &StatusChange) -> Result<(), DomainError>;
}

pub trait ContentRepository: Send + Sync + 'static {
    fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>, DomainError>;
    fn create_banner(&self, input: BannerInput) -> Result<Banner, DomainError>;
    fn update_banner(&self, id: i32, input: BannerInput) -> Result<Option<Banner>, DomainError>;
    fn delete_banner(&self, id: i32) -> Result<bool, DomainError>;

    fn list_promotions(&self) -> Result<Vec<Promotion>, DomainError>;
    fn create_promotion(&self, input: PromotionInput) -> Result<Promotion, DomainError>;
    fn update_promotion(
        &self,
        id: i32,
        input: PromotionInput,
    ) -> Result<Option<Promotion>, DomainError>;
    fn delete_promotion(&self, id: i32) -> Result<bool, DomainError>;

    fn list_coupons(&self) -> Result<Vec<Coupon>, DomainError>;
    fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError>;
    fn create_coupon(&self, input: CouponInput) -> Result<Coupon, DomainError>;
    fn update_coupon(&self, id: i32, input: CouponInput) -> Result<Option<Coupon>, DomainError>;
    fn delete_coupon(&self, id: i32) -> Result<bool, DomainError>;

    fn list_settings(&self) -> Result<Vec<SiteSetting>, DomainError>;
    fn upsert_setting(&self, key: &str, value: &str) -> Result<SiteSetting, DomainError>;
    fn delete_setting(&self, key: &str) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_payment(&self, request: &PaymentRequest)
        -> Result<PaymentReceipt, DomainError>;
    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus, DomainError>;
    async fn refund(&self, payment_id: &str) -> Result<(), DomainError>;
}

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}
