use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::auth::AdminAuth;
use crate::domain::content::{
    Banner, BannerInput, Coupon, CouponInput, Promotion, PromotionInput, SiteSetting,
};
use crate::errors::AppError;
use crate::state::AppState;

fn default_true() -> bool {
    true
}

// ── Banners ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BannerResponse {
    pub id: i32,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub active: bool,
    pub created_at: String,
}

impl From<Banner> for BannerResponse {
    fn from(b: Banner) -> Self {
        Self {
            id: b.id,
            title: b.title,
            image_url: b.image_url,
            link_url: b.link_url,
            position: b.position,
            active: b.active,
            created_at: b.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BannerRequest {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl From<BannerRequest> for BannerInput {
    fn from(r: BannerRequest) -> Self {
        Self {
            title: r.title,
            image_url: r.image_url,
            link_url: r.link_url.filter(|l| !l.trim().is_empty()),
            position: r.position,
            active: r.active,
        }
    }
}

// ── Promotions ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub discount_percent: i32,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub active: bool,
}

impl From<Promotion> for PromotionResponse {
    fn from(p: Promotion) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            discount_percent: p.discount_percent,
            starts_at: p.starts_at.map(|t| t.to_rfc3339()),
            ends_at: p.ends_at.map(|t| t.to_rfc3339()),
            active: p.active,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub discount_percent: i32,
    /// RFC 3339 instant; open-ended when omitted.
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl From<PromotionRequest> for PromotionInput {
    fn from(r: PromotionRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            discount_percent: r.discount_percent,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
            active: r.active,
        }
    }
}

// ── Coupons ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    pub id: i32,
    pub code: String,
    pub discount_percent: i32,
    pub active: bool,
    pub expires_at: Option<String>,
}

impl From<Coupon> for CouponResponse {
    fn from(c: Coupon) -> Self {
        Self {
            id: c.id,
            code: c.code,
            discount_percent: c.discount_percent,
            active: c.active,
            expires_at: c.expires_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    /// Stored upper-cased; lookups ignore case.
    pub code: String,
    pub discount_percent: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CouponRequest> for CouponInput {
    fn from(r: CouponRequest) -> Self {
        Self {
            code: r.code,
            discount_percent: r.discount_percent,
            active: r.active,
            expires_at: r.expires_at,
        }
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingResponse {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl From<SiteSetting> for SettingResponse {
    fn from(s: SiteSetting) -> Self {
        Self {
            key: s.key,
            value: s.value,
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SettingRequest {
    pub value: String,
}

// ── Public handlers ──────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/banners",
    responses((status = 200, description = "Active banners by position", body = Vec<BannerResponse>)),
    tag = "content"
)]
pub async fn list_banners(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let banners = web::block(move || state.content.active_banners())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<BannerResponse> = banners.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/api/promotions",
    responses((status = 200, description = "Promotions running now", body = Vec<PromotionResponse>)),
    tag = "content"
)]
pub async fn list_promotions(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let promotions = web::block(move || state.content.running_promotions())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<PromotionResponse> = promotions.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/coupons/{code}
///
/// 404 for unknown codes, 400 for inactive or expired ones.
#[utoipa::path(
    get,
    path = "/api/coupons/{code}",
    params(("code" = String, Path, description = "Coupon code, any case")),
    responses(
        (status = 200, description = "Coupon can be applied", body = CouponResponse),
        (status = 400, description = "Coupon inactive or expired"),
        (status = 404, description = "Unknown coupon"),
    ),
    tag = "content"
)]
pub async fn validate_coupon(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let coupon = web::block(move || state.content.redeemable_coupon(&code))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CouponResponse::from(coupon)))
}

/// GET /api/settings
///
/// All site settings as a single `{key: value}` object.
#[utoipa::path(
    get,
    path = "/api/settings",
    responses((status = 200, description = "Settings map", body = BTreeMap<String, String>)),
    tag = "content"
)]
pub async fn get_settings(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let settings = web::block(move || state.content.settings())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: BTreeMap<String, String> = settings.into_iter().map(|s| (s.key, s.value)).collect();
    Ok(HttpResponse::Ok().json(body))
}

// ── Admin handlers ───────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/admin/banners",
    responses((status = 200, description = "All banners", body = Vec<BannerResponse>)),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn admin_list_banners(
    _admin: AdminAuth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let banners = web::block(move || state.content.all_banners())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<BannerResponse> = banners.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/admin/banners",
    request_body = BannerRequest,
    responses(
        (status = 201, description = "Banner created", body = BannerResponse),
        (status = 400, description = "Invalid banner"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn create_banner(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    body: web::Json<BannerRequest>,
) -> Result<HttpResponse, AppError> {
    let input = BannerInput::from(body.into_inner());
    let banner = web::block(move || state.content.create_banner(input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(BannerResponse::from(banner)))
}

#[utoipa::path(
    put,
    path = "/api/admin/banners/{id}",
    params(("id" = i32, Path, description = "Banner id")),
    request_body = BannerRequest,
    responses(
        (status = 200, description = "Banner updated", body = BannerResponse),
        (status = 404, description = "Banner not found"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn update_banner(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<BannerRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = BannerInput::from(body.into_inner());
    let banner = web::block(move || state.content.update_banner(id, input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(BannerResponse::from(banner)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/banners/{id}",
    params(("id" = i32, Path, description = "Banner id")),
    responses(
        (status = 204, description = "Banner deleted"),
        (status = 404, description = "Banner not found"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn delete_banner(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || state.content.delete_banner(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/admin/promotions",
    responses((status = 200, description = "All promotions", body = Vec<PromotionResponse>)),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn admin_list_promotions(
    _admin: AdminAuth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let promotions = web::block(move || state.content.all_promotions())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<PromotionResponse> = promotions.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/admin/promotions",
    request_body = PromotionRequest,
    responses(
        (status = 201, description = "Promotion created", body = PromotionResponse),
        (status = 400, description = "Invalid promotion"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn create_promotion(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    body: web::Json<PromotionRequest>,
) -> Result<HttpResponse, AppError> {
    let input = PromotionInput::from(body.into_inner());
    let promotion = web::block(move || state.content.create_promotion(input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(PromotionResponse::from(promotion)))
}

#[utoipa::path(
    put,
    path = "/api/admin/promotions/{id}",
    params(("id" = i32, Path, description = "Promotion id")),
    request_body = PromotionRequest,
    responses(
        (status = 200, description = "Promotion updated", body = PromotionResponse),
        (status = 404, description = "Promotion not found"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn update_promotion(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<PromotionRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = PromotionInput::from(body.into_inner());
    let promotion = web::block(move || state.content.update_promotion(id, input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(PromotionResponse::from(promotion)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/promotions/{id}",
    params(("id" = i32, Path, description = "Promotion id")),
    responses(
        (status = 204, description = "Promotion deleted"),
        (status = 404, description = "Promotion not found"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn delete_promotion(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || state.content.delete_promotion(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/admin/coupons",
    responses((status = 200, description = "All coupons", body = Vec<CouponResponse>)),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn admin_list_coupons(
    _admin: AdminAuth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let coupons = web::block(move || state.content.all_coupons())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<CouponResponse> = coupons.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/admin/coupons",
    request_body = CouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = CouponResponse),
        (status = 400, description = "Invalid coupon"),
        (status = 409, description = "Code already in use"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn create_coupon(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    body: web::Json<CouponRequest>,
) -> Result<HttpResponse, AppError> {
    let input = CouponInput::from(body.into_inner());
    let coupon = web::block(move || state.content.create_coupon(input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(CouponResponse::from(coupon)))
}

#[utoipa::path(
    put,
    path = "/api/admin/coupons/{id}",
    params(("id" = i32, Path, description = "Coupon id")),
    request_body = CouponRequest,
    responses(
        (status = 200, description = "Coupon updated", body = CouponResponse),
        (status = 404, description = "Coupon not found"),
        (status = 409, description = "Code already in use"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn update_coupon(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<CouponRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = CouponInput::from(body.into_inner());
    let coupon = web::block(move || state.content.update_coupon(id, input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CouponResponse::from(coupon)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/coupons/{id}",
    params(("id" = i32, Path, description = "Coupon id")),
    responses(
        (status = 204, description = "Coupon deleted"),
        (status = 404, description = "Coupon not found"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn delete_coupon(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || state.content.delete_coupon(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses((status = 200, description = "All settings", body = Vec<SettingResponse>)),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn admin_list_settings(
    _admin: AdminAuth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let settings = web::block(move || state.content.settings())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<SettingResponse> = settings.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings/{key}",
    params(("key" = String, Path, description = "Setting key, e.g. store.whatsapp")),
    request_body = SettingRequest,
    responses(
        (status = 200, description = "Setting stored", body = SettingResponse),
        (status = 400, description = "Invalid key"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn put_setting(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SettingRequest>,
) -> Result<HttpResponse, AppError> {
    let key = path.into_inner();
    let value = body.into_inner().value;
    let setting = web::block(move || state.content.put_setting(&key, &value))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(SettingResponse::from(setting)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 204, description = "Setting deleted"),
        (status = 404, description = "Setting not found"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn delete_setting(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let key = path.into_inner();
    web::block(move || state.content.delete_setting(&key))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}
