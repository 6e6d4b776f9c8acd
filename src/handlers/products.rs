use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::auth::AdminAuth;
use crate::domain::catalog::{Product, ProductInput, ProductQuery};
use crate::domain::money::parse_money;
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// Product type, e.g. "anel", "colar", "relogio".
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub metal: Option<String>,
    pub stone: Option<String>,
    /// One of "price_asc", "price_desc" or "newest" (default).
    pub sort: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    /// List price as a decimal string, e.g. "1299.90"
    pub price: String,
    /// Price after the product's own discount.
    pub effective_price: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub metal: String,
    pub stone: Option<String>,
    pub discount_percent: Option<i32>,
    pub image_urls: Vec<String>,
    pub created_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            effective_price: p.effective_price().to_string(),
            price: p.price.to_string(),
            name: p.name,
            description: p.description,
            product_type: p.product_type,
            metal: p.metal,
            stone: p.stone,
            discount_percent: p.discount_percent,
            image_urls: p.image_urls,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "249.90"
    pub price: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub metal: String,
    pub stone: Option<String>,
    pub discount_percent: Option<i32>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl TryFrom<ProductRequest> for ProductInput {
    type Error = AppError;

    fn try_from(r: ProductRequest) -> Result<Self, Self::Error> {
        Ok(ProductInput {
            price: parse_money("price", &r.price)?,
            name: r.name,
            description: r.description,
            product_type: r.product_type,
            metal: r.metal,
            stone: r.stone.filter(|s| !s.trim().is_empty()),
            discount_percent: r.discount_percent,
            image_urls: r.image_urls,
        })
    }
}

// ── Public handlers ──────────────────────────────────────────────────────────

/// GET /api/products
///
/// Catalog filtered by type, metal and stone. Blank filters are ignored and an
/// unknown sort falls back to newest first.
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListParams),
    responses(
        (status = 200, description = "Matching products", body = Vec<ProductResponse>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "catalog"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ProductListParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let query = ProductQuery::from_params(
        params.product_type,
        params.metal,
        params.stone,
        params.sort.as_deref(),
    );

    let products = web::block(move || state.catalog.list_products(&query))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = web::block(move || state.catalog.get_product(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

// ── Admin handlers ───────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product"),
        (status = 401, description = "Missing or wrong admin token"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn create_product(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let input = ProductInput::try_from(body.into_inner())?;
    let product = web::block(move || state.catalog.create_product(input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid product"),
        (status = 404, description = "Product not found"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn update_product(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = ProductInput::try_from(body.into_inner())?;
    let product = web::block(move || state.catalog.update_product(id, input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn delete_product(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || state.catalog.delete_product(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}
