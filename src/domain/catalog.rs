use std::cmp::Reverse;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use super::errors::DomainError;
use super::money::percent_off;

#[derive(Debug, Clone)]
pub struct Product {
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

impl Product {
    /// List price with the product's own discount applied.
    pub fn effective_price(&self) -> BigDecimal {
        match self.discount_percent {
            Some(percent) if percent > 0 => percent_off(&self.price, percent),
            _ => self.price.clone(),
        }
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}

/// Admin-side create/update payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub product_type: String,
    pub metal: String,
    pub stone: Option<String>,
    pub discount_percent: Option<i32>,
    pub image_urls: Vec<String>,
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::missing_field("name"));
        }
        if self.product_type.trim().is_empty() {
            return Err(DomainError::missing_field("type"));
        }
        if self.metal.trim().is_empty() {
            return Err(DomainError::missing_field("metal"));
        }
        if self.price <= BigDecimal::zero() {
            return Err(DomainError::InvalidInput(
                "price must be greater than zero".to_string(),
            ));
        }
        if let Some(percent) = self.discount_percent {
            if !(0..=99).contains(&percent) {
                return Err(DomainError::InvalidInput(
                    "discount must be between 0 and 99 percent".to_string(),
                ));
            }
        }
        if self.image_urls.iter().any(|url| url.trim().is_empty()) {
            return Err(DomainError::InvalidInput(
                "image urls must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
}

impl ProductSort {
    /// Unknown or missing values fall back to newest-first.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price_asc") => ProductSort::PriceAsc,
            Some("price_desc") => ProductSort::PriceDesc,
            _ => ProductSort::Newest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProductSort::PriceAsc => "price_asc",
            ProductSort::PriceDesc => "price_desc",
            ProductSort::Newest => "newest",
        }
    }
}

/// Catalog filter. Present fields are ANDed together; exactly one sort applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub product_type: Option<String>,
    pub metal: Option<String>,
    pub stone: Option<String>,
    pub sort: ProductSort,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProductQuery {
    pub fn from_params(
        product_type: Option<String>,
        metal: Option<String>,
        stone: Option<String>,
        sort: Option<&str>,
    ) -> Self {
        Self {
            product_type: non_blank(product_type),
            metal: non_blank(metal),
            stone: non_blank(stone),
            sort: ProductSort::parse(sort),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.product_type
            .as_ref()
            .map_or(true, |t| product.product_type == *t)
            && self.metal.as_ref().map_or(true, |m| product.metal == *m)
            && self
                .stone
                .as_ref()
                .map_or(true, |s| product.stone.as_deref() == Some(s.as_str()))
    }

    /// In-memory equivalent of the database query. Equal prices list the
    /// newest product first.
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut matched: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            ProductSort::PriceAsc => {
                matched.sort_by(|a, b| a.price.cmp(&b.price).then(b.id.cmp(&a.id)))
            }
            ProductSort::PriceDesc => {
                matched.sort_by(|a, b| b.price.cmp(&a.price).then(b.id.cmp(&a.id)))
            }
            ProductSort::Newest => matched.sort_by_key(|p| Reverse(p.id)),
        }
        matched
    }
}
