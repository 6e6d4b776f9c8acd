use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::catalog::{Product, ProductInput, ProductQuery, ProductSort};
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::schema::products;

use super::models::{ProductChangeset, ProductRow};

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            product_type: row.product_type,
            metal: row.metal,
            stone: row.stone,
            discount_percent: row.discount_percent,
            image_urls: row.image_urls,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ProductInput> for ProductChangeset {
    fn from(input: ProductInput) -> Self {
        ProductChangeset {
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            product_type: input.product_type.trim().to_string(),
            metal: input.metal.trim().to_string(),
            stone: input
                .stone
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            discount_percent: input.discount_percent,
            image_urls: input.image_urls,
        }
    }
}

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProductRepository for DieselProductRepository {
    fn list(&self, query: &ProductQuery) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut select = products::table
            .select(ProductRow::as_select())
            .into_boxed();
        if let Some(product_type) = &query.product_type {
            select = select.filter(products::product_type.eq(product_type));
        }
        if let Some(metal) = &query.metal {
            select = select.filter(products::metal.eq(metal));
        }
        if let Some(stone) = &query.stone {
            select = select.filter(products::stone.eq(stone));
        }
        select = match query.sort {
            ProductSort::PriceAsc => select.order((products::price.asc(), products::id.desc())),
            ProductSort::PriceDesc => select.order((products::price.desc(), products::id.desc())),
            ProductSort::Newest => select.order(products::id.desc()),
        };

        let rows = select.load(&mut conn)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn find_by_id(&self, id: i32) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn find_many(&self, ids: &[i32]) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn create(&self, input: ProductInput) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(products::table)
            .values(&ProductChangeset::from(input))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update(&self, id: i32, input: ProductInput) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(products::table.find(id))
            .set((
                &ProductChangeset::from(input),
                products::updated_at.eq(diesel::dsl::now),
            ))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn delete(&self, id: i32) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
