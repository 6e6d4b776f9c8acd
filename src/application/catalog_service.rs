use std::sync::Arc;

use crate::domain::catalog::{Product, ProductInput, ProductQuery};
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, DomainError> {
        self.products.list(query)
    }

    pub fn get_product(&self, id: i32) -> Result<Product, DomainError> {
        self.products.find_by_id(id)?.ok_or(DomainError::NotFound)
    }

    pub fn create_product(&self, input: ProductInput) -> Result<Product, DomainError> {
        input.validate()?;
        let product = self.products.create(input)?;
        log::info!("Created product {} ({})", product.id, product.name);
        Ok(product)
    }

    pub fn update_product(&self, id: i32, input: ProductInput) -> Result<Product, DomainError> {
        input.validate()?;
        let product = self
            .products
            .update(id, input)?
            .ok_or(DomainError::NotFound)?;
        log::info!("Updated product {}", product.id);
        Ok(product)
    }

    pub fn delete_product(&self, id: i32) -> Result<(), DomainError> {
        if !self.products.delete(id)? {
            return Err(DomainError::NotFound);
        }
        log::info!("Deleted product {id}");
        Ok(())
    }
}
