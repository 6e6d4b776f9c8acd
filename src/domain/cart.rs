//! Shopper cart: line items with selection flags, written back to storage
//! after every mutation.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use super::catalog::Product;
use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i32,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: u32,
    pub selected: bool,
    pub image_url: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

/// Where a cart lives between mutations.
pub trait CartStorage {
    fn load(&self) -> Result<Vec<CartItem>, DomainError>;
    fn save(&self, items: &[CartItem]) -> Result<(), DomainError>;
}

#[derive(Debug)]
pub struct Cart<S: CartStorage> {
    items: Vec<CartItem>,
    storage: S,
}

impl<S: CartStorage> Cart<S> {
    /// Restores whatever the storage currently holds.
    pub fn open(storage: S) -> Result<Self, DomainError> {
        let items = storage.load()?;
        Ok(Self { items, storage })
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), DomainError> {
        let quantity = quantity.max(1);
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.effective_price(),
                quantity,
                selected: true,
                image_url: product.cover_image().map(str::to_string),
            }),
        }
        self.persist()
    }

    pub fn remove_item(&mut self, product_id: i32) -> Result<(), DomainError> {
        self.items.retain(|i| i.product_id != product_id);
        self.persist()
    }

    pub fn update_quantity(&mut self, product_id: i32, quantity: u32) -> Result<(), DomainError> {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = quantity.max(1);
        }
        self.persist()
    }

    pub fn toggle_selection(&mut self, product_id: i32) -> Result<(), DomainError> {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.selected = !item.selected;
        }
        self.persist()
    }

    pub fn select_all(&mut self) -> Result<(), DomainError> {
        for item in &mut self.items {
            item.selected = true;
        }
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), DomainError> {
        self.items.clear();
        self.persist()
    }

    /// Drops the items that were just paid for, keeping the rest.
    pub fn clear_selected(&mut self) -> Result<(), DomainError> {
        self.items.retain(|i| !i.selected);
        self.persist()
    }

    pub fn selected_items(&self) -> Vec<CartItem> {
        self.items.iter().filter(|i| i.selected).cloned().collect()
    }

    pub fn total(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::zero(), |acc, i| acc + i.line_total())
    }

    pub fn selected_total(&self) -> BigDecimal {
        self.items
            .iter()
            .filter(|i| i.selected)
            .fold(BigDecimal::zero(), |acc, i| acc + i.line_total())
    }

    fn persist(&self) -> Result<(), DomainError> {
        self.storage.save(&self.items)
    }
}
