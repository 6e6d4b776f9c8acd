use std::sync::{Arc, Mutex};

use crate::domain::cart::{CartItem, CartStorage};
use crate::domain::errors::DomainError;

/// Process-local storage; clones share the same items.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    items: Arc<Mutex<Vec<CartItem>>>,
}

impl CartStorage for MemoryCartStorage {
    fn load(&self) -> Result<Vec<CartItem>, DomainError> {
        self.items
            .lock()
            .map(|items| items.clone())
            .map_err(|e| DomainError::Internal(e.to_string()))
    }

    fn save(&self, items: &[CartItem]) -> Result<(), DomainError> {
        let mut stored = self
            .items
            .lock()
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        *stored = items.to_vec();
        Ok(())
    }
}
