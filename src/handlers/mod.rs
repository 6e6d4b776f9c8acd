pub mod auth;
pub mod content;
pub mod orders;
pub mod payment;
pub mod products;
pub mod upload;
