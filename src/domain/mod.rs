pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod errors;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod tracking;
