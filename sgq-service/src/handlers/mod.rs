pub mod auth;
pub mod company;
pub mod crud;
pub mod health;
pub mod invoices;
pub mod products;

pub use health::{health_check, metrics, readiness_check};
