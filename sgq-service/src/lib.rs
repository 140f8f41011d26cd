//! SGQ back-office service: clients, catalog, employees, company profile and
//! invoicing with stock reconciliation, served as a JSON API.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod store;
pub mod utils;
