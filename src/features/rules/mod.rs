//! Ticket automation rules.
//!
//! Only trigger validation lives on the server: conditions and actions are
//! parsed into typed values, referenced categories must exist and be active,
//! and invalid triggers are switched off.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::TriggerService;
