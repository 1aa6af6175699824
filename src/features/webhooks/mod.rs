//! Outgoing webhooks.
//!
//! Active records of the `Webhook` collection are loaded into memory at
//! startup and on `POST /api/webhooks/refresh`. Category mutations are
//! delivered as signed JSON posts.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::WebhookRegistry;
