mod webhook_registry;

pub use webhook_registry::{sign, Delivery, WebhookRegistry, SIGNATURE_HEADER};
