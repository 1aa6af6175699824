mod webhook;

pub use webhook::{fields, Webhook};
