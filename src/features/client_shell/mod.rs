//! HTML entry point of the browser client.
//!
//! Every GET outside `/api` that no static file answers gets this page;
//! routing from there on happens in the browser.

pub mod handler;
mod renderer;

pub use renderer::{script_safe_json, ClientGlobals, ClientShell, TemplateError};
