pub mod categories;
pub mod client_shell;
pub mod rules;
pub mod webhooks;
