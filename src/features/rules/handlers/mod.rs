mod trigger_handler;

pub use trigger_handler::*;
