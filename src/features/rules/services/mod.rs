mod trigger_service;

pub use trigger_service::TriggerService;
