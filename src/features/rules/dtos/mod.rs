mod trigger_dto;

pub use trigger_dto::{InvalidTriggerDto, TriggerValidationDto};
