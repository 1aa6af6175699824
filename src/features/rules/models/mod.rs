mod trigger;

pub use trigger::{
    fields, raw_title, Action, Condition, Conditions, EqualityOp, StringOp, Trigger,
    TriggerError, TICKET_STATUSES,
};
