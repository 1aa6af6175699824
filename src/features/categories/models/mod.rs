mod category;

pub use category::{fields, Category};
