pub mod compile;
pub mod import;
pub mod templates;
pub mod tools;
