pub mod detail;
pub mod source;
