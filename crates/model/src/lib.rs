pub mod config;
pub mod core;
pub mod error;
pub mod load;
pub mod pagination;
pub mod records;
pub mod sync;
