pub mod adapter;
pub mod encoder;
pub mod utils;
