pub mod base;
pub mod crm;
pub mod gateway;
pub mod workspace;
