pub mod state;
pub mod window;
