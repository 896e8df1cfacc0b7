pub mod error;
pub mod execution;
pub mod notify;

#[cfg(test)]
mod tests;
