pub mod context;
pub mod giveaway;
pub mod help;

// Re-exports for the later usage in main.rs
pub use crate::commands::context::{Context, UserData};
