//! Application module
//!
//! Wiring of the registry, cache, accountant and background tasks, and their
//! lifecycle.

pub mod builder;
pub mod core;
pub mod services;
pub mod tasks;

// Re-export main types
pub use builder::ApplicationBuilder;
pub use self::core::Application;
pub use services::ApplicationServices;
