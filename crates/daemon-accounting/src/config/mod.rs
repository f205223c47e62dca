pub mod cli;
pub mod daemon;

pub use cli::*;
pub use daemon::*;
