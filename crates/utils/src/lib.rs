//! Helpers shared by the workspace binaries: logging setup and version info.

pub mod logging;
pub mod version;
