pub mod config;
pub mod logging;
pub mod profile_loader;
pub mod report;
pub mod utils;
