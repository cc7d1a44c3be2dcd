mod app;
pub mod branch_name;
pub mod clients;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod server;

// Re-export App and Config from modules
pub use app::App;
pub use config::Config;
