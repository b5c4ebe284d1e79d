pub mod config;
pub mod server;

pub use config::ServerConfig;
pub use server::{build_router, AppState};
