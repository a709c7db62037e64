//! emberdb server: HTTP request surface and CLI launcher over `emberdb-core`.

pub mod command;
pub mod config;
pub mod error;
pub mod router;

pub use config::{Cli, ServerConfig};
pub use error::ApiError;
pub use router::{build_router, AppState};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {}
}
