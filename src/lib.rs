// Parking Vecinal - Core Library
// Administrative web application for a residential parking program:
// neighbors, their vehicles, their payments, and a read-only resident
// portal. Exposed as a library for the server binary and the tests.

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod flash;
pub mod routes;
pub mod uploads;
pub mod views;

// Re-export commonly used types
pub use config::Config;
pub use entities::{Neighbor, NeighborSummary, Payment, Vehicle};
pub use error::AppError;
pub use flash::Flash;
pub use routes::{router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
