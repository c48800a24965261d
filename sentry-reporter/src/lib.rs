pub mod config;
pub mod delivery;
pub mod dsn;
pub mod error;
pub mod reporter;
pub mod transport;
