pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
mod service;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use fixtures::{
    ensure_seeded, ensure_vectors_ready, rebuild_vectors, DemoDataset, SeedResult,
    VectorRebuildError, VerificationResult,
};
pub use service::recommendation_service;
