pub mod collections;
pub mod config;
pub mod error;
pub mod hardening;
pub mod looting;
pub mod models;
pub mod scanner;
pub mod state;
pub mod util;
pub mod world;

// Convenient re-exports (so call sites can do `harvest_engine::Registry`, etc.)
pub use collections::CollectionManager;
pub use models::lootability::Lootability;
pub use scanner::{ScanWorker, run_pass};
pub use state::registry::Registry;
