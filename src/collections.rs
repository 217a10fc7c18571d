//! User-defined collections: JSON definitions, the condition trees they compile to, and the
//! manager that resolves membership and answers collectibility queries.

pub mod collection;
pub mod condition;
pub mod definition;
pub mod manager;

pub use collection::{Collection, CollectionEntry, CollectionPolicy};
pub use manager::CollectionManager;
