pub mod blocks;
pub mod container;
pub mod events;
pub mod governor;
pub mod settings;
pub mod try_loot;

pub use blocks::LootBlocks;
pub use events::{EventSink, LogEventSink, RecordingEventSink};
pub use governor::ScanGovernor;
pub use settings::LootingSettings;
pub use try_loot::{LootContext, TryLoot};
