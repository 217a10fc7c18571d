use std::time::Duration;

/// Maximum number of definition files read per load
pub const MAX_DEFINITION_FILES: usize = 256;
/// Maximum size of a single definition file in bytes
pub const MAX_FILE_BYTES: usize = 1024 * 1024;           // 1 MB per JSON
/// Maximum total size of all definition files in bytes
pub const MAX_TOTAL_BYTES: usize = 32 * 1024 * 1024;     // 32 MB per load
/// Whether to follow symlinked definition files
pub const ALLOW_SYMLINKS: bool = false;
/// Deepest allowed subFilter nesting below a root filter
pub const MAX_FILTER_DEPTH: usize = 16;

/// References handed to the decision pipeline per scan pass
pub const MAX_REFS_PER_PASS: usize = 75;
/// Pending harvest notifications above which new harvests go silent
pub const HARVEST_SPAM_LIMIT: usize = 10;
/// Wall time between full inventory reconciliations
pub const INVENTORY_RECONCILE_INTERVAL: Duration = Duration::from_millis(3000);
/// Floor for the configured scan delay
pub const MIN_SCAN_DELAY: Duration = Duration::from_millis(100);
/// Ceiling for the configured scan interval in seconds
pub const MAX_SCAN_INTERVAL_SECS: f64 = 3600.0;
