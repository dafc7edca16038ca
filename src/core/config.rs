use std::time::Duration;
use crate::compression::compress::CompressionType;
use crate::schema::schema::Schema;

/// Engine options shared by writers and readers.
#[derive(Debug, Clone)]
pub struct Config {
    pub lock_poll_interval: Duration,   // First wait between lock attempts
    pub lock_max_backoff: Duration,     // Upper bound for the doubling wait
    pub compression: CompressionType,   // Segment payload compression
    pub auto_migrate: bool,             // Upgrade older storage versions on open
    pub sync_on_commit: bool,           // fsync segments and manifest before the swap
    pub default_frame_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lock_poll_interval: Duration::from_millis(5),
            lock_max_backoff: Duration::from_millis(200),
            compression: CompressionType::Lz4,
            auto_migrate: true,
            sync_on_commit: true,
            default_frame_size: 2,
        }
    }
}

impl Config {
    pub fn with_auto_migrate(mut self, auto_migrate: bool) -> Self {
        self.auto_migrate = auto_migrate;
        self
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }
}

/// Description of a new index, used to bootstrap an empty location.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub schema: Schema,
}

impl IndexConfig {
    pub fn new(schema: Schema) -> Self {
        IndexConfig { schema }
    }
}
