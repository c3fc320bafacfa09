/// Maximum cards returned by the due queue
pub const DUE_QUEUE_LIMIT: usize = 50;

/// Cards loaded before shuffling a cram queue
pub const CRAM_POOL_LIMIT: usize = 100;

/// Cards returned by the global cram queue after shuffling
pub const GLOBAL_CRAM_LIMIT: usize = 20;

/// Active days shown in the analytics chart
pub const ANALYTICS_CHART_DAYS: usize = 7;

/// Default due-queue cache lifetime (seconds)
pub const DEFAULT_QUEUE_CACHE_TTL_SECS: u64 = 300;

/// Cron expression for the expired cache entry sweep
pub const CACHE_SWEEP_SCHEDULE: &str = "0 */10 * * * *";

/// Cron expression for the periodic sled flush
pub const STORE_FLUSH_SCHEDULE: &str = "0 */5 * * * *";

/// Hard ceiling for a single worker run (seconds)
pub const WORKER_JOB_TIMEOUT_SECS: u64 = 300;
