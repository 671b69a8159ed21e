//! Key schema
//!
//! Every key the system writes is built here, together with the retention
//! period for each key family.

/// Retention periods
pub mod ttl {
    use std::time::Duration;

    const DAY: u64 = 24 * 60 * 60;

    /// Thread/response aggregates and per-file segment hashes
    pub const THREAD_DATA: Duration = Duration::from_secs(90 * DAY);
    /// Generic cache entries
    pub const CACHE_DATA: Duration = Duration::from_secs(60 * 60);
    /// User session data
    pub const USER_SESSION: Duration = Duration::from_secs(DAY);
    /// Analytics counters
    pub const ANALYTICS: Duration = Duration::from_secs(30 * DAY);
}

/// Aggregate thread cache record
pub fn thread_meta_key(thread_id: &str) -> String {
    format!("response:{}:meta", thread_id)
}

/// Segment hash for one file within a thread
pub fn thread_file_key(thread_id: &str, file_id: &str) -> String {
    format!("response:{}:file:{}", thread_id, file_id)
}

/// Generic cache entry within a category
pub fn cache_key(category: &str, id: &str) -> String {
    format!("cache:{}:{}", category, id)
}

/// Session record for a user
pub fn user_session_key(user_id: &str) -> String {
    format!("user:{}:session", user_id)
}

/// Daily analytics counter for a metric (`date` as `YYYY-MM-DD`)
pub fn analytics_key(metric: &str, date: &str) -> String {
    format!("analytics:{}:{}", metric, date)
}

/// Short-lived scratch data
pub fn temp_data_key(kind: &str, id: &str) -> String {
    format!("temp:{}:{}", kind, id)
}
