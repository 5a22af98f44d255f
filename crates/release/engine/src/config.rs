use serde::{Deserialize, Serialize};

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix of generated release numbers
    pub release_number_prefix: String,

    /// Window used when a stats query names none
    pub stats_window_days: u32,

    /// Entries fetched per storage round trip when streaming audit trails
    pub audit_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            release_number_prefix: "REL".to_string(),
            stats_window_days: 30,
            audit_page_size: 100,
        }
    }
}
