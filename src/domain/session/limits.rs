use serde::{Deserialize, Serialize};

/// Quota ceiling for a sandbox session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Informational; not enforced by the session itself
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: u32,
    #[serde(default = "default_max_calls_per_session")]
    pub max_calls_per_session: u64,
    #[serde(default = "default_max_tokens_per_session")]
    pub max_tokens_per_session: u64,
    #[serde(default = "default_max_session_duration_ms")]
    pub max_session_duration_ms: u64,
}

fn default_max_concurrent_sessions() -> u32 {
    5
}

fn default_max_calls_per_session() -> u64 {
    100
}

fn default_max_tokens_per_session() -> u64 {
    50_000
}

fn default_max_session_duration_ms() -> u64 {
    3_600_000
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: default_max_concurrent_sessions(),
            max_calls_per_session: default_max_calls_per_session(),
            max_tokens_per_session: default_max_tokens_per_session(),
            max_session_duration_ms: default_max_session_duration_ms(),
        }
    }
}

impl ResourceLimits {
    pub fn with_max_calls(mut self, max_calls: u64) -> Self {
        self.max_calls_per_session = max_calls;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens_per_session = max_tokens;
        self
    }

    pub fn with_max_duration_ms(mut self, duration_ms: u64) -> Self {
        self.max_session_duration_ms = duration_ms;
        self
    }

    pub fn with_max_concurrent_sessions(mut self, max: u32) -> Self {
        self.max_concurrent_sessions = max;
        self
    }
}
