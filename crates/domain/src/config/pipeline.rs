use serde::{Deserialize, Serialize};
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bounded turn queue size.  Producers wait when it is full.
    #[serde(default = "d_1000")]
    pub queue_capacity: usize,
    /// Card refresh period.  At most one update call is issued per tick.
    #[serde(default = "d_200")]
    pub tick_interval_ms: u64,
    /// Maximum turn duration before the pipeline is force-closed.
    /// `0` disables the limit.
    #[serde(default = "d_300")]
    pub turn_timeout_secs: u64,
    /// Card text shown when a turn fails after the card was sent.
    #[serde(default = "d_error_text")]
    pub error_text: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            tick_interval_ms: 200,
            turn_timeout_secs: 300,
            error_text: d_error_text(),
        }
    }
}

impl PipelineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn turn_timeout(&self) -> Option<Duration> {
        (self.turn_timeout_secs > 0).then(|| Duration::from_secs(self.turn_timeout_secs))
    }
}

fn d_1000() -> usize {
    1000
}
fn d_200() -> u64 {
    200
}
fn d_300() -> u64 {
    300
}
fn d_error_text() -> String {
    "Internal server error, please try again later.".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_disables_limit() {
        let cfg = PipelineConfig {
            turn_timeout_secs: 0,
            ..Default::default()
        };
        assert!(cfg.turn_timeout().is_none());
        assert_eq!(
            PipelineConfig::default().turn_timeout(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn tick_interval_is_millis() {
        assert_eq!(
            PipelineConfig::default().tick_interval(),
            Duration::from_millis(200)
        );
    }
}
