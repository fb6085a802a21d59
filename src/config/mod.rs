//! Configuration module - environment variable parsing and tuning defaults

use std::env;

/// Slack allowed above raw damage when clamping the absorbed amount.
/// Armor can soak more than what reaches the body part, but not without bound.
pub const ABSORBED_SLACK: f32 = 100.0;

/// Hit feedback tuning (camera and hands shake, screen blur).
///
/// The defaults reproduce the shipped feel; hosts can override them wholesale
/// if their presentation layer scales differently.
#[derive(Clone, Copy, Debug)]
pub struct FeedbackTuning {
    pub base_hands_shake: f32,
    pub base_camera_shake: f32,
    pub head_hands_shake: f32,
    pub head_camera_shake: f32,
    pub arm_hands_shake: f32,
    pub arm_camera_shake: f32,
    pub leg_camera_shake: f32,
    /// Blur multiplier for head hits.
    pub head_blur_scale: f32,
    /// Blur multiplier for every other body part.
    pub body_blur_scale: f32,
}

impl Default for FeedbackTuning {
    fn default() -> Self {
        Self {
            base_hands_shake: 0.05,
            base_camera_shake: 0.4,
            head_hands_shake: 0.1,
            head_camera_shake: 1.3,
            arm_hands_shake: 0.15,
            arm_camera_shake: 0.5,
            leg_camera_shake: 0.3,
            head_blur_scale: 6.0,
            body_blur_scale: 3.0,
        }
    }
}

/// Replication core configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Clamp the absorbed amount of inbound damage packets to
    /// `damage + ABSORBED_SLACK` instead of trusting the sender.
    pub clamp_absorbed: bool,
    /// Hit feedback tuning
    pub feedback: FeedbackTuning,
}

impl ReplicationConfig {
    /// Load configuration from environment variables, with defaults for
    /// everything (an embedded core must come up without any environment).
    pub fn from_env() -> Result<Self, ConfigError> {
        let clamp_absorbed = match env::var("RAIDLINK_CLAMP_ABSORBED") {
            Ok(raw) => match raw.as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => return Err(ConfigError::InvalidBool("RAIDLINK_CLAMP_ABSORBED")),
            },
            Err(_) => true,
        };

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            clamp_absorbed,
            feedback: FeedbackTuning::default(),
        })
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            clamp_absorbed: true,
            feedback: FeedbackTuning::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} must be a boolean (1/0/true/false)")]
    InvalidBool(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_clamp_absorbed() {
        let config = ReplicationConfig::default();
        assert!(config.clamp_absorbed);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.feedback.head_camera_shake, 1.3);
    }
}
