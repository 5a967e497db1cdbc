use super::error::ConfigurationError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

/// 前端可选的采样数
pub const SAMPLE_COUNT_OPTIONS: [usize; 4] = [10, 20, 50, 100];
/// 推荐阈值范围（超出只告警，不拒绝）
pub const THRESHOLD_RANGE: RangeInclusive<f32> = 0.0..=5.0;

pub const DEFAULT_THRESHOLD: f32 = 3.0;
pub const DEFAULT_NUM_SAMPLES: usize = 50;
pub const DEFAULT_SMOOTHING_WINDOW: usize = 3;

/// 打分失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringErrorPolicy {
    /// 跳过单帧问题，模型不可用时终止
    #[default]
    SkipMalformed,
    /// 任何打分错误都跳过该帧
    SkipAll,
    /// 任何打分错误都终止
    AbortAll,
}

impl ScoringErrorPolicy {
    pub fn should_skip(&self, recoverable: bool) -> bool {
        match self {
            ScoringErrorPolicy::SkipMalformed => recoverable,
            ScoringErrorPolicy::SkipAll => true,
            ScoringErrorPolicy::AbortAll => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// 动作区平均熵 ≥ 阈值即拒绝
    pub threshold: f32,
    pub num_samples: usize,
    /// 仅用于展示的滑动平均窗口
    pub smoothing_window: usize,
    pub on_scoring_error: ScoringErrorPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            num_samples: DEFAULT_NUM_SAMPLES,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            on_scoring_error: ScoringErrorPolicy::default(),
        }
    }
}

impl AuditConfig {
    pub fn quick() -> Self {
        Self {
            num_samples: 10,
            ..Default::default()
        }
    }

    pub fn thorough() -> Self {
        Self {
            num_samples: 100,
            ..Default::default()
        }
    }

    pub fn from_json5_str(text: &str) -> Result<Self, ConfigurationError> {
        let config: AuditConfig =
            json5::from_str(text).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }

    /// 在运行开始前校验，非法值直接拒绝，不做截断
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.num_samples < 1 {
            return Err(ConfigurationError::InvalidSampleCount(self.num_samples));
        }
        if !self.threshold.is_finite() {
            return Err(ConfigurationError::NonFiniteThreshold(self.threshold));
        }
        if self.smoothing_window < 1 {
            return Err(ConfigurationError::InvalidSmoothingWindow(
                self.smoothing_window,
            ));
        }

        if !THRESHOLD_RANGE.contains(&self.threshold) {
            warn!(
                "⚠️ Threshold {:.2} outside recommended range {:?}",
                self.threshold, THRESHOLD_RANGE
            );
        }
        if !SAMPLE_COUNT_OPTIONS.contains(&self.num_samples) {
            warn!(
                "⚠️ num_samples {} is not one of {:?}",
                self.num_samples, SAMPLE_COUNT_OPTIONS
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AuditConfig::default();
        assert_eq!(config.threshold, 3.0);
        assert_eq!(config.num_samples, 50);
        assert!(config.validate().is_ok());
        assert!(AuditConfig::quick().validate().is_ok());
        assert_eq!(AuditConfig::thorough().num_samples, 100);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let config = AuditConfig {
            num_samples: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidSampleCount(0))
        ));
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        for threshold in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let config = AuditConfig {
                threshold,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigurationError::NonFiniteThreshold(_))
            ));
        }
    }

    #[test]
    fn test_out_of_range_threshold_not_clamped() {
        let config = AuditConfig {
            threshold: 7.5,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.threshold, 7.5);
    }

    #[test]
    fn test_parse_json5_with_defaults() {
        let config = AuditConfig::from_json5_str(
            r#"{
                // 更严格的审核
                threshold: 2.5,
                num_samples: 20,
                on_scoring_error: "abort_all",
            }"#,
        )
        .unwrap();

        assert_eq!(config.threshold, 2.5);
        assert_eq!(config.num_samples, 20);
        assert_eq!(config.smoothing_window, DEFAULT_SMOOTHING_WINDOW);
        assert_eq!(config.on_scoring_error, ScoringErrorPolicy::AbortAll);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        assert!(matches!(
            AuditConfig::from_json5_str("{ num_samples: 0 }"),
            Err(ConfigurationError::InvalidSampleCount(0))
        ));
        assert!(matches!(
            AuditConfig::from_json5_str("{ threshold: 'high' }"),
            Err(ConfigurationError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json5");
        std::fs::write(&path, "{ num_samples: 100 }").unwrap();

        let config = AuditConfig::from_file(&path).unwrap();
        assert_eq!(config.num_samples, 100);
        assert!(matches!(
            AuditConfig::from_file(&dir.path().join("missing.json5")),
            Err(ConfigurationError::Io(_))
        ));
    }

    #[test]
    fn test_scoring_error_policy() {
        assert!(ScoringErrorPolicy::SkipMalformed.should_skip(true));
        assert!(!ScoringErrorPolicy::SkipMalformed.should_skip(false));
        assert!(ScoringErrorPolicy::SkipAll.should_skip(false));
        assert!(!ScoringErrorPolicy::AbortAll.should_skip(true));
    }
}
