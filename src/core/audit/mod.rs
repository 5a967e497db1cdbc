//! 阶段感知熵审核
//!
//! 核心流程：
//! 1. 均匀采样 - 在整段轨迹上取 `num_samples` 帧
//! 2. 逐帧打分 - 策略模型动作 token 分布的香农熵
//! 3. 动作区聚合 - 只取中间 60% 的平均熵，排除起止阶段的噪声
//! 4. 判定 - 平均熵 ≥ 阈值即拒绝

pub mod aggregator;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod verdict;

pub use aggregator::{action_zone, aggregate, ZoneSummary, TOP_K};
pub use config::{AuditConfig, ScoringErrorPolicy, SAMPLE_COUNT_OPTIONS, THRESHOLD_RANGE};
pub use error::{AuditError, AuditStage, ConfigurationError};
pub use pipeline::{audit_path, audit_video, evaluate_profile, AuditReport, AuditResult};
pub use profile::{build_profile, build_profile_with, smooth, EntropyProfile, FrameScore, ProfileOutcome};
pub use progress::{AuditObserver, AuditProgress, NoProgress};
pub use verdict::{decide, Verdict};
