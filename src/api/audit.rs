//! 轨迹数据审核器

use crate::api::models::audit::{AuditApiError, AuditSummary, ProfileVerdict};
use crate::core::audit::{
    self, AuditConfig, AuditObserver, ConfigurationError, EntropyProfile, NoProgress,
    SAMPLE_COUNT_OPTIONS,
};
use crate::core::policy::PolicyModel;
use crate::core::video::{sample_indices, ImageSequenceSource, OpenedVideo};
use flutter_rust_bridge::frb;
use log::info;
use std::path::Path;
use std::sync::Mutex;

/// 轨迹审核器 - 动作 token 熵 + 动作区判定
///
/// 模型由宿主加载后交给审核器持有；多个审核并发时对模型的调用会被串行化。
///
/// ```dart
/// final summary = await auditor.auditImageSequence(framesDir: dir, instruction: "pick up the block");
/// if (summary.verdict.verdict == AuditVerdict.reject) { ... }
/// ```
#[frb(opaque)]
pub struct TrajectoryAuditor {
    model: Mutex<Box<dyn PolicyModel>>,
    config: AuditConfig,
}

impl TrajectoryAuditor {
    /// 使用已加载的策略模型创建审核器，配置非法时拒绝
    #[frb(ignore)]
    pub fn new(model: Box<dyn PolicyModel>, config: AuditConfig) -> Result<Self, AuditApiError> {
        crate::init_logging();
        config
            .validate()
            .map_err(|e| AuditApiError::from(audit::AuditError::from(e)))?;

        info!(
            "🛡️ TrajectoryAuditor: created (threshold {:.2}, {} samples)",
            config.threshold, config.num_samples
        );
        Ok(Self {
            model: Mutex::new(model),
            config,
        })
    }

    #[frb(sync, getter)]
    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    #[frb(sync, getter)]
    pub fn num_samples(&self) -> u32 {
        self.config.num_samples as u32
    }

    /// 审核一个图片序列目录（每个图片文件为一帧）
    #[frb]
    pub fn audit_image_sequence(
        &self,
        frames_dir: String,
        instruction: String,
    ) -> Result<AuditSummary, AuditApiError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| AuditApiError::model_poisoned())?;

        let report = audit::audit_path(
            &ImageSequenceSource,
            Path::new(&frames_dir),
            model.as_mut(),
            &instruction,
            &self.config,
            &mut NoProgress,
        )?;
        Ok(AuditSummary::from_report(&report, self.config.threshold))
    }

    /// 审核调用方已打开的视频，逐帧回报进度
    #[frb(ignore)]
    pub fn audit_video(
        &self,
        video: OpenedVideo,
        instruction: &str,
        observer: &mut dyn AuditObserver,
    ) -> Result<AuditSummary, AuditApiError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| AuditApiError::model_poisoned())?;

        let report =
            audit::audit_video(video, model.as_mut(), instruction, &self.config, observer)?;
        Ok(AuditSummary::from_report(&report, self.config.threshold))
    }
}

impl Drop for TrajectoryAuditor {
    fn drop(&mut self) {
        info!("🗑️ TrajectoryAuditor: released");
    }
}

/// 用新阈值重新评估一条已有的熵曲线（帧号按 0, 1, 2... 计）
#[frb(sync)]
pub fn evaluate_entropy_profile(
    entropies: Vec<f32>,
    threshold: f32,
) -> Result<ProfileVerdict, AuditApiError> {
    if !threshold.is_finite() {
        return Err(
            audit::AuditError::from(ConfigurationError::NonFiniteThreshold(threshold)).into(),
        );
    }
    let profile = EntropyProfile::from_entropies(&entropies)?;
    let result = audit::evaluate_profile(&profile, threshold)?;
    Ok(ProfileVerdict::from_result(&result, profile.len(), threshold))
}

/// 展示用的平滑曲线
#[frb(sync)]
pub fn smooth_entropy_series(
    entropies: Vec<f32>,
    window: u32,
) -> Result<Vec<f32>, AuditApiError> {
    let profile = EntropyProfile::from_entropies(&entropies)?;
    Ok(audit::smooth(&profile, window as usize))
}

/// 预览会被采样的帧号
#[frb(sync)]
pub fn plan_sample_indices(total_frames: u32, num_samples: u32) -> Result<Vec<u32>, AuditApiError> {
    if num_samples < 1 {
        return Err(
            audit::AuditError::from(ConfigurationError::InvalidSampleCount(num_samples as usize))
                .into(),
        );
    }
    Ok(sample_indices(total_frames as usize, num_samples as usize)
        .iter()
        .map(|i| i as u32)
        .collect())
}

#[frb(sync)]
pub fn sample_count_options() -> Vec<u32> {
    SAMPLE_COUNT_OPTIONS.iter().map(|&n| n as u32).collect()
}
