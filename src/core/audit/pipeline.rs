//! 一次完整审核：采样 → 打分 → 聚合 → 判定
//!
//! 单线程顺序执行，不跨运行保存任何状态。视频句柄按值传入，
//! 无论正常结束、提前停止、出错还是取消，函数返回时都会释放。

use super::aggregator::aggregate;
use super::config::AuditConfig;
use super::error::AuditError;
use super::profile::{build_profile_with, smooth, EntropyProfile, FrameScore};
use super::progress::AuditObserver;
use super::verdict::{decide, Verdict};
use crate::core::policy::PolicyModel;
use crate::core::video::{get_frame, sample_indices, OpenedVideo, RasterImage, VideoSource};
use log::{error, info, warn};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditResult {
    pub action_zone_average: f32,
    pub overall_peak: f32,
    pub verdict: Verdict,
    pub top_k_frames: Vec<FrameScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub result: AuditResult,
    pub profile: EntropyProfile,
    /// 仅用于展示，不参与判定
    pub smoothed: Vec<f32>,
    pub skipped_frames: Vec<usize>,
    pub stopped_early_at: Option<usize>,
    pub planned_samples: usize,
    pub total_frames: usize,
    /// 与 `result.top_k_frames` 一一对应；重新读取失败的帧不在其中
    #[serde(skip)]
    pub top_frame_images: Vec<RasterImage>,
}

impl AuditReport {
    pub fn frames_analyzed(&self) -> usize {
        self.profile.len()
    }

    pub fn frames_skipped(&self) -> usize {
        self.skipped_frames.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// 对已有的熵曲线做聚合与判定（不需要模型和视频）
pub fn evaluate_profile(profile: &EntropyProfile, threshold: f32) -> Result<AuditResult, AuditError> {
    let summary = aggregate(profile)?;
    Ok(AuditResult {
        action_zone_average: summary.action_zone_average,
        overall_peak: summary.overall_peak,
        verdict: decide(summary.action_zone_average, threshold),
        top_k_frames: summary.top_k_frames,
    })
}

/// 打开视频并审核。配置在打开视频之前校验
pub fn audit_path(
    source: &dyn VideoSource,
    path: &Path,
    model: &mut dyn PolicyModel,
    instruction: &str,
    config: &AuditConfig,
    observer: &mut dyn AuditObserver,
) -> Result<AuditReport, AuditError> {
    config.validate()?;
    let video = OpenedVideo::open(source, path).map_err(|e| {
        error!("❌ Failed to open {:?}: {}", path, e);
        AuditError::OpenVideo(e)
    })?;
    run_validated(video, model, instruction, config, observer)
}

pub fn audit_video(
    video: OpenedVideo,
    model: &mut dyn PolicyModel,
    instruction: &str,
    config: &AuditConfig,
    observer: &mut dyn AuditObserver,
) -> Result<AuditReport, AuditError> {
    config.validate()?;
    run_validated(video, model, instruction, config, observer)
}

/// 调用方已校验过 `config`
fn run_validated(
    mut video: OpenedVideo,
    model: &mut dyn PolicyModel,
    instruction: &str,
    config: &AuditConfig,
    observer: &mut dyn AuditObserver,
) -> Result<AuditReport, AuditError> {
    let total_frames = video.total_frame_count();
    let sample_set = sample_indices(total_frames, config.num_samples);
    info!(
        "🔍 Auditing trajectory: {} frames, {} samples, threshold {:.2}, instruction {:?}",
        total_frames,
        sample_set.len(),
        config.threshold,
        instruction
    );

    let outcome = build_profile_with(
        &mut video,
        &sample_set,
        model,
        instruction,
        config.on_scoring_error,
        observer,
    )
    .inspect_err(|e| error!("❌ Audit failed ({:?}): {}", e.stage(), e))?;

    if outcome.profile.is_empty() {
        let err = AuditError::InsufficientData {
            frames_skipped: outcome.skipped_frames.len(),
        };
        error!("❌ {}", err);
        return Err(err);
    }

    let result = evaluate_profile(&outcome.profile, config.threshold)?;
    let smoothed = smooth(&outcome.profile, config.smoothing_window);

    let mut top_frame_images = Vec::with_capacity(result.top_k_frames.len());
    for score in &result.top_k_frames {
        match get_frame(&mut video, score.frame_index) {
            Ok(image) => top_frame_images.push(image),
            Err(e) => warn!("⚠️ Could not re-read top frame {}: {}", score.frame_index, e),
        }
    }

    if !outcome.skipped_frames.is_empty() {
        warn!(
            "⚠️ {} frame(s) skipped, zone average is based on {} frames",
            outcome.skipped_frames.len(),
            outcome.profile.len()
        );
    }
    info!(
        "✅ Verdict {:?}: zone average {:.3}, peak {:.3} ({} frames analyzed)",
        result.verdict,
        result.action_zone_average,
        result.overall_peak,
        outcome.profile.len()
    );

    Ok(AuditReport {
        result,
        smoothed,
        profile: outcome.profile,
        skipped_frames: outcome.skipped_frames,
        stopped_early_at: outcome.stopped_early_at,
        planned_samples: outcome.planned_samples,
        total_frames,
        top_frame_images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::config::ScoringErrorPolicy;
    use crate::core::audit::error::AuditStage;
    use crate::core::audit::progress::{AuditProgress, NoProgress};
    use crate::core::policy::{ActionDistribution, MockPolicyModel, ScoringError};
    use crate::core::video::{ImageSequenceSource, InMemoryVideo};
    use std::ops::ControlFlow;
    use std::sync::atomic::Ordering;

    /// 中段帧在 `vocab` 个 token 上均匀，其余帧确定
    fn model_uncertain_between(lo: usize, hi: usize, vocab: usize) -> MockPolicyModel {
        MockPolicyModel::with_vocab_sizes(move |i| if (lo..hi).contains(&i) { vocab } else { 1 })
    }

    #[test]
    fn test_evaluate_profile_example() {
        let profile =
            EntropyProfile::from_entropies(&[1.0, 1.0, 4.0, 4.0, 4.0, 1.0, 1.0, 1.0, 1.0, 1.0])
                .unwrap();
        let result = evaluate_profile(&profile, 3.0).unwrap();

        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(result.overall_peak, 4.0);
        assert_eq!(result.top_k_frames.len(), 3);
        assert_eq!(evaluate_profile(&profile, 2.5).unwrap().verdict, Verdict::Reject);
    }

    #[test]
    fn test_ambiguous_action_zone_rejected() {
        let video = OpenedVideo::new(Box::new(InMemoryVideo::solid(100, 4, 4)));
        // e^4 ≈ 54.6，取 64 个 token → 熵 ln 64 ≈ 4.16
        let mut model = model_uncertain_between(20, 80, 64);
        let config = AuditConfig::quick();

        let report = audit_video(video, &mut model, "put it there", &config, &mut NoProgress)
            .unwrap();

        assert_eq!(report.result.verdict, Verdict::Reject);
        assert_eq!(report.frames_analyzed(), 10);
        assert_eq!(report.frames_skipped(), 0);
        assert_eq!(report.top_frame_images.len(), 3);
        assert_eq!(report.smoothed.len(), 10);
    }

    #[test]
    fn test_top_frames_reread_once_each() {
        let video = InMemoryVideo::solid(100, 4, 4);
        let reads = video.read_counter();
        let mut model = model_uncertain_between(20, 80, 64);

        let report = audit_video(
            OpenedVideo::new(Box::new(video)),
            &mut model,
            "put it there",
            &AuditConfig::quick(),
            &mut NoProgress,
        )
        .unwrap();

        // 10 次采样 + 3 次最不确定帧回读
        assert_eq!(reads.load(Ordering::SeqCst), 13);
        let reread: Vec<usize> = report.top_frame_images.iter().map(|i| i.frame_index).collect();
        let top: Vec<usize> = report.result.top_k_frames.iter().map(|s| s.frame_index).collect();
        assert_eq!(reread, top);
    }

    #[test]
    fn test_noisy_edges_still_pass() {
        let video = OpenedVideo::new(Box::new(InMemoryVideo::solid(100, 4, 4)));
        let mut model = MockPolicyModel::with_vocab_sizes(|i| if !(10..90).contains(&i) { 512 } else { 1 });
        let config = AuditConfig::quick();

        let report = audit_video(video, &mut model, "pick up the red block", &config, &mut NoProgress)
            .unwrap();

        assert_eq!(report.result.verdict, Verdict::Pass);
        assert!(report.result.overall_peak > 6.0);
        assert!(report.result.action_zone_average < 1e-6);
    }

    #[test]
    fn test_video_released_on_every_path() {
        // 正常结束
        let video = InMemoryVideo::solid(30, 2, 2);
        let released = video.release_flag();
        let mut model = MockPolicyModel::confident();
        audit_video(
            OpenedVideo::new(Box::new(video)),
            &mut model,
            "x",
            &AuditConfig::quick(),
            &mut NoProgress,
        )
        .unwrap();
        assert!(released.load(Ordering::SeqCst));

        // 打分失败
        let video = InMemoryVideo::solid(30, 2, 2);
        let released = video.release_flag();
        let mut model = MockPolicyModel::unavailable("gone");
        let err = audit_video(
            OpenedVideo::new(Box::new(video)),
            &mut model,
            "x",
            &AuditConfig::quick(),
            &mut NoProgress,
        )
        .unwrap_err();
        assert_eq!(err.stage(), AuditStage::Scoring);
        assert!(released.load(Ordering::SeqCst));

        // 调用方取消
        let video = InMemoryVideo::solid(30, 2, 2);
        let released = video.release_flag();
        let mut model = MockPolicyModel::confident();
        let mut cancel = |_e: AuditProgress| -> ControlFlow<()> { ControlFlow::Break(()) };
        let err = audit_video(
            OpenedVideo::new(Box::new(video)),
            &mut model,
            "x",
            &AuditConfig::quick(),
            &mut cancel,
        )
        .unwrap_err();
        assert!(matches!(err, AuditError::Cancelled { frames_analyzed: 0 }));
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_resilience_to_short_video() {
        let frames = (0..=40)
            .map(|i| RasterImage::new(2, 2, vec![0u8; 12], i))
            .collect();
        let video = InMemoryVideo::with_reported_frames(frames, 100);
        let released = video.release_flag();
        let mut model = MockPolicyModel::with_vocab_sizes(|_| 4);
        let config = AuditConfig::default();

        let report = audit_video(
            OpenedVideo::new(Box::new(video)),
            &mut model,
            "stack the cups",
            &config,
            &mut NoProgress,
        )
        .unwrap();

        assert_eq!(report.planned_samples, 50);
        assert_eq!(report.frames_analyzed(), 21);
        assert!(report
            .profile
            .scores()
            .iter()
            .all(|s| s.frame_index <= 40));
        assert!(report.stopped_early_at.is_some());
        assert_eq!(report.result.verdict, Verdict::Pass);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_all_frames_skipped_is_insufficient() {
        let video = OpenedVideo::new(Box::new(InMemoryVideo::solid(10, 2, 2)));
        let mut model = MockPolicyModel::with_pattern(|img| {
            Err(ScoringError::MalformedInput {
                frame_index: img.frame_index,
                reason: "blank".to_string(),
            })
        });

        let err = audit_video(video, &mut model, "x", &AuditConfig::quick(), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, AuditError::InsufficientData { frames_skipped: 10 }));
        assert_eq!(err.stage(), AuditStage::Aggregation);
    }

    #[test]
    fn test_skip_count_reported() {
        let video = OpenedVideo::new(Box::new(InMemoryVideo::solid(10, 2, 2)));
        let mut model = MockPolicyModel::with_pattern(|img| {
            if img.frame_index == 4 {
                Err(ScoringError::InvalidDistribution("empty".to_string()))
            } else {
                Ok(ActionDistribution::uniform(2))
            }
        });

        let report = audit_video(video, &mut model, "x", &AuditConfig::quick(), &mut NoProgress)
            .unwrap();
        assert_eq!(report.skipped_frames, vec![4]);
        assert_eq!(report.frames_analyzed(), 9);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"verdict\": \"PASS\""));
        assert!(json.contains("\"skipped_frames\""));
    }

    #[test]
    fn test_invalid_config_rejected_before_scoring() {
        let video = OpenedVideo::new(Box::new(InMemoryVideo::solid(10, 2, 2)));
        let mut model = MockPolicyModel::confident();
        let calls = model.call_counter();
        let config = AuditConfig {
            threshold: f32::NAN,
            ..Default::default()
        };

        let err = audit_video(video, &mut model, "x", &config, &mut NoProgress).unwrap_err();
        assert_eq!(err.stage(), AuditStage::Configuration);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_abort_all_policy() {
        let video = OpenedVideo::new(Box::new(InMemoryVideo::solid(10, 2, 2)));
        let mut model = MockPolicyModel::with_pattern(|img| {
            if img.frame_index == 5 {
                Err(ScoringError::InvalidDistribution("nan".to_string()))
            } else {
                Ok(ActionDistribution::uniform(2))
            }
        });
        let config = AuditConfig {
            num_samples: 10,
            on_scoring_error: ScoringErrorPolicy::AbortAll,
            ..Default::default()
        };

        let err = audit_video(video, &mut model, "x", &config, &mut NoProgress).unwrap_err();
        assert_eq!(err.frames_analyzed(), 5);
    }

    #[test]
    fn test_audit_path_missing_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = MockPolicyModel::confident();
        let err = audit_path(
            &ImageSequenceSource,
            &dir.path().join("nope"),
            &mut model,
            "x",
            &AuditConfig::default(),
            &mut NoProgress,
        )
        .unwrap_err();
        assert_eq!(err.stage(), AuditStage::OpenVideo);
    }

    /// 记录打开次数的内存视频源
    struct CountingSource {
        opens: std::cell::Cell<usize>,
    }

    impl VideoSource for CountingSource {
        fn open(
            &self,
            _path: &Path,
        ) -> Result<Box<dyn crate::core::video::VideoHandle>, crate::core::video::DecodeError> {
            self.opens.set(self.opens.get() + 1);
            Ok(Box::new(InMemoryVideo::solid(20, 2, 2)))
        }
    }

    #[test]
    fn test_audit_path_validates_before_open() {
        let source = CountingSource {
            opens: std::cell::Cell::new(0),
        };
        let mut model = MockPolicyModel::confident();
        let bad = AuditConfig {
            smoothing_window: 0,
            ..Default::default()
        };

        let err = audit_path(&source, Path::new("mem"), &mut model, "x", &bad, &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.stage(), AuditStage::Configuration);
        assert_eq!(source.opens.get(), 0);

        // 超出推荐范围的阈值只告警，运行照常完成
        let unusual = AuditConfig {
            threshold: 7.5,
            num_samples: 15,
            ..Default::default()
        };
        let report =
            audit_path(&source, Path::new("mem"), &mut model, "x", &unusual, &mut NoProgress)
                .unwrap();
        assert_eq!(source.opens.get(), 1);
        assert_eq!(report.frames_analyzed(), 15);
        assert_eq!(report.result.verdict, Verdict::Pass);
    }

    #[test]
    fn test_audit_path_image_sequence() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..12 {
            image::RgbImage::from_pixel(8, 8, image::Rgb([i as u8 * 20, 0, 0]))
                .save(dir.path().join(format!("{:04}.png", i)))
                .unwrap();
        }
        let mut model = MockPolicyModel::confident();

        let report = audit_path(
            &ImageSequenceSource,
            dir.path(),
            &mut model,
            "fold the towel",
            &AuditConfig::quick(),
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(report.total_frames, 12);
        assert_eq!(report.frames_analyzed(), 10);
        assert_eq!(report.result.verdict, Verdict::Pass);
    }
}
