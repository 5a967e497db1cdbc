use super::error::ScoringError;
use crate::core::video::RasterImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 模型对下一动作的输出：每个解码步一行，覆盖固定词表
#[derive(Debug, Clone, PartialEq)]
pub enum ActionDistribution {
    /// 未归一化分数
    Logits(Vec<Vec<f32>>),
    /// 已归一化的概率
    Probabilities(Vec<Vec<f32>>),
}

impl ActionDistribution {
    pub fn single_logits(logits: Vec<f32>) -> Self {
        ActionDistribution::Logits(vec![logits])
    }

    pub fn single_probabilities(probs: Vec<f32>) -> Self {
        ActionDistribution::Probabilities(vec![probs])
    }

    /// `vocab_size` 上的均匀分布，熵为 ln(vocab_size)
    pub fn uniform(vocab_size: usize) -> Self {
        Self::single_logits(vec![0.0; vocab_size])
    }

    pub fn steps(&self) -> &[Vec<f32>] {
        match self {
            ActionDistribution::Logits(steps) | ActionDistribution::Probabilities(steps) => steps,
        }
    }
}

/// 冻结的 VLA 策略模型能力
///
/// 模型加载、量化、设备放置都是一次性的外部准备工作；
/// 这里只需要"图像 + 指令 → 动作 token 分布"。
pub trait PolicyModel: Send {
    fn infer(
        &mut self,
        instruction: &str,
        image: &RasterImage,
    ) -> Result<ActionDistribution, ScoringError>;
}

type DistributionFn = Box<dyn Fn(&RasterImage) -> Result<ActionDistribution, ScoringError> + Send>;

/// 按帧号返回预设分布的模型（用于测试和演示）
pub struct MockPolicyModel {
    pattern: DistributionFn,
    calls: Arc<AtomicUsize>,
}

impl MockPolicyModel {
    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&RasterImage) -> Result<ActionDistribution, ScoringError> + Send + 'static,
    {
        Self {
            pattern: Box::new(pattern),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 每帧输出 `vocab_for(frame_index)` 大小的均匀分布
    pub fn with_vocab_sizes<F>(vocab_for: F) -> Self
    where
        F: Fn(usize) -> usize + Send + 'static,
    {
        Self::with_pattern(move |image| Ok(ActionDistribution::uniform(vocab_for(image.frame_index))))
    }

    /// 所有帧都是确定分布（熵为 0）
    pub fn confident() -> Self {
        Self::with_pattern(|_| Ok(ActionDistribution::single_probabilities(vec![1.0, 0.0, 0.0])))
    }

    pub fn unavailable(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::with_pattern(move |_| Err(ScoringError::Unavailable(reason.clone())))
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl PolicyModel for MockPolicyModel {
    fn infer(
        &mut self,
        _instruction: &str,
        image: &RasterImage,
    ) -> Result<ActionDistribution, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.pattern)(image)
    }
}
