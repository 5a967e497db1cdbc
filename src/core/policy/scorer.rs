//! 不确定性打分：一次模型调用 → 一个标量熵

use super::entropy::{shannon_entropy, softmax};
use super::error::ScoringError;
use super::model::{ActionDistribution, PolicyModel};
use crate::core::video::RasterImage;
use log::debug;

/// 概率和偏离 1 超过该值时重新归一化
const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;

pub struct UncertaintyScorer;

impl UncertaintyScorer {
    /// 调用一次模型并把输出分布压成一个非负熵值
    pub fn score(
        model: &mut dyn PolicyModel,
        image: &RasterImage,
        instruction: &str,
    ) -> Result<f32, ScoringError> {
        if !image.is_valid() {
            return Err(ScoringError::MalformedInput {
                frame_index: image.frame_index,
                reason: format!(
                    "{}x{} image with {} bytes",
                    image.width,
                    image.height,
                    image.data.len()
                ),
            });
        }

        let distribution = model.infer(instruction, image)?;
        let entropy = distribution_entropy(&distribution)?;

        debug!(
            "🎲 Frame {}: entropy {:.4} over {} step(s)",
            image.frame_index,
            entropy,
            distribution.steps().len()
        );
        Ok(entropy)
    }
}

/// 逐解码步计算熵后取算术平均；只有一步时即为该步的熵
pub fn distribution_entropy(distribution: &ActionDistribution) -> Result<f32, ScoringError> {
    let steps = distribution.steps();
    if steps.is_empty() {
        return Err(ScoringError::InvalidDistribution(
            "no decoding steps".to_string(),
        ));
    }

    let mut total = 0.0f64;
    for (position, step) in steps.iter().enumerate() {
        let probs = match distribution {
            ActionDistribution::Logits(_) => normalize_logits(step, position)?,
            ActionDistribution::Probabilities(_) => normalize_probabilities(step, position)?,
        };
        total += shannon_entropy(&probs) as f64;
    }

    Ok((total / steps.len() as f64) as f32)
}

fn normalize_logits(logits: &[f32], position: usize) -> Result<Vec<f32>, ScoringError> {
    if logits.is_empty() {
        return Err(ScoringError::InvalidDistribution(format!(
            "step {} has an empty vocabulary",
            position
        )));
    }
    if logits.iter().any(|x| x.is_nan() || *x == f32::INFINITY) {
        return Err(ScoringError::InvalidDistribution(format!(
            "step {} has NaN or +inf logits",
            position
        )));
    }

    let probs = softmax(logits);
    if probs.is_empty() {
        return Err(ScoringError::InvalidDistribution(format!(
            "step {} masks every token",
            position
        )));
    }
    Ok(probs)
}

fn normalize_probabilities(probs: &[f32], position: usize) -> Result<Vec<f32>, ScoringError> {
    if probs.is_empty() {
        return Err(ScoringError::InvalidDistribution(format!(
            "step {} has an empty vocabulary",
            position
        )));
    }
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(ScoringError::InvalidDistribution(format!(
            "step {} has negative or non-finite probabilities",
            position
        )));
    }

    let sum: f32 = probs.iter().sum();
    if sum <= 0.0 {
        return Err(ScoringError::InvalidDistribution(format!(
            "step {} has zero total probability",
            position
        )));
    }

    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        debug!("Step {} probabilities sum to {:.4}, renormalizing", position, sum);
        return Ok(probs.iter().map(|p| p / sum).collect());
    }
    Ok(probs.to_vec())
}
