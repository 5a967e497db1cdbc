use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Reject,
}

impl Verdict {
    pub fn is_reject(&self) -> bool {
        matches!(self, Verdict::Reject)
    }
}

/// 动作区平均熵达到阈值（含等于）即拒绝
pub fn decide(action_zone_average: f32, threshold: f32) -> Verdict {
    if action_zone_average >= threshold {
        Verdict::Reject
    } else {
        Verdict::Pass
    }
}
