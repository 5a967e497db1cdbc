//! 动作 token 分布的香农熵

/// 防止 ln(0) 的加性平滑，对非退化分布的熵几乎无影响
pub const ENTROPY_EPSILON: f64 = 1e-9;

/// 数值稳定的 softmax：先减去最大值再取指数
///
/// `-inf` 视为被屏蔽的 token，概率为 0。全部为 `-inf` 时返回空数组。
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_val = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    if !max_val.is_finite() {
        return vec![];
    }

    let exp_vals: Vec<f64> = logits
        .iter()
        .map(|&x| ((x - max_val) as f64).exp())
        .collect();
    let total: f64 = exp_vals.iter().sum();

    exp_vals.iter().map(|&e| (e / total) as f32).collect()
}

/// H = -Σ p·ln(p + ε)，单位 nat
pub fn shannon_entropy(probs: &[f32]) -> f32 {
    let h: f64 = probs
        .iter()
        .map(|&p| {
            let p = p as f64;
            -p * (p + ENTROPY_EPSILON).ln()
        })
        .sum();
    // ε 会让确定分布得到 -1e-9 量级的负值
    h.max(0.0) as f32
}
