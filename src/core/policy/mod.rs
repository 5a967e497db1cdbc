//! 策略模型打分：外部模型能力 + 动作 token 熵

pub mod entropy;
pub mod error;
pub mod model;
pub mod scorer;

pub use entropy::{shannon_entropy, softmax, ENTROPY_EPSILON};
pub use error::ScoringError;
pub use model::{ActionDistribution, MockPolicyModel, PolicyModel};
pub use scorer::{distribution_entropy, UncertaintyScorer};
