use crate::error::Result;
use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Weights,
    Biases,
}

/// Identifies one parameter tensor of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId {
    pub layer: usize,
    pub kind: ParamKind,
}

/// Parameter update policy.
///
/// `Network::apply_gradients` calls this once per tensor, in layer order,
/// weights before biases. Implementations own whatever per-parameter state
/// they need.
pub trait UpdateRule {
    fn update(
        &mut self,
        param: ParamId,
        values: &mut Matrix,
        gradient: &Matrix,
        learning_rate: f64,
    ) -> Result<()>;
}
