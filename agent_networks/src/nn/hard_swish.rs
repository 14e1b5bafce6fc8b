//! HardSwish activation: `relu6(x + 3) / 6 * x`.

use burn::module::Module;
use burn::prelude::*;

/// Piecewise-linear approximation of swish. Stateless.
#[derive(Module, Clone, Debug, Default)]
pub struct HardSwish;

impl HardSwish {
    pub fn new() -> Self {
        Self
    }

    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        hard_swish(input)
    }
}

/// Elementwise `relu6(x + 3) / 6 * x`, where relu6 clamps to [0, 6].
pub fn hard_swish<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clone().add_scalar(3.0).clamp(0.0, 6.0).div_scalar(6.0) * x
}
