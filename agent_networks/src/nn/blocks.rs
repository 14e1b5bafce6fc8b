//! Body blocks placed between a network's input projection and its head.
//!
//! - [`ResNet`]: two dense layers with one additive skip. Width is preserved.
//! - [`DenseNet`]: two dense layers with concatenative skips. Width grows
//!   `mid_dim -> 2 * mid_dim -> 4 * mid_dim`, followed by dropout at a rate
//!   chosen by the caller for each call.
//!
//! ```text
//! ResNet:    x ──► dense1 ──► dense2 ──► (+) ──► out        [b, mid]
//!            └──────────────────────────┘
//!
//! DenseNet:  x ──► dense1 ──► cat(x, ·) ──► dense2 ──► cat(·, ·) ──► dropout
//!            [b, mid]         [b, 2mid]               [b, 4mid]
//! ```

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::exploration::DropRate;
use crate::nn::hard_swish::HardSwish;

/// Linear layer followed by HardSwish.
#[derive(Module, Debug)]
pub struct DenseUnit<B: Backend> {
    linear: Linear<B>,
    activation: HardSwish,
}

impl<B: Backend> DenseUnit<B> {
    pub fn new(d_input: usize, d_output: usize, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(d_input, d_output).init(device),
            activation: HardSwish::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.activation.forward(self.linear.forward(x))
    }
}

/// Residual block: `dense2(dense1(x)) + x`.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    dense1: DenseUnit<B>,
    dense2: DenseUnit<B>,
}

impl<B: Backend> ResNet<B> {
    pub fn new(mid_dim: usize, device: &B::Device) -> Self {
        Self {
            dense1: DenseUnit::new(mid_dim, mid_dim, device),
            dense2: DenseUnit::new(mid_dim, mid_dim, device),
        }
    }

    /// `[batch, mid_dim] -> [batch, mid_dim]`.
    pub fn forward(&self, x1: Tensor<B, 2>) -> Tensor<B, 2> {
        let x2 = self.dense1.forward(x1.clone());
        self.dense2.forward(x2) + x1
    }
}

/// Densely connected block with per-call dropout.
#[derive(Module, Debug)]
pub struct DenseNet<B: Backend> {
    dense1: DenseUnit<B>,
    dense2: DenseUnit<B>,
}

impl<B: Backend> DenseNet<B> {
    pub fn new(mid_dim: usize, device: &B::Device) -> Self {
        Self {
            dense1: DenseUnit::new(mid_dim, mid_dim, device),
            dense2: DenseUnit::new(mid_dim * 2, mid_dim * 2, device),
        }
    }

    /// `[batch, mid_dim] -> [batch, 4 * mid_dim]`, dropout applied at `drop_rate`.
    pub fn forward(&self, x1: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        let x2 = Tensor::cat(vec![x1.clone(), self.dense1.forward(x1)], 1);
        let x3 = Tensor::cat(vec![x2.clone(), self.dense2.forward(x2)], 1);
        drop_rate.apply(x3)
    }
}

/// Which body block a network uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyKind {
    /// [`ResNet`], output width `mid_dim`.
    #[default]
    Residual,
    /// [`DenseNet`], output width `4 * mid_dim`.
    Dense,
}

impl BodyKind {
    pub fn from_use_densenet(use_densenet: bool) -> Self {
        if use_densenet {
            BodyKind::Dense
        } else {
            BodyKind::Residual
        }
    }

    /// Feature width the block produces for a given `mid_dim`.
    pub fn output_dim(&self, mid_dim: usize) -> usize {
        match self {
            BodyKind::Residual => mid_dim,
            BodyKind::Dense => mid_dim * 4,
        }
    }

    pub fn init<B: Backend>(&self, mid_dim: usize, device: &B::Device) -> BodyBlock<B> {
        match self {
            BodyKind::Residual => BodyBlock::Residual(ResNet::new(mid_dim, device)),
            BodyKind::Dense => BodyBlock::Dense(DenseNet::new(mid_dim, device)),
        }
    }
}

/// A body block selected at construction time.
#[derive(Module, Debug)]
pub enum BodyBlock<B: Backend> {
    Residual(ResNet<B>),
    Dense(DenseNet<B>),
}

impl<B: Backend> BodyBlock<B> {
    /// `drop_rate` is ignored by the residual block.
    pub fn forward(&self, x: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        match self {
            BodyBlock::Residual(block) => block.forward(x),
            BodyBlock::Dense(block) => block.forward(x, drop_rate),
        }
    }

    /// Get body architecture.
    pub fn kind(&self) -> BodyKind {
        match self {
            BodyBlock::Residual(_) => BodyKind::Residual,
            BodyBlock::Dense(_) => BodyKind::Dense,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray<f32>;

    fn device() -> <B as Backend>::Device {
        Default::default()
    }

    #[test]
    fn test_resnet_preserves_shape() {
        let block = ResNet::<B>::new(8, &device());
        let x = Tensor::<B, 2>::random([3, 8], Distribution::Normal(0.0, 1.0), &device());
        assert_eq!(block.forward(x).dims(), [3, 8]);
    }

    #[test]
    fn test_resnet_skip_carries_input() {
        // Zeroed sublayers make the block an identity through the skip
        let mut block = ResNet::<B>::new(4, &device());
        block.dense2.linear = block.dense2.linear.clone().map(&mut ZeroMapper);

        let x = Tensor::<B, 2>::random([2, 4], Distribution::Normal(0.0, 1.0), &device());
        let y = block.forward(x.clone());

        let diff: f32 = (y - x).abs().max().into_scalar().elem();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_densenet_quadruples_width() {
        let block = DenseNet::<B>::new(8, &device());
        let x = Tensor::<B, 2>::random([3, 8], Distribution::Normal(0.0, 1.0), &device());
        assert_eq!(block.forward(x, DropRate::NONE).dims(), [3, 32]);
    }

    #[test]
    fn test_densenet_keeps_input_as_prefix() {
        let block = DenseNet::<B>::new(4, &device());
        let x = Tensor::<B, 2>::random([2, 4], Distribution::Normal(0.0, 1.0), &device());
        let y = block.forward(x.clone(), DropRate::NONE);

        let prefix = y.slice([0..2, 0..4]);
        let diff: f32 = (prefix - x).abs().max().into_scalar().elem();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_densenet_dropout_varies_output() {
        let block = DenseNet::<B>::new(16, &device());
        let x = Tensor::<B, 2>::ones([4, 16], &device());
        let rate = DropRate::new(0.2).unwrap();

        let first = block.forward(x.clone(), rate);
        let differs = (0..10).any(|_| {
            let next = block.forward(x.clone(), rate);
            let diff: f32 = (next - first.clone()).abs().sum().into_scalar().elem();
            diff > 0.0
        });
        assert!(differs, "dropout at p=0.2 should change the output across calls");
    }

    #[test]
    fn test_body_kind_dims() {
        assert_eq!(BodyKind::from_use_densenet(false).output_dim(8), 8);
        assert_eq!(BodyKind::from_use_densenet(true).output_dim(8), 32);

        let body: BodyBlock<B> = BodyKind::Dense.init(8, &device());
        assert_eq!(body.kind(), BodyKind::Dense);
        let x = Tensor::<B, 2>::zeros([3, 8], &device());
        assert_eq!(body.forward(x, DropRate::NONE).dims(), [3, 32]);
    }

    struct ZeroMapper;

    impl burn::module::ModuleMapper<B> for ZeroMapper {
        fn map_float<const D: usize>(
            &mut self,
            param: burn::module::Param<Tensor<B, D>>,
        ) -> burn::module::Param<Tensor<B, D>> {
            let zeros = param.val().zeros_like();
            burn::module::Param::from_tensor(zeros)
        }
    }
}
