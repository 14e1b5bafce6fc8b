//! Discrete-action Q network: state -> one value per action.
//!
//! ```text
//! state ──► Linear(state_dim → mid) ──► ReLU ──► DenseNet ──► SN-Linear(4·mid → action_dim)
//! ```
//!
//! Exploration noise is plain additive Gaussian noise on the Q values. There
//! is no clipping or resampling, unlike the actor's action noise.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_features, ensure_noise_std, ensure_positive, NetworkError};
use crate::exploration::{add_value_noise, DropRate, NoiseSource, TensorNoise};
use crate::nn::{DenseNet, SpectralNormLinear, SpectralNormLinearConfig};

/// Configuration for [`QNetwork`].
///
/// The output layer is always spectrally normalized, so a QNetwork must not
/// be tracked by soft target updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetworkConfig {
    pub state_dim: usize,
    /// Number of discrete actions.
    pub action_dim: usize,
    /// Hidden width.
    pub mid_dim: usize,
}

impl QNetworkConfig {
    pub fn new(state_dim: usize, action_dim: usize, mid_dim: usize) -> Self {
        Self {
            state_dim,
            action_dim,
            mid_dim,
        }
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        ensure_positive("state_dim", self.state_dim)?;
        ensure_positive("action_dim", self.action_dim)?;
        ensure_positive("mid_dim", self.mid_dim)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<QNetwork<B>, NetworkError> {
        self.validate()?;
        log::debug!(
            "QNetwork: state_dim={} action_dim={} mid_dim={}",
            self.state_dim,
            self.action_dim,
            self.mid_dim
        );

        Ok(QNetwork {
            input: LinearConfig::new(self.state_dim, self.mid_dim).init(device),
            body: DenseNet::new(self.mid_dim, device),
            head: SpectralNormLinearConfig::new(self.mid_dim * 4, self.action_dim).init(device),
            state_dim: self.state_dim,
            action_dim: self.action_dim,
        })
    }
}

#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    input: Linear<B>,
    body: DenseNet<B>,
    head: SpectralNormLinear<B>,
    state_dim: usize,
    action_dim: usize,
}

impl<B: Backend> QNetwork<B> {
    /// `[batch, state_dim] -> [batch, action_dim]`.
    pub fn forward(&self, state: Tensor<B, 2>, noise_std: f32, drop_rate: DropRate) -> Tensor<B, 2> {
        self.forward_with_noise(state, noise_std, drop_rate, &TensorNoise)
    }

    /// [`QNetwork::forward`] drawing noise from `noise`.
    pub fn forward_with_noise<N: NoiseSource<B>>(
        &self,
        state: Tensor<B, 2>,
        noise_std: f32,
        drop_rate: DropRate,
        noise: &N,
    ) -> Tensor<B, 2> {
        let x = relu(self.input.forward(state));
        let q = self.head.forward(self.body.forward(x, drop_rate));
        if noise_std == 0.0 {
            q
        } else {
            add_value_noise(q, noise_std, noise)
        }
    }

    /// [`QNetwork::forward`] with the input width and `noise_std` checked first.
    pub fn try_forward(
        &self,
        state: Tensor<B, 2>,
        noise_std: f32,
        drop_rate: DropRate,
    ) -> Result<Tensor<B, 2>, NetworkError> {
        ensure_features("state", state.dims(), self.state_dim)?;
        ensure_noise_std(noise_std)?;
        Ok(self.forward(state, noise_std, drop_rate))
    }

    /// Advance the power iteration of the output layer. Call after each
    /// optimizer step so the head's Lipschitz bound stays tight.
    pub fn update_spectral_norm(mut self) -> Self {
        self.head = self.head.update_singular_vectors();
        self
    }

    /// Get state dimension.
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    /// Get number of discrete actions.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploration::noise::tests::FixedNoise;
    use crate::nn::spectral_norm::tests::reference_norm;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray<f32>;

    fn device() -> <B as Backend>::Device {
        Default::default()
    }

    #[test]
    fn test_q_values_per_action() {
        let net = QNetworkConfig::new(4, 3, 8).init::<B>(&device()).unwrap();
        let state = Tensor::<B, 2>::random([5, 4], Distribution::Normal(0.0, 1.0), &device());
        assert_eq!(net.forward(state, 0.0, DropRate::NONE).dims(), [5, 3]);
    }

    #[test]
    fn test_noise_is_added_unclipped() {
        let net = QNetworkConfig::new(4, 3, 8).init::<B>(&device()).unwrap();
        let state = Tensor::<B, 2>::random([5, 4], Distribution::Normal(0.0, 1.0), &device());

        let clean = net.forward(state.clone(), 0.0, DropRate::NONE);
        let noisy = net.forward_with_noise(
            state,
            1.0,
            DropRate::NONE,
            &FixedNoise { gaussian: 10.0, uniform: 0.0 },
        );

        // Far outside [-1, 1], kept as-is
        let shift: f32 = (noisy - clean).mean().into_scalar().elem();
        assert!((shift - 10.0).abs() < 1e-4, "got {}", shift);
    }

    #[test]
    fn test_update_spectral_norm_bounds_head() {
        let mut net = QNetworkConfig::new(4, 6, 8).init::<B>(&device()).unwrap();
        for _ in 0..200 {
            net = net.update_spectral_norm();
        }

        let norm = reference_norm(net.head.normalized_weight());
        assert!((norm - 1.0).abs() < 1e-2, "||W_sn||_2 = {}", norm);
    }

    #[test]
    fn test_try_forward_reports_wrong_width() {
        let net = QNetworkConfig::new(4, 3, 8).init::<B>(&device()).unwrap();
        let state = Tensor::<B, 2>::zeros([2, 6], &device());
        assert_eq!(
            net.try_forward(state, 0.0, DropRate::NONE).unwrap_err(),
            NetworkError::ShapeMismatch { input: "state", expected: 4, actual: 6 }
        );
    }
}
