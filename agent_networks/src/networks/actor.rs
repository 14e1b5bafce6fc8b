//! Deterministic actor: state -> action in [-1, 1].
//!
//! ```text
//! state ──► Linear(state_dim → mid) ──► ReLU ──► body ──► Linear(· → action_dim) ──► Tanh
//! ```
//!
//! With a nonzero `noise_std` the tanh output goes through
//! [`add_action_noise`], which can leave `[-1, 1]` only through its
//! resampling branch (see its docs).

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_features, ensure_noise_std, ensure_positive, NetworkError};
use crate::exploration::{add_action_noise, DropRate, NoiseSource, TensorNoise};
use crate::nn::{BodyBlock, BodyKind};

/// Configuration for [`Actor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    pub state_dim: usize,
    pub action_dim: usize,
    /// Hidden width.
    pub mid_dim: usize,
    /// DenseNet body instead of ResNet.
    pub use_densenet: bool,
}

impl ActorConfig {
    pub fn new(state_dim: usize, action_dim: usize, mid_dim: usize) -> Self {
        Self {
            state_dim,
            action_dim,
            mid_dim,
            use_densenet: false,
        }
    }

    /// Set whether the body is a DenseNet instead of a ResNet.
    pub fn with_densenet(mut self, use_densenet: bool) -> Self {
        self.use_densenet = use_densenet;
        self
    }

    /// Get body architecture.
    pub fn body_kind(&self) -> BodyKind {
        BodyKind::from_use_densenet(self.use_densenet)
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        ensure_positive("state_dim", self.state_dim)?;
        ensure_positive("action_dim", self.action_dim)?;
        ensure_positive("mid_dim", self.mid_dim)
    }

    /// Build the actor on `device`. The device is fixed for the actor's lifetime.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Actor<B>, NetworkError> {
        self.validate()?;
        let body_kind = self.body_kind();

        log::debug!(
            "Actor: state_dim={} action_dim={} mid_dim={} body={:?}",
            self.state_dim,
            self.action_dim,
            self.mid_dim,
            body_kind
        );

        Ok(Actor {
            input: LinearConfig::new(self.state_dim, self.mid_dim).init(device),
            body: body_kind.init(self.mid_dim, device),
            output: LinearConfig::new(body_kind.output_dim(self.mid_dim), self.action_dim)
                .init(device),
            state_dim: self.state_dim,
            action_dim: self.action_dim,
        })
    }
}

/// Deterministic policy network.
#[derive(Module, Debug)]
pub struct Actor<B: Backend> {
    input: Linear<B>,
    body: BodyBlock<B>,
    output: Linear<B>,
    state_dim: usize,
    action_dim: usize,
}

impl<B: Backend> Actor<B> {
    /// `[batch, state_dim] -> [batch, action_dim]`.
    ///
    /// `noise_std == 0` returns the plain tanh output.
    pub fn forward(&self, state: Tensor<B, 2>, noise_std: f32, drop_rate: DropRate) -> Tensor<B, 2> {
        self.forward_with_noise(state, noise_std, drop_rate, &TensorNoise)
    }

    /// [`Actor::forward`] drawing exploration noise from `noise`.
    pub fn forward_with_noise<N: NoiseSource<B>>(
        &self,
        state: Tensor<B, 2>,
        noise_std: f32,
        drop_rate: DropRate,
        noise: &N,
    ) -> Tensor<B, 2> {
        let action = tanh(self.output.forward(self.features(state, drop_rate)));
        if noise_std == 0.0 {
            action
        } else {
            add_action_noise(action, noise_std, noise)
        }
    }

    /// [`Actor::forward`] with the input width and `noise_std` checked first.
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

    /// Apply the exploration-noise policy to an action batch.
    pub fn add_noise(&self, action: Tensor<B, 2>, noise_std: f32) -> Tensor<B, 2> {
        add_action_noise(action, noise_std, &TensorNoise)
    }

    /// Get state dimension.
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    /// Get action dimension.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Get body architecture.
    pub fn body_kind(&self) -> BodyKind {
        self.body.kind()
    }

    /// Output of the body block, i.e. the input of the output layer.
    pub(crate) fn features(&self, state: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        let x = relu(self.input.forward(state));
        self.body.forward(x, drop_rate)
    }
}
