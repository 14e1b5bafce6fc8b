//! Q(s, a) critics.
//!
//! ```text
//! Critic:     cat(s, a) ──► Linear ──► ReLU ──► body ──► head ──► Tanh
//! CriticTwin: cat(s, a) ─┬► Linear ──► ReLU ──► body ──► head   (net1)
//!                        └► Linear ──► ReLU ──► body ──► head   (net2)
//! ```
//!
//! The single critic ends in a tanh, so its values are bounded to [-1, 1].
//! That bound is part of the architecture. The twin critic has no tanh.
//!
//! The head is optionally spectrally normalized. Do not combine a normalized
//! head with soft target-network updates; this is not checked.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_features, ensure_positive, ensure_same_batch, NetworkError};
use crate::exploration::DropRate;
use crate::nn::{BodyBlock, BodyKind, OutputHead};

/// Configuration shared by [`Critic`] and [`CriticTwin`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticConfig {
    pub state_dim: usize,
    pub action_dim: usize,
    /// Hidden width.
    pub mid_dim: usize,
    /// DenseNet body instead of ResNet.
    pub use_densenet: bool,
    /// Spectrally normalize the output layer.
    pub use_spectral_norm: bool,
    /// Width of the value output. 1 for Q(s, a).
    pub output_dim: usize,
}

impl CriticConfig {
    pub fn new(state_dim: usize, action_dim: usize, mid_dim: usize) -> Self {
        Self {
            state_dim,
            action_dim,
            mid_dim,
            use_densenet: false,
            use_spectral_norm: false,
            output_dim: 1,
        }
    }

    /// Set whether the body is a DenseNet instead of a ResNet.
    pub fn with_densenet(mut self, use_densenet: bool) -> Self {
        self.use_densenet = use_densenet;
        self
    }

    /// Set whether the output layer is spectrally normalized.
    pub fn with_spectral_norm(mut self, use_spectral_norm: bool) -> Self {
        self.use_spectral_norm = use_spectral_norm;
        self
    }

    /// Set width of the value output.
    pub fn with_output_dim(mut self, output_dim: usize) -> Self {
        self.output_dim = output_dim;
        self
    }

    /// Get body architecture.
    pub fn body_kind(&self) -> BodyKind {
        BodyKind::from_use_densenet(self.use_densenet)
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        ensure_positive("state_dim", self.state_dim)?;
        ensure_positive("action_dim", self.action_dim)?;
        ensure_positive("mid_dim", self.mid_dim)?;
        ensure_positive("output_dim", self.output_dim)
    }

    /// Build a single tanh-bounded critic on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Critic<B>, NetworkError> {
        self.validate()?;
        self.log_construction("Critic");
        Ok(Critic {
            net: self.init_branch(device),
            state_dim: self.state_dim,
            action_dim: self.action_dim,
        })
    }

    /// Build a twin critic on `device`. The two branches are initialized
    /// independently and share no parameters.
    pub fn init_twin<B: Backend>(&self, device: &B::Device) -> Result<CriticTwin<B>, NetworkError> {
        self.validate()?;
        self.log_construction("CriticTwin");
        Ok(CriticTwin {
            net1: self.init_branch(device),
            net2: self.init_branch(device),
            state_dim: self.state_dim,
            action_dim: self.action_dim,
        })
    }

    fn init_branch<B: Backend>(&self, device: &B::Device) -> CriticBranch<B> {
        let body_kind = self.body_kind();
        CriticBranch {
            input: LinearConfig::new(self.state_dim + self.action_dim, self.mid_dim).init(device),
            body: body_kind.init(self.mid_dim, device),
            head: OutputHead::new(
                body_kind.output_dim(self.mid_dim),
                self.output_dim,
                self.use_spectral_norm,
                device,
            ),
        }
    }

    fn log_construction(&self, name: &str) {
        log::debug!(
            "{}: state_dim={} action_dim={} mid_dim={} body={:?} spectral_norm={} output_dim={}",
            name,
            self.state_dim,
            self.action_dim,
            self.mid_dim,
            self.body_kind(),
            self.use_spectral_norm,
            self.output_dim
        );
        if self.use_spectral_norm {
            log::debug!("{}: spectral-norm head, do not pair with soft target updates", name);
        }
    }
}

/// One Q pipeline without a final activation.
#[derive(Module, Debug)]
pub struct CriticBranch<B: Backend> {
    input: Linear<B>,
    body: BodyBlock<B>,
    head: OutputHead<B>,
}

impl<B: Backend> CriticBranch<B> {
    /// `[batch, state_dim + action_dim] -> [batch, output_dim]`.
    pub fn forward(&self, x: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        let x = relu(self.input.forward(x));
        self.head.forward(self.body.forward(x, drop_rate))
    }

    /// Get body architecture.
    pub fn body_kind(&self) -> BodyKind {
        self.body.kind()
    }

    /// Whether the output layer is spectrally normalized.
    pub fn is_spectral(&self) -> bool {
        self.head.is_spectral()
    }

    fn update_spectral_norm(mut self) -> Self {
        self.head = self.head.update_spectral_norm();
        self
    }
}

/// Single critic, values bounded by tanh.
#[derive(Module, Debug)]
pub struct Critic<B: Backend> {
    net: CriticBranch<B>,
    state_dim: usize,
    action_dim: usize,
}

impl<B: Backend> Critic<B> {
    /// `([batch, state_dim], [batch, action_dim]) -> [batch, output_dim]`.
    pub fn forward(&self, state: Tensor<B, 2>, action: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        let x = Tensor::cat(vec![state, action], 1);
        tanh(self.net.forward(x, drop_rate))
    }

    /// [`Critic::forward`] with input shapes checked first.
    pub fn try_forward(
        &self,
        state: Tensor<B, 2>,
        action: Tensor<B, 2>,
        drop_rate: DropRate,
    ) -> Result<Tensor<B, 2>, NetworkError> {
        check_state_action(&state, &action, self.state_dim, self.action_dim)?;
        Ok(self.forward(state, action, drop_rate))
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
        self.net.body_kind()
    }

    /// Whether the output layer is spectrally normalized.
    pub fn is_spectral(&self) -> bool {
        self.net.is_spectral()
    }

    /// Advance the power iteration of a spectral head. Call after each
    /// optimizer step; a no-op without `use_spectral_norm`.
    pub fn update_spectral_norm(mut self) -> Self {
        self.net = self.net.update_spectral_norm();
        self
    }
}

/// Two independent critics for clipped double-Q targets.
#[derive(Module, Debug)]
pub struct CriticTwin<B: Backend> {
    net1: CriticBranch<B>,
    net2: CriticBranch<B>,
    state_dim: usize,
    action_dim: usize,
}

impl<B: Backend> CriticTwin<B> {
    /// Q1 only. This is the path the actor loss differentiates through.
    pub fn forward(&self, state: Tensor<B, 2>, action: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        let x = Tensor::cat(vec![state, action], 1);
        self.net1.forward(x, drop_rate)
    }

    /// `(Q1, Q2)` for the same inputs.
    pub fn get_q1_q2(
        &self,
        state: Tensor<B, 2>,
        action: Tensor<B, 2>,
        drop_rate: DropRate,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let x = Tensor::cat(vec![state, action], 1);
        let q1 = self.net1.forward(x.clone(), drop_rate);
        let q2 = self.net2.forward(x, drop_rate);
        (q1, q2)
    }

    /// Elementwise `min(Q1, Q2)`.
    pub fn min_q(&self, state: Tensor<B, 2>, action: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        let (q1, q2) = self.get_q1_q2(state, action, drop_rate);
        q1.min_pair(q2)
    }

    /// [`CriticTwin::forward`] with input shapes checked first.
    pub fn try_forward(
        &self,
        state: Tensor<B, 2>,
        action: Tensor<B, 2>,
        drop_rate: DropRate,
    ) -> Result<Tensor<B, 2>, NetworkError> {
        check_state_action(&state, &action, self.state_dim, self.action_dim)?;
        Ok(self.forward(state, action, drop_rate))
    }

    /// [`CriticTwin::get_q1_q2`] with input shapes checked first.
    pub fn try_get_q1_q2(
        &self,
        state: Tensor<B, 2>,
        action: Tensor<B, 2>,
        drop_rate: DropRate,
    ) -> Result<(Tensor<B, 2>, Tensor<B, 2>), NetworkError> {
        check_state_action(&state, &action, self.state_dim, self.action_dim)?;
        Ok(self.get_q1_q2(state, action, drop_rate))
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
        self.net1.body_kind()
    }

    /// Whether the output layer is spectrally normalized.
    pub fn is_spectral(&self) -> bool {
        self.net1.is_spectral()
    }

    /// Advance the power iteration of both spectral heads.
    pub fn update_spectral_norm(mut self) -> Self {
        self.net1 = self.net1.update_spectral_norm();
        self.net2 = self.net2.update_spectral_norm();
        self
    }
}

pub(crate) fn check_state_action<B: Backend>(
    state: &Tensor<B, 2>,
    action: &Tensor<B, 2>,
    state_dim: usize,
    action_dim: usize,
) -> Result<(), NetworkError> {
    ensure_features("state", state.dims(), state_dim)?;
    ensure_features("action", action.dims(), action_dim)?;
    ensure_same_batch(state.dims(), action.dims())
}
