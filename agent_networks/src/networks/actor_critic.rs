//! Combined actor-critic sharing one DenseNet core.
//!
//! ```text
//! actor:   s ──► enc_s ─────────────────► core ──► dec_a ──► a
//! critic:  s ──► enc_s ──┐
//!                        (+) ──► core ──► dec_q ──► q
//!          a ──► enc_a ──┘
//! ```
//!
//! - `enc_s`, `enc_a`: Linear → ReLU → Linear, into `mid_dim`
//! - `core`: [`DenseNet`], `mid_dim → 4·mid_dim`, owned once and used by both paths
//! - `dec_a`: Linear → HardSwish → Linear → Tanh
//! - `dec_q`: Linear → HardSwish → SN-Linear(· → 1)
//!
//! [`ActorCritic::next_q_a`] computes the current action and a next-state
//! target in one pass. The target is the equal-weight mean of a noiseless and
//! a noise-perturbed estimate.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_features, ensure_noise_std, ensure_positive, ensure_same_batch, NetworkError};
use crate::exploration::{add_action_noise, DropRate, NoiseSource, TensorNoise};
use crate::networks::critic::check_state_action;
use crate::nn::{DenseNet, HardSwish, SpectralNormLinear, SpectralNormLinearConfig};

/// Configuration for [`ActorCritic`].
///
/// The value decoder ends in a spectrally normalized layer, so the model
/// must not be tracked by soft target updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorCriticConfig {
    pub state_dim: usize,
    pub action_dim: usize,
    /// Hidden width.
    pub mid_dim: usize,
}

impl ActorCriticConfig {
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

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ActorCritic<B>, NetworkError> {
        self.validate()?;
        log::debug!(
            "ActorCritic: state_dim={} action_dim={} mid_dim={} core=DenseNet({})",
            self.state_dim,
            self.action_dim,
            self.mid_dim,
            self.mid_dim * 4
        );

        let mid = self.mid_dim;
        Ok(ActorCritic {
            enc_s: Encoder::new(self.state_dim, mid, device),
            enc_a: Encoder::new(self.action_dim, mid, device),
            core: DenseNet::new(mid, device),
            dec_a: ActionDecoder::new(mid * 4, mid, self.action_dim, device),
            dec_q: ValueDecoder::new(mid * 4, mid, device),
            state_dim: self.state_dim,
            action_dim: self.action_dim,
        })
    }
}

/// Linear → ReLU → Linear.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    first: Linear<B>,
    second: Linear<B>,
}

impl<B: Backend> Encoder<B> {
    fn new(d_input: usize, mid_dim: usize, device: &B::Device) -> Self {
        Self {
            first: LinearConfig::new(d_input, mid_dim).init(device),
            second: LinearConfig::new(mid_dim, mid_dim).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.second.forward(relu(self.first.forward(x)))
    }
}

/// Linear → HardSwish → Linear → Tanh.
#[derive(Module, Debug)]
pub struct ActionDecoder<B: Backend> {
    first: Linear<B>,
    activation: HardSwish,
    second: Linear<B>,
}

impl<B: Backend> ActionDecoder<B> {
    fn new(d_input: usize, mid_dim: usize, action_dim: usize, device: &B::Device) -> Self {
        Self {
            first: LinearConfig::new(d_input, mid_dim).init(device),
            activation: HardSwish::new(),
            second: LinearConfig::new(mid_dim, action_dim).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.first.forward(x));
        tanh(self.second.forward(x))
    }
}

/// Linear → HardSwish → SN-Linear(· → 1).
#[derive(Module, Debug)]
pub struct ValueDecoder<B: Backend> {
    first: Linear<B>,
    activation: HardSwish,
    head: SpectralNormLinear<B>,
}

impl<B: Backend> ValueDecoder<B> {
    fn new(d_input: usize, mid_dim: usize, device: &B::Device) -> Self {
        Self {
            first: LinearConfig::new(d_input, mid_dim).init(device),
            activation: HardSwish::new(),
            head: SpectralNormLinearConfig::new(mid_dim, 1).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.head.forward(self.activation.forward(self.first.forward(x)))
    }

    fn update_spectral_norm(mut self) -> Self {
        self.head = self.head.update_singular_vectors();
        self
    }
}

/// Result of [`ActorCritic::next_q_a`].
#[derive(Debug, Clone)]
pub struct TargetEstimate<B: Backend> {
    /// `(q_noiseless + q_noisy) * 0.5`, shape [batch, 1].
    pub q_target: Tensor<B, 2>,
    /// Q(s', a) with the action as decoded.
    pub q_noiseless: Tensor<B, 2>,
    /// Q(s', a + noise) after the action-noise policy.
    pub q_noisy: Tensor<B, 2>,
    /// The action for the current state, shape [batch, action_dim].
    pub action: Tensor<B, 2>,
}

#[derive(Module, Debug)]
pub struct ActorCritic<B: Backend> {
    enc_s: Encoder<B>,
    enc_a: Encoder<B>,
    core: DenseNet<B>,
    dec_a: ActionDecoder<B>,
    dec_q: ValueDecoder<B>,
    state_dim: usize,
    action_dim: usize,
}

impl<B: Backend> ActorCritic<B> {
    /// Actor path. `[batch, state_dim] -> [batch, action_dim]`.
    pub fn forward(&self, state: Tensor<B, 2>, noise_std: f32, drop_rate: DropRate) -> Tensor<B, 2> {
        self.forward_with_noise(state, noise_std, drop_rate, &TensorNoise)
    }

    /// [`ActorCritic::forward`] drawing exploration noise from `noise`.
    pub fn forward_with_noise<N: NoiseSource<B>>(
        &self,
        state: Tensor<B, 2>,
        noise_std: f32,
        drop_rate: DropRate,
        noise: &N,
    ) -> Tensor<B, 2> {
        let action = self.act(self.enc_s.forward(state), drop_rate);
        if noise_std == 0.0 {
            action
        } else {
            add_action_noise(action, noise_std, noise)
        }
    }

    /// Critic path. `([batch, state_dim], [batch, action_dim]) -> [batch, 1]`.
    ///
    /// # Panics
    ///
    /// If `state` and `action` have different batch sizes.
    pub fn critic(&self, state: Tensor<B, 2>, action: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        let s_ = self.enc_s.forward(state);
        let a_ = self.enc_a.forward(action);
        self.evaluate(s_, a_, drop_rate)
    }

    /// Current action for `state` and a target value for `state_next`.
    ///
    /// The state encoding of `state_next` is computed once and used for both
    /// target branches. `drop_rate` applies to every pass through the core.
    ///
    /// # Panics
    ///
    /// If `state` and `state_next` have different batch sizes.
    pub fn next_q_a(
        &self,
        state: Tensor<B, 2>,
        state_next: Tensor<B, 2>,
        noise_std: f32,
        drop_rate: DropRate,
    ) -> TargetEstimate<B> {
        self.next_q_a_with_noise(state, state_next, noise_std, drop_rate, &TensorNoise)
    }

    /// [`ActorCritic::next_q_a`] drawing the target-branch noise from `noise`.
    pub fn next_q_a_with_noise<N: NoiseSource<B>>(
        &self,
        state: Tensor<B, 2>,
        state_next: Tensor<B, 2>,
        noise_std: f32,
        drop_rate: DropRate,
        noise: &N,
    ) -> TargetEstimate<B> {
        let action = self.act(self.enc_s.forward(state), drop_rate);
        let s_next_ = self.enc_s.forward(state_next);

        let a_ = self.enc_a.forward(action.clone());
        let q_noiseless = self.evaluate(s_next_.clone(), a_, drop_rate);

        let a_noise = add_action_noise(action.clone(), noise_std, noise);
        let a_noise_ = self.enc_a.forward(a_noise);
        let q_noisy = self.evaluate(s_next_, a_noise_, drop_rate);

        let q_target = (q_noiseless.clone() + q_noisy.clone()).mul_scalar(0.5);

        TargetEstimate {
            q_target,
            q_noiseless,
            q_noisy,
            action,
        }
    }

    /// Apply the exploration-noise policy to an action batch.
    pub fn add_noise(&self, action: Tensor<B, 2>, noise_std: f32) -> Tensor<B, 2> {
        add_action_noise(action, noise_std, &TensorNoise)
    }

    /// [`ActorCritic::forward`] with the input width and `noise_std` checked first.
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

    /// [`ActorCritic::critic`] with input shapes checked first.
    pub fn try_critic(
        &self,
        state: Tensor<B, 2>,
        action: Tensor<B, 2>,
        drop_rate: DropRate,
    ) -> Result<Tensor<B, 2>, NetworkError> {
        check_state_action(&state, &action, self.state_dim, self.action_dim)?;
        Ok(self.critic(state, action, drop_rate))
    }

    /// [`ActorCritic::next_q_a`] with input shapes and `noise_std` checked first.
    pub fn try_next_q_a(
        &self,
        state: Tensor<B, 2>,
        state_next: Tensor<B, 2>,
        noise_std: f32,
        drop_rate: DropRate,
    ) -> Result<TargetEstimate<B>, NetworkError> {
        ensure_features("state", state.dims(), self.state_dim)?;
        ensure_features("state_next", state_next.dims(), self.state_dim)?;
        ensure_same_batch(state.dims(), state_next.dims())?;
        ensure_noise_std(noise_std)?;
        Ok(self.next_q_a(state, state_next, noise_std, drop_rate))
    }

    /// Advance the power iteration of the value decoder's output layer.
    /// Call after each optimizer step.
    pub fn update_spectral_norm(mut self) -> Self {
        self.dec_q = self.dec_q.update_spectral_norm();
        self
    }

    /// Get state dimension.
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    /// Get action dimension.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    fn act(&self, s_: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        self.dec_a.forward(self.core.forward(s_, drop_rate))
    }

    /// Panics on differing batch sizes; the add below would broadcast a
    /// batch of one.
    fn evaluate(&self, s_: Tensor<B, 2>, a_: Tensor<B, 2>, drop_rate: DropRate) -> Tensor<B, 2> {
        let [state_batch, _] = s_.dims();
        let [action_batch, _] = a_.dims();
        assert_eq!(
            state_batch, action_batch,
            "state and action batch sizes differ"
        );
        self.dec_q.forward(self.core.forward(s_ + a_, drop_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploration::noise::tests::FixedNoise;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray<f32>;

    fn device() -> <B as Backend>::Device {
        Default::default()
    }

    fn model() -> ActorCritic<B> {
        ActorCriticConfig::new(4, 2, 8).init::<B>(&device()).unwrap()
    }

    fn states(batch: usize) -> Tensor<B, 2> {
        Tensor::random([batch, 4], Distribution::Normal(0.0, 1.0), &device())
    }

    fn max_abs_diff(a: Tensor<B, 2>, b: Tensor<B, 2>) -> f32 {
        (a - b).abs().max().into_scalar().elem()
    }

    #[test]
    fn test_actor_path_shape_and_range() {
        let action = model().forward(states(3), 0.0, DropRate::NONE);
        assert_eq!(action.dims(), [3, 2]);

        let data = action.into_data();
        let slice: &[f32] = data.as_slice().unwrap();
        assert!(slice.iter().all(|a| (-1.0..=1.0).contains(a)));
    }

    #[test]
    fn test_critic_path_shape() {
        let action = Tensor::random([3, 2], Distribution::Uniform(-1.0, 1.0), &device());
        assert_eq!(model().critic(states(3), action, DropRate::NONE).dims(), [3, 1]);
    }

    #[test]
    fn test_next_q_a_is_exact_mean() {
        let model = model();
        let noise = FixedNoise { gaussian: 0.3, uniform: 0.6 };

        let estimate = model.next_q_a_with_noise(states(5), states(5), 0.2, DropRate::NONE, &noise);

        assert_eq!(estimate.q_target.dims(), [5, 1]);
        assert_eq!(estimate.action.dims(), [5, 2]);

        let mean = (estimate.q_noiseless.clone() + estimate.q_noisy.clone()).mul_scalar(0.5);
        assert_eq!(max_abs_diff(estimate.q_target, mean), 0.0);
    }

    #[test]
    fn test_next_q_a_branches_match_critic() {
        let model = model();
        let (s, s_next) = (states(4), states(4));
        let noise = FixedNoise { gaussian: 0.5, uniform: 0.1 };

        let estimate =
            model.next_q_a_with_noise(s.clone(), s_next.clone(), 0.5, DropRate::NONE, &noise);

        let action = model.forward(s, 0.0, DropRate::NONE);
        assert!(max_abs_diff(estimate.action.clone(), action.clone()) < 1e-6);

        let q0 = model.critic(s_next.clone(), action.clone(), DropRate::NONE);
        assert!(max_abs_diff(estimate.q_noiseless, q0) < 1e-5);

        let noisy_action = add_action_noise(action, 0.5, &noise);
        let q1 = model.critic(s_next, noisy_action, DropRate::NONE);
        assert!(max_abs_diff(estimate.q_noisy, q1) < 1e-5);
    }

    #[test]
    fn test_noisy_branch_differs_from_noiseless() {
        let model = model();
        // Every entry leaves [-1, 1] and is replaced by 0.5
        let noise = FixedNoise { gaussian: 5.0, uniform: 0.5 };

        let estimate = model.next_q_a_with_noise(states(6), states(6), 1.0, DropRate::NONE, &noise);
        assert!(max_abs_diff(estimate.q_noiseless, estimate.q_noisy) > 0.0);
    }

    #[test]
    #[should_panic(expected = "batch sizes differ")]
    fn test_critic_rejects_single_action_for_batch() {
        let action = Tensor::<B, 2>::zeros([1, 2], &device());
        model().critic(states(3), action, DropRate::NONE);
    }

    #[test]
    #[should_panic(expected = "batch sizes differ")]
    fn test_next_q_a_rejects_mismatched_batches() {
        model().next_q_a(states(1), states(3), 0.1, DropRate::NONE);
    }

    #[test]
    fn test_update_spectral_norm_tightens_value_head() {
        let mut model = model();
        for _ in 0..100 {
            model = model.update_spectral_norm();
        }
        // Single-row head: σ is the row norm, so the normalized row has unit length
        let weight = model.dec_q.head.normalized_weight();
        let norm: f32 = weight.powf_scalar(2.0).sum().sqrt().into_scalar().elem();
        assert!((norm - 1.0).abs() < 1e-4, "got {}", norm);
    }

    #[test]
    fn test_try_methods_check_shapes() {
        let model = model();
        assert!(model.try_forward(states(2), 0.1, DropRate::NONE).is_ok());

        let wide = Tensor::<B, 2>::zeros([2, 7], &device());
        assert_eq!(
            model.try_next_q_a(states(2), wide, 0.1, DropRate::NONE).unwrap_err(),
            NetworkError::ShapeMismatch { input: "state_next", expected: 4, actual: 7 }
        );
        assert_eq!(
            model.try_next_q_a(states(2), states(3), 0.1, DropRate::NONE).unwrap_err(),
            NetworkError::BatchMismatch { left: 2, right: 3 }
        );

        let action = Tensor::<B, 2>::zeros([3, 2], &device());
        assert!(model.try_critic(states(2), action, DropRate::NONE).is_err());
    }
}
