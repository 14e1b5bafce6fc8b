//! Spectrally normalized linear layer.
//!
//! The weight matrix is divided by an estimate of its largest singular value
//! before every forward pass, bounding the layer's Lipschitz constant by 1.
//! Value heads use it to keep Q estimates from blowing up.
//!
//! # Algorithm
//!
//! Power iteration from the stored singular-vector estimates `u`, `v`:
//!
//! ```text
//! v = W^T u / ||W^T u||
//! u = W v   / ||W v||
//! σ = u^T W v
//! W_sn = W / (σ + ε)
//! ```
//!
//! `u` and `v` are non-trainable state: gradients flow into `W` through σ,
//! but the estimates themselves are never trained.
//!
//! # Keeping the estimate current
//!
//! `forward` takes `&self` and never writes the refined vectors back. The
//! estimate only converges across calls to
//! [`SpectralNormLinear::update_singular_vectors`], which runs
//! `n_power_iterations` more steps and stores the result. Call it (or the
//! owning network's `update_spectral_norm`) once per optimizer step, after
//! the weights change. With the default single iteration the bound is only
//! tight once a few updates have accumulated.
//!
//! # Caveat
//!
//! A normalized head must not be paired with soft (Polyak) target updates.
//! Averaging raw weights of two normalized layers does not give a normalized
//! layer. Nothing here checks for it; it is up to the training loop.

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::Distribution;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, NetworkError};

/// Configuration for [`SpectralNormLinear`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralNormLinearConfig {
    /// Number of input features.
    pub d_input: usize,
    /// Number of output features.
    pub d_output: usize,
    /// Power iterations per forward pass and per update.
    pub n_power_iterations: usize,
    /// Whether to include a bias term.
    pub bias: bool,
    /// Added to σ before dividing.
    pub epsilon: f32,
}

impl SpectralNormLinearConfig {
    pub fn new(d_input: usize, d_output: usize) -> Self {
        Self {
            d_input,
            d_output,
            n_power_iterations: 1,
            bias: true,
            epsilon: 1e-12,
        }
    }

    /// Set number of power iterations.
    pub fn with_n_power_iterations(mut self, n: usize) -> Self {
        self.n_power_iterations = n;
        self
    }

    /// Set whether to include a bias term.
    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        ensure_positive("d_input", self.d_input)?;
        ensure_positive("d_output", self.d_output)
    }

    /// Initialize the layer on `device`.
    ///
    /// Weights start uniform in ±1/sqrt(d_input), the same range a plain
    /// `Linear` uses, so swapping a head for its normalized version does not
    /// change the initial scale of the pre-normalization weights. The random
    /// singular-vector estimates are warmed up with
    /// [`INIT_POWER_ITERATIONS`] steps before the layer is returned.
    pub fn init<B: Backend>(&self, device: &B::Device) -> SpectralNormLinear<B> {
        let bound = 1.0 / (self.d_input as f64).sqrt();
        let weight = Tensor::<B, 2>::random(
            [self.d_output, self.d_input],
            Distribution::Uniform(-bound, bound),
            device,
        );

        let bias = if self.bias {
            let bias = Tensor::<B, 1>::random(
                [self.d_output],
                Distribution::Uniform(-bound, bound),
                device,
            );
            Some(Param::from_tensor(bias))
        } else {
            None
        };

        let u = Tensor::<B, 1>::random([self.d_output], Distribution::Normal(0.0, 1.0), device);
        let v = Tensor::<B, 1>::random([self.d_input], Distribution::Normal(0.0, 1.0), device);

        let layer = SpectralNormLinear {
            weight: Param::from_tensor(weight),
            bias,
            u: frozen(normalize_vector(u)),
            v: frozen(normalize_vector(v)),
            n_power_iterations: self.n_power_iterations,
            epsilon: self.epsilon,
        };
        layer.refresh(INIT_POWER_ITERATIONS)
    }
}

/// Power iterations run once when a layer is created.
pub const INIT_POWER_ITERATIONS: usize = 15;

/// Linear layer whose weight is divided by its spectral norm on every call.
#[derive(Module, Debug)]
pub struct SpectralNormLinear<B: Backend> {
    /// Raw weight of shape [d_output, d_input].
    pub weight: Param<Tensor<B, 2>>,
    /// Optional bias of shape [d_output].
    pub bias: Option<Param<Tensor<B, 1>>>,
    /// Left singular vector estimate. Not trainable.
    u: Param<Tensor<B, 1>>,
    /// Right singular vector estimate. Not trainable.
    v: Param<Tensor<B, 1>>,
    n_power_iterations: usize,
    epsilon: f32,
}

impl<B: Backend> SpectralNormLinear<B> {
    /// `input @ W_sn^T + b` for `[batch, d_input]` input.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = input.matmul(self.normalized_weight().transpose());

        match &self.bias {
            Some(bias) => output + bias.val().unsqueeze_dim(0),
            None => output,
        }
    }

    /// The weight matrix divided by `σ + ε`. Differentiable in `weight`.
    pub fn normalized_weight(&self) -> Tensor<B, 2> {
        let weight = self.weight.val();
        let sigma = self.sigma(weight.clone());
        weight / sigma.add_scalar(self.epsilon)
    }

    /// Current estimate of the raw weight's largest singular value.
    pub fn spectral_norm(&self) -> f32 {
        let sigma = self.sigma(self.weight.val().detach());
        let sigma: Tensor<B, 1> = sigma.reshape([1]);
        sigma.into_scalar().elem()
    }

    /// Run `n_power_iterations` steps from the stored estimates and keep
    /// the refined `u`, `v`.
    pub fn update_singular_vectors(self) -> Self {
        let n = self.n_power_iterations;
        self.refresh(n)
    }

    /// Get input dimension.
    pub fn d_input(&self) -> usize {
        self.weight.dims()[1]
    }

    /// Get output dimension.
    pub fn d_output(&self) -> usize {
        self.weight.dims()[0]
    }

    fn refresh(mut self, n_iterations: usize) -> Self {
        let (u, v) = self.iterate(self.weight.val().detach(), n_iterations);
        self.u = frozen(u);
        self.v = frozen(v);
        self
    }

    /// σ = u^T W v as a `[1, 1]` tensor, after power iteration.
    fn sigma(&self, weight: Tensor<B, 2>) -> Tensor<B, 2> {
        let (u, v) = self.power_iteration(weight.clone().detach());
        u.unsqueeze_dim::<2>(0)
            .matmul(weight)
            .matmul(v.unsqueeze_dim::<2>(1))
    }

    fn power_iteration(&self, weight: Tensor<B, 2>) -> (Tensor<B, 1>, Tensor<B, 1>) {
        self.iterate(weight, self.n_power_iterations)
    }

    fn iterate(&self, weight: Tensor<B, 2>, n_iterations: usize) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let [d_output, d_input] = weight.dims();
        let mut u = self.u.val().detach();
        let mut v = self.v.val().detach();

        for _ in 0..n_iterations {
            let v_new = weight
                .clone()
                .transpose()
                .matmul(u.unsqueeze_dim::<2>(1))
                .reshape([d_input]);
            v = normalize_vector(v_new);

            let u_new = weight
                .clone()
                .matmul(v.clone().unsqueeze_dim::<2>(1))
                .reshape([d_output]);
            u = normalize_vector(u_new);
        }

        (u, v)
    }
}

fn frozen<B: Backend>(tensor: Tensor<B, 1>) -> Param<Tensor<B, 1>> {
    Param::from_tensor(tensor.detach()).set_require_grad(false)
}

fn normalize_vector<B: Backend>(v: Tensor<B, 1>) -> Tensor<B, 1> {
    let norm = v.clone().powf_scalar(2.0).sum().sqrt();
    v / norm.add_scalar(1e-12)
}
