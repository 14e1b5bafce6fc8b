//! Ornstein-Uhlenbeck exploration noise.
//!
//! Temporally correlated noise for continuous control. Each call advances
//! the process by one Euler-Maruyama step:
//!
//! ```text
//! x_{t+1} = x_t - θ x_t dt + σ sqrt(dt) ε,   ε ~ N(0, I)
//! ```
//!
//! and returns the new state. The state is only reset by building a new
//! process.
//!
//! The process is not synchronized. Workers sharing one instance should go
//! through [`SharedOrnsteinUhlenbeck`].

use std::sync::Arc;

use burn::prelude::*;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, NetworkError};

/// Configuration for [`OrnsteinUhlenbeckProcess`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrnsteinUhlenbeckConfig {
    /// Number of independent noise dimensions.
    pub size: usize,
    /// Mean-reversion rate.
    pub theta: f64,
    /// Volatility.
    pub sigma: f64,
    /// Initial state, broadcast to every dimension.
    pub x0: f64,
    /// Per-dimension initial state. Takes precedence over `x0` when set.
    #[serde(default)]
    pub x0_per_dim: Option<Vec<f64>>,
    /// Time step.
    pub dt: f64,
}

impl OrnsteinUhlenbeckConfig {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            theta: 0.15,
            sigma: 0.3,
            x0: 0.0,
            x0_per_dim: None,
            dt: 1e-2,
        }
    }

    /// Set mean-reversion rate.
    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Set volatility.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the same initial value for every dimension.
    pub fn with_x0(mut self, x0: f64) -> Self {
        self.x0 = x0;
        self.x0_per_dim = None;
        self
    }

    /// Set one initial value per dimension. Must have `size` entries.
    pub fn with_x0_vec(mut self, x0: Vec<f64>) -> Self {
        self.x0_per_dim = Some(x0);
        self
    }

    /// Set time step.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        ensure_positive("size", self.size)?;
        if !(self.theta >= 0.0) {
            return Err(out_of_range("theta", self.theta, 0.0, f64::INFINITY));
        }
        if !(self.sigma >= 0.0) {
            return Err(out_of_range("sigma", self.sigma, 0.0, f64::INFINITY));
        }
        if !(self.dt > 0.0) {
            return Err(out_of_range("dt", self.dt, f64::MIN_POSITIVE, f64::INFINITY));
        }
        if !self.x0.is_finite() {
            return Err(out_of_range("x0", self.x0, f64::MIN, f64::MAX));
        }
        if let Some(x0) = &self.x0_per_dim {
            if x0.len() != self.size {
                return Err(NetworkError::ShapeMismatch {
                    input: "x0",
                    expected: self.size,
                    actual: x0.len(),
                });
            }
            if let Some(&bad) = x0.iter().find(|x| !x.is_finite()) {
                return Err(out_of_range("x0", bad, f64::MIN, f64::MAX));
            }
        }
        Ok(())
    }

    fn initial_state(&self) -> Vec<f64> {
        match &self.x0_per_dim {
            Some(x0) => x0.clone(),
            None => vec![self.x0; self.size],
        }
    }

    /// Build a process seeded from OS entropy.
    pub fn init(&self) -> Result<OrnsteinUhlenbeckProcess<StdRng>, NetworkError> {
        self.init_with_rng(StdRng::from_entropy())
    }

    /// Build a process driven by `rng`.
    pub fn init_with_rng<R: Rng>(&self, rng: R) -> Result<OrnsteinUhlenbeckProcess<R>, NetworkError> {
        self.validate()?;
        log::debug!(
            "OU process: size={} theta={} sigma={} x0={:?} dt={}",
            self.size,
            self.theta,
            self.sigma,
            self.x0_per_dim.as_deref().unwrap_or(&[self.x0]),
            self.dt
        );
        Ok(OrnsteinUhlenbeckProcess {
            theta: self.theta,
            sigma: self.sigma,
            dt: self.dt,
            state: self.initial_state(),
            rng,
        })
    }
}

fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> NetworkError {
    NetworkError::OutOfRange { field, value, min, max }
}

/// Stateful Ornstein-Uhlenbeck noise generator.
#[derive(Debug, Clone)]
pub struct OrnsteinUhlenbeckProcess<R = StdRng> {
    theta: f64,
    sigma: f64,
    dt: f64,
    state: Vec<f64>,
    rng: R,
}

impl<R: Rng> OrnsteinUhlenbeckProcess<R> {
    /// Advance one step and return the new state.
    pub fn sample(&mut self) -> &[f64] {
        let scale = self.sigma * self.dt.sqrt();
        let decay = self.theta * self.dt;
        for x in self.state.iter_mut() {
            let eps: f64 = self.rng.sample(StandardNormal);
            *x = *x - decay * *x + scale * eps;
        }
        &self.state
    }

    /// Advance one step and return the new state as a `[size]` tensor.
    pub fn sample_tensor<B: Backend>(&mut self, device: &B::Device) -> Tensor<B, 1> {
        let values: Vec<f32> = self.sample().iter().map(|&x| x as f32).collect();
        Tensor::from_floats(values.as_slice(), device)
    }

    /// The current state, without advancing.
    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Get number of noise dimensions.
    pub fn size(&self) -> usize {
        self.state.len()
    }
}

/// One process shared between threads.
pub type SharedOrnsteinUhlenbeck<R = StdRng> = Arc<Mutex<OrnsteinUhlenbeckProcess<R>>>;

/// Build an entropy-seeded process wrapped for sharing.
pub fn shared_ornstein_uhlenbeck(
    config: &OrnsteinUhlenbeckConfig,
) -> Result<SharedOrnsteinUhlenbeck, NetworkError> {
    Ok(Arc::new(Mutex::new(config.init()?)))
}
