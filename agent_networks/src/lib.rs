//! # Agent Networks: actor, critic and exploration building blocks
//!
//! Function approximators for off-policy actor-critic and Q-learning agents,
//! written as burn modules, plus the noise processes used for exploration.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  nn                                                              │
//! │  HardSwish   ResNet (+skip)   DenseNet (cat skip, ×4, dropout)   │
//! │  SpectralNormLinear           OutputHead (plain | spectral)      │
//! └──────────────┬───────────────────────────────────────────────────┘
//!                ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  networks                                                        │
//! │  Actor        s → Linear → ReLU → body → Linear → Tanh           │
//! │  Critic       cat(s,a) → Linear → ReLU → body → head → Tanh      │
//! │  CriticTwin   two independent critic branches, no Tanh           │
//! │  QNetwork     s → Linear → ReLU → DenseNet → SN-Linear           │
//! │  ActorCritic  enc_s / enc_a → shared DenseNet → dec_a / dec_q    │
//! └──────────────┬───────────────────────────────────────────────────┘
//!                ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  exploration                                                     │
//! │  DropRate (per-call dropout)   NoiseSource / add_action_noise    │
//! │  OrnsteinUhlenbeckProcess      SharedOrnsteinUhlenbeck           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Explicit randomness and placement
//!
//! - Modules are built with `Config::init(&device)`; the device is chosen by
//!   the caller and never changes afterwards.
//! - DenseNet dropout takes a [`DropRate`] argument on every call. Draw a
//!   fresh one per forward pass with [`DropRate::sample`] during training,
//!   pass [`DropRate::NONE`] for evaluation.
//! - Action and value noise go through a [`NoiseSource`], so target
//!   computations can be reproduced with fixed noise.
//!
//! ## Spectral normalization and target networks
//!
//! Critics built with `use_spectral_norm`, [`QNetwork`] and the value decoder
//! of [`ActorCritic`] all normalize their output layer. Do not maintain soft
//! (Polyak-averaged) target copies of these networks. This is a contract on
//! the training loop and is not checked here.
//!
//! The singular-vector estimates only converge when the training loop calls
//! `update_spectral_norm` after each optimizer step:
//!
//! ```rust,ignore
//! let q_net = optimizer.step(lr, q_net, grads).update_spectral_norm();
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_networks::{ActorConfig, CriticConfig, DropRate};
//!
//! let actor = ActorConfig::new(state_dim, action_dim, 256)
//!     .with_densenet(true)
//!     .init::<B>(&device)?;
//! let critic = CriticConfig::new(state_dim, action_dim, 256).init_twin::<B>(&device)?;
//!
//! let action = actor.forward(state.clone(), 0.1, DropRate::jitter());
//! let (q1, q2) = critic.get_q1_q2(state, action, DropRate::jitter());
//! ```

pub mod error;
pub mod exploration;
pub mod networks;
pub mod nn;

pub use error::NetworkError;

pub use exploration::{
    add_action_noise, add_value_noise, shared_ornstein_uhlenbeck, DropRate, NoiseSource,
    OrnsteinUhlenbeckConfig, OrnsteinUhlenbeckProcess, SharedOrnsteinUhlenbeck, TensorNoise,
};

pub use networks::{
    Actor, ActorConfig, ActorCritic, ActorCriticConfig, Critic, CriticConfig, CriticTwin,
    QNetwork, QNetworkConfig, TargetEstimate,
};

pub use nn::{
    BodyBlock, BodyKind, DenseNet, HardSwish, OutputHead, ResNet, SpectralNormLinear,
    SpectralNormLinearConfig,
};
