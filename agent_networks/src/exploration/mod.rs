//! Exploration and regularization noise.
//!
//! - [`drop_rate`]: per-call dropout rate for DenseNet bodies
//! - [`noise`]: noise sources and the action/value noise policies
//! - [`ornstein_uhlenbeck`]: temporally correlated action noise

pub mod drop_rate;
pub mod noise;
pub mod ornstein_uhlenbeck;

pub use drop_rate::DropRate;
pub use noise::{add_action_noise, add_value_noise, NoiseSource, TensorNoise};
pub use ornstein_uhlenbeck::{
    shared_ornstein_uhlenbeck, OrnsteinUhlenbeckConfig, OrnsteinUhlenbeckProcess,
    SharedOrnsteinUhlenbeck,
};
