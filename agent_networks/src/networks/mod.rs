//! Agent networks.
//!
//! - [`actor`]: state → action
//! - [`critic`]: (state, action) → value, single and twin
//! - [`q_network`]: state → value per discrete action
//! - [`actor_critic`]: actor and critic sharing one core

pub mod actor;
pub mod actor_critic;
pub mod critic;
pub mod q_network;


pub use actor::{Actor, ActorConfig};
pub use actor_critic::{ActorCritic, ActorCriticConfig, TargetEstimate};
pub use critic::{Critic, CriticBranch, CriticConfig, CriticTwin};
pub use q_network::{QNetwork, QNetworkConfig};
