//! Layers and blocks the agent networks are assembled from.
//!
//! - [`hard_swish`]: HardSwish activation
//! - [`blocks`]: ResNet / DenseNet body blocks
//! - [`spectral_norm`]: spectrally normalized linear layer
//! - [`heads`]: output head with optional spectral normalization

pub mod blocks;
pub mod hard_swish;
pub mod heads;
pub mod spectral_norm;

pub use blocks::{BodyBlock, BodyKind, DenseNet, DenseUnit, ResNet};
pub use hard_swish::{hard_swish, HardSwish};
pub use heads::OutputHead;
pub use spectral_norm::{SpectralNormLinear, SpectralNormLinearConfig};
