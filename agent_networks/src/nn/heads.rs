//! Output layer that is either a plain linear map or a spectrally normalized one.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use crate::nn::spectral_norm::{SpectralNormLinear, SpectralNormLinearConfig};

#[derive(Module, Debug)]
pub enum OutputHead<B: Backend> {
    Plain(Linear<B>),
    Spectral(SpectralNormLinear<B>),
}

impl<B: Backend> OutputHead<B> {
    pub fn new(d_input: usize, d_output: usize, spectral_norm: bool, device: &B::Device) -> Self {
        if spectral_norm {
            OutputHead::Spectral(SpectralNormLinearConfig::new(d_input, d_output).init(device))
        } else {
            OutputHead::Plain(LinearConfig::new(d_input, d_output).init(device))
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            OutputHead::Plain(linear) => linear.forward(x),
            OutputHead::Spectral(linear) => linear.forward(x),
        }
    }

    /// Whether the output layer is spectrally normalized.
    pub fn is_spectral(&self) -> bool {
        matches!(self, OutputHead::Spectral(_))
    }

    /// Refresh the singular-vector estimates of a spectral head. No-op for
    /// a plain head.
    pub fn update_spectral_norm(self) -> Self {
        match self {
            OutputHead::Spectral(linear) => OutputHead::Spectral(linear.update_singular_vectors()),
            plain => plain,
        }
    }
}
