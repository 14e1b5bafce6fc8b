//! Dropout rate passed explicitly into every DenseNet forward call.
//!
//! DenseNet bodies regularize with a dropout probability that is redrawn
//! uniformly from `[0, 0.2)` before each forward pass. Rather than mutating
//! hidden module state, the rate is a value: draw one with
//! [`DropRate::sample`] and hand it to the forward method, or pass
//! [`DropRate::NONE`] for deterministic evaluation.

use burn::prelude::*;
use burn::tensor::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Probability of zeroing an activation, in `[0, 1)`.
///
/// Deserializes from a bare number, through [`DropRate::new`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DropRate(f64);

impl TryFrom<f64> for DropRate {
    type Error = NetworkError;

    fn try_from(p: f64) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl From<DropRate> for f64 {
    fn from(rate: DropRate) -> Self {
        rate.0
    }
}

impl DropRate {
    /// No dropout.
    pub const NONE: DropRate = DropRate(0.0);

    /// Upper bound (exclusive) of the per-call jitter.
    pub const JITTER_MAX: f64 = 0.2;

    /// Validate `p` against `[0, 1)`.
    pub fn new(p: f64) -> Result<Self, NetworkError> {
        if !(0.0..1.0).contains(&p) {
            return Err(NetworkError::OutOfRange {
                field: "drop_rate",
                value: p,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(p))
    }

    /// Draw a rate uniformly from `[0, JITTER_MAX)`.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(0.0..Self::JITTER_MAX))
    }

    /// [`DropRate::sample`] using the thread-local generator.
    pub fn jitter() -> Self {
        Self::sample(&mut rand::thread_rng())
    }

    /// Get the probability.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Inverted dropout: zero each element with probability `p`, scale the
    /// survivors by `1 / (1 - p)`. Identity when `p == 0`.
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        if self.0 == 0.0 {
            return x;
        }
        let keep = 1.0 - self.0;
        let mask = Tensor::<B, D>::random(x.shape(), Distribution::Bernoulli(keep), &x.device());
        x * mask.div_scalar(keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type B = NdArray<f32>;

    #[test]
    fn test_sample_stays_in_jitter_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = DropRate::sample(&mut rng).value();
            assert!((0.0..DropRate::JITTER_MAX).contains(&p), "got {}", p);
        }
    }

    #[test]
    fn test_sample_is_not_constant() {
        let mut rng = StdRng::seed_from_u64(11);
        let first = DropRate::sample(&mut rng);
        assert!((0..20).any(|_| DropRate::sample(&mut rng) != first));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(DropRate::new(0.0).is_ok());
        assert!(DropRate::new(0.5).is_ok());
        assert!(DropRate::new(1.0).is_err());
        assert!(DropRate::new(-0.1).is_err());
        assert!(DropRate::new(f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_goes_through_validation() {
        use serde::de::value::{Error, F64Deserializer};
        use serde::de::IntoDeserializer;

        let valid: F64Deserializer<Error> = 0.1_f64.into_deserializer();
        assert_eq!(DropRate::deserialize(valid).unwrap().value(), 0.1);

        let too_high: F64Deserializer<Error> = 1.5_f64.into_deserializer();
        assert!(DropRate::deserialize(too_high).is_err());

        assert!(DropRate::try_from(-0.2).is_err());
        assert_eq!(f64::from(DropRate::NONE), 0.0);
    }

    #[test]
    fn test_none_is_identity() {
        let device = <B as Backend>::Device::default();
        let x: Tensor<B, 2> = Tensor::from_floats([[1.0, -2.0], [3.0, 4.0]], &device);
        let y = DropRate::NONE.apply(x.clone());
        let diff: f32 = (y - x).abs().sum().into_scalar().elem();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_apply_zeroes_or_rescales() {
        let device = <B as Backend>::Device::default();
        let x: Tensor<B, 2> = Tensor::ones([8, 64], &device);
        let rate = DropRate::new(0.5).unwrap();

        let data = rate.apply(x).into_data();
        let slice: &[f32] = data.as_slice().unwrap();

        // Every element is either dropped or scaled by 1 / (1 - p)
        assert!(slice.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-5));
        assert!(slice.iter().any(|&v| v == 0.0));
        assert!(slice.iter().any(|&v| v > 0.0));
    }
}
