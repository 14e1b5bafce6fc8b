//! Noise sources and the action-noise injection policy.
//!
//! Networks never call the random number generator directly. They take a
//! [`NoiseSource`], which lets training use burn's samplers
//! ([`TensorNoise`]) and tests substitute fixed values.

use burn::prelude::*;
use burn::tensor::Distribution;

/// Supplier of the two noise tensors the networks need.
pub trait NoiseSource<B: Backend> {
    /// Zero-mean Gaussian noise with standard deviation `std`.
    fn gaussian(&self, dims: [usize; 2], std: f32, device: &B::Device) -> Tensor<B, 2>;

    /// Uniform noise in `[0, 1)`.
    fn uniform(&self, dims: [usize; 2], device: &B::Device) -> Tensor<B, 2>;
}

/// Noise drawn from burn's tensor samplers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorNoise;

impl<B: Backend> NoiseSource<B> for TensorNoise {
    fn gaussian(&self, dims: [usize; 2], std: f32, device: &B::Device) -> Tensor<B, 2> {
        if std == 0.0 {
            return Tensor::zeros(dims, device);
        }
        Tensor::random(dims, Distribution::Normal(0.0, std as f64), device)
    }

    fn uniform(&self, dims: [usize; 2], device: &B::Device) -> Tensor<B, 2> {
        Tensor::random(dims, Distribution::Uniform(0.0, 1.0), device)
    }
}

/// Perturb a tanh-squashed action.
///
/// 1. `a_temp = action + N(0, noise_std)`
/// 2. Wherever `a_temp` leaves `[-1, 1]`, replace it with a fresh sample
///    from `U[0, 1)`; elsewhere keep `a_temp`.
///
/// Out-of-range entries are resampled, not clipped. The replacement range is
/// `[0, 1)`, not `[-1, 1]`, so replaced entries are always non-negative.
pub fn add_action_noise<B: Backend, N: NoiseSource<B>>(
    action: Tensor<B, 2>,
    noise_std: f32,
    noise: &N,
) -> Tensor<B, 2> {
    let dims = action.dims();
    let device = action.device();

    let a_temp = action + noise.gaussian(dims, noise_std, &device);
    let mask = a_temp.clone().lower_elem(-1.0).float() + a_temp.clone().greater_elem(1.0).float();

    let uniform = noise.uniform(dims, &device);
    uniform * mask.clone() + a_temp * mask.neg().add_scalar(1.0)
}

/// Add `N(0, noise_std)` to a value estimate. No clipping or resampling.
pub fn add_value_noise<B: Backend, N: NoiseSource<B>>(
    value: Tensor<B, 2>,
    noise_std: f32,
    noise: &N,
) -> Tensor<B, 2> {
    let dims = value.dims();
    let device = value.device();
    value + noise.gaussian(dims, noise_std, &device)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    /// Constant noise, for checking the policy arithmetic.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct FixedNoise {
        pub gaussian: f32,
        pub uniform: f32,
    }

    impl<B: Backend> NoiseSource<B> for FixedNoise {
        fn gaussian(&self, dims: [usize; 2], _std: f32, device: &B::Device) -> Tensor<B, 2> {
            Tensor::full(dims, self.gaussian, device)
        }

        fn uniform(&self, dims: [usize; 2], device: &B::Device) -> Tensor<B, 2> {
            Tensor::full(dims, self.uniform, device)
        }
    }

    fn values(t: Tensor<B, 2>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_in_range_values_keep_gaussian_shift() {
        let device = <B as Backend>::Device::default();
        let action: Tensor<B, 2> = Tensor::from_floats([[0.0, 0.5, -0.5]], &device);
        let noise = FixedNoise { gaussian: 0.25, uniform: 0.9 };

        let out = values(add_action_noise(action, 0.1, &noise));
        assert_eq!(out, vec![0.25, 0.75, -0.25]);
    }

    #[test]
    fn test_out_of_range_values_are_resampled_not_clipped() {
        let device = <B as Backend>::Device::default();
        let action: Tensor<B, 2> = Tensor::from_floats([[0.9, -0.9, 0.0]], &device);

        // +0.5 pushes 0.9 over the top; -0.9 + 0.5 stays inside
        let up = FixedNoise { gaussian: 0.5, uniform: 0.3 };
        let out = values(add_action_noise(action.clone(), 0.5, &up));
        assert!((out[0] - 0.3).abs() < 1e-6, "replaced by uniform, got {}", out[0]);
        assert!((out[1] + 0.4).abs() < 1e-6);
        assert!((out[2] - 0.5).abs() < 1e-6);

        // -0.5 pushes -0.9 below the bottom
        let down = FixedNoise { gaussian: -0.5, uniform: 0.7 };
        let out = values(add_action_noise(action, 0.5, &down));
        assert!((out[0] - 0.4).abs() < 1e-6);
        assert!((out[1] - 0.7).abs() < 1e-6, "replaced by uniform, got {}", out[1]);
    }

    #[test]
    fn test_boundary_is_inside() {
        let device = <B as Backend>::Device::default();
        let action: Tensor<B, 2> = Tensor::from_floats([[0.5, -0.5]], &device);
        let noise = FixedNoise { gaussian: 0.5, uniform: 0.0 };

        // 0.5 + 0.5 = 1.0 is on the boundary and kept
        let out = values(add_action_noise(action, 0.5, &noise));
        assert!((out[0] - 1.0).abs() < 1e-6);
        assert!(out[1].abs() < 1e-6);
    }

    #[test]
    fn test_tensor_noise_action_policy_stays_bounded() {
        let device = <B as Backend>::Device::default();
        let action: Tensor<B, 2> = Tensor::zeros([64, 4], &device).add_scalar(0.95);

        let out = values(add_action_noise(action, 1.0, &TensorNoise));
        assert!(out.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_value_noise_is_plain_addition() {
        let device = <B as Backend>::Device::default();
        let value: Tensor<B, 2> = Tensor::from_floats([[5.0, -5.0]], &device);
        let noise = FixedNoise { gaussian: 2.0, uniform: 0.0 };

        let out = values(add_value_noise(value, 1.0, &noise));
        assert_eq!(out, vec![7.0, -3.0]);
    }

    #[test]
    fn test_tensor_noise_statistics() {
        let device = <B as Backend>::Device::default();
        let g = values(NoiseSource::<B>::gaussian(&TensorNoise, [100, 100], 0.5, &device));
        let mean: f32 = g.iter().sum::<f32>() / g.len() as f32;
        let var: f32 = g.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / g.len() as f32;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((var.sqrt() - 0.5).abs() < 0.05, "std {}", var.sqrt());

        let u = values(NoiseSource::<B>::uniform(&TensorNoise, [50, 50], &device));
        assert!(u.iter().all(|v| (0.0..1.0).contains(v)));
    }
}
