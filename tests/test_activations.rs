// Activation and loss function contracts.

use approx::assert_relative_eq;
use digit_recognizer::activation::activation::{sigmoid, softmax};
use digit_recognizer::{ActivationFunction, Error, LossFunction};

const ELEMENTWISE: [ActivationFunction; 5] = [
    ActivationFunction::Sigmoid,
    ActivationFunction::Softplus,
    ActivationFunction::ReLU,
    ActivationFunction::Tanh,
    ActivationFunction::Identity,
];

#[test]
fn test_softmax_is_a_distribution() {
    let z = vec![1.0, -2.0, 0.5, 3.0];
    let p = ActivationFunction::Softmax.activate(&z);
    assert_eq!(p.len(), z.len());
    assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert!(p.iter().all(|&x| x > 0.0));
    assert!(p[3] > p[0] && p[0] > p[2] && p[2] > p[1]);
}

#[test]
fn test_softmax_survives_huge_logits() {
    let p = softmax(&[1000.0, 1000.0, -1000.0]);
    assert!(p.iter().all(|x| x.is_finite()));
    assert_relative_eq!(p[0], 0.5, epsilon = 1e-12);
    assert_relative_eq!(p[2], 0.0, epsilon = 1e-12);
}

#[test]
fn test_activate_does_not_mutate_input_and_keeps_length() {
    let z = vec![-3.0, -0.1, 0.0, 0.1, 3.0];
    let copy = z.clone();
    for f in ELEMENTWISE {
        assert_eq!(f.activate(&z).len(), z.len());
    }
    assert_eq!(z, copy);
}

#[test]
fn test_softplus_values_and_sigmoid_derivative() {
    let z = vec![-40.0, -1.0, 0.0, 2.0, 40.0];
    let a = ActivationFunction::Softplus.activate(&z);
    assert_relative_eq!(a[2], 2f64.ln(), epsilon = 1e-12);
    assert_relative_eq!(a[3], (1.0 + 2f64.exp()).ln(), epsilon = 1e-12);
    assert_relative_eq!(a[4], 40.0, epsilon = 1e-12);
    assert!(a[0] > 0.0 && a[0] < 1e-15);

    let d = ActivationFunction::Softplus.derivative(&z, &[]);
    for (zi, di) in z.iter().zip(d.iter()) {
        assert_relative_eq!(*di, sigmoid(*zi), epsilon = 1e-15);
    }
}

#[test]
fn test_pointwise_derivatives_match_finite_differences() {
    let h = 1e-6;
    let points = [-2.0, -0.7, 0.3, 1.9];
    for f in ELEMENTWISE {
        for &z in &points {
            let plus = f.activate(&[z + h])[0];
            let minus = f.activate(&[z - h])[0];
            let numeric = (plus - minus) / (2.0 * h);
            let analytic = f.derivative(&[z], &[])[0];
            assert_relative_eq!(analytic, numeric, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_softmax_derivative_is_combined_cross_entropy_gradient() {
    let z = vec![0.2, -1.3, 2.2];
    let one_hot = vec![0.0, 1.0, 0.0];
    let derivative = ActivationFunction::Softmax.derivative(&z, &one_hot);
    let predicted = ActivationFunction::Softmax.activate(&z);
    let gradient = LossFunction::CrossEntropy.gradient(&predicted, &one_hot);
    for (d, g) in derivative.iter().zip(gradient.iter()) {
        assert_relative_eq!(*d, *g, epsilon = 1e-15);
    }
}

#[test]
fn test_pointwise_backprop_scales_upstream_by_derivative() {
    let z = vec![-2.0, -0.3, 0.0, 0.7, 4.0];
    let upstream = vec![0.5, -1.0, 2.0, 0.25, -3.0];
    for f in ELEMENTWISE {
        let local = f.derivative(&z, &[]);
        let expected: Vec<f64> = local.iter().zip(&upstream).map(|(d, g)| g * d).collect();
        assert_eq!(f.backprop(&z, &upstream), expected, "{}", f.name());
    }
}

#[test]
fn test_softmax_backprop_passes_gradient_through() {
    let upstream = vec![0.3, -0.3];
    assert_eq!(ActivationFunction::Softmax.backprop(&[5.0, 1.0], &upstream), upstream);
}

#[test]
fn test_activation_is_shared_across_threads() {
    let f = ActivationFunction::Tanh;
    let handles: Vec<_> = (0..4)
        .map(|i| std::thread::spawn(move || f.activate(&[i as f64])[0]))
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), (i as f64).tanh());
    }
}

#[test]
fn test_cross_entropy_value_and_clamp() {
    let target = vec![0.0, 1.0, 0.0];
    assert_relative_eq!(LossFunction::CrossEntropy.compute(&[0.2, 0.5, 0.3], &target), -(0.5f64).ln());
    assert_relative_eq!(LossFunction::CrossEntropy.compute(&[0.0, 1.0, 0.0], &target), 0.0);
    let clamped = LossFunction::CrossEntropy.compute(&[1.0, 0.0, 0.0], &target);
    assert!(clamped.is_finite() && clamped > 20.0);
}

#[test]
fn test_cross_entropy_gradient_is_prediction_minus_target() {
    let g = LossFunction::CrossEntropy.gradient(&[0.2, 0.5, 0.3], &[0.0, 1.0, 0.0]);
    assert_relative_eq!(g[0], 0.2);
    assert_relative_eq!(g[1], -0.5);
    assert_relative_eq!(g[2], 0.3);
}

#[test]
fn test_mse_gradient_matches_finite_differences() {
    let predicted = vec![0.4, -1.0, 2.5];
    let target = vec![0.0, 1.0, 2.0];
    let analytic = LossFunction::MeanSquaredError.gradient(&predicted, &target);
    let h = 1e-6;
    for i in 0..predicted.len() {
        let mut plus = predicted.clone();
        let mut minus = predicted.clone();
        plus[i] += h;
        minus[i] -= h;
        let numeric = (LossFunction::MeanSquaredError.compute(&plus, &target)
            - LossFunction::MeanSquaredError.compute(&minus, &target))
            / (2.0 * h);
        assert_relative_eq!(analytic[i], numeric, epsilon = 1e-6);
    }
}

#[test]
fn test_loss_output_pairing() {
    assert!(LossFunction::CrossEntropy.check_output_activation(ActivationFunction::Softmax).is_ok());
    assert!(matches!(
        LossFunction::CrossEntropy.check_output_activation(ActivationFunction::Sigmoid),
        Err(Error::InvalidConfig(_))
    ));
    assert!(LossFunction::MeanSquaredError.check_output_activation(ActivationFunction::Identity).is_ok());
    assert!(LossFunction::MeanSquaredError.check_output_activation(ActivationFunction::Softmax).is_err());
}
