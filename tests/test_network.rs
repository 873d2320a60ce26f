// Forward/backward pass behaviour and the finite-difference gradient check.

mod common;

use approx::assert_relative_eq;
use digit_recognizer::data::one_hot;
use digit_recognizer::optim::{ParamId, ParamKind, UpdateRule};
use digit_recognizer::{
    ActivationFunction, Error, Layer, LayerSpec, LossFunction, Matrix, Network, NetworkSpec, Result,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

use common::{parameters, random_network, random_vec, with_parameters};

use ActivationFunction::{Identity, ReLU, Sigmoid, Softmax, Softplus, Tanh};

#[test]
fn test_chain_mismatch_is_rejected() {
    let layers = vec![Layer::new(4, 3, Sigmoid), Layer::new(5, 2, Softmax)];
    match Network::new(layers, 0.1) {
        Err(Error::ShapeMismatch { expected, got, .. }) => {
            assert_eq!(expected, (3, 2));
            assert_eq!(got, (5, 2));
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
}

#[test]
fn test_empty_network_and_bad_learning_rate_are_rejected() {
    assert!(matches!(Network::new(vec![], 0.1), Err(Error::InvalidConfig(_))));
    assert!(Network::new(vec![Layer::new(2, 2, Sigmoid)], 0.0).is_err());
    assert!(Network::new(vec![Layer::new(2, 2, Sigmoid)], f64::NAN).is_err());
}

#[test]
fn test_softmax_is_only_accepted_on_the_output_layer() {
    let layers = vec![Layer::new(2, 3, Softmax), Layer::new(3, 2, Softmax)];
    assert!(matches!(Network::new(layers, 0.1), Err(Error::InvalidConfig(_))));

    let layers = vec![Layer::new(2, 3, Softmax), Layer::new(3, 2, Sigmoid)];
    assert!(matches!(Network::new(layers, 0.1), Err(Error::InvalidConfig(_))));

    let spec = NetworkSpec {
        layers: vec![
            LayerSpec { input_size: 2, output_size: 3, activation: Softmax },
            LayerSpec { input_size: 3, output_size: 2, activation: Softmax },
        ],
        learning_rate: 0.1,
    };
    assert!(matches!(spec.build(), Err(Error::InvalidConfig(_))));

    assert!(Network::new(vec![Layer::new(2, 3, Tanh), Layer::new(3, 2, Softmax)], 0.1).is_ok());
}

#[test]
fn test_forward_output_length_matches_last_layer() {
    let chains: Vec<Vec<(usize, usize, ActivationFunction)>> = vec![
        vec![(784, 10, Softmax)],
        vec![(3, 7, Sigmoid), (7, 2, Softmax)],
        vec![(5, 4, ReLU), (4, 6, Tanh), (6, 1, Identity)],
        vec![(1, 1, Softplus)],
        vec![(8, 16, Softplus), (16, 16, Sigmoid), (16, 3, Softmax)],
    ];
    let mut rng = StdRng::seed_from_u64(3);
    for (seed, chain) in chains.iter().enumerate() {
        let mut network = random_network(chain, seed as u64);
        let input = random_vec(chain[0].0, &mut rng);
        let out = network.forward(&input).unwrap();
        assert_eq!(out.len(), chain.last().unwrap().1);
        assert_eq!(network.infer(&input).unwrap(), out);
    }
}

#[test]
fn test_forward_rejects_wrong_input_length() {
    let mut network = random_network(&[(3, 2, Softmax)], 1);
    assert!(matches!(network.forward(&[1.0, 2.0]), Err(Error::ShapeMismatch { .. })));
    assert!(matches!(network.infer(&[1.0; 4]), Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_layer_backward_requires_forward_and_matching_gradient() {
    let mut layer = Layer::from_parameters(
        Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
        Matrix::zeros(1, 2),
        Identity,
    )
    .unwrap();
    assert!(layer.backward(&[1.0, 1.0]).is_err());
    layer.forward(&[2.0, 3.0]).unwrap();
    assert!(matches!(layer.backward(&[1.0]), Err(Error::ShapeMismatch { .. })));

    let (input_grad, grads) = layer.backward(&[1.0, -1.0]).unwrap();
    assert_eq!(input_grad, vec![1.0, -1.0]);
    assert_eq!(grads.weights.data, vec![vec![2.0, -2.0], vec![3.0, -3.0]]);
    assert_eq!(grads.biases.row(), &[1.0, -1.0]);
    // Backward never touches parameters.
    assert_eq!(layer.weights.data, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[test]
fn test_backward_yields_one_gradient_per_layer_in_order() {
    let mut network = random_network(&[(4, 6, Sigmoid), (6, 5, Tanh), (5, 3, Softmax)], 9);
    let out = network.forward(&[0.1, 0.2, 0.3, 0.4]).unwrap();
    let grads = network
        .backward(&LossFunction::CrossEntropy.gradient(&out, &one_hot(1, 3).unwrap()))
        .unwrap();
    assert_eq!(grads.len(), 3);
    for (g, layer) in grads.iter().zip(network.layers()) {
        assert_eq!(g.weights.shape(), layer.weights.shape());
        assert_eq!(g.biases.shape(), layer.biases.shape());
    }
}

fn loss_at(network: &Network, loss: LossFunction, input: &[f64], target: &[f64]) -> f64 {
    loss.compute(&network.infer(input).unwrap(), target)
}

fn gradient_check(shapes: &[(usize, usize, ActivationFunction)], loss: LossFunction, target: Vec<f64>, seed: u64) {
    let epsilon = 1e-5;
    let mut network = random_network(shapes, seed);
    let mut rng = StdRng::seed_from_u64(seed + 100);
    let input = random_vec(shapes[0].0, &mut rng);

    let output = network.forward(&input).unwrap();
    let analytic = network.backward(&loss.gradient(&output, &target)).unwrap();
    let base = parameters(&network);

    for (l, grads) in analytic.iter().enumerate() {
        for i in 0..grads.weights.rows {
            for j in 0..grads.weights.cols {
                let mut plus = base.clone();
                let mut minus = base.clone();
                plus[l].0.data[i][j] += epsilon;
                minus[l].0.data[i][j] -= epsilon;
                let numeric = (loss_at(&with_parameters(&network, plus), loss, &input, &target)
                    - loss_at(&with_parameters(&network, minus), loss, &input, &target))
                    / (2.0 * epsilon);
                assert_relative_eq!(grads.weights.data[i][j], numeric, epsilon = 1e-7, max_relative = 1e-4);
            }
        }
        for j in 0..grads.biases.cols {
            let mut plus = base.clone();
            let mut minus = base.clone();
            plus[l].1.data[0][j] += epsilon;
            minus[l].1.data[0][j] -= epsilon;
            let numeric = (loss_at(&with_parameters(&network, plus), loss, &input, &target)
                - loss_at(&with_parameters(&network, minus), loss, &input, &target))
                / (2.0 * epsilon);
            assert_relative_eq!(grads.biases.data[0][j], numeric, epsilon = 1e-7, max_relative = 1e-4);
        }
    }
}

#[test]
fn test_gradient_check_softmax_cross_entropy() {
    gradient_check(&[(5, 4, Sigmoid), (4, 3, Softmax)], LossFunction::CrossEntropy, one_hot(2, 3).unwrap(), 21);
}

#[test]
fn test_gradient_check_softplus_hidden_layers() {
    gradient_check(
        &[(4, 5, Softplus), (5, 3, Tanh), (3, 4, Softmax)],
        LossFunction::CrossEntropy,
        one_hot(0, 4).unwrap(),
        22,
    );
}

#[test]
fn test_gradient_check_mean_squared_error() {
    gradient_check(
        &[(3, 4, Tanh), (4, 2, Sigmoid)],
        LossFunction::MeanSquaredError,
        vec![0.25, 0.75],
        23,
    );
}

/// Records the order in which parameters are handed to the rule.
struct Recorder {
    seen: Vec<ParamId>,
}

impl UpdateRule for Recorder {
    fn update(&mut self, param: ParamId, values: &mut Matrix, gradient: &Matrix, learning_rate: f64) -> Result<()> {
        self.seen.push(param);
        values.add_scaled(gradient, -learning_rate);
        Ok(())
    }
}

#[test]
fn test_apply_gradients_delegates_every_tensor_in_order() {
    let mut network = random_network(&[(2, 3, Sigmoid), (3, 2, Softmax)], 4);
    let before = parameters(&network);
    network.forward(&[0.5, -0.5]).unwrap();
    let grads = network.backward(&[0.1, -0.1]).unwrap();

    let mut rule = Recorder { seen: vec![] };
    network.apply_gradients(&grads, &mut rule).unwrap();

    assert_eq!(
        rule.seen,
        vec![
            ParamId { layer: 0, kind: ParamKind::Weights },
            ParamId { layer: 0, kind: ParamKind::Biases },
            ParamId { layer: 1, kind: ParamKind::Weights },
            ParamId { layer: 1, kind: ParamKind::Biases },
        ]
    );
    let after = parameters(&network);
    let expected = before[1].0.data[2][1] - 0.1 * grads[1].weights.data[2][1];
    assert_relative_eq!(after[1].0.data[2][1], expected);
}

#[test]
fn test_apply_gradients_rejects_misaligned_lists_without_mutation() {
    let mut network = random_network(&[(2, 3, Sigmoid), (3, 2, Softmax)], 5);
    let before = parameters(&network);
    network.forward(&[0.5, -0.5]).unwrap();
    let mut grads = network.backward(&[0.1, -0.1]).unwrap();
    let mut rule = Recorder { seen: vec![] };

    let short = vec![grads[0].clone()];
    assert!(matches!(network.apply_gradients(&short, &mut rule), Err(Error::ShapeMismatch { .. })));

    grads[1].weights = Matrix::zeros(2, 2);
    assert!(matches!(network.apply_gradients(&grads, &mut rule), Err(Error::ShapeMismatch { .. })));

    assert!(rule.seen.is_empty());
    assert_eq!(parameters(&network), before);
}
