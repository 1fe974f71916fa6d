// Tests for forward propagation through single layers and whole networks,
// with parameters fixed to known values so outputs can be computed by hand.

use convnet_engine::layers::{
    ConvolutionLayer, FullyConnectedLayer, Layer, LayerShape, MaxPoolingLayer,
};
use convnet_engine::matrix::Matrix;
use convnet_engine::network::NeuralNetwork;
use convnet_engine::training::Network;
use convnet_engine::utils::activations::{relu, sigmoid};
use convnet_engine::utils::{Activation, SimpleRng};

fn two_two_one() -> NeuralNetwork {
    let hidden = FullyConnectedLayer::from_parameters(
        Matrix::from_vec(2, 2, vec![0.1, 0.2, 0.3, 0.4]),
        Matrix::from_vec(2, 1, vec![0.5, -0.5]),
        Activation::Sigmoid,
    );
    let output = FullyConnectedLayer::from_parameters(
        Matrix::from_vec(1, 2, vec![1.0, -1.0]),
        Matrix::from_vec(1, 1, vec![0.25]),
        Activation::Sigmoid,
    );
    NeuralNetwork::new(
        LayerShape::column_vector(2),
        vec![Box::new(hidden), Box::new(output)],
        &mut SimpleRng::new(1),
    )
}

// ============================================================================
// Fully Connected Forward Tests
// ============================================================================

mod fully_connected_forward_tests {
    use super::*;

    #[test]
    fn test_two_two_one_network_exact_output() {
        let mut net = two_two_one();
        let output = net.predict(&Matrix::from_vec(2, 1, vec![1.0, 2.0]));

        // Same evaluation order as the product kernel: accumulate from zero, then add the bias.
        let h0 = sigmoid(0.0 + 0.1 * 1.0 + 0.2 * 2.0 + 0.5);
        let h1 = sigmoid(0.0 + 0.3 * 1.0 + 0.4 * 2.0 + -0.5);
        let expected = sigmoid(0.0 + 1.0 * h0 + -1.0 * h1 + 0.25);

        assert_eq!(output.shape(), (1, 1));
        assert_eq!(output[(0, 0)], expected);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let mut net = two_two_one();
        let input = Matrix::from_vec(2, 1, vec![-0.3, 0.8]);
        let first = net.predict(&input);
        let second = net.predict(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_row_vector_input_is_accepted() {
        let mut net = two_two_one();
        let column = net.predict(&Matrix::from_vec(2, 1, vec![1.0, 2.0]));
        let row = net.predict(&Matrix::from_vec(1, 2, vec![1.0, 2.0]));
        assert_eq!(column, row);
    }

    #[test]
    fn test_rectifier_layer_output() {
        let mut layer = FullyConnectedLayer::from_parameters(
            Matrix::from_vec(2, 2, vec![1.0, -1.0, -1.0, 1.0]),
            Matrix::zeros(2, 1),
            Activation::Rectifier,
        );
        layer.connect(LayerShape::column_vector(2), &mut SimpleRng::new(1));
        let output = layer.forward(&[Matrix::from_vec(2, 1, vec![3.0, 1.0])]);
        assert_eq!(output[0].elements(), &[2.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "Wrong input size")]
    fn test_wrong_input_size_panics() {
        two_two_one().predict(&Matrix::zeros(3, 1));
    }
}

// ============================================================================
// Convolution And Pooling Forward Tests
// ============================================================================

mod convolution_forward_tests {
    use super::*;

    #[test]
    fn test_convolution_feature_maps() {
        let kernels = vec![
            Matrix::new(3, 3, 1.0),
            Matrix::from_vec(3, 3, vec![0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
        ];
        let mut conv =
            ConvolutionLayer::from_parameters(kernels, vec![-40.0, 0.5], Activation::Rectifier);
        let shape = conv.connect(LayerShape::new(1, 4, 4), &mut SimpleRng::new(1));
        assert_eq!(shape, LayerShape::new(2, 2, 2));

        let input = Matrix::sequence(4, 4);
        let output = conv.forward(std::slice::from_ref(&input));
        assert_eq!(output.len(), 2);

        // Box sums of the four 3x3 windows: 54, 63, 90, 99.
        let expected_sums = [54.0, 63.0, 90.0, 99.0];
        for (value, sum) in output[0].elements().iter().zip(expected_sums) {
            assert_eq!(*value, relu(sum - 40.0));
        }
        // Horizontal gradient of a row-major sequence is 2 everywhere.
        assert!(output[1].elements().iter().all(|&v| v == 2.5));
    }

    #[test]
    fn test_pooling_of_each_feature() {
        let mut pool = MaxPoolingLayer::new(2, 2);
        pool.connect(LayerShape::new(2, 2, 4), &mut SimpleRng::new(1));

        let first = Matrix::from_vec(2, 4, vec![1.0, 5.0, 2.0, 0.0, 3.0, 4.0, 8.0, 7.0]);
        let second = Matrix::from_vec(2, 4, vec![-1.0, -2.0, -3.0, -4.0, -5.0, -6.0, -7.0, -8.0]);
        let output = pool.forward(&[first, second]);

        assert_eq!(output[0].elements(), &[5.0, 8.0]);
        assert_eq!(output[1].elements(), &[-1.0, -3.0]);
    }

    #[test]
    fn test_conv_pool_dense_network_output_shape() {
        let mut rng = SimpleRng::new(5);
        let mut net = NeuralNetwork::new(
            LayerShape::new(1, 10, 10),
            vec![
                Box::new(ConvolutionLayer::new(3, 3, 3, Activation::Rectifier)),
                Box::new(MaxPoolingLayer::new(2, 2)),
                Box::new(FullyConnectedLayer::new(4, Activation::Sigmoid)),
            ],
            &mut rng,
        );
        let output = net.predict(&Matrix::random_normal(10, 10, &mut rng));
        assert_eq!(output.shape(), (4, 1));
        assert!(output.elements().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_network_output_flattens_feature_maps() {
        let mut net = NeuralNetwork::new(
            LayerShape::new(1, 4, 4),
            vec![
                Box::new(ConvolutionLayer::from_parameters(
                    vec![Matrix::zeros(3, 3), Matrix::zeros(3, 3)],
                    vec![1.0, 2.0],
                    Activation::Rectifier,
                )),
            ],
            &mut SimpleRng::new(1),
        );
        let output = net.predict(&Matrix::sequence(4, 4));
        assert_eq!(output.elements(), &[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
    }
}
