use convnet_engine::gradient_check::{GradientCheckReport, DEFAULT_GRADIENT_TOLERANCE};
use convnet_engine::layers::{ConvolutionLayer, FullyConnectedLayer, LayerShape, MaxPoolingLayer};
use convnet_engine::network::NeuralNetwork;
use convnet_engine::utils::{Activation, SimpleRng};
use log::{error, info, warn};
use std::process;
use tracing_subscriber::filter::LevelFilter;

// Compares backpropagated gradients against central differences for a
// fully connected network and a convolution + pooling network.
// Usage: gradient_check [seed]
const DEFAULT_SEED: u64 = 7;

fn fully_connected_network(rng: &mut SimpleRng) -> NeuralNetwork {
    NeuralNetwork::new(
        LayerShape::column_vector(4),
        vec![
            Box::new(FullyConnectedLayer::new(5, Activation::Sigmoid)),
            Box::new(FullyConnectedLayer::new(3, Activation::Sigmoid)),
        ],
        rng,
    )
}

fn convolution_network(rng: &mut SimpleRng) -> NeuralNetwork {
    NeuralNetwork::new(
        LayerShape::new(1, 6, 6),
        vec![
            Box::new(ConvolutionLayer::new(2, 3, 3, Activation::Sigmoid)),
            Box::new(MaxPoolingLayer::new(2, 2)),
            Box::new(FullyConnectedLayer::new(2, Activation::Sigmoid)),
        ],
        rng,
    )
}

fn report(name: &str, report: &GradientCheckReport) -> bool {
    let passed = report.passes(DEFAULT_GRADIENT_TOLERANCE);
    info!(
        "{}: {} parameters, max relative error {:.3e}",
        name,
        report.entries.len(),
        report.max_relative_error()
    );
    for entry in report.failures(DEFAULT_GRADIENT_TOLERANCE) {
        warn!(
            "{}: layer {} parameter {} numeric {:.8} analytic {:.8}",
            name, entry.layer, entry.parameter, entry.numeric, entry.analytic
        );
    }
    passed
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    let seed = match std::env::args().nth(1) {
        Some(arg) => arg.parse().unwrap_or_else(|_| {
            error!("Seed must be an unsigned integer, got '{}'", arg);
            process::exit(2);
        }),
        None => DEFAULT_SEED,
    };
    let mut rng = SimpleRng::new(seed);

    let mut dense = fully_connected_network(&mut rng);
    let dense_ok = report("fully connected", &dense.gradient_check(&mut rng));

    let mut conv = convolution_network(&mut rng);
    let conv_ok = report("convolution", &conv.gradient_check(&mut rng));

    if dense_ok && conv_ok {
        info!("All gradients within tolerance {:e}", DEFAULT_GRADIENT_TOLERANCE);
    } else {
        error!("Gradient check failed");
        process::exit(1);
    }
}
