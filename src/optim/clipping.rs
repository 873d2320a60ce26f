use crate::layers::dense::LayerGradients;

/// Threshold used by `use_gradient_clipping()` when none is given.
pub const DEFAULT_CLIP_THRESHOLD: f64 = 5.0;

/// L2 norm over every weight and bias gradient of a step, taken together.
pub fn global_norm(gradients: &[LayerGradients]) -> f64 {
    gradients
        .iter()
        .map(|g| g.weights.squared_norm() + g.biases.squared_norm())
        .sum::<f64>()
        .sqrt()
}

/// Rescales all gradients by one common factor so their global norm is at
/// most `threshold`. Gradients already within the threshold are untouched.
///
/// Returns whether any rescaling happened.
pub fn clip_by_global_norm(gradients: &mut [LayerGradients], threshold: f64) -> bool {
    let norm = global_norm(gradients);
    if norm <= threshold || norm == 0.0 {
        return false;
    }
    let scale = threshold / norm;
    for g in gradients.iter_mut() {
        g.weights.scale_in_place(scale);
        g.biases.scale_in_place(scale);
    }
    true
}
