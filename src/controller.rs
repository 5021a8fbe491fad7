//! Next-window probability from target, demand estimate and budget.
//!
//! A proportional-integral controller without the derivative term:
//! the per-window target is the set point and the interval budget the integral error.

/// Below one expected event per window, demand is considered unknown.
pub const MIN_POPULATION_ESTIMATE: f64 = 1.0;

/// `clamp((target + budget) / max(estimate, 1), 0, 1)`.
/// Unknown demand (tiny, zero or NaN estimate) admits everything and lets the sample limit cap the window.
pub fn next_probability(target_per_window: f64, population_estimate: f64, budget: f64) -> f64 {
    if !(population_estimate >= MIN_POPULATION_ESTIMATE) {
        return 1.0;
    }
    let probability = (target_per_window + budget) / population_estimate.max(1.0);
    if probability.is_nan() {
        1.0
    } else {
        probability.max(0.0).min(1.0)
    }
}

/// Most samples a window may take: the target plus whatever budget the interval carries.
pub fn sample_limit(target_per_window: f64, budget: f64) -> u64 {
    let allowance = target_per_window + budget;
    if allowance > 0.0 {
        allowance.ceil().min(u64::from(u32::MAX) as f64) as u64
    } else {
        0
    }
}
