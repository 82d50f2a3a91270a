use std::time::Instant;

use super::force_field::ForceField;

/// Settings of the conjugate gradient minimizer
#[derive(Clone, Debug)]
pub(crate) struct MinimizationConfig {
    pub max_iterations: usize,
    /// converged once the rms gradient drops below this
    pub gradient_tolerance: f64,
    /// largest displacement of a single coordinate in one step, in Ångström
    pub max_step: f64,
    pub deadline: Option<Instant>,
}

impl Default for MinimizationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            gradient_tolerance: 1e-6,
            max_step: 0.3,
            deadline: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum MinimizationStatus {
    Converged,
    /// the line search could not lower the energy any further
    Stalled,
    MaxIterations,
    DeadlineExceeded,
}

#[derive(Clone, Debug)]
pub(crate) struct MinimizationResult {
    pub energy: f64,
    pub iterations: usize,
    pub status: MinimizationStatus,
}

/// Polak-Ribière conjugate gradient with a backtracking (Armijo) line search.
/// `positions` is updated in place.
pub(crate) fn minimize_with_force_field(
    force_field: &impl ForceField,
    positions: &mut [f64],
    config: &MinimizationConfig,
) -> MinimizationResult {
    const ARMIJO: f64 = 1e-4;
    const MAX_BACKTRACKS: usize = 40;

    let n = positions.len();
    let mut gradient = vec![0.0; n];
    let mut energy = force_field.energy_and_gradients(positions, &mut gradient);
    let mut direction = gradient.iter().map(|g| -g).collect::<Vec<_>>();
    let mut trial = vec![0.0; n];
    let mut trial_gradient = vec![0.0; n];

    let finish = |energy, iterations, status| MinimizationResult {
        energy,
        iterations,
        status,
    };

    if n == 0 {
        return finish(energy, 0, MinimizationStatus::Converged);
    }

    for iteration in 0..config.max_iterations {
        if config.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return finish(energy, iteration, MinimizationStatus::DeadlineExceeded);
        }

        let rms = (dot(&gradient, &gradient) / n as f64).sqrt();
        if rms < config.gradient_tolerance {
            return finish(energy, iteration, MinimizationStatus::Converged);
        }

        let mut slope = dot(&gradient, &direction);
        if slope >= 0.0 {
            // not a descent direction, restart along the steepest descent
            for (d, g) in direction.iter_mut().zip(&gradient) {
                *d = -g;
            }
            slope = -dot(&gradient, &gradient);
        }

        let largest = direction.iter().fold(0.0f64, |max, d| max.max(d.abs()));
        let mut step = (config.max_step / largest).min(1.0);

        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            for ((t, x), d) in trial.iter_mut().zip(positions.iter()).zip(&direction) {
                *t = x + step * d;
            }
            let trial_energy = force_field.energy_and_gradients(&trial, &mut trial_gradient);
            if trial_energy <= energy + ARMIJO * step * slope {
                accepted = Some(trial_energy);
                break;
            }
            step *= 0.5;
        }

        let Some(trial_energy) = accepted else {
            return finish(energy, iteration, MinimizationStatus::Stalled);
        };

        let beta = {
            let numerator = trial_gradient
                .iter()
                .zip(&gradient)
                .map(|(new, old)| new * (new - old))
                .sum::<f64>();
            (numerator / dot(&gradient, &gradient)).max(0.0)
        };

        positions.copy_from_slice(&trial);
        std::mem::swap(&mut gradient, &mut trial_gradient);
        for (d, g) in direction.iter_mut().zip(&gradient) {
            *d = -g + beta * *d;
        }
        energy = trial_energy;
    }

    finish(energy, config.max_iterations, MinimizationStatus::MaxIterations)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    /// anisotropic quadratic bowl centered at (1, -2, 3)
    struct Bowl;

    impl ForceField for Bowl {
        fn energy_and_gradients(&self, positions: &[f64], gradients: &mut [f64]) -> f64 {
            let center = [1.0, -2.0, 3.0];
            let scale = [1.0, 10.0, 100.0];
            let mut energy = 0.0;
            for k in 0..3 {
                let d = positions[k] - center[k];
                energy += scale[k] * d * d;
                gradients[k] = 2.0 * scale[k] * d;
            }
            energy
        }
    }

    #[test]
    fn finds_minimum_of_quadratic() {
        let mut positions = [5.0, 5.0, 5.0];
        let result = minimize_with_force_field(&Bowl, &mut positions, &MinimizationConfig::default());

        assert_eq!(result.status, MinimizationStatus::Converged);
        assert_relative_eq!(positions[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(positions[1], -2.0, epsilon = 1e-6);
        assert_relative_eq!(positions[2], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn stops_at_deadline() {
        let mut positions = [5.0, 5.0, 5.0];
        let config = MinimizationConfig {
            deadline: Some(Instant::now()),
            ..Default::default()
        };
        let result = minimize_with_force_field(&Bowl, &mut positions, &config);

        assert_eq!(result.status, MinimizationStatus::DeadlineExceeded);
        assert_eq!(result.iterations, 0);
        assert_eq!(positions, [5.0, 5.0, 5.0]);
    }
}
