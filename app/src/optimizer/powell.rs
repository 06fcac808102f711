use super::{Evaluator, MethodResult, OptimizerConfig};

const GOLDEN: f64 = 1.618033988749895;
const GOLDEN_SECTION: f64 = 0.381966011250105;
const MAX_BRACKET_STEPS: usize = 50;
const MAX_LINE_ITERATIONS: usize = 100;
const LINE_TOLERANCE: f64 = 1e-8;

//axis directions scaled by the start point
pub(super) fn minimize(evaluator: &Evaluator, x0: &[f64], config: &OptimizerConfig) -> MethodResult {
    let n = x0.len();
    let max_iterations = config.max_iterations.unwrap_or(1000 * n);
    let first_evaluation = evaluator.evaluations();

    let mut directions: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut direction = vec![0.0; n];
            direction[i] = if x0[i] != 0.0 { x0[i].abs() } else { 1.0 };
            direction
        })
        .collect();

    let mut x = x0.to_vec();
    let mut fx = evaluator.loss(&x);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations && evaluator.evaluations() - first_evaluation < max_iterations {
        iterations += 1;
        let (x_start, f_start) = (x.clone(), fx);
        let mut biggest_drop = 0.0;
        let mut biggest_index = 0;

        for (i, direction) in directions.iter().enumerate() {
            let f_before = fx;
            let (step, f) = line_minimize(evaluator, &x, direction, fx);
            x = offset(&x, direction, step);
            fx = f;

            if f_before - fx > biggest_drop {
                biggest_drop = f_before - fx;
                biggest_index = i;
            }
        }

        if !fx.is_finite() {
            break;
        }

        if 2.0 * (f_start - fx) <= config.f_tolerance * (f_start.abs() + fx.abs()) + 1e-20 {
            converged = true;
            break;
        }

        //replace the direction of largest decrease by the overall displacement if that pays off
        let displacement: Vec<f64> = x.iter().zip(&x_start).map(|(a, b)| a - b).collect();
        let f_extrapolated = evaluator.loss(&offset(&x, &displacement, 1.0));

        if f_start > f_extrapolated {
            let t = 2.0 * (f_start + f_extrapolated - 2.0 * fx) * (f_start - fx - biggest_drop).powi(2)
                - biggest_drop * (f_start - f_extrapolated).powi(2);

            if t < 0.0 {
                let (step, f) = line_minimize(evaluator, &x, &displacement, fx);
                x = offset(&x, &displacement, step);
                fx = f;

                let new_direction: Vec<f64> = displacement.iter().map(|d| d * step).collect();
                if new_direction.iter().any(|d| *d != 0.0) {
                    directions[biggest_index] = directions[n - 1].clone();
                    directions[n - 1] = new_direction;
                }
            }
        }
    }

    let message = if converged {
        format!("Converged after {iterations} iterations")
    } else if !fx.is_finite() {
        "Loss is not finite along any search direction".to_string()
    } else {
        format!("Maximum number of iterations or evaluations ({max_iterations}) exceeded")
    };

    evaluator.result(&x, fx, converged, message)
}

fn offset(x: &[f64], direction: &[f64], step: f64) -> Vec<f64> {
    x.iter().zip(direction).map(|(v, d)| v + step * d).collect()
}

//minimises f(x + step * direction) over step, returns the step and the loss there
fn line_minimize(evaluator: &Evaluator, x: &[f64], direction: &[f64], fx: f64) -> (f64, f64) {
    let phi = |step: f64| evaluator.loss(&offset(x, direction, step));

    //walk downhill from the better of the first two points
    let (mut a, mut b, mut fb) = (0.0, 1.0, phi(1.0));
    if fb > fx {
        (a, b, fb) = (1.0, 0.0, fx);
    }

    let mut c = b + GOLDEN * (b - a);
    let mut fc = phi(c);
    let mut steps = 0;

    while fc < fb && steps < MAX_BRACKET_STEPS {
        a = b;
        (b, fb) = (c, fc);
        c = b + GOLDEN * (b - a);
        fc = phi(c);
        steps += 1;
    }

    if fc < fb {
        //no bracket found within the step limit, keep the furthest improvement
        return (c, fc);
    }

    golden_section(&phi, a, (b, fb), c)
}

//golden-section search on [a, c] starting from an interior point with known loss
fn golden_section(phi: &impl Fn(f64) -> f64, a: f64, interior: (f64, f64), c: f64) -> (f64, f64) {
    let (b, fb) = interior;
    let (mut x0, mut x3) = (a, c);

    let (mut x1, mut f1, mut x2, mut f2) = if (c - b).abs() > (b - a).abs() {
        let x2 = b + GOLDEN_SECTION * (c - b);
        (b, fb, x2, phi(x2))
    } else {
        let x1 = b - GOLDEN_SECTION * (b - a);
        (x1, phi(x1), b, fb)
    };

    let mut iterations = 0;
    while (x3 - x0).abs() > LINE_TOLERANCE * (x1.abs() + x2.abs()) + 1e-10 && iterations < MAX_LINE_ITERATIONS {
        if f2 < f1 {
            x0 = x1;
            (x1, f1) = (x2, f2);
            x2 = (1.0 - GOLDEN_SECTION) * x2 + GOLDEN_SECTION * x3;
            f2 = phi(x2);
        } else {
            x3 = x2;
            (x2, f2) = (x1, f1);
            x1 = (1.0 - GOLDEN_SECTION) * x1 + GOLDEN_SECTION * x0;
            f1 = phi(x1);
        }
        iterations += 1;
    }

    if f1 < f2 { (x1, f1) } else { (x2, f2) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_minimize_parabola() {
        let objective = |x: &[f64]| (x[0] - 4.0).powi(2);
        let evaluator = Evaluator::new(&objective, None);

        let (step, f) = line_minimize(&evaluator, &[1.0], &[1.0], 9.0);

        assert!((step - 3.0).abs() < 1e-6);
        assert!(f < 1e-10);
    }

    #[test]
    fn test_line_minimize_backwards() {
        let objective = |x: &[f64]| (x[0] + 2.0).powi(2);
        let evaluator = Evaluator::new(&objective, None);

        let (step, _) = line_minimize(&evaluator, &[1.0], &[1.0], 9.0);

        assert!((step + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_badly_scaled_quadratic() {
        //same shape as the thermal parameters: one coordinate around 1e-2, one around 1e6
        let objective = |x: &[f64]| ((x[0] - 0.008) / 0.008).powi(2) + ((x[1] - 4.5e6) / 4.5e6).powi(2);
        let evaluator = Evaluator::new(&objective, None);

        let result = minimize(&evaluator, &[0.01, 3.6e6], &OptimizerConfig::default());

        assert!(result.loss < 1e-12, "{result:?}");
        assert!((result.parameters[0] - 0.008).abs() / 0.008 < 1e-4);
        assert!((result.parameters[1] - 4.5e6).abs() / 4.5e6 < 1e-4);
    }

    #[test]
    fn test_non_finite_everywhere() {
        let objective = |_: &[f64]| f64::NAN;
        let evaluator = Evaluator::new(&objective, None);

        let result = minimize(&evaluator, &[1.0, 1.0], &OptimizerConfig::default());

        assert!(!result.converged);
        assert_eq!(result.loss, f64::INFINITY);
    }
}
