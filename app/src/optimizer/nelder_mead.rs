use super::{Evaluator, MethodResult, OptimizerConfig};

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

//initial simplex: 5 % step along each axis, fixed step for zero coordinates
const NONZERO_STEP: f64 = 0.05;
const ZERO_STEP: f64 = 0.00025;

type Vertex = (Vec<f64>, f64);

pub(super) fn minimize(evaluator: &Evaluator, x0: &[f64], config: &OptimizerConfig) -> MethodResult {
    let n = x0.len();
    let max_iterations = config.max_iterations.unwrap_or(200 * n);
    let first_evaluation = evaluator.evaluations();
    let evaluations = || evaluator.evaluations() - first_evaluation;

    let mut simplex: Vec<Vertex> = initial_simplex(x0)
        .into_iter()
        .map(|x| {
            let f = evaluator.loss(&x);
            (x, f)
        })
        .collect();
    sort(&mut simplex);

    let mut iterations = 1;
    let mut converged = false;

    while evaluations() < 2 * max_iterations && iterations < max_iterations {
        if is_converged(&simplex, config) {
            converged = true;
            break;
        }

        let centroid = centroid(&simplex[..n]);
        let (worst, f_worst) = simplex[n].clone();

        let reflected = along(&centroid, &worst, REFLECTION);
        let f_reflected = evaluator.loss(&reflected);

        if f_reflected < simplex[0].1 {
            let expanded = along(&centroid, &worst, REFLECTION * EXPANSION);
            let f_expanded = evaluator.loss(&expanded);

            simplex[n] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
        } else if f_reflected < simplex[n - 1].1 {
            simplex[n] = (reflected, f_reflected);
        } else {
            //outside contraction if the reflection helped at all, inside contraction otherwise
            let contracted = if f_reflected < f_worst {
                along(&centroid, &worst, CONTRACTION * REFLECTION)
            } else {
                along(&centroid, &worst, -CONTRACTION)
            };
            let f_contracted = evaluator.loss(&contracted);

            if f_contracted < f_reflected.min(f_worst) {
                simplex[n] = (contracted, f_contracted);
            } else {
                shrink(evaluator, &mut simplex);
            }
        }

        sort(&mut simplex);
        iterations += 1;
    }

    let (best, loss) = &simplex[0];
    let message = if converged {
        format!("Converged after {iterations} iterations")
    } else {
        format!("Maximum number of iterations ({max_iterations}) or evaluations exceeded")
    };

    evaluator.result(best, *loss, converged, message)
}

fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = vec![x0.to_vec()];

    for k in 0..x0.len() {
        let mut vertex = x0.to_vec();
        vertex[k] = if vertex[k] != 0.0 {
            vertex[k] * (1.0 + NONZERO_STEP)
        } else {
            ZERO_STEP
        };
        simplex.push(vertex);
    }

    simplex
}

fn sort(simplex: &mut [Vertex]) {
    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
}

fn centroid(vertices: &[Vertex]) -> Vec<f64> {
    let n = vertices.len() as f64;
    let mut centroid = vec![0.0; vertices[0].0.len()];

    for (x, _) in vertices {
        for (c, v) in centroid.iter_mut().zip(x) {
            *c += v / n;
        }
    }

    centroid
}

//centroid + factor * (centroid - worst)
fn along(centroid: &[f64], worst: &[f64], factor: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst)
        .map(|(c, w)| c + factor * (c - w))
        .collect()
}

fn shrink(evaluator: &Evaluator, simplex: &mut [Vertex]) {
    let best = simplex[0].0.clone();

    for (x, f) in simplex.iter_mut().skip(1) {
        for (v, b) in x.iter_mut().zip(&best) {
            *v = b + SHRINK * (*v - b);
        }
        *f = evaluator.loss(x);
    }
}

//coordinate spread is compared against x_tolerance * (1 + |x|), loss spread absolutely
fn is_converged(simplex: &[Vertex], config: &OptimizerConfig) -> bool {
    let (best, f_best) = &simplex[0];

    let x_spread_ok = simplex[1..].iter().all(|(x, _)| {
        x.iter()
            .zip(best)
            .all(|(v, b)| (v - b).abs() <= config.x_tolerance * (1.0 + b.abs()))
    });
    let f_spread_ok = simplex[1..].iter().all(|(_, f)| (f - f_best).abs() <= config.f_tolerance);

    x_spread_ok && f_spread_ok
}
