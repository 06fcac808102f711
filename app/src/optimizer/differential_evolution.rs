use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::core::{Range, math};

use super::{Evaluator, MethodResult, OptimizerConfig, nelder_mead};

const MIN_POPULATION: usize = 5;
const CROSSOVER_PROBABILITY: f64 = 0.7;
const MUTATION_MIN: f64 = 0.5;
const MUTATION_MAX: f64 = 1.0;

//best/1/bin on the unit cube, seeded
pub(super) fn minimize(evaluator: &Evaluator, bounds: &[Range<f64>], config: &OptimizerConfig) -> MethodResult {
    let n = bounds.len();
    let size = (config.population_factor * n).max(MIN_POPULATION);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let scale = |unit: &[f64]| -> Vec<f64> {
        unit.iter()
            .zip(bounds)
            .map(|(u, range)| range.from() + u * (range.to() - range.from()))
            .collect()
    };

    let mut population = latin_hypercube(size, n, &mut rng);
    let mut energies: Vec<f64> = population.iter().map(|member| evaluator.loss(&scale(member))).collect();
    let mut best = index_of_min(&energies);

    let mut generations = 0;
    let mut converged = false;

    while generations < config.max_generations {
        let mutation = rng.random_range(MUTATION_MIN..MUTATION_MAX);

        for i in 0..size {
            let (r0, r1) = two_others(i, size, &mut rng);
            let fill_point = rng.random_range(0..n);

            let trial: Vec<f64> = (0..n)
                .map(|j| {
                    if j == fill_point || rng.random::<f64>() < CROSSOVER_PROBABILITY {
                        let value = population[best][j] + mutation * (population[r0][j] - population[r1][j]);
                        if (0.0..=1.0).contains(&value) { value } else { rng.random::<f64>() }
                    } else {
                        population[i][j]
                    }
                })
                .collect();

            let energy = evaluator.loss(&scale(&trial));
            if energy <= energies[i] {
                population[i] = trial;
                energies[i] = energy;

                if energy < energies[best] {
                    best = i;
                }
            }
        }

        generations += 1;

        if is_converged(&energies, config.de_tolerance) {
            converged = true;
            break;
        }
    }

    let mut x = scale(&population[best]);
    let mut loss = energies[best];
    let mut message = if converged {
        format!("Population converged after {generations} generations")
    } else {
        format!("Maximum number of generations ({}) exceeded", config.max_generations)
    };

    if config.polish && loss.is_finite() {
        let polished = nelder_mead::minimize(evaluator, &x, config);
        if polished.loss < loss {
            x = polished.parameters;
            loss = polished.loss;
            message.push_str(", polished");
        }
    }

    evaluator.result(&x, loss, converged, message)
}

fn latin_hypercube(size: usize, n: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut population = vec![vec![0.0; n]; size];

    for j in 0..n {
        let mut segments: Vec<usize> = (0..size).collect();
        segments.shuffle(rng);

        for (member, segment) in population.iter_mut().zip(segments) {
            member[j] = (segment as f64 + rng.random::<f64>()) / size as f64;
        }
    }

    population
}

//two distinct members, both different from the candidate
fn two_others(candidate: usize, size: usize, rng: &mut StdRng) -> (usize, usize) {
    let r0 = loop {
        let index = rng.random_range(0..size);
        if index != candidate {
            break index;
        }
    };
    let r1 = loop {
        let index = rng.random_range(0..size);
        if index != candidate && index != r0 {
            break index;
        }
    };

    (r0, r1)
}

fn index_of_min(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

//spread of the population energies relative to their mean
fn is_converged(energies: &[f64], tolerance: f64) -> bool {
    match (math::std_dev(energies), math::mean(energies)) {
        (Some(spread), Some(mean)) => spread <= tolerance * mean.abs(),
        _ => false,
    }
}
