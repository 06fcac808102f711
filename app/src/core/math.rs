//Plain statistics over f64 slices. Empty input yields None instead of NaN.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

//population standard deviation (divides by n)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;

    Some(variance.sqrt())
}

pub fn rmse(predicted: &[f64], observed: &[f64]) -> Option<f64> {
    let squared: Vec<f64> = paired(predicted, observed).map(|(p, o)| (p - o).powi(2)).collect();
    mean(&squared).map(f64::sqrt)
}

pub fn mae(predicted: &[f64], observed: &[f64]) -> Option<f64> {
    let absolute: Vec<f64> = paired(predicted, observed).map(|(p, o)| (p - o).abs()).collect();
    mean(&absolute)
}

pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        covariance += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return None;
    }

    Some(covariance / denominator)
}

fn paired<'a>(a: &'a [f64], b: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    a.iter().zip(b).map(|(x, y)| (*x, *y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        assert_eq!(mean(&values), Some(5.0));
        assert_eq!(std_dev(&values), Some(2.0));
    }

    #[test]
    fn test_empty() {
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[]), None);
        assert_eq!(rmse(&[], &[]), None);
    }

    #[test]
    fn test_rmse_and_mae() {
        let predicted = [1.0, 2.0, 3.0];
        let observed = [1.0, 4.0, 3.0];

        assert_eq!(mae(&predicted, &observed), Some(2.0 / 3.0));
        assert_eq!(rmse(&predicted, &observed), Some((4.0_f64 / 3.0).sqrt()));
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];

        assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]), None);
    }
}
