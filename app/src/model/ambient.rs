use crate::core::unit::DegreeCelsius;

//neighbours heat all winter, so cold exterior temperatures are lifted
pub fn adjusted_ambient(exterior: DegreeCelsius, consider_neighbors: bool) -> DegreeCelsius {
    if !consider_neighbors {
        return exterior;
    }

    if exterior.0 >= 10.0 {
        exterior
    } else if exterior.0 > 0.0 {
        DegreeCelsius(10.0)
    } else {
        DegreeCelsius(exterior.0 + 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warm_outside_is_kept() {
        assert_eq!(adjusted_ambient(DegreeCelsius(14.0), true), DegreeCelsius(14.0));
        assert_eq!(adjusted_ambient(DegreeCelsius(10.0), true), DegreeCelsius(10.0));
    }

    #[test]
    fn test_mild_outside_is_clamped() {
        assert_eq!(adjusted_ambient(DegreeCelsius(5.0), true), DegreeCelsius(10.0));
        assert_eq!(adjusted_ambient(DegreeCelsius(0.1), true), DegreeCelsius(10.0));
    }

    #[test]
    fn test_freezing_outside_is_shifted() {
        assert_eq!(adjusted_ambient(DegreeCelsius(0.0), true), DegreeCelsius(10.0));
        assert_eq!(adjusted_ambient(DegreeCelsius(-4.0), true), DegreeCelsius(6.0));
    }

    #[test]
    fn test_neighbors_ignored() {
        assert_eq!(adjusted_ambient(DegreeCelsius(-4.0), false), DegreeCelsius(-4.0));
    }
}
