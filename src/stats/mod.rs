// src/stats/mod.rs
use anyhow::{bail, Context, Result};
use statrs::distribution::{ContinuousCDF, StudentsT};

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). Needs at least two
/// observations; a single point has no spread to estimate.
pub fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = xs.iter().sum::<f64>() / xs.len() as f64;
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn median(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Result of Welch's two-sample t-test (unequal variances).
#[derive(Debug, Clone)]
pub struct WelchTTest {
    pub t: f64,
    pub df: f64,
    pub p_value: f64,
    pub mean_a: f64,
    pub mean_b: f64,
    pub n_a: usize,
    pub n_b: usize,
}

impl WelchTTest {
    pub fn significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Welch's t-test with a two-sided p-value from the Student's t CDF at the
/// Welch-Satterthwaite degrees of freedom.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<WelchTTest> {
    if a.len() < 2 || b.len() < 2 {
        bail!(
            "t-test needs at least two observations per group (got {} and {})",
            a.len(),
            b.len()
        );
    }
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let mean_a = a.iter().sum::<f64>() / na;
    let mean_b = b.iter().sum::<f64>() / nb;
    let var_a = a.iter().map(|x| (x - mean_a).powi(2)).sum::<f64>() / (na - 1.0);
    let var_b = b.iter().map(|x| (x - mean_b).powi(2)).sum::<f64>() / (nb - 1.0);

    let se2 = var_a / na + var_b / nb;
    if se2 == 0.0 {
        bail!("both groups have zero variance; the t statistic is undefined");
    }
    let t = (mean_a - mean_b) / se2.sqrt();
    let df = se2.powi(2)
        / ((var_a / na).powi(2) / (na - 1.0) + (var_b / nb).powi(2) / (nb - 1.0));

    let dist = StudentsT::new(0.0, 1.0, df).context("building Student's t distribution")?;
    let p_value = 2.0 * dist.cdf(-t.abs());

    Ok(WelchTTest {
        t,
        df,
        p_value,
        mean_a,
        mean_b,
        n_a: a.len(),
        n_b: b.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_median_basics() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0]), Some(15.0));
        assert_eq!(median(&[1.0, 3.0, 2.0]), Some(2.0));
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        assert_eq!(sample_std(&[5.0]), None);
        let s = sample_std(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((s - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn welch_against_known_values() {
        // scipy.stats.ttest_ind([1..5], [2,4,6,8,10], equal_var=False)
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let test = welch_t_test(&a, &b).unwrap();
        assert!((test.t - (-1.8973665961010278)).abs() < 1e-9);
        assert!((test.df - 5.882352941176471).abs() < 1e-9);
        assert!(test.p_value > 0.10 && test.p_value < 0.12);
        assert!(!test.significant(0.05));
    }

    #[test]
    fn identical_groups_are_not_significant() {
        let xs = [1.0, 2.0, 3.0];
        let test = welch_t_test(&xs, &xs).unwrap();
        assert_eq!(test.t, 0.0);
        assert!((test.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_is_an_error() {
        assert!(welch_t_test(&[2.0, 2.0], &[3.0, 3.0]).is_err());
        assert!(welch_t_test(&[1.0], &[1.0, 2.0]).is_err());
    }
}
