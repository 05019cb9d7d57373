//! Random time and value distributions.
//!
//! [`TimeDistribution`] supplies processing times, repair times, and
//! inter-arrival times; every call to [`TimeDistribution::sample`] yields an
//! independent draw from the caller's RNG. [`DiscreteDistribution`] picks
//! from a weighted set of values (work plans, order quantities).
//!
//! # Reference
//! Law (2015), "Simulation Modeling and Analysis", Ch. 6 (Selecting Input
//! Probability Distributions)

use rand::Rng;
use rand_distr::{Distribution as _, Exp, LogNormal, Normal, Triangular};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Draws after which a positive-truncated normal falls back to its mean.
const MAX_TRUNCATION_DRAWS: usize = 64;

/// Smallest delay between two firings of a periodic process.
pub const MIN_INTER_ARRIVAL_MS: i64 = 1;

/// Tolerance for discrete weights summing to one.
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// A distribution over durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeDistribution {
    /// Always the same value.
    Constant(i64),
    /// Normal, truncated to positive values by resampling.
    Normal { mean_ms: f64, std_dev_ms: f64 },
    /// Uniform over `[min_ms, max_ms]`.
    Uniform { min_ms: i64, max_ms: i64 },
    /// Triangular with the given mode.
    Triangular {
        min_ms: f64,
        mode_ms: f64,
        max_ms: f64,
    },
    /// Exponential with the given mean (memoryless inter-arrival times).
    Exponential { mean_ms: f64 },
    /// Log-normal; `mu` and `sigma` are in log-milliseconds.
    LogNormal { mu: f64, sigma: f64 },
}

impl TimeDistribution {
    /// Normal distribution with `std = coefficient * mean`.
    pub fn normal_with_variation(mean_ms: f64, coefficient: f64) -> Self {
        Self::Normal {
            mean_ms,
            std_dev_ms: coefficient * mean_ms,
        }
    }

    /// Expected value (ms). For the truncated normal this is the
    /// untruncated mean.
    pub fn mean_ms(&self) -> f64 {
        match self {
            Self::Constant(v) => *v as f64,
            Self::Normal { mean_ms, .. } => *mean_ms,
            Self::Uniform { min_ms, max_ms } => (*min_ms + *max_ms) as f64 / 2.0,
            Self::Triangular {
                min_ms,
                mode_ms,
                max_ms,
            } => (min_ms + mode_ms + max_ms) / 3.0,
            Self::Exponential { mean_ms } => *mean_ms,
            Self::LogNormal { mu, sigma } => (mu + sigma.powi(2) / 2.0).exp(),
        }
    }

    /// Checks parameters; `name` identifies the distribution in the error.
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: &str| {
            Err(Error::InvalidDistribution {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };
        match self {
            Self::Constant(v) if *v < 0 => invalid("constant must be non-negative"),
            Self::Normal {
                mean_ms,
                std_dev_ms,
            } if !mean_ms.is_finite() || !std_dev_ms.is_finite() || *std_dev_ms < 0.0 => {
                invalid("mean must be finite and std dev non-negative")
            }
            Self::Uniform { min_ms, max_ms } if *min_ms < 0 || min_ms > max_ms => {
                invalid("uniform bounds must satisfy 0 <= min <= max")
            }
            Self::Triangular {
                min_ms,
                mode_ms,
                max_ms,
            } if !(*min_ms >= 0.0 && min_ms <= mode_ms && mode_ms <= max_ms) => {
                invalid("triangular bounds must satisfy 0 <= min <= mode <= max")
            }
            Self::Exponential { mean_ms } if !(mean_ms.is_finite() && *mean_ms > 0.0) => {
                invalid("exponential mean must be positive")
            }
            Self::LogNormal { mu, sigma } if !mu.is_finite() || !(sigma.is_finite() && *sigma >= 0.0) => {
                invalid("log-normal sigma must be non-negative")
            }
            _ => Ok(()),
        }
    }

    /// Checks parameters of an inter-arrival distribution.
    ///
    /// Beyond [`validate`](Self::validate), a bounded support must start at
    /// [`MIN_INTER_ARRIVAL_MS`] or later, and a normal needs a positive mean.
    pub fn validate_inter_arrival(&self, name: &str) -> Result<()> {
        self.validate(name)?;
        let min = MIN_INTER_ARRIVAL_MS as f64;
        let zero_possible = match self {
            Self::Constant(v) => *v < MIN_INTER_ARRIVAL_MS,
            Self::Uniform { min_ms, .. } => *min_ms < MIN_INTER_ARRIVAL_MS,
            Self::Triangular { min_ms, .. } => *min_ms < min,
            Self::Normal { mean_ms, .. } => *mean_ms < min,
            Self::Exponential { .. } | Self::LogNormal { .. } => false,
        };
        if zero_possible {
            return Err(Error::InvalidDistribution {
                name: name.to_string(),
                reason: format!("inter-arrival time must be at least {MIN_INTER_ARRIVAL_MS} ms"),
            });
        }
        Ok(())
    }

    /// Draws one sample (ms, never negative).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<i64> {
        let value = match self {
            Self::Constant(v) => return Ok((*v).max(0)),
            Self::Normal {
                mean_ms,
                std_dev_ms,
            } => sample_positive_normal(rng, *mean_ms, *std_dev_ms)?,
            Self::Uniform { min_ms, max_ms } => {
                if min_ms >= max_ms {
                    return Ok((*min_ms).max(0));
                }
                return Ok(rng.random_range(*min_ms..=*max_ms).max(0));
            }
            Self::Triangular {
                min_ms,
                mode_ms,
                max_ms,
            } => {
                if min_ms >= max_ms {
                    *min_ms
                } else {
                    Triangular::new(*min_ms, *max_ms, *mode_ms)
                        .map_err(|e| invalid_params("triangular", e))?
                        .sample(rng)
                }
            }
            Self::Exponential { mean_ms } => Exp::new(1.0 / mean_ms)
                .map_err(|e| invalid_params("exponential", e))?
                .sample(rng),
            Self::LogNormal { mu, sigma } => LogNormal::new(*mu, *sigma)
                .map_err(|e| invalid_params("log-normal", e))?
                .sample(rng),
        };
        Ok(value.max(0.0).round() as i64)
    }
}

impl Default for TimeDistribution {
    fn default() -> Self {
        Self::Constant(0)
    }
}

fn invalid_params(name: &str, err: impl std::fmt::Display) -> Error {
    Error::InvalidDistribution {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

/// Samples `N(mean, std)` truncated to positive values.
///
/// Non-positive draws are rejected and redrawn. After
/// `MAX_TRUNCATION_DRAWS` rejections the mean is returned (clamped at 0).
/// A zero standard deviation yields exactly the mean.
pub fn sample_positive_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> Result<f64> {
    if std_dev <= 0.0 || mean <= 0.0 {
        return Ok(mean.max(0.0));
    }
    let normal = Normal::new(mean, std_dev).map_err(|e| invalid_params("normal", e))?;
    for _ in 0..MAX_TRUNCATION_DRAWS {
        let x = normal.sample(rng);
        if x > 0.0 {
            return Ok(x);
        }
    }
    Ok(mean)
}

/// A weighted choice over a finite set of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteDistribution<T> {
    values: Vec<T>,
    weights: Vec<f64>,
}

impl<T> DiscreteDistribution<T> {
    /// Creates a distribution; weights must be non-negative and sum to 1.
    pub fn new(values: Vec<T>, weights: Vec<f64>) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidDistribution {
            name: "discrete".to_string(),
            reason,
        };
        if values.is_empty() {
            return Err(invalid("no values".to_string()));
        }
        if values.len() != weights.len() {
            return Err(invalid(format!(
                "{} values but {} weights",
                values.len(),
                weights.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid("weights must be non-negative".to_string()));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(invalid(format!("weights sum to {total}, expected 1")));
        }
        Ok(Self { values, weights })
    }

    /// Single value with probability 1.
    pub fn constant(value: T) -> Self {
        Self {
            values: vec![value],
            weights: vec![1.0],
        }
    }

    /// Equal weight on every value.
    pub fn uniform(values: Vec<T>) -> Result<Self> {
        let n = values.len();
        if n == 0 {
            return Err(Error::InvalidDistribution {
                name: "discrete".to_string(),
                reason: "no values".to_string(),
            });
        }
        Ok(Self {
            values,
            weights: vec![1.0 / n as f64; n],
        })
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Picks a value by inverse-CDF lookup.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        let u: f64 = rng.random::<f64>();
        let mut cumulative = 0.0;
        for (value, weight) in self.values.iter().zip(&self.weights) {
            cumulative += weight;
            if u < cumulative {
                return value;
            }
        }
        // Rounding left u above the final cumulative sum.
        &self.values[self.values.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_constant_sample() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = TimeDistribution::Constant(300_000);
        for _ in 0..5 {
            assert_eq!(d.sample(&mut rng).unwrap(), 300_000);
        }
        assert!((d.mean_ms() - 300_000.0).abs() < 1e-10);
    }

    #[test]
    fn test_normal_zero_std_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = TimeDistribution::normal_with_variation(600_000.0, 0.0);
        assert_eq!(d.sample(&mut rng).unwrap(), 600_000);
    }

    #[test]
    fn test_normal_is_positive() {
        let mut rng = StdRng::seed_from_u64(7);
        let d = TimeDistribution::Normal {
            mean_ms: 10.0,
            std_dev_ms: 50.0,
        };
        for _ in 0..500 {
            assert!(d.sample(&mut rng).unwrap() >= 0);
        }
    }

    #[test]
    fn test_positive_normal_mean_is_close() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 5_000;
        let sum: f64 = (0..n)
            .map(|_| sample_positive_normal(&mut rng, 1000.0, 100.0).unwrap())
            .sum();
        let mean = sum / n as f64;
        assert!((mean - 1000.0).abs() < 10.0, "mean = {mean}");
    }

    #[test]
    fn test_uniform_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let d = TimeDistribution::Uniform {
            min_ms: 100,
            max_ms: 200,
        };
        for _ in 0..200 {
            let x = d.sample(&mut rng).unwrap();
            assert!((100..=200).contains(&x));
        }
    }

    #[test]
    fn test_triangular_and_exponential() {
        let mut rng = StdRng::seed_from_u64(5);
        let tri = TimeDistribution::Triangular {
            min_ms: 10.0,
            mode_ms: 20.0,
            max_ms: 40.0,
        };
        for _ in 0..200 {
            let x = tri.sample(&mut rng).unwrap();
            assert!((10..=40).contains(&x));
        }
        let exp = TimeDistribution::Exponential { mean_ms: 1000.0 };
        assert!(exp.sample(&mut rng).unwrap() >= 0);
        assert!((exp.mean_ms() - 1000.0).abs() < 1e-10);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(TimeDistribution::Constant(-1).validate("repair").is_err());
        assert!(TimeDistribution::Uniform {
            min_ms: 5,
            max_ms: 1
        }
        .validate("x")
        .is_err());
        assert!(TimeDistribution::Exponential { mean_ms: 0.0 }
            .validate("x")
            .is_err());
        assert!(TimeDistribution::Normal {
            mean_ms: 1.0,
            std_dev_ms: -1.0
        }
        .validate("x")
        .is_err());
        assert!(TimeDistribution::Constant(10).validate("x").is_ok());

        match TimeDistribution::Constant(-1).validate("repair") {
            Err(Error::InvalidDistribution { name, .. }) => assert_eq!(name, "repair"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_discrete_validation() {
        assert!(DiscreteDistribution::new(vec!["a", "b"], vec![0.5, 0.4]).is_err());
        assert!(DiscreteDistribution::new(vec!["a"], vec![0.5, 0.5]).is_err());
        assert!(DiscreteDistribution::<u32>::new(vec![], vec![]).is_err());
        assert!(DiscreteDistribution::new(vec!["a", "b"], vec![0.25, 0.75]).is_ok());
    }

    #[test]
    fn test_discrete_sampling_respects_weights() {
        let mut rng = StdRng::seed_from_u64(11);
        let d = DiscreteDistribution::new(vec!["a", "b"], vec![0.0, 1.0]).unwrap();
        for _ in 0..100 {
            assert_eq!(*d.sample(&mut rng), "b");
        }

        let c = DiscreteDistribution::constant(3u32);
        assert_eq!(*c.sample(&mut rng), 3);

        let u = DiscreteDistribution::uniform(vec![1, 2, 3, 4]).unwrap();
        let total: f64 = u.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-10);
    }
}
