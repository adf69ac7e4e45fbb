//! Normal distribution with sampling.
//!
//! Used to approximate each group's posterior mean as `N(x̄, SE²)` and to
//! draw posterior samples from it.

use rand::Rng;

use crate::special;

/// Error type for invalid distribution parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionError {
    /// Parameters violate distribution constraints.
    #[error("invalid distribution parameters: {0}")]
    InvalidParameters(String),
}

/// Normal (Gaussian) distribution N(μ, σ²).
///
/// `σ = 0` is accepted and denotes a point mass at `μ`: a group whose
/// observations are all equal has zero standard error, and its posterior
/// collapses onto the sample mean.
///
/// # Examples
/// ```
/// use u_abtest::distributions::Normal;
/// use u_abtest::random::create_rng;
///
/// let n = Normal::new(10.0, 2.0).unwrap();
/// assert!((n.cdf(10.0) - 0.5).abs() < 1e-7);
///
/// let mut rng = create_rng(7);
/// let draws = n.sample_n(&mut rng, 4);
/// assert_eq!(draws.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    /// Creates N(μ, σ).
    ///
    /// # Errors
    /// Returns `Err` if `sigma < 0` or either parameter is not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self, DistributionError> {
        if !mu.is_finite() || !sigma.is_finite() || sigma < 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Normal requires finite μ and σ ≥ 0, got μ={mu}, σ={sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn is_degenerate(&self) -> bool {
        self.sigma == 0.0
    }

    /// CDF: Φ((x−μ)/σ), or the step function for a point mass.
    pub fn cdf(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            return if x >= self.mu { 1.0 } else { 0.0 };
        }
        special::standard_normal_cdf((x - self.mu) / self.sigma)
    }

    /// Draws one sample.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.is_degenerate() {
            return self.mu;
        }
        let (z, _) = standard_normal_pair(rng);
        self.mu + self.sigma * z
    }

    /// Draws `n` independent samples, using both halves of each
    /// Box–Muller pair.
    pub fn sample_n<R: Rng>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        if self.is_degenerate() {
            return vec![self.mu; n];
        }
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let (z0, z1) = standard_normal_pair(rng);
            out.push(self.mu + self.sigma * z0);
            if out.len() < n {
                out.push(self.mu + self.sigma * z1);
            }
        }
        out
    }
}

/// Two independent N(0, 1) variates via the Box–Muller transform.
///
/// Reference: Box & Muller (1958), "A Note on the Generation of Random
/// Normal Deviates", *Annals of Mathematical Statistics* 29(2).
fn standard_normal_pair<R: Rng>(rng: &mut R) -> (f64, f64) {
    // `random` yields [0, 1); shift to (0, 1] so ln never sees zero.
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    let radius = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    (radius * theta.cos(), radius * theta.sin())
}

// ============================================================================
// Tests
// ============================================================================
