//! Descriptive statistics for group samples.
//!
//! Every routine treats NaN/Inf as invalid input and reports it through
//! `None` rather than propagating non-finite values into test statistics.
//!
//! # Algorithms
//!
//! - **Mean**: Neumaier-compensated summation, error independent of n.
//! - **Variance**: Welford's online algorithm.
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).
//! - **Quantile**: R-7 linear interpolation (the NumPy/pandas default).
//!   Reference: Hyndman & Fan (1996), *The American Statistician* 50(4).

/// Arithmetic mean using compensated summation.
///
/// # Returns
/// - `None` if `data` is empty or contains any NaN/Inf.
///
/// # Examples
/// ```
/// use u_abtest::stats::mean;
/// let v = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert!((mean(&v).unwrap() - 3.0).abs() < 1e-15);
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !all_finite(data) {
        return None;
    }
    Some(kahan_sum(data) / data.len() as f64)
}

/// Sample variance (denominator `n − 1`).
///
/// # Returns
/// - `None` if `data.len() < 2` or contains NaN/Inf.
///
/// # Examples
/// ```
/// use u_abtest::stats::variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((variance(&v).unwrap() - 4.571428571428571).abs() < 1e-10);
/// ```
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 || !all_finite(data) {
        return None;
    }
    WelfordAccumulator::from_slice(data).sample_variance()
}

/// Population variance (denominator `n`), the `ddof = 0` convention.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
pub fn population_variance(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !all_finite(data) {
        return None;
    }
    WelfordAccumulator::from_slice(data).population_variance()
}

/// Sample standard deviation, `sqrt(variance(data))`.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Population standard deviation, `sqrt(population_variance(data))`.
fn population_std_dev(data: &[f64]) -> Option<f64> {
    population_variance(data).map(f64::sqrt)
}

/// Standard error of the mean using the population standard deviation:
/// `σ_pop / √n`.
///
/// This is the spread used for the normal approximation of a group's
/// posterior mean. A single observation has standard error zero.
///
/// # Examples
/// ```
/// use u_abtest::stats::standard_error;
/// let se = standard_error(&[1.0, 2.0, 3.0, 4.0]).unwrap();
/// assert!((se - (1.25_f64).sqrt() / 2.0).abs() < 1e-12);
/// ```
pub fn standard_error(data: &[f64]) -> Option<f64> {
    let sd = population_std_dev(data)?;
    Some(sd / (data.len() as f64).sqrt())
}

/// R-7 quantile on data the caller has already sorted ascending.
fn quantile_sorted(sorted_data: &[f64], p: f64) -> Option<f64> {
    let n = sorted_data.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted_data[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();

    if j + 1 >= n {
        Some(sorted_data[n - 1])
    } else {
        Some((1.0 - g) * sorted_data[j] + g * sorted_data[j + 1])
    }
}

/// Neumaier-compensated summation.
///
/// Reference: Neumaier (1974), *Zeitschrift für Angewandte Mathematik
/// und Mechanik* 54(1), pp. 39–51.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}

fn all_finite(data: &[f64]) -> bool {
    data.iter().all(|x| x.is_finite())
}

fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    sorted
}

// ---------------------------------------------------------------------------
// Welford accumulator
// ---------------------------------------------------------------------------

/// Streaming accumulator for count, mean and the sum of squared deviations.
///
/// The procedures use it as a per-group summary: the t-test pools `M₂`
/// across two groups and ANOVA sums it into the within-group sum of
/// squares.
///
/// # Examples
/// ```
/// use u_abtest::stats::WelfordAccumulator;
/// let acc = WelfordAccumulator::from_slice(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
/// assert_eq!(acc.count(), 8);
/// assert!((acc.mean().unwrap() - 5.0).abs() < 1e-15);
/// assert!((acc.sum_squared_deviations() - 32.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WelfordAccumulator {
    count: u64,
    mean_acc: f64,
    m2: f64,
}

impl WelfordAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an accumulator over every value in `data`.
    pub fn from_slice(data: &[f64]) -> Self {
        let mut acc = Self::new();
        for &x in data {
            acc.update(x);
        }
        acc
    }

    /// Feeds one sample.
    ///
    /// The first sample only initializes the mean, which keeps `delta²`
    /// from overflowing for very large magnitudes.
    pub fn update(&mut self, value: f64) {
        let n1 = self.count;
        self.count += 1;

        if n1 == 0 {
            self.mean_acc = value;
            return;
        }

        let delta = value - self.mean_acc;
        self.mean_acc += delta / self.count as f64;
        self.m2 += delta * (value - self.mean_acc);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean, or `None` before the first sample.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean_acc)
        }
    }

    /// `M₂ = Σ (xᵢ − x̄)²`. Zero for fewer than two samples.
    pub fn sum_squared_deviations(&self) -> f64 {
        self.m2
    }

    /// Sample variance (`n − 1`), or `None` for fewer than 2 samples.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.m2 / (self.count - 1) as f64)
        }
    }

    /// Population variance (`n`), or `None` before the first sample.
    pub fn population_variance(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.m2 / self.count as f64)
        }
    }
}

// ---------------------------------------------------------------------------
// Column summary
// ---------------------------------------------------------------------------

/// Describe-style summary of a numeric column.
///
/// `std` uses the sample convention and is `None` for a single value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl Summary {
    /// Summarizes `data`, or returns `None` if it is empty or non-finite.
    pub fn of(data: &[f64]) -> Option<Self> {
        let mean = mean(data)?;
        let sorted = sorted_copy(data);
        Some(Self {
            count: data.len(),
            mean,
            std: std_dev(data),
            min: sorted[0],
            q25: quantile_sorted(&sorted, 0.25)?,
            median: quantile_sorted(&sorted, 0.5)?,
            q75: quantile_sorted(&sorted, 0.75)?,
            max: sorted[sorted.len() - 1],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_basic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
    }

    #[test]
    fn test_mean_rejects_non_finite() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, f64::NAN]), None);
        assert_eq!(mean(&[1.0, f64::INFINITY]), None);
    }

    #[test]
    fn test_variance_basic() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((variance(&v).unwrap() - 4.571428571428571).abs() < 1e-10);
        assert!((population_variance(&v).unwrap() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_variance_single() {
        assert_eq!(variance(&[1.0]), None);
        assert_eq!(population_variance(&[1.0]), Some(0.0));
    }

    #[test]
    fn test_standard_error_single_is_zero() {
        assert_eq!(standard_error(&[7.0]), Some(0.0));
    }

    #[test]
    fn test_standard_error_ddof_zero() {
        // population sd of [1..=5] is √2
        let se = standard_error(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((se - 2.0_f64.sqrt() / 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_sorted_r7() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&data, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&data, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&data, 1.5), None);
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_kahan_sum_compensates() {
        let data = [1e16, 1.0, -1e16];
        assert_eq!(kahan_sum(&data), 1.0);
    }

    #[test]
    fn test_welford_offset_data() {
        // Large offset would wreck the naive E[X²] − E[X]² formula.
        let data: Vec<f64> = (1..=5).map(|i| 1e9 + i as f64).collect();
        let acc = WelfordAccumulator::from_slice(&data);
        let var = acc.sample_variance().unwrap();
        assert!((var - 2.5).abs() < 1e-6, "variance of offset data should be ~2.5, got {var}");
    }

    #[test]
    fn test_welford_empty() {
        let acc = WelfordAccumulator::new();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.mean(), None);
        assert_eq!(acc.sample_variance(), None);
        assert_eq!(acc.sum_squared_deviations(), 0.0);
    }

    #[test]
    fn test_summary() {
        let s = Summary::of(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.q25, 2.0);
        assert_eq!(s.q75, 4.0);
        assert!((s.std.unwrap() - 2.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_summary_empty() {
        assert_eq!(Summary::of(&[]), None);
    }
}
