use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::collections::BTreeMap;

/// Exact distance histogram: distance → number of MPR pairs.
///
/// Zero counts are never stored. Every operation returns a fresh value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    bins: BTreeMap<u64, BigUint>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{0: 1}`, the neutral element of [`Histogram::convolve`].
    pub fn unit() -> Self {
        Self::from_pairs([(0, BigUint::from(1u32))])
    }

    /// Repeated keys are summed.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u64, BigUint)>,
    {
        let mut bins: BTreeMap<u64, BigUint> = BTreeMap::new();
        for (k, v) in pairs {
            if !v.is_zero() {
                *bins.entry(k).or_default() += v;
            }
        }
        Self { bins }
    }

    pub fn get(&self, key: u64) -> BigUint {
        self.bins.get(&key).cloned().unwrap_or_default()
    }

    /// Number of non-zero keys.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &BigUint)> {
        self.bins.iter().map(|(k, v)| (*k, v))
    }

    pub fn shift(&self, k: u64) -> Self {
        Self {
            bins: self.bins.iter().map(|(x, v)| (x + k, v.clone())).collect(),
        }
    }

    pub fn scale(&self, c: &BigUint) -> Self {
        if c.is_zero() {
            return Self::new();
        }
        Self {
            bins: self.bins.iter().map(|(x, v)| (*x, v * c)).collect(),
        }
    }

    /// (f ∗ g)(n) = Σᵢ f(i)·g(n − i)
    pub fn convolve(&self, other: &Self) -> Self {
        let mut bins: BTreeMap<u64, BigUint> = BTreeMap::new();
        for (x, a) in &self.bins {
            for (y, b) in &other.bins {
                *bins.entry(x + y).or_default() += a * b;
            }
        }
        Self { bins }
    }

    /// Pointwise sum.
    pub fn add(&self, other: &Self) -> Self {
        let mut bins = self.bins.clone();
        for (x, v) in &other.bins {
            *bins.entry(*x).or_default() += v;
        }
        Self { bins }
    }

    /// In-place pointwise sum, for accumulation loops.
    pub fn add_assign(&mut self, other: &Self) {
        for (x, v) in &other.bins {
            *self.bins.entry(*x).or_default() += v;
        }
    }

    /// Maps every key x to k·x.
    pub fn xscale(&self, k: u64) -> Self {
        Self::from_pairs(self.bins.iter().map(|(x, v)| (x * k, v.clone())))
    }

    /// Drops the 0 key.
    pub fn omit_zero(&self) -> Self {
        let mut bins = self.bins.clone();
        bins.remove(&0);
        Self { bins }
    }

    pub fn sum(&self) -> BigUint {
        self.bins.values().sum()
    }

    pub fn max_key(&self) -> Option<u64> {
        self.bins.keys().next_back().copied()
    }

    /// Σ key·count
    pub fn total_distance(&self) -> BigUint {
        self.bins.iter().map(|(x, v)| v * BigUint::from(*x)).sum()
    }

    /// Exact mean, converted to f64 at the end. `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        let n = self.sum();
        if n.is_zero() {
            return None;
        }
        Some(ratio(&self.total_distance(), &n))
    }

    /// Population variance, (n·Σx²c − (Σxc)²) / n², exact until the division.
    pub fn variance(&self) -> Option<f64> {
        let n = self.sum();
        if n.is_zero() {
            return None;
        }
        let s1 = self.total_distance();
        let s2: BigUint = self
            .bins
            .iter()
            .map(|(x, v)| v * BigUint::from(*x) * BigUint::from(*x))
            .sum();
        let num = &n * s2 - &s1 * &s1;
        Some(ratio(&num, &(&n * &n)))
    }

    /// Running sums over increasing keys.
    pub fn cumulative(&self) -> Self {
        let mut acc = BigUint::zero();
        let mut bins = BTreeMap::new();
        for (x, v) in &self.bins {
            acc += v;
            bins.insert(*x, acc.clone());
        }
        Self { bins }
    }

    /// Keys divided by `divisor`, counts as f64.
    pub fn rescale_x(&self, divisor: f64) -> Density {
        Density {
            points: self
                .bins
                .iter()
                .map(|(x, v)| (*x as f64 / divisor, big_to_f64(v)))
                .collect(),
        }
    }

    /// Keys rescaled to [0, 1] by the maximum key.
    pub fn normalize_x(&self) -> Density {
        match self.max_key() {
            Some(m) if m > 0 => self.rescale_x(m as f64),
            _ => self.rescale_x(1.0),
        }
    }

    /// Counts divided by their sum, so that the weights add up to 1.
    pub fn normalize_y(&self) -> Density {
        let n = self.sum();
        Density {
            points: self
                .bins
                .iter()
                .map(|(x, v)| (*x as f64, ratio(v, &n)))
                .collect(),
        }
    }

    pub fn to_density(&self) -> Density {
        self.rescale_x(1.0)
    }
}

/// Normalized histogram: sorted (key, weight) points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Density {
    points: Vec<(f64, f64)>,
}

impl Density {
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn sum(&self) -> f64 {
        self.points.iter().map(|(_, w)| w).sum()
    }

    pub fn max_key(&self) -> Option<f64> {
        self.points.last().map(|(x, _)| *x)
    }

    pub fn mean(&self) -> Option<f64> {
        let n = self.sum();
        if n == 0.0 {
            return None;
        }
        Some(self.points.iter().map(|(x, w)| x * w).sum::<f64>() / n)
    }

    pub fn variance(&self) -> Option<f64> {
        let n = self.sum();
        let mean = self.mean()?;
        Some(
            self.points
                .iter()
                .map(|(x, w)| (x - mean) * (x - mean) * w)
                .sum::<f64>()
                / n,
        )
    }

    pub fn cumulative(&self) -> Density {
        let mut acc = 0.0;
        Density {
            points: self
                .points
                .iter()
                .map(|(x, w)| {
                    acc += w;
                    (*x, acc)
                })
                .collect(),
        }
    }

    pub fn normalize_y(&self) -> Density {
        let n = self.sum();
        if n == 0.0 {
            return self.clone();
        }
        Density {
            points: self.points.iter().map(|(x, w)| (*x, w / n)).collect(),
        }
    }

    pub fn omit_zero(&self) -> Density {
        Density {
            points: self.points.iter().filter(|(x, _)| *x != 0.0).copied().collect(),
        }
    }
}

fn big_to_f64(v: &BigUint) -> f64 {
    v.to_f64().unwrap_or(f64::INFINITY)
}

/// num / den as f64, shifting both down so huge counts stay representable.
pub fn ratio(num: &BigUint, den: &BigUint) -> f64 {
    if den.is_zero() {
        return f64::NAN;
    }
    let shift = den.bits().saturating_sub(60);
    let n = big_to_f64(&(num >> shift));
    let d = big_to_f64(&(den >> shift));
    n / d
}
