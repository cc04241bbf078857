use super::error::{ReconError, Result};
use std::fmt;
use std::str::FromStr;

/// Unit costs of duplication, transfer and loss events.
///
/// Cospeciation and contemporaneous events are free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostParams {
    pub duplication: f64,
    pub transfer: f64,
    pub loss: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            duplication: 2.0,
            transfer: 3.0,
            loss: 1.0,
        }
    }
}

impl CostParams {
    /// Checked constructor: every cost must be finite and non-negative.
    pub fn new(duplication: f64, transfer: f64, loss: f64) -> Result<Self> {
        let costs = Self {
            duplication,
            transfer,
            loss,
        };
        costs.validate()?;
        Ok(costs)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("duplication", self.duplication),
            ("transfer", self.transfer),
            ("loss", self.loss),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ReconError::Input(format!(
                    "{} cost must be a non-negative number, got {}",
                    name, v
                )));
            }
        }
        Ok(())
    }
}

/// How the initial split of the cluster engine is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Split at mandatory nodes whose parasite depth is below D
    Depth(usize),
    /// Split breadth-first until at least N seed sub-graphs exist
    MprCount(usize),
}

impl Default for SplitMode {
    fn default() -> Self {
        SplitMode::Depth(3)
    }
}

/// Accepts `depth=D` or `nmprs=N`.
impl FromStr for SplitMode {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| ReconError::Input(format!("split mode '{}' is not key=value", s)))?;
        let n: usize = value
            .trim()
            .parse()
            .map_err(|_| ReconError::Input(format!("split mode value '{}' is not an integer", value)))?;
        match key.trim() {
            "depth" => Ok(SplitMode::Depth(n)),
            "nmprs" => Ok(SplitMode::MprCount(n)),
            other => Err(ReconError::Input(format!("unknown split mode '{}'", other))),
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMode::Depth(d) => write!(f, "depth={}", d),
            SplitMode::MprCount(n) => write!(f, "nmprs={}", n),
        }
    }
}

/// Within-cluster dispersion objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scorer {
    /// Mean pairwise event distance between MPRs of the cluster
    #[default]
    Pdv,
    /// Negated mean in-cluster support of the cluster's events
    Support,
}

impl FromStr for Scorer {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pdv" => Ok(Scorer::Pdv),
            "support" => Ok(Scorer::Support),
            other => Err(ReconError::Input(format!("unknown scorer '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PdvOptions {
    /// Loss events contribute nothing to the distance
    pub zero_loss: bool,
    /// Keys are divided by twice the number of internal parasite nodes
    pub normalize: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterConfig {
    pub k: usize,
    pub mode: SplitMode,
    pub scorer: Scorer,
    /// Upper bound on the number of seed sub-graphs
    pub max_splits: usize,
    pub pdv: PdvOptions,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 2,
            mode: SplitMode::default(),
            scorer: Scorer::default(),
            max_splits: 256,
            pdv: PdvOptions::default(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(ReconError::Input("k must be at least 1".to_string()));
        }
        if self.max_splits == 0 {
            return Err(ReconError::Input("max_splits must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonteCarloConfig {
    pub trials: usize,
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: 100,
            seed: 0,
        }
    }
}

/// Every key of the configuration surface, fully populated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub costs: CostParams,
    pub cluster: ClusterConfig,
    pub pdv: PdvOptions,
    pub monte_carlo: MonteCarloConfig,
    /// RNG seed for sampling and median selection
    pub seed: u64,
    /// Ceiling on explicit MPR enumeration
    pub max_mprs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            costs: CostParams::default(),
            cluster: ClusterConfig::default(),
            pdv: PdvOptions::default(),
            monte_carlo: MonteCarloConfig::default(),
            seed: 0,
            max_mprs: 10_000,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.costs.validate()?;
        self.cluster.validate()?;
        if self.monte_carlo.trials == 0 {
            return Err(ReconError::Input("trials must be at least 1".to_string()));
        }
        Ok(())
    }
}
