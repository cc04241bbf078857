use crate::libs::phylo::TreeError;
use thiserror::Error;

/// Errors surfaced by the reconciliation core.
///
/// `Tree` and `Input` are recoverable input problems, `Infeasible` means the
/// tip mapping admits no finite-cost reconciliation, and `Invariant` is a bug.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("No feasible reconciliation (best partial cost: {})", fmt_partial(.best_partial))]
    Infeasible {
        /// Parasite node closest to the root with a finite cost, and that cost
        best_partial: Option<(String, f64)>,
    },

    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    #[error("MPR count {count} exceeds the ceiling of {ceiling}")]
    ResourceExhaustion { count: String, ceiling: u64 },

    #[error("Operation cancelled")]
    Cancelled,
}

fn fmt_partial(best: &Option<(String, f64)>) -> String {
    match best {
        Some((name, cost)) => format!("{} at {}", cost, name),
        None => "none".to_string(),
    }
}

impl ReconError {
    /// Whether the error comes from the caller's data rather than from the core.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            ReconError::Tree(_) | ReconError::Input(_) | ReconError::Infeasible { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
