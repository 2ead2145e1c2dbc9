//! Error taxonomy for an evaluation run.
//!
//! Every failure names the pipeline [`Stage`] it came from. Input and
//! parameter errors abort the run before any simulation work; fit errors
//! are reported as degraded diagnostics by the evaluator.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::FitError;

/// Pipeline stage in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Building or validating the daily sales series.
    Series,
    /// Unit price inference and dollar-to-unit conversion.
    UnitConversion,
    /// Empirical distribution estimation, perturbation and sampling.
    Distribution,
    /// Welch's test, resampling null and empirical p-value.
    Hypothesis,
    /// Annual projection simulation.
    Projection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Series => "series",
            Stage::UnitConversion => "unit conversion",
            Stage::Distribution => "distribution",
            Stage::Hypothesis => "hypothesis test",
            Stage::Projection => "projection",
        };
        f.write_str(name)
    }
}

/// Errors that abort (or, for fits, degrade) an evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Empty or degenerate input data.
    #[error("input data error in {stage}: {reason}")]
    InputData {
        /// Stage that rejected the data.
        stage: Stage,
        /// What was wrong with it.
        reason: String,
    },

    /// A user-supplied numeric parameter is out of range.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    Parameter {
        /// Parameter name as it appears in `EvaluationConfig`.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Constraint that was violated.
        reason: &'static str,
    },

    /// Nonlinear least-squares fit failed. The evaluator records these as
    /// report warnings rather than returning them.
    #[error("curve fit failed: {0}")]
    Fit(#[from] FitError),

    /// A simulation trial produced an unusable intermediate value.
    #[error("simulation error in {stage}: {reason}")]
    Simulation {
        /// Stage that was running.
        stage: Stage,
        /// Description including the trial index.
        reason: String,
    },
}

impl EvalError {
    pub(crate) fn input(stage: Stage, reason: impl Into<String>) -> Self {
        EvalError::InputData {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        EvalError::Parameter {
            name,
            value,
            reason,
        }
    }

    pub(crate) fn simulation(stage: Stage, reason: impl Into<String>) -> Self {
        EvalError::Simulation {
            stage,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type EvalResult<T> = Result<T, EvalError>;
