//! JSON serialization for evaluation reports.

use crate::result::EvaluationReport;

/// Serialize an EvaluationReport to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails. An infinite Welch statistic is
/// written as the string `"-inf"` or `"inf"` and reads back unchanged.
pub fn to_json(report: &EvaluationReport) -> Result<String, serde_json::Error> {
    serde_json::to_string(report)
}

/// Serialize an EvaluationReport to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_pretty(report: &EvaluationReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
