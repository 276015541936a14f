use crate::models::diagnostic_result::DiagnosticResult;
use crate::models::state::PipelineStage;

/// Event delegate for background diagnostic attempts.
///
/// All methods are called from the worker thread, not the caller's thread.
/// Implementations should marshal to a UI thread if needed.
pub trait DiagnosticDelegate: Send + Sync {
    /// Called when the attempt moves to a new stage.
    fn on_stage_changed(&self, stage: PipelineStage);

    /// Called exactly once with the final result, success or failure.
    fn on_result(&self, result: &DiagnosticResult);
}
