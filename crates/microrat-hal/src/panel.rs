//! Operator interaction: the start button, feedback signals and self test.

use microrat_types::{DiagnosticReport, UserEvent};

/// Buttons and indicators the operator uses to sequence a run.
pub trait OperatorPanel: Send {
    /// `true` when the start/confirm trigger has been pressed since the last
    /// call.
    fn start_pressed(&mut self) -> bool;

    /// Present `event` to the operator (LED pattern, buzzer, debug link).
    fn signal(&mut self, event: UserEvent);
}

/// Hardware self test executed before the first exploration.
pub trait Diagnostics: Send {
    fn run_self_test(&mut self) -> DiagnosticReport;
}
