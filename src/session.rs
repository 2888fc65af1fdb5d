//! Session state for the four-step UI flow.
//!
//! The flow is strictly linear — Idle → Analyzed → Clarified → Generated —
//! and each transition is triggered by exactly one user action. A failed
//! action must leave the session where it was so the user can retry it, so
//! the transition methods here only mutate state on success paths; the
//! caller runs the fallible pipeline step *first* and records the result
//! afterwards. Going backwards means [`Session::reset`].

use serde::Serialize;

/// Where the single UI session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing uploaded/analysed yet.
    Idle,
    /// Document uploaded, text extracted, analysis available.
    Analyzed,
    /// Clarifications recorded (possibly empty).
    Clarified,
    /// Assignment text generated; downloads available.
    Generated,
}

/// Error raised when an action arrives out of order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{action}' is not available in the {phase:?} step")]
pub struct PhaseError {
    pub action: &'static str,
    pub phase: Phase,
}

/// All transient data for the single in-memory session.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    pub document_text: String,
    pub instructions: String,
    pub clarifications: String,
    pub analysis: String,
    pub assignment: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            document_text: String::new(),
            instructions: String::new(),
            clarifications: String::new(),
            analysis: String::new(),
            assignment: String::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Record a successful analysis (Idle → Analyzed).
    ///
    /// Re-analysing from Idle after a reset is the only entry; re-running
    /// the action in a later phase would silently discard downstream results,
    /// so it is rejected.
    pub fn record_analysis(
        &mut self,
        document_text: String,
        instructions: String,
        analysis: String,
    ) -> Result<(), PhaseError> {
        self.require(Phase::Idle, "analyze")?;
        self.document_text = document_text;
        self.instructions = instructions;
        self.analysis = analysis;
        self.phase = Phase::Analyzed;
        Ok(())
    }

    /// Record the user's clarifications (Analyzed → Clarified). Empty text
    /// is a valid answer ("no clarifications needed").
    pub fn record_clarifications(&mut self, clarifications: String) -> Result<(), PhaseError> {
        self.require(Phase::Analyzed, "clarify")?;
        self.clarifications = clarifications;
        self.phase = Phase::Clarified;
        Ok(())
    }

    /// Record the generated assignment text (Clarified → Generated).
    pub fn record_assignment(&mut self, assignment: String) -> Result<(), PhaseError> {
        self.require(Phase::Clarified, "generate")?;
        self.assignment = assignment;
        self.phase = Phase::Generated;
        Ok(())
    }

    /// The generated assignment, only available once Generated.
    pub fn assignment_text(&self) -> Result<&str, PhaseError> {
        self.require(Phase::Generated, "download")?;
        Ok(&self.assignment)
    }

    /// Restart the flow, discarding all transient data.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn require(&self, expected: Phase, action: &'static str) -> Result<(), PhaseError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(PhaseError {
                action,
                phase: self.phase,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzed_session() -> Session {
        let mut s = Session::new();
        s.record_analysis("doc".into(), "instr".into(), "analysis".into())
            .unwrap();
        s
    }

    #[test]
    fn happy_path_walks_all_four_phases() {
        let mut s = Session::new();
        assert_eq!(s.phase(), Phase::Idle);

        s.record_analysis("doc".into(), "instr".into(), "analysis".into())
            .unwrap();
        assert_eq!(s.phase(), Phase::Analyzed);

        s.record_clarifications(String::new()).unwrap();
        assert_eq!(s.phase(), Phase::Clarified);

        s.record_assignment("# Done".into()).unwrap();
        assert_eq!(s.phase(), Phase::Generated);
        assert_eq!(s.assignment_text().unwrap(), "# Done");
    }

    #[test]
    fn out_of_order_actions_are_rejected_and_phase_unchanged() {
        let mut s = Session::new();
        let err = s.record_assignment("text".into()).unwrap_err();
        assert_eq!(err.phase, Phase::Idle);
        assert_eq!(s.phase(), Phase::Idle);

        let err = s.record_clarifications("c".into()).unwrap_err();
        assert_eq!(err.action, "clarify");
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn re_analyzing_after_analysis_is_rejected() {
        let mut s = analyzed_session();
        let err = s
            .record_analysis("doc2".into(), "i".into(), "a".into())
            .unwrap_err();
        assert_eq!(err.action, "analyze");
        assert_eq!(s.analysis, "analysis", "original analysis kept");
    }

    #[test]
    fn download_requires_generated() {
        let s = analyzed_session();
        assert!(s.assignment_text().is_err());
    }

    #[test]
    fn reset_returns_to_idle_and_clears_data() {
        let mut s = analyzed_session();
        s.reset();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.document_text.is_empty());
        assert!(s.analysis.is_empty());
    }

    #[test]
    fn phase_error_display_names_the_action() {
        let e = PhaseError {
            action: "generate",
            phase: Phase::Idle,
        };
        assert!(e.to_string().contains("generate"));
        assert!(e.to_string().contains("Idle"));
    }
}
