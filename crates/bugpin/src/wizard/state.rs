//! The wizard's step graph and per-step view descriptions.

use serde::{Deserialize, Serialize};

use crate::types::{ReportType, Severity};

/// The seven wizard steps. `Closed` is both the initial and the
/// terminal idle state; `Success` auto-returns to `Closed` after the
/// countdown elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Closed,
    TypeSelect,
    Capture,
    Annotate,
    Details,
    Review,
    Success,
}

impl WizardStep {
    pub fn is_open(&self) -> bool {
        *self != WizardStep::Closed
    }
}

/// Advancing out of `Capture` skips annotation when there is nothing
/// to annotate.
pub fn advance_from_capture(has_screenshot: bool) -> WizardStep {
    if has_screenshot {
        WizardStep::Annotate
    } else {
        WizardStep::Details
    }
}

/// Going back from `Details` mirrors the skip-if-absent rule.
pub fn back_from_details(has_screenshot: bool) -> WizardStep {
    if has_screenshot {
        WizardStep::Annotate
    } else {
        WizardStep::Capture
    }
}

/// A pure description of what the UI should show for the current step.
/// One variant per step; the embedder renders it however it likes.
#[derive(Debug, Clone, PartialEq)]
pub enum StepView {
    Closed,
    TypeSelect {
        selected: ReportType,
    },
    Capture {
        capture_enabled: bool,
        pick_count: usize,
        has_screenshot: bool,
        picking: bool,
        area_selection_active: bool,
    },
    Annotate {
        annotation_count: usize,
        color: String,
    },
    Details {
        title: String,
        description: String,
        severity: Severity,
        can_advance: bool,
    },
    Review {
        report_type: ReportType,
        title: String,
        severity: Severity,
        element_count: usize,
        has_screenshot: bool,
        console_log_count: usize,
        network_log_count: usize,
        submitting: bool,
        submit_error: Option<String>,
    },
    Success {
        countdown: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_advance_skips_annotate_without_screenshot() {
        assert_eq!(advance_from_capture(false), WizardStep::Details);
        assert_eq!(advance_from_capture(true), WizardStep::Annotate);
    }

    #[test]
    fn details_back_mirrors_the_skip_rule() {
        assert_eq!(back_from_details(false), WizardStep::Capture);
        assert_eq!(back_from_details(true), WizardStep::Annotate);
    }

    #[test]
    fn closed_is_the_only_non_open_step() {
        assert!(!WizardStep::Closed.is_open());
        assert!(WizardStep::TypeSelect.is_open());
        assert!(WizardStep::Success.is_open());
    }
}
