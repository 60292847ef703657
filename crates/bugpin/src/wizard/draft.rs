use crate::annotate::Annotation;
use crate::capture::Screenshot;
use crate::picker::SelectedElement;
use crate::types::{ReportType, Severity};

/// The wizard's single mutable aggregate. Lives only while the wizard
/// is open; reset to defaults on close and on successful submission.
#[derive(Debug, Clone, Default)]
pub struct DraftReport {
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub selected_elements: Vec<SelectedElement>,
    pub screenshot: Option<Screenshot>,
    pub annotations: Vec<Annotation>,
    /// Indices into the console snapshot the user explicitly ticked.
    /// Empty means "submit the full buffer".
    pub selected_log_ids: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_an_empty_bug_report() {
        let draft = DraftReport::default();
        assert_eq!(draft.report_type, ReportType::Bug);
        assert_eq!(draft.severity, Severity::Medium);
        assert!(draft.title.is_empty());
        assert!(draft.screenshot.is_none());
        assert!(draft.selected_log_ids.is_empty());
    }
}
