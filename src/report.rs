use crate::manifest::{DocumentDefect, ParsedDocument};
use crate::models::{ApplyOutcome, ApplyReport, OutcomeStatus, Verb};

impl From<&DocumentDefect> for ApplyOutcome {
    fn from(defect: &DocumentDefect) -> Self {
        let (kind, name, namespace) = match defect {
            DocumentDefect::MissingTypeInfo {
                kind,
                name,
                namespace,
            } => (kind.clone(), name.clone(), namespace.clone()),
            DocumentDefect::MissingName { kind, namespace } => {
                (Some(kind.clone()), None, namespace.clone())
            }
        };
        ApplyOutcome {
            kind,
            name,
            namespace,
            verb: Verb::Apply,
            status: OutcomeStatus::Error,
            detail: Some(defect.to_string()),
            apply_error: None,
        }
    }
}

/// Collects outcomes into their input slots.
///
/// Outcomes may arrive in apply order; the finished report is always in
/// input order and holds exactly one outcome per parsed document.
#[derive(Debug)]
pub struct ReportBuilder {
    slots: Vec<Option<ApplyOutcome>>,
}

impl ReportBuilder {
    /// Start a report for `docs`, recording parser rejections up front.
    pub fn for_documents(docs: &[ParsedDocument]) -> Self {
        let slots = docs
            .iter()
            .map(|doc| doc.as_ref().err().map(ApplyOutcome::from))
            .collect();
        Self { slots }
    }

    /// Record the outcome for the document at input position `index`.
    ///
    /// A slot is written once; later writes to the same slot are ignored.
    pub fn record(&mut self, index: usize, outcome: ApplyOutcome) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.is_none() {
                *slot = Some(outcome);
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// The complete report, or `None` while any document is unattempted.
    pub fn finish(self) -> Option<ApplyReport> {
        let outcomes = self.slots.into_iter().collect::<Option<Vec<_>>>()?;
        Some(ApplyReport::new(outcomes))
    }
}
