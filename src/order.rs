use crate::manifest::ParsedDocument;
use crate::models::ManifestDocument;

/// A document scheduled for submission, tagged with its input position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Planned<'a> {
    pub index: usize,
    pub document: &'a ManifestDocument,
}

/// Order valid documents for submission.
///
/// Namespaces and CRDs go first so that objects living in them (or typed
/// by them) do not hit a transient not-found. Input order is kept within
/// each pass. Rejected documents are never scheduled.
pub fn order_documents(docs: &[ParsedDocument]) -> Vec<Planned<'_>> {
    let valid = docs.iter().enumerate().filter_map(|(index, doc)| {
        doc.as_ref().ok().map(|document| Planned { index, document })
    });

    let (mut plan, rest): (Vec<_>, Vec<_>) =
        valid.partition(|planned| planned.document.kind.is_prerequisite());
    plan.extend(rest);
    plan
}
