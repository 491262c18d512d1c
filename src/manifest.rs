//! Multi-document YAML parsing.
//!
//! Malformed YAML fails the whole payload. Structural defects in a single
//! document (no kind, no apiVersion, no name) are returned in place so the
//! batch can report them without reaching the cluster.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{ManifestDocument, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentDefect {
    #[error("Invalid manifest (missing kind/apiVersion)")]
    MissingTypeInfo {
        kind: Option<String>,
        name: Option<String>,
        namespace: Option<String>,
    },

    #[error("Missing metadata.name for kind {kind}")]
    MissingName {
        kind: String,
        namespace: Option<String>,
    },
}

pub type ParsedDocument = std::result::Result<ManifestDocument, DocumentDefect>;

/// Parse every non-blank document of `text`, preserving input order.
pub fn parse_manifests(text: &str) -> Result<Vec<ParsedDocument>> {
    let mut parsed = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        if is_blank(&value) {
            continue;
        }
        parsed.push(validate(value));
    }
    Ok(parsed)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn non_empty_str<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn validate(value: Value) -> ParsedDocument {
    let field = |pointer: &str| non_empty_str(&value, pointer).map(str::to_string);
    let kind = field("/kind");
    let api_version = field("/apiVersion");
    let name = field("/metadata/name");
    let namespace = field("/metadata/namespace");

    let (Some(kind), Some(api_version)) = (kind.clone(), api_version) else {
        return Err(DocumentDefect::MissingTypeInfo {
            kind,
            name,
            namespace,
        });
    };

    let Some(name) = name else {
        return Err(DocumentDefect::MissingName { kind, namespace });
    };

    Ok(ManifestDocument {
        kind: ResourceKind::parse(&kind),
        api_version,
        name,
        namespace,
        payload: value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn parses_documents_in_order() {
        let docs = parse_manifests(
            "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: demo\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n  namespace: demo\ndata:\n  key: value\n",
        )
        .unwrap();

        assert_eq!(docs.len(), 2);
        let ns = docs[0].as_ref().unwrap();
        assert_eq!(ns.kind, ResourceKind::Namespace);
        assert_eq!(ns.name, "demo");
        assert_eq!(ns.namespace, None);

        let cm = docs[1].as_ref().unwrap();
        assert_eq!(cm.kind, ResourceKind::Other("ConfigMap".into()));
        assert_eq!(cm.namespace.as_deref(), Some("demo"));
        assert_eq!(cm.payload["data"]["key"], "value");
    }

    #[test]
    fn skips_blank_documents() {
        let docs =
            parse_manifests("---\n---\napiVersion: v1\nkind: Pod\nmetadata:\n  name: x").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].as_ref().unwrap().name, "x");
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_manifests("").unwrap().is_empty());
        assert!(parse_manifests("---\n").unwrap().is_empty());
    }

    #[test]
    fn missing_kind_or_api_version_is_a_document_defect() {
        let docs = parse_manifests(
            "kind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: v1\nmetadata:\n  name: b\n",
        )
        .unwrap();
        assert_eq!(docs.len(), 2);
        for doc in &docs {
            let defect = doc.as_ref().unwrap_err();
            assert_eq!(
                defect.to_string(),
                "Invalid manifest (missing kind/apiVersion)"
            );
        }
    }

    #[test]
    fn missing_name_references_kind() {
        let docs = parse_manifests("apiVersion: apps/v1\nkind: Deployment\nmetadata: {}\n").unwrap();
        let defect = docs[0].as_ref().unwrap_err();
        assert_eq!(defect.to_string(), "Missing metadata.name for kind Deployment");
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let docs = parse_manifests("apiVersion: v1\nkind: ''\nmetadata:\n  name: a\n").unwrap();
        assert!(matches!(
            docs[0],
            Err(DocumentDefect::MissingTypeInfo { .. })
        ));
    }

    #[test]
    fn scalar_document_is_rejected_not_fatal() {
        let docs = parse_manifests("just a string\n---\napiVersion: v1\nkind: Pod\nmetadata:\n  name: x\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].is_err());
        assert!(docs[1].is_ok());
    }

    #[test]
    fn malformed_yaml_fails_the_batch() {
        let err = parse_manifests("apiVersion: v1\nkind: [Pod\n").unwrap_err();
        assert!(matches!(err, Error::InvalidYaml(_)));
    }
}
