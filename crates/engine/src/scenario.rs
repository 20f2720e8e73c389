//! Scenario documents and the resolver.
//!
//! Scenario definitions arrive in three heterogeneous layouts. The resolver
//! classifies a document once into a closed [`DocumentShape`] and flattens it
//! into one canonical [`Scenario`] through a single dispatch function, rather
//! than shape-sniffing at every access site.

use crate::error::ResolutionError;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// One discriminated user-action instruction, immutable once resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Navigate { target: String },
    Click { target: String },
    Type { target: String, text: String },
    Hover { target: String },
    Wait { duration_ms: u64 },
    /// Unrecognized or malformed action. Never fails resolution; the
    /// executor demotes it to a warning at run time.
    Unknown { action: String, raw: Value },
}

impl Step {
    /// Action tag as recorded in step results.
    pub fn action(&self) -> &str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::Click { .. } => "click",
            Step::Type { .. } => "type",
            Step::Hover { .. } => "hover",
            Step::Wait { .. } => "wait",
            Step::Unknown { action, .. } => action,
        }
    }

    /// Target as recorded in step results (empty for wait/unknown).
    pub fn target(&self) -> &str {
        match self {
            Step::Navigate { target }
            | Step::Click { target }
            | Step::Type { target, .. }
            | Step::Hover { target } => target,
            Step::Wait { .. } | Step::Unknown { .. } => "",
        }
    }
}

/// Canonical ordered list of steps plus identifying metadata.
///
/// Invariant: `steps` is non-empty after resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub identifier: String,
    pub display_name: String,
    pub steps: Vec<Step>,
}

/// The three recognized scenario-document layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// Root list of step mappings.
    DirectSteps,
    /// Root mapping carrying a `scenarios` list of named entries.
    NamedCollection,
    /// Root mapping of group name -> named collection.
    NestedGroups,
}

impl DocumentShape {
    /// Classify a raw document, checked in declaration order.
    pub fn classify(document: &Value) -> Result<Self, ResolutionError> {
        if document.is_array() {
            return Ok(DocumentShape::DirectSteps);
        }
        let map = match document.as_object() {
            Some(map) if !map.is_empty() => map,
            _ => {
                return Err(ResolutionError::UnsupportedShape(
                    "document is not a step list or mapping".to_string(),
                ))
            }
        };
        if map.get("scenarios").map(Value::is_array).unwrap_or(false) {
            return Ok(DocumentShape::NamedCollection);
        }
        let nested = map.values().any(|group| {
            group
                .get("scenarios")
                .map(Value::is_array)
                .unwrap_or(false)
        });
        if nested {
            return Ok(DocumentShape::NestedGroups);
        }
        Err(ResolutionError::UnsupportedShape(
            "mapping carries no scenario collection".to_string(),
        ))
    }
}

/// Read a scenario document from disk (YAML or JSON, by extension).
///
/// This is the only I/O the resolver performs; `resolve` itself is a pure
/// function of its inputs.
pub fn load_document(path: &Path) -> Result<Value, ResolutionError> {
    if !path.exists() {
        return Err(ResolutionError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ResolutionError::Parse(format!("{}: {}", path.display(), e)))?;
    let is_json = path
        .extension()
        .map(|ext| ext == "json")
        .unwrap_or(false);
    if is_json {
        serde_json::from_str(&content).map_err(|e| ResolutionError::Parse(e.to_string()))
    } else {
        serde_yaml::from_str(&content).map_err(|e| ResolutionError::Parse(e.to_string()))
    }
}

/// Resolve a raw document into a canonical scenario.
///
/// Selection rule for named entries: the entry matching `identifier` when
/// one is given, otherwise the first entry with a non-empty step list.
pub fn resolve(document: &Value, identifier: Option<&str>) -> Result<Scenario, ResolutionError> {
    let shape = DocumentShape::classify(document)?;
    debug!(?shape, "classified scenario document");

    match shape {
        DocumentShape::DirectSteps => {
            let steps = validate_steps(document.as_array().unwrap_or(&Vec::new()))?;
            Ok(Scenario {
                identifier: identifier.unwrap_or("default").to_string(),
                display_name: "Scenario".to_string(),
                steps,
            })
        }
        DocumentShape::NamedCollection => {
            let entries = collection_entries(document);
            select_entry(&entries, identifier)
        }
        DocumentShape::NestedGroups => {
            // Flatten group -> collection, then apply the same selection rule.
            let mut entries = Vec::new();
            if let Some(groups) = document.as_object() {
                for group in groups.values() {
                    entries.extend(collection_entries(group));
                }
            }
            select_entry(&entries, identifier)
        }
    }
}

/// Resolve directly from a file on disk.
pub fn resolve_file(path: &Path, identifier: Option<&str>) -> Result<Scenario, ResolutionError> {
    let document = load_document(path)?;
    resolve(&document, identifier)
}

fn collection_entries(value: &Value) -> Vec<&Value> {
    value
        .get("scenarios")
        .and_then(Value::as_array)
        .map(|list| list.iter().collect())
        .unwrap_or_default()
}

fn select_entry(
    entries: &[&Value],
    identifier: Option<&str>,
) -> Result<Scenario, ResolutionError> {
    let entry = match identifier {
        Some(id) => entries
            .iter()
            .find(|e| entry_id(e).map(|eid| eid == id).unwrap_or(false))
            .ok_or_else(|| ResolutionError::IdentifierNotFound(id.to_string()))?,
        None => entries
            .iter()
            .find(|e| {
                e.get("steps")
                    .and_then(Value::as_array)
                    .map(|s| !s.is_empty())
                    .unwrap_or(false)
            })
            .ok_or(ResolutionError::EmptySteps)?,
    };

    let raw_steps = entry
        .get("steps")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let steps = validate_steps(&raw_steps)?;
    let identifier = entry_id(entry).unwrap_or("default").to_string();
    let display_name = entry
        .get("name")
        .or_else(|| entry.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(&identifier)
        .to_string();

    Ok(Scenario {
        identifier,
        display_name,
        steps,
    })
}

fn entry_id(entry: &Value) -> Option<&str> {
    entry
        .get("id")
        .or_else(|| entry.get("name"))
        .and_then(Value::as_str)
}

/// Validate and canonicalize a raw step list.
///
/// Every step must be a mapping with an `action` discriminator; an empty
/// list is a resolution failure.
pub fn validate_steps(raw: &[Value]) -> Result<Vec<Step>, ResolutionError> {
    if raw.is_empty() {
        return Err(ResolutionError::EmptySteps);
    }
    raw.iter().map(parse_step).collect()
}

fn parse_step(raw: &Value) -> Result<Step, ResolutionError> {
    let map = raw.as_object().ok_or_else(|| {
        ResolutionError::UnsupportedShape("step is not a mapping".to_string())
    })?;
    let action = map
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ResolutionError::UnsupportedShape("step is missing an 'action' field".to_string())
        })?
        .to_ascii_lowercase();

    let target = step_field(map, &["target", "selector", "url"]);
    let step = match action.as_str() {
        "navigate" | "goto" => match target {
            Some(target) => Step::Navigate { target },
            None => unknown(&action, raw),
        },
        "click" | "tap" => match target {
            Some(target) => Step::Click { target },
            None => unknown(&action, raw),
        },
        "type" | "fill" | "input" => match target {
            Some(target) => Step::Type {
                target,
                text: step_field(map, &["text", "value"]).unwrap_or_default(),
            },
            None => unknown(&action, raw),
        },
        "hover" => match target {
            Some(target) => Step::Hover { target },
            None => unknown(&action, raw),
        },
        "wait" | "sleep" => Step::Wait {
            duration_ms: ["duration_ms", "durationMs", "ms", "duration"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_u64))
                .unwrap_or(1_000),
        },
        _ => unknown(&action, raw),
    };
    Ok(step)
}

fn unknown(action: &str, raw: &Value) -> Step {
    Step::Unknown {
        action: action.to_string(),
        raw: raw.clone(),
    }
}

fn step_field(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_steps() -> Value {
        json!([
            {"action": "navigate", "target": "http://x"},
            {"action": "click", "target": "#btn"}
        ])
    }

    #[test]
    fn classifies_direct_steps() {
        assert_eq!(
            DocumentShape::classify(&two_steps()).unwrap(),
            DocumentShape::DirectSteps
        );
    }

    #[test]
    fn classifies_named_collection() {
        let doc = json!({"scenarios": [{"id": "1.1", "steps": two_steps()}]});
        assert_eq!(
            DocumentShape::classify(&doc).unwrap(),
            DocumentShape::NamedCollection
        );
    }

    #[test]
    fn classifies_nested_groups() {
        let doc = json!({"checkout": {"scenarios": [{"id": "1.1", "steps": two_steps()}]}});
        assert_eq!(
            DocumentShape::classify(&doc).unwrap(),
            DocumentShape::NestedGroups
        );
    }

    #[test]
    fn rejects_scalar_document() {
        assert!(matches!(
            DocumentShape::classify(&json!(42)),
            Err(ResolutionError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn resolves_by_identifier() {
        let doc = json!({"scenarios": [
            {"id": "1.1", "steps": two_steps()},
            {"id": "1.2", "steps": [{"action": "hover", "target": "#menu"}]}
        ]});
        let scenario = resolve(&doc, Some("1.2")).unwrap();
        assert_eq!(scenario.identifier, "1.2");
        assert_eq!(scenario.steps, vec![Step::Hover { target: "#menu".to_string() }]);
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        let doc = json!({"scenarios": [{"id": "1.1", "steps": two_steps()}]});
        assert!(matches!(
            resolve(&doc, Some("9.9")),
            Err(ResolutionError::IdentifierNotFound(_))
        ));
    }

    #[test]
    fn selects_first_entry_with_steps() {
        let doc = json!({"scenarios": [
            {"id": "empty", "steps": []},
            {"id": "real", "steps": two_steps()}
        ]});
        let scenario = resolve(&doc, None).unwrap();
        assert_eq!(scenario.identifier, "real");
    }

    #[test]
    fn empty_steps_everywhere_is_an_error() {
        let doc = json!({"scenarios": [{"id": "empty", "steps": []}]});
        assert!(matches!(resolve(&doc, None), Err(ResolutionError::EmptySteps)));
    }

    #[test]
    fn step_without_action_is_unsupported() {
        let doc = json!([{"target": "#btn"}]);
        assert!(matches!(
            resolve(&doc, None),
            Err(ResolutionError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn unrecognized_action_resolves_to_unknown() {
        let doc = json!([{"action": "teleport", "target": "#btn"}]);
        let scenario = resolve(&doc, None).unwrap();
        assert!(matches!(scenario.steps[0], Step::Unknown { ref action, .. } if action == "teleport"));
    }

    #[test]
    fn accepts_field_aliases() {
        let doc = json!([
            {"action": "navigate", "url": "http://x"},
            {"action": "fill", "selector": "#q", "value": "hello"},
            {"action": "wait", "ms": 250}
        ]);
        let scenario = resolve(&doc, None).unwrap();
        assert_eq!(
            scenario.steps,
            vec![
                Step::Navigate { target: "http://x".to_string() },
                Step::Type { target: "#q".to_string(), text: "hello".to_string() },
                Step::Wait { duration_ms: 250 },
            ]
        );
    }

    #[test]
    fn three_shapes_resolve_equivalently() {
        let direct = two_steps();
        let named = json!({"scenarios": [{"id": "1.1", "steps": two_steps()}]});
        let nested = json!({"suite": {"scenarios": [{"id": "1.1", "steps": two_steps()}]}});

        let a = resolve(&direct, None).unwrap();
        let b = resolve(&named, Some("1.1")).unwrap();
        let c = resolve(&nested, Some("1.1")).unwrap();

        assert_eq!(a.steps, b.steps);
        assert_eq!(b.steps, c.steps);
        assert_eq!(b.identifier, "1.1");
        assert_eq!(c.identifier, "1.1");
    }
}
