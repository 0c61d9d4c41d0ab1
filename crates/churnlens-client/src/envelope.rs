use churnlens_core::DatasetKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::ClientError;

/// Rows of one dataset plus whatever summary fields the service sent next to
/// them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset<T = Value> {
    pub rows: Vec<T>,
    pub summary: Map<String, Value>,
}

impl<T> Default for Dataset<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            summary: Map::new(),
        }
    }
}

impl Dataset<Value> {
    pub fn decode<T: DeserializeOwned>(self) -> Result<Dataset<T>, ClientError> {
        let rows = self
            .rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Dataset {
            rows,
            summary: self.summary,
        })
    }
}

/// Accepts either a bare array or an object wrapping the rows. Objects are
/// unwrapped by the kind key, then by the kind's alias keys, then by their
/// only array-valued field.
pub fn normalize_dataset(kind: DatasetKind, payload: Value) -> Result<Dataset, ClientError> {
    let mut object = match payload {
        Value::Array(rows) => {
            return Ok(Dataset {
                rows,
                summary: Map::new(),
            });
        }
        Value::Object(object) => object,
        other => {
            return Err(ClientError::InvalidEnvelope {
                kind: kind.as_str(),
                message: format!("expected an array or object, got {}", value_type(&other)),
            });
        }
    };

    let key = std::iter::once(kind.as_str())
        .chain(kind.envelope_aliases().iter().copied())
        .find(|key| object.get(*key).is_some_and(Value::is_array))
        .map(str::to_owned)
        .or_else(|| sole_array_field(&object));

    let Some(key) = key else {
        return Err(ClientError::InvalidEnvelope {
            kind: kind.as_str(),
            message: "object has no row array".to_owned(),
        });
    };

    let rows = match object.remove(&key) {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
    };
    Ok(Dataset {
        rows,
        summary: object,
    })
}

fn sole_array_field(object: &Map<String, Value>) -> Option<String> {
    let mut arrays = object.iter().filter(|(_, value)| value.is_array());
    let (key, _) = arrays.next()?;
    if arrays.next().is_some() {
        return None;
    }
    Some(key.clone())
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use churnlens_core::HotspotRow;
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_arrays_pass_through() {
        let dataset = normalize_dataset(DatasetKind::Hotspots, json!([{"path": "a"}]))
            .expect("normalize");
        assert_eq!(dataset.rows, vec![json!({"path": "a"})]);
        assert!(dataset.summary.is_empty());
    }

    #[test]
    fn kind_key_wins_and_summary_is_kept() {
        let dataset = normalize_dataset(
            DatasetKind::Hotspots,
            json!({
                "hotspots": [{"path": "a", "touches": 3}],
                "items": [{"path": "ignored"}],
                "total": 1
            }),
        )
        .expect("normalize");

        assert_eq!(dataset.rows.len(), 1);
        assert_eq!(dataset.summary.get("total"), Some(&json!(1)));
        assert_eq!(dataset.summary.get("items"), Some(&json!([{"path": "ignored"}])));
    }

    #[test]
    fn alias_keys_then_sole_array_field() {
        let findings = normalize_dataset(
            DatasetKind::Quality,
            json!({"findings": [{"path": "x"}], "other": [1, 2]}),
        )
        .expect("alias key");
        assert_eq!(findings.rows, vec![json!({"path": "x"})]);

        let sole = normalize_dataset(
            DatasetKind::Timeline,
            json!({"weeks": [{"bucket": "2024-W01"}], "granularity": "week"}),
        )
        .expect("sole array");
        assert_eq!(sole.rows.len(), 1);
        assert_eq!(sole.summary.get("granularity"), Some(&json!("week")));
    }

    #[test]
    fn ambiguous_or_scalar_payloads_are_rejected() {
        let ambiguous = normalize_dataset(
            DatasetKind::Commits,
            json!({"first": [], "second": []}),
        );
        assert!(matches!(
            ambiguous,
            Err(ClientError::InvalidEnvelope { kind: "commits", .. })
        ));

        assert!(normalize_dataset(DatasetKind::Commits, json!("nope")).is_err());
        assert!(normalize_dataset(DatasetKind::Commits, json!({"total": 0})).is_err());
    }

    #[test]
    fn decode_reports_malformed_rows() {
        let dataset = normalize_dataset(
            DatasetKind::Hotspots,
            json!([{"path": "a", "touches": 2, "churn": 10}, {"touches": 1}]),
        )
        .expect("normalize");

        assert!(matches!(
            dataset.decode::<HotspotRow>(),
            Err(ClientError::Json(_))
        ));
    }
}
