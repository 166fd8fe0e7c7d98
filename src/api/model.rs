use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

pub type ProblemId = i64;
pub type ExistingIds = HashSet<ProblemId>;

/// Listing payload from the problem API (or a saved copy of it).
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ListingResponse {
    #[serde(default, deserialize_with = "deserialize_optional_record_list")]
    pub stat_status_pairs: Option<Vec<Value>>,
}

fn deserialize_optional_record_list<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(arr) => Ok(Some(arr)),
        _ => Ok(None),
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProblemRecord {
    pub stat: ProblemStat,
    pub difficulty: Difficulty,
    pub paid_only: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProblemStat {
    pub question_id: ProblemId,
    #[serde(rename = "question__title")]
    pub title: String,
    #[serde(rename = "question__title_slug")]
    pub title_slug: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Difficulty {
    pub level: i64,
}

/// Reads `stat.question_id` without decoding the rest of the record.
/// Zero and negative ids count as missing.
pub fn raw_question_id(record: &Value) -> Option<ProblemId> {
    record
        .get("stat")?
        .get("question_id")?
        .as_i64()
        .filter(|id| *id > 0)
}

/// Register and login share this shape: a token on success, an `errors` list otherwise.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<Value>>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl AuthResponse {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn error_messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .errors
            .iter()
            .flatten()
            .map(|e| match e.get("msg").and_then(Value::as_str) {
                Some(m) => m.to_string(),
                None => e.to_string(),
            })
            .collect();
        if let Some(m) = &self.msg {
            messages.push(m.clone());
        }
        messages
    }
}

/// Collects every integer `id` from the inventory listing. Anything that isn't an
/// array yields an empty set.
pub fn existing_ids_from_value(value: &Value) -> ExistingIds {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_i64))
            .collect(),
        _ => HashSet::new(),
    }
}

/// Non-empty `errors` list of a bulk insert response, if any.
pub fn bulk_errors_from_value(value: &Value) -> Option<Vec<Value>> {
    value
        .get("errors")
        .and_then(Value::as_array)
        .filter(|errors| !errors.is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_without_collection_decodes_to_none() {
        let listing: ListingResponse = serde_json::from_value(json!({"user_name": ""})).unwrap();
        assert!(listing.stat_status_pairs.is_none());

        let listing: ListingResponse =
            serde_json::from_value(json!({"stat_status_pairs": "oops"})).unwrap();
        assert!(listing.stat_status_pairs.is_none());
    }

    #[test]
    fn raw_question_id_requires_positive_integer() {
        assert_eq!(raw_question_id(&json!({"stat": {"question_id": 7}})), Some(7));
        assert_eq!(raw_question_id(&json!({"stat": {"question_id": 0}})), None);
        assert_eq!(raw_question_id(&json!({"stat": {"question_id": "7"}})), None);
        assert_eq!(raw_question_id(&json!({"difficulty": {"level": 1}})), None);
    }

    #[test]
    fn inventory_degrades_to_empty_set() {
        let ids = existing_ids_from_value(&json!([{"id": 1}, {"id": 2}, {"name": "x"}]));
        assert_eq!(ids, HashSet::from([1, 2]));
        assert!(existing_ids_from_value(&json!({"msg": "Server error."})).is_empty());
        assert!(existing_ids_from_value(&Value::Null).is_empty());
    }

    #[test]
    fn auth_response_collects_backend_messages() {
        let resp: AuthResponse = serde_json::from_value(json!({
            "errors": [{"msg": "User already exists."}, "plain"]
        }))
        .unwrap();
        assert!(resp.token().is_none());
        assert_eq!(
            resp.error_messages(),
            vec!["User already exists.".to_string(), "\"plain\"".to_string()]
        );

        let resp: AuthResponse = serde_json::from_value(json!({"token": "  "})).unwrap();
        assert!(resp.token().is_none());
    }

    #[test]
    fn bulk_errors_ignores_empty_list() {
        assert!(bulk_errors_from_value(&json!({"errors": []})).is_none());
        assert!(bulk_errors_from_value(&json!([{"id": 1}])).is_none());
        assert_eq!(
            bulk_errors_from_value(&json!({"errors": [{"msg": "dup"}]})).map(|e| e.len()),
            Some(1)
        );
    }
}
