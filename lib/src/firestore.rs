use crate::{error::Error, publish::DocumentStore, publish::UPDATED_AT, Result};
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_DATABASE: &str = "(default)";

/// Upserts documents through the Firestore REST `documents:commit` endpoint.
pub struct FirestoreStore {
    client: reqwest::blocking::Client,
    base_url: String,
    project_id: String,
    database: String,
    access_token: String,
}

impl FirestoreStore {
    /// `access_token` is an OAuth2 bearer token with datastore scope, such as the
    /// output of `gcloud auth print-access-token`.
    pub fn new(
        project_id: impl Into<String>,
        database: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: FIRESTORE_URL.to_string(),
            project_id: project_id.into(),
            database: database.into(),
            access_token: access_token.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/{}", self.project_id, self.database)
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/documents/{}/{}", self.database_path(), collection, id)
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/{}/documents:commit",
            self.base_url.trim_end_matches('/'),
            self.database_path()
        )
    }

    // The update mask names every leaf so fields outside the payload are kept
    pub fn commit_body(&self, collection: &str, id: &str, fields: &Map<String, Value>) -> Value {
        let mut field_paths = Vec::new();
        leaf_paths(fields, None, &mut field_paths);

        json!({
            "writes": [{
                "update": {
                    "name": self.document_name(collection, id),
                    "fields": to_firestore_fields(fields),
                },
                "updateMask": { "fieldPaths": field_paths },
                "updateTransforms": [{
                    "fieldPath": UPDATED_AT,
                    "setToServerValue": "REQUEST_TIME",
                }],
            }]
        })
    }
}

impl DocumentStore for FirestoreStore {
    fn upsert(&mut self, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let body = self.commit_body(collection, id, fields);
        log::debug!("Committing {}/{}", collection, id);

        let response = self
            .client
            .post(self.commit_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(Error::Store {
                id: id.to_string(),
                status,
                body,
            });
        }
        Ok(())
    }
}

fn to_firestore_fields(fields: &Map<String, Value>) -> Value {
    let fields: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), to_firestore_value(value)))
        .collect();
    Value::Object(fields)
}

/// Converts a JSON value into Firestore's typed value representation.
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        // integers travel as strings in the REST encoding
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({ "mapValue": { "fields": to_firestore_fields(fields) } }),
    }
}

// Every path ending in a non-map value, nested names joined with '.'
fn leaf_paths(fields: &Map<String, Value>, prefix: Option<&str>, paths: &mut Vec<String>) {
    for (key, value) in fields {
        let segment = quote_segment(key);
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, segment),
            None => segment,
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => leaf_paths(nested, Some(&path), paths),
            _ => paths.push(path),
        }
    }
}

fn quote_segment(name: &str) -> String {
    let mut chars = name.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::TeamGrades;
    use crate::publish::TeamDocument;

    fn store() -> FirestoreStore {
        FirestoreStore::new("grades-demo", DEFAULT_DATABASE, "token").unwrap()
    }

    fn fields() -> Map<String, Value> {
        let record = TeamGrades {
            team: "KC".to_string(),
            oline: 81.2,
            dline: 70.0,
            secondary: 64.5,
            offense: 92.3,
        };
        TeamDocument::from(&record).to_fields().unwrap()
    }

    #[test]
    fn commit_url_includes_database() {
        assert_eq!(
            store().commit_url(),
            format!("{}/projects/grades-demo/databases/(default)/documents:commit", FIRESTORE_URL)
        );
        let local = store().with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            local.commit_url(),
            "http://localhost:8080/v1/projects/grades-demo/databases/(default)/documents:commit"
        );
    }

    #[test]
    fn commit_body_is_a_merge_upsert() {
        let body = store().commit_body("team_analytics", "KC", &fields());
        let write = &body["writes"][0];

        assert_eq!(
            write["update"]["name"],
            json!("projects/grades-demo/databases/(default)/documents/team_analytics/KC")
        );
        assert_eq!(
            write["update"]["fields"]["id"],
            json!({ "stringValue": "KC" })
        );
        assert_eq!(
            write["update"]["fields"]["grades"]["mapValue"]["fields"]["oline"],
            json!({ "doubleValue": 81.2 })
        );

        let mut mask: Vec<String> = write["updateMask"]["fieldPaths"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_str().unwrap().to_string())
            .collect();
        mask.sort();
        assert_eq!(
            mask,
            vec!["grades.dline", "grades.offense", "grades.oline", "grades.secondary", "id"]
        );

        assert_eq!(
            write["updateTransforms"],
            json!([{ "fieldPath": "updated_at", "setToServerValue": "REQUEST_TIME" }])
        );
    }

    #[test]
    fn converts_json_values() {
        assert_eq!(
            to_firestore_value(&json!(3)),
            json!({ "integerValue": "3" })
        );
        assert_eq!(
            to_firestore_value(&json!(true)),
            json!({ "booleanValue": true })
        );
        assert_eq!(
            to_firestore_value(&Value::Null),
            json!({ "nullValue": null })
        );
        assert_eq!(
            to_firestore_value(&json!(["a", 1.5])),
            json!({ "arrayValue": { "values": [{ "stringValue": "a" }, { "doubleValue": 1.5 }] } })
        );
    }

    #[test]
    fn quotes_non_identifier_segments() {
        assert_eq!(quote_segment("oline"), "oline");
        assert_eq!(quote_segment("_x1"), "_x1");
        assert_eq!(quote_segment("49ers"), "`49ers`");
        assert_eq!(quote_segment("a-b"), "`a-b`");
        assert_eq!(quote_segment("we`ird"), "`we\\`ird`");
    }
}
