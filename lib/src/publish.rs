use crate::{error::Error, merge::TeamGrades, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Field the store stamps with its own time on every write.
pub const UPDATED_AT: &str = "updated_at";

/// A document store accepting merge upserts.
pub trait DocumentStore {
    /// Merges `fields` into document `id` of `collection`, creating it if needed.
    ///
    /// Fields absent from `fields` keep their stored value. Implementations set
    /// [`UPDATED_AT`] to the store's time of the write.
    fn upsert(&mut self, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeFields {
    pub oline: f64,
    pub dline: f64,
    pub secondary: f64,
    pub offense: f64,
}

/// The document written for each team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamDocument {
    pub id: String,
    pub grades: GradeFields,
}

impl From<&TeamGrades> for TeamDocument {
    fn from(record: &TeamGrades) -> Self {
        TeamDocument {
            id: record.team.clone(),
            grades: GradeFields {
                oline: record.oline,
                dline: record.dline,
                secondary: record.secondary,
                offense: record.offense,
            },
        }
    }
}

impl TeamDocument {
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            // structs always serialize to objects
            _ => Ok(Map::new()),
        }
    }
}

/// Outcome of a publish run.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub written: Vec<String>,
    pub skipped: usize,
    pub failed: Vec<(String, Error)>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What happened to one record during a publish run.
#[derive(Debug)]
pub enum PublishEvent<'a> {
    Written(&'a str),
    Skipped,
    Failed(&'a str, &'a Error),
}

pub struct Publisher<S> {
    store: S,
    collection: String,
}

impl<S: DocumentStore> Publisher<S> {
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Upserts every record, one write per team, in order.
    ///
    /// Records with an empty team are skipped. A failed write is recorded in
    /// the report and the remaining records are still written.
    pub fn publish<'a, I>(&mut self, records: I) -> PublishReport
    where
        I: IntoIterator<Item = &'a TeamGrades>,
    {
        self.publish_with(records, |_| {})
    }

    /// Like [`Publisher::publish`], calling `progress` after each record.
    pub fn publish_with<'a, I, F>(&mut self, records: I, mut progress: F) -> PublishReport
    where
        I: IntoIterator<Item = &'a TeamGrades>,
        F: FnMut(PublishEvent),
    {
        log::trace!("publish::publish to {}", self.collection);
        let mut report = PublishReport::default();

        for record in records {
            if record.team.is_empty() {
                log::warn!("Skipping record without a team: {:?}", record);
                report.skipped += 1;
                progress(PublishEvent::Skipped);
                continue;
            }

            match self.write(record) {
                Ok(()) => {
                    log::info!("Updated {}", record.team);
                    progress(PublishEvent::Written(&record.team));
                    report.written.push(record.team.clone());
                }
                Err(e) => {
                    log::error!("Failed to update {}: {}", record.team, e);
                    progress(PublishEvent::Failed(&record.team, &e));
                    report.failed.push((record.team.clone(), e));
                }
            }
        }

        log::info!(
            "Published {} teams ({} skipped, {} failed)",
            report.written.len(),
            report.skipped,
            report.failed.len()
        );
        report
    }

    fn write(&mut self, record: &TeamGrades) -> Result<()> {
        let fields = TeamDocument::from(record).to_fields()?;
        self.store.upsert(&self.collection, &record.team, &fields)
    }
}

/// In-process [`DocumentStore`].
///
/// Every write gets a strictly later `updated_at` than the previous one, as an
/// RFC 3339 string.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<String, HashMap<String, Map<String, Value>>>,
    last_write: Option<DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<&Map<String, Value>> {
        self.collections.get(collection)?.get(id)
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, HashMap::len)
    }

    fn now(&mut self) -> DateTime<Utc> {
        let now = match self.last_write {
            Some(last) if Utc::now() <= last => last + Duration::microseconds(1),
            _ => Utc::now(),
        };
        self.last_write = Some(now);
        now
    }
}

impl DocumentStore for MemoryStore {
    fn upsert(&mut self, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let timestamp = self.now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let document = self
            .collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();

        merge_fields(document, fields);
        document.insert(UPDATED_AT.to_string(), Value::String(timestamp));
        Ok(())
    }
}

// Nested maps merge key by key, anything else replaces the stored value
fn merge_fields(target: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, value) in fields {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(update)) => {
                merge_fields(existing, update)
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
