//! The analysis result store and its persisted form.

use arcstr::ArcStr;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::frame::{Column, Frame};

/// Analysis results keyed by VectorSet name (`tran1`, `ac1`, …).
///
/// Each key holds the frames received for that analysis, newest last. A
/// mid-stream change in the simulator's column set opens a fresh frame
/// under the same key; earlier frames stay observable.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    frames: IndexMap<ArcStr, Vec<Frame>>,
    error: Option<String>,
}

impl ResultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The analysis keys, in arrival order.
    pub fn keys(&self) -> impl Iterator<Item = &ArcStr> {
        self.frames.keys()
    }

    /// Every frame received under `key`.
    pub fn frames(&self, key: &str) -> &[Frame] {
        self.frames.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The frame currently growing under `key`.
    pub fn latest(&self, key: &str) -> Option<&Frame> {
        self.frames(key).last()
    }

    /// Total row count under `key`, summed over all frames.
    pub fn total_rows(&self, key: &str) -> usize {
        self.frames(key).iter().map(Frame::len).sum()
    }

    /// Appends a chunk under `key`: grows the newest frame when the column
    /// sets match, otherwise opens a new frame. Returns whether a new frame
    /// was opened.
    pub fn append(&mut self, key: impl Into<ArcStr>, chunk: Frame) -> bool {
        let frames = self.frames.entry(key.into()).or_default();
        match frames.last_mut() {
            Some(last) if last.same_columns(&chunk) => {
                last.append(chunk);
                false
            }
            _ => {
                frames.push(chunk);
                true
            }
        }
    }

    /// Replaces everything under `key` with one frame.
    pub fn replace(&mut self, key: impl Into<ArcStr>, frame: Frame) {
        self.frames.insert(key.into(), vec![frame]);
    }

    /// Drops all rows in place, preserving the keys.
    pub fn clear_all(&mut self) {
        for frames in self.frames.values_mut() {
            frames.clear();
        }
        self.error = None;
    }

    /// Records an error observed while streaming; partial results stay put.
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    /// The error recorded alongside the results, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn column_json(column: &Column) -> Value {
    match column {
        Column::Real(values) => json!(values),
        Column::Complex(values) => {
            let mag: Vec<f64> = values.iter().map(|c| c.norm()).collect();
            let arg: Vec<f64> = values.iter().map(|c| c.arg()).collect();
            json!({ "mag": mag, "arg": arg })
        }
    }
}

/// The persisted result document id: `<name>$result:<ISO-8601 UTC>`.
pub fn result_doc_id(name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}$result:{}",
        name,
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Serializes the store for persistence: per analysis key, a map from
/// column name to samples, with the independent variable as a named column
/// and complex columns split into `mag`/`arg` lists.
///
/// Only the newest frame per key is persisted.
pub fn to_result_doc(store: &ResultStore) -> Value {
    let mut doc = serde_json::Map::new();
    for key in store.keys() {
        let Some(frame) = store.latest(key) else {
            continue;
        };
        let mut columns = serde_json::Map::new();
        columns.insert(frame.scale.to_string(), column_json(&frame.index));
        for (name, column) in &frame.columns {
            columns.insert(name.to_string(), column_json(column));
        }
        doc.insert(key.to_string(), Value::Object(columns));
    }
    Value::Object(doc)
}
