//! The schematic mirror.

use std::collections::VecDeque;

use couchdoc::{Change, ChangeStream, DbClient, Selector, Seq};
use indexmap::IndexMap;
use schemdoc::{CellKind, Hierarchy, ModelType, Upsert, MODELS};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::Result;

/// A source of documents by id-range, the read half of
/// [`DbClient`](couchdoc::DbClient).
///
/// The mirror's recursive build only needs range reads; keeping them behind
/// a trait lets the resolution logic run against canned fixtures.
pub trait DocSource {
    /// Fetches every document with id in `[prefix:, prefix:\u{fff0})`.
    fn fetch(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<(Seq, IndexMap<String, Value>)>>;
}

impl DocSource for DbClient {
    async fn fetch(&self, prefix: &str) -> Result<(Seq, IndexMap<String, Value>)> {
        Ok(self.list_by_range(prefix).await?)
    }
}

/// A live, incrementally-updated copy of one top cell's document closure:
/// the model table, the top schematic, and every sub-schematic reachable
/// through schematic-realized model references.
#[derive(Debug, Clone)]
pub struct Mirror {
    name: String,
    hierarchy: Hierarchy,
    seq: Seq,
}

impl Mirror {
    /// Builds a mirror of `name` (`cell$variant`) by fetching the model
    /// table, the top schematic, and then breadth-first every referenced
    /// sub-schematic.
    pub async fn build<S: DocSource>(db: &S, name: &str) -> Result<Self> {
        let mut mirror = Self {
            name: name.to_string(),
            hierarchy: Hierarchy::new(),
            seq: Seq::origin(),
        };
        let (seq, models) = db.fetch(MODELS).await?;
        mirror.seq = seq;
        for (id, body) in models {
            mirror.hierarchy.upsert(&id, body)?;
        }
        mirror.fetch_closure(db, name.to_string()).await?;
        info!(
            schematic = name,
            buckets = mirror.hierarchy.schematics.len(),
            "mirror built"
        );
        Ok(mirror)
    }

    /// The mirrored top schematic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last sequence token observed.
    pub fn seq(&self) -> &Seq {
        &self.seq
    }

    /// An immutable snapshot of the current hierarchy.
    pub fn snapshot(&self) -> Hierarchy {
        self.hierarchy.clone()
    }

    /// The change-feed selector covering everything mirrored right now.
    pub fn selector(&self) -> Selector {
        Selector::id_ranges(self.hierarchy.names())
    }

    /// Fetches `name` and, breadth-first, every sub-schematic its devices
    /// reference. Already-present buckets are not refetched; an empty fetch
    /// leaves the reference pending.
    async fn fetch_closure<S: DocSource>(&mut self, db: &S, name: String) -> Result<()> {
        let mut pending = VecDeque::from([name]);
        while let Some(name) = pending.pop_front() {
            if self.hierarchy.contains(&name) {
                continue;
            }
            let (seq, docs) = db.fetch(&name).await?;
            self.seq = seq;
            if docs.is_empty() {
                warn!(schematic = %name, "referenced schematic has no documents yet");
                continue;
            }
            self.hierarchy.insert_schematic(name.clone(), IndexMap::new());
            for (id, body) in docs {
                let upsert = self.hierarchy.upsert(&id, body)?;
                if let Some(sub) = self.reference_of(upsert) {
                    pending.push_back(sub);
                }
            }
        }
        Ok(())
    }

    /// The sub-schematic a freshly-upserted device references but the
    /// mirror does not hold, if any.
    fn reference_of(&self, upsert: Upsert) -> Option<String> {
        let Upsert::Element {
            cell: CellKind::Other(cell),
            model: Some(variant),
            ..
        } = upsert
        else {
            return None;
        };
        let def = self.hierarchy.model(&cell)?.variant(&variant)?;
        if def.typ != ModelType::Schematic {
            return None;
        }
        let sub = format!("{}${}", cell, variant);
        (!self.hierarchy.contains(&sub)).then_some(sub)
    }

    /// Applies one change. Returns the newly-referenced schematic name when
    /// the change points outside the current mirror (a selector gap).
    fn apply(&mut self, change: Change<Value>) -> Result<Option<String>> {
        if let Some(seq) = change.seq {
            self.seq = seq;
        }
        let deleted = change.deleted
            || change
                .doc
                .as_ref()
                .and_then(|doc| doc.get("_deleted"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
        if deleted {
            debug!(id = %change.id, "document deleted");
            self.hierarchy.remove(&change.id);
            return Ok(None);
        }
        let Some(doc) = change.doc else {
            return Ok(None);
        };
        debug!(id = %change.id, "document updated");
        let upsert = self.hierarchy.upsert(&change.id, doc)?;
        Ok(self.reference_of(upsert))
    }

    /// One-shot catch-up: applies every change after the mirror's sequence
    /// token and advances it.
    pub async fn poll(&mut self, db: &DbClient) -> Result<()> {
        let selector = self.selector();
        let (seq, changes) = db.changes_since(&self.seq, &selector).await?;
        for change in changes {
            if let Some(sub) = self.apply(change)? {
                self.fetch_closure(db, sub).await?;
            }
        }
        self.seq = seq;
        Ok(())
    }

    /// Turns the mirror into a long-lived reconciliation loop.
    pub fn watch(self, db: DbClient) -> MirrorWatch {
        MirrorWatch {
            db,
            mirror: self,
            stream: None,
            primed: false,
        }
    }
}

/// Long-lived reconciliation against the continuous change feed.
///
/// Yields a snapshot after the initial build and after each applied change.
/// The feed's selector reflects the mirror at open time, so a change can
/// reference a schematic outside it; the new identifier is then fetched
/// recursively and the feed reopened with a selector rebuilt from the
/// enlarged mirror.
pub struct MirrorWatch {
    db: DbClient,
    mirror: Mirror,
    stream: Option<ChangeStream<Value>>,
    primed: bool,
}

impl MirrorWatch {
    /// The mirrored top schematic name.
    pub fn name(&self) -> &str {
        self.mirror.name()
    }

    /// The next snapshot, or `None` when the server closed the feed.
    pub async fn next(&mut self) -> Result<Option<Hierarchy>> {
        if !self.primed {
            self.primed = true;
            return Ok(Some(self.mirror.snapshot()));
        }
        loop {
            if self.stream.is_none() {
                let selector = self.mirror.selector();
                self.stream = Some(
                    self.db
                        .changes_stream(&self.mirror.seq, &selector)
                        .await?,
                );
            }
            let Some(stream) = self.stream.as_mut() else {
                continue;
            };
            match stream.next().await? {
                Some(change) => {
                    if let Some(sub) = self.mirror.apply(change)? {
                        info!(schematic = %sub, "new sub-schematic referenced, refreshing selector");
                        self.mirror.fetch_closure(&self.db, sub).await?;
                        self.stream = None;
                    }
                    return Ok(Some(self.mirror.snapshot()));
                }
                None => return Ok(None),
            }
        }
    }

    /// Stops watching and hands the mirror back.
    pub fn into_mirror(self) -> Mirror {
        self.mirror
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A canned document store: prefix to (id, body) rows.
    struct Fixture(IndexMap<String, Vec<(String, Value)>>);

    impl Fixture {
        fn new(rows: Vec<(&str, Value)>) -> Self {
            let mut map: IndexMap<String, Vec<(String, Value)>> = IndexMap::new();
            for (id, body) in rows {
                let prefix = id.split(':').next().unwrap().to_string();
                map.entry(prefix).or_default().push((id.to_string(), body));
            }
            Self(map)
        }
    }

    impl DocSource for Fixture {
        async fn fetch(&self, prefix: &str) -> Result<(Seq, IndexMap<String, Value>)> {
            let docs = self
                .0
                .get(prefix)
                .map(|rows| rows.iter().cloned().collect())
                .unwrap_or_default();
            Ok((Seq::origin(), docs))
        }
    }

    fn amp_fixture() -> Fixture {
        Fixture::new(vec![
            (
                "models:amp",
                json!({"_id": "models:amp", "conn": [[0, 0, "OUT"]],
                       "models": {"v1": {"type": "schematic"}}}),
            ),
            (
                "top$top:x1-k",
                json!({"_id": "top$top:x1-k", "cell": "amp", "x": 0, "y": 0,
                       "props": {"model": "v1"}}),
            ),
            (
                "top$top:r1-k",
                json!({"_id": "top$top:r1-k", "cell": "resistor", "x": 4, "y": 0,
                       "props": {"model": "rmod"}}),
            ),
            (
                "amp$v1:p1-k",
                json!({"_id": "amp$v1:p1-k", "cell": "port", "x": 0, "y": 0, "name": "OUT"}),
            ),
        ])
    }

    #[test_log::test(tokio::test)]
    async fn build_resolves_subcircuits_recursively() {
        let mirror = Mirror::build(&amp_fixture(), "top$top").await.unwrap();
        let snapshot = mirror.snapshot();
        assert!(snapshot.contains("top$top"));
        assert!(snapshot.contains("amp$v1"));
        // The resistor's `rmod` names a .model card, not a sub-schematic.
        assert!(!snapshot.contains("resistor$rmod"));
        assert!(snapshot.model("amp").is_some());
    }

    #[test_log::test(tokio::test)]
    async fn deletion_shrinks_the_next_snapshot() {
        let mut mirror = Mirror::build(&amp_fixture(), "top$top").await.unwrap();
        assert_eq!(mirror.snapshot().schematic("top$top").unwrap().len(), 2);
        let gap = mirror
            .apply(Change {
                seq: None,
                id: "top$top:r1-k".to_string(),
                deleted: true,
                doc: Some(json!({"_id": "top$top:r1-k", "_deleted": true})),
            })
            .unwrap();
        assert!(gap.is_none());
        let snapshot = mirror.snapshot();
        let top = snapshot.schematic("top$top").unwrap();
        assert_eq!(top.len(), 1);
        assert!(top.contains_key("top$top:x1-k"));
    }

    #[test_log::test(tokio::test)]
    async fn new_reference_reports_a_selector_gap() {
        let mut mirror = Mirror::build(&amp_fixture(), "top$top").await.unwrap();
        // A second amp cell appears with a schematic variant the mirror has
        // never seen.
        mirror
            .apply(Change {
                seq: None,
                id: "models:buf".to_string(),
                deleted: false,
                doc: Some(json!({"_id": "models:buf", "conn": [],
                                 "models": {"v2": {"type": "schematic"}}})),
            })
            .unwrap();
        let gap = mirror
            .apply(Change {
                seq: None,
                id: "top$top:x9-k".to_string(),
                deleted: false,
                doc: Some(json!({"_id": "top$top:x9-k", "cell": "buf", "x": 8, "y": 0,
                                 "props": {"model": "v2"}})),
            })
            .unwrap();
        assert_eq!(gap.as_deref(), Some("buf$v2"));
    }

    #[test_log::test(tokio::test)]
    async fn updates_are_idempotent_by_id() {
        let mut mirror = Mirror::build(&amp_fixture(), "top$top").await.unwrap();
        let change = || Change {
            seq: None,
            id: "top$top:r1-k".to_string(),
            deleted: false,
            doc: Some(json!({"_id": "top$top:r1-k", "cell": "resistor",
                             "x": 4, "y": 0, "props": {"model": "rmod2"}})),
        };
        mirror.apply(change()).unwrap();
        mirror.apply(change()).unwrap();
        let snapshot = mirror.snapshot();
        assert_eq!(snapshot.schematic("top$top").unwrap().len(), 2);
    }
}
