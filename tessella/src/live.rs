//! Live deck emission and result persistence.

use couchdoc::DbClient;
use schemdoc::Hierarchy;
use simserver::ResultStore;
use spice::EmitOptions;
use tracing::{info, warn};

use crate::mirror::MirrorWatch;
use crate::Result;

/// A freshly emitted deck with its save-vector list.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDeck {
    /// The SPICE deck text.
    pub deck: String,
    /// The simulator vectors to request when running it.
    pub vectors: Vec<String>,
}

fn emit(name: &str, hierarchy: &Hierarchy, opts: &EmitOptions) -> spice::Result<LiveDeck> {
    Ok(LiveDeck {
        deck: spice::deck(name, hierarchy, opts)?,
        vectors: spice::save_vectors(name, hierarchy, &opts.sim)?,
    })
}

/// Re-emits the deck for every mirror snapshot.
///
/// Each snapshot supersedes the previous extraction; a snapshot whose
/// extraction fails surfaces the error while the last successful deck stays
/// available through [`DeckWatch::last`].
pub struct DeckWatch {
    watch: MirrorWatch,
    opts: EmitOptions,
    last: Option<LiveDeck>,
}

impl DeckWatch {
    /// Wraps a mirror watch with emission options.
    pub fn new(watch: MirrorWatch, opts: EmitOptions) -> Self {
        Self {
            watch,
            opts,
            last: None,
        }
    }

    /// The most recent successfully emitted deck.
    pub fn last(&self) -> Option<&LiveDeck> {
        self.last.as_ref()
    }

    /// The next deck, or `None` when the change feed ended.
    pub async fn next(&mut self) -> Result<Option<LiveDeck>> {
        let Some(snapshot) = self.watch.next().await? else {
            return Ok(None);
        };
        match emit(self.watch.name(), &snapshot, &self.opts) {
            Ok(live) => {
                self.last = Some(live.clone());
                Ok(Some(live))
            }
            Err(err) => {
                warn!(error = %err, "extraction failed, keeping previous deck");
                Err(err.into())
            }
        }
    }
}

/// Emits a deck once from a snapshot, without a watch.
pub fn emit_deck(name: &str, hierarchy: &Hierarchy, opts: &EmitOptions) -> Result<LiveDeck> {
    Ok(emit(name, hierarchy, opts)?)
}

/// Persists a simulation run to the document store under
/// `<name>$result:<timestamp>`. Returns the new document's revision.
pub async fn persist_results(
    db: &DbClient,
    name: &str,
    store: &ResultStore,
) -> Result<String> {
    let id = simserver::result_doc_id(name, chrono::Utc::now());
    let doc = simserver::to_result_doc(store);
    let rev = db.put_doc(&id, &doc).await?;
    info!(id, rev = %rev, "results persisted");
    Ok(rev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::{DocSource, Mirror};
    use crate::Error;
    use couchdoc::Seq;
    use indexmap::IndexMap;
    use serde_json::{json, Value};

    struct Fixture(Vec<(String, Value)>);

    impl DocSource for Fixture {
        async fn fetch(&self, prefix: &str) -> crate::Result<(Seq, IndexMap<String, Value>)> {
            let docs = self
                .0
                .iter()
                .filter(|(id, _)| id.starts_with(&format!("{}:", prefix)))
                .cloned()
                .collect();
            Ok((Seq::origin(), docs))
        }
    }

    fn amp_fixture() -> Fixture {
        Fixture(
            vec![
                (
                    "models:amp",
                    json!({"_id": "models:amp", "conn": [[0, 1, "INP"], [2, 1, "OUT"]],
                           "models": {"v1": {"type": "schematic"}}}),
                ),
                (
                    "top$top:pa-k",
                    json!({"_id": "top$top:pa-k", "cell": "port", "x": 10, "y": 11, "name": "A"}),
                ),
                (
                    "top$top:pb-k",
                    json!({"_id": "top$top:pb-k", "cell": "port", "x": 12, "y": 11, "name": "B"}),
                ),
                (
                    "top$top:x1-k",
                    json!({"_id": "top$top:x1-k", "cell": "amp", "x": 10, "y": 10,
                           "name": "inst", "props": {"model": "v1"}}),
                ),
                (
                    "amp$v1:p1-k",
                    json!({"_id": "amp$v1:p1-k", "cell": "port", "x": 3, "y": 0, "name": "INP"}),
                ),
                (
                    "amp$v1:p2-k",
                    json!({"_id": "amp$v1:p2-k", "cell": "port", "x": 3, "y": 2, "name": "OUT"}),
                ),
                (
                    "amp$v1:r1-z",
                    json!({"_id": "amp$v1:r1-z", "cell": "resistor", "x": 2, "y": 0,
                           "name": "1", "props": {"r": "10k"}}),
                ),
            ]
            .into_iter()
            .map(|(id, body)| (id.to_string(), body))
            .collect(),
        )
    }

    #[test_log::test(tokio::test)]
    async fn mirrored_subcircuit_reaches_the_deck() {
        let mirror = Mirror::build(&amp_fixture(), "top$top").await.unwrap();
        let live = emit_deck("top$top", &mirror.snapshot(), &EmitOptions::default()).unwrap();
        assert!(live.deck.contains(".subckt v1 INP OUT"));
        assert!(live.deck.lines().any(|l| l == "Xinst A B v1"));
        assert_eq!(live.vectors, ["a", "b", "xinst.inp", "xinst.out", "@r.xinst.r1[i]"]);
    }

    #[test_log::test(tokio::test)]
    async fn unresolvable_cell_is_surfaced_not_emitted() {
        let fixture = Fixture(vec![(
            "top$top:x1-k".to_string(),
            json!({"_id": "top$top:x1-k", "cell": "ghost", "x": 0, "y": 0,
                   "props": {"model": "v1"}}),
        )]);
        let mirror = Mirror::build(&fixture, "top$top").await.unwrap();
        let err = emit_deck("top$top", &mirror.snapshot(), &EmitOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Spice(spice::Error::MissingModel(_))));
    }
}

