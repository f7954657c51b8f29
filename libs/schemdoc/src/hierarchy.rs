//! The mirrored schematic hierarchy.

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::{CellKind, Element, Error, ModelDoc, ModelType, Result, SchemId};

/// The reserved name of the model pseudo-schematic.
pub const MODELS: &str = "models";

/// Model documents keyed by cell name.
pub type ModelTable = IndexMap<ArcStr, ModelDoc>;

/// Id prefix of model documents.
const MODEL_PREFIX: &str = "models:";

/// What [`Hierarchy::upsert`] stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    /// A model document for the given cell.
    Model(ArcStr),
    /// An element document.
    Element {
        /// The `cell$variant` bucket the element landed in.
        schem: String,
        /// The element's cell discriminator.
        cell: CellKind,
        /// The element's `model` property, if any.
        model: Option<ArcStr>,
    },
}

/// What a device's `model` property points at.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelRef {
    /// A schematic-realized variant; holds the `cell$variant` name that must
    /// be present in the hierarchy.
    Schematic(String),
    /// A SPICE-realized variant.
    Spice,
    /// The referenced variant or model document is absent.
    Unknown,
}

/// A top cell plus every sub-schematic and model document it references.
///
/// Buckets are insertion-ordered so that derived netlists are stable for a
/// given snapshot. Cloning a hierarchy yields an independent snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hierarchy {
    /// Model documents keyed by cell name.
    pub models: ModelTable,
    /// Schematic buckets keyed by `cell$variant`, each mapping document id
    /// to element.
    pub schematics: IndexMap<ArcStr, IndexMap<ArcStr, Element>>,
}

impl Hierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// The model document for `cell`, if mirrored.
    pub fn model(&self, cell: &str) -> Option<&ModelDoc> {
        self.models.get(cell)
    }

    /// The schematic bucket named `name` (`cell$variant`), if mirrored.
    pub fn schematic(&self, name: &str) -> Option<&IndexMap<ArcStr, Element>> {
        self.schematics.get(name)
    }

    /// Whether the hierarchy holds a schematic bucket named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.schematics.contains_key(name)
    }

    /// Installs a full schematic bucket, replacing any existing one.
    pub fn insert_schematic(&mut self, name: impl Into<ArcStr>, docs: IndexMap<ArcStr, Element>) {
        self.schematics.insert(name.into(), docs);
    }

    /// Installs a model document under its cell name.
    pub fn insert_model(&mut self, doc: ModelDoc) {
        let cell = doc
            .id
            .strip_prefix(MODEL_PREFIX)
            .unwrap_or(&doc.id)
            .to_string();
        self.models.insert(cell.into(), doc);
    }

    /// All names the change-feed selector must cover: the model
    /// pseudo-schematic plus every mirrored `cell$variant`.
    pub fn names(&self) -> Vec<String> {
        let mut names = vec![MODELS.to_string()];
        names.extend(self.schematics.keys().map(|k| k.to_string()));
        names
    }

    /// Resolves what a device element's `model` property points at.
    pub fn model_ref(&self, elem: &Element) -> Option<ModelRef> {
        if !elem.cell.is_device() {
            return None;
        }
        let variant = elem.model()?;
        let Some(def) = self
            .model(elem.cell.name())
            .and_then(|doc| doc.variant(variant))
        else {
            return Some(ModelRef::Unknown);
        };
        Some(match def.typ {
            ModelType::Schematic => {
                ModelRef::Schematic(format!("{}${}", elem.cell.name(), variant))
            }
            ModelType::Spice => ModelRef::Spice,
        })
    }

    /// Inserts or overwrites one document from its raw JSON body, routing it
    /// by id: `models:*` into the model table, everything else into its
    /// `cell$variant` bucket. Re-applying the same document is idempotent.
    pub fn upsert(&mut self, id: &str, body: serde_json::Value) -> Result<Upsert> {
        if id.starts_with(MODEL_PREFIX) {
            let doc: ModelDoc = serde_json::from_value(body).map_err(|source| {
                Error::InvalidDoc {
                    id: id.to_string(),
                    source,
                }
            })?;
            let cell: ArcStr = id[MODEL_PREFIX.len()..].into();
            self.models.insert(cell.clone(), doc);
            return Ok(Upsert::Model(cell));
        }
        let schem = id.parse::<SchemId>()?.schem();
        let elem: Element =
            serde_json::from_value(body).map_err(|source| Error::InvalidDoc {
                id: id.to_string(),
                source,
            })?;
        let upsert = Upsert::Element {
            schem: schem.clone(),
            cell: elem.cell.clone(),
            model: elem.model().map(ArcStr::from),
        };
        self.schematics
            .entry(schem.into())
            .or_default()
            .insert(elem.id.clone(), elem);
        Ok(upsert)
    }

    /// Removes one document by id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        if let Some(cell) = id.strip_prefix(MODEL_PREFIX) {
            return self.models.shift_remove(cell).is_some();
        }
        let Ok(schem_id) = id.parse::<SchemId>() else {
            return false;
        };
        self.schematics
            .get_mut(schem_id.schem().as_str())
            .is_some_and(|bucket| bucket.shift_remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hierarchy_with_top() -> Hierarchy {
        let mut h = Hierarchy::new();
        h.insert_schematic("top$top", IndexMap::new());
        h
    }

    #[test]
    fn upsert_routes_by_id() {
        let mut h = hierarchy_with_top();
        h.upsert(
            "models:opamp",
            json!({"_id": "models:opamp", "conn": [[0, 0, "OUT"]],
                   "models": {"v1": {"type": "schematic"}}}),
        )
        .unwrap();
        let up = h
            .upsert(
                "top$top:x1-k",
                json!({"_id": "top$top:x1-k", "cell": "opamp", "x": 0, "y": 0,
                       "props": {"model": "v1"}}),
            )
            .unwrap();
        assert_eq!(
            up,
            Upsert::Element {
                schem: "top$top".to_string(),
                cell: CellKind::Other("opamp".into()),
                model: Some("v1".into()),
            }
        );
        assert!(h.model("opamp").is_some());
        assert_eq!(h.schematic("top$top").unwrap().len(), 1);
    }

    #[test]
    fn remove_deletes_in_place() {
        let mut h = hierarchy_with_top();
        h.upsert(
            "top$top:r1-a",
            json!({"_id": "top$top:r1-a", "cell": "resistor", "x": 0, "y": 0}),
        )
        .unwrap();
        assert!(h.remove("top$top:r1-a"));
        assert!(!h.remove("top$top:r1-a"));
        assert!(h.schematic("top$top").unwrap().is_empty());
    }

    #[test]
    fn model_ref_resolution() {
        let mut h = hierarchy_with_top();
        h.upsert(
            "models:amp",
            json!({"_id": "models:amp", "conn": [],
                   "models": {"v1": {"type": "schematic"},
                              "v2": {"type": "spice"}}}),
        )
        .unwrap();
        let elem = |model: &str| {
            serde_json::from_value::<Element>(json!({
                "_id": "top$top:x1", "cell": "amp", "x": 0, "y": 0,
                "props": {"model": model}
            }))
            .unwrap()
        };
        assert_eq!(
            h.model_ref(&elem("v1")),
            Some(ModelRef::Schematic("amp$v1".to_string()))
        );
        assert_eq!(h.model_ref(&elem("v2")), Some(ModelRef::Spice));
        assert_eq!(h.model_ref(&elem("nope")), Some(ModelRef::Unknown));
    }

    #[test]
    fn selector_names_cover_models_and_buckets() {
        let mut h = hierarchy_with_top();
        h.insert_schematic("amp$v1", IndexMap::new());
        assert_eq!(h.names(), ["models", "top$top", "amp$v1"]);
    }
}
