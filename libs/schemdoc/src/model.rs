//! Model documents: symbol pins and cell variants.

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One symbol pin position in a model's `conn` list: `(x, y, port)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conn(pub i64, pub i64, pub ArcStr);

impl Conn {
    /// The port name this pin exposes.
    pub fn port(&self) -> &ArcStr {
        &self.2
    }
}

/// How a variant is realized.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// The variant is a sub-schematic drawn in the editor.
    Schematic,
    /// The variant is backed by SPICE text (a `.model` card, an include, or
    /// a foundry subcircuit).
    Spice,
}

/// Per-simulator emission overrides for one variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimModel {
    /// Template replacing the built-in device reference line. Receives
    /// `{name}`, `{ports}`, and `{properties}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reftempl: Option<ArcStr>,
    /// Template emitted once into the deck's declaration set. Receives
    /// `{corner}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decltempl: Option<ArcStr>,
    /// The internal component instantiated by `reftempl`, used when
    /// synthesizing save-vector names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ArcStr>,
    /// Simulator vectors this variant exposes per instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vectors: Vec<ArcStr>,
}

/// One named variant of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    /// How the variant is realized.
    #[serde(rename = "type")]
    pub typ: ModelType,
    /// Per-simulator blocks, keyed by simulator name (`ngspice`, `xyce`, …).
    #[serde(flatten)]
    pub sims: IndexMap<ArcStr, SimModel>,
}

impl ModelDef {
    /// The simulator block for `sim`, if declared.
    pub fn sim(&self, sim: &str) -> Option<&SimModel> {
        self.sims.get(sim)
    }
}

/// The `models:<cell>` document describing a user-defined cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDoc {
    /// The document id.
    #[serde(rename = "_id")]
    pub id: ArcStr,
    /// The document revision token.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<ArcStr>,
    /// Ordered symbol pin positions; also the subcircuit port order.
    #[serde(default)]
    pub conn: Vec<Conn>,
    /// The variants this cell can be realized with.
    #[serde(default)]
    pub models: IndexMap<ArcStr, ModelDef>,
}

impl ModelDoc {
    /// The variant named `variant`, if declared.
    pub fn variant(&self, variant: &str) -> Option<&ModelDef> {
        self.models.get(variant)
    }

    /// The subcircuit port names in `conn` order.
    pub fn ports(&self) -> impl Iterator<Item = &ArcStr> {
        self.conn.iter().map(Conn::port)
    }
}
