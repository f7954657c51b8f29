//! Element documents: wires, ports, and device placements.

use std::fmt::{self, Display, Formatter};

use arcstr::ArcStr;
use geometry::{Affine, Point};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::CellKind;

/// A free-form device property value.
///
/// Property bags are written by the editor and passed through to the
/// netlist verbatim, so values keep whatever scalar type they had in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// A string value.
    String(ArcStr),
    /// A numeric value.
    Number(serde_json::Number),
    /// A boolean value.
    Bool(bool),
}

impl PropValue {
    /// The property value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl Display for PropValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A schematic element: one wire, port, or device placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// The document id.
    #[serde(rename = "_id")]
    pub id: ArcStr,
    /// The document revision token.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<ArcStr>,
    /// What this element is.
    pub cell: CellKind,
    /// The grid x-coordinate of the element origin.
    #[serde(default)]
    pub x: i64,
    /// The grid y-coordinate of the element origin.
    #[serde(default)]
    pub y: i64,
    /// Wire endpoint offset in x; zero for non-wires.
    #[serde(default)]
    pub rx: i64,
    /// Wire endpoint offset in y; zero for non-wires.
    #[serde(default)]
    pub ry: i64,
    /// The element name: a net label on wires, the pin name on ports, the
    /// instance name on devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ArcStr>,
    /// The symbol placement transform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Affine>,
    /// Free-form device properties.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub props: IndexMap<ArcStr, PropValue>,
}

impl Element {
    /// The element origin as a [`Point`].
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The placement transform, defaulting to identity.
    pub fn transform(&self) -> Affine {
        self.transform.unwrap_or_default()
    }

    /// The `model` property: which variant of the cell realizes this device.
    pub fn model(&self) -> Option<&str> {
        self.props.get("model").and_then(PropValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_device_document() {
        let elem: Element = serde_json::from_str(
            r#"{
                "_id": "top$top:r1-abc",
                "_rev": "3-deadbeef",
                "cell": "resistor",
                "x": 2, "y": 0,
                "transform": [1, 0, 0, 1, 0, 0],
                "props": {"model": "rmod", "r": "1k"}
            }"#,
        )
        .unwrap();
        assert_eq!(elem.cell, CellKind::Resistor);
        assert_eq!(elem.model(), Some("rmod"));
        assert_eq!(elem.props.get("r").unwrap().to_string(), "1k");
        assert_eq!(elem.origin(), Point::new(2, 0));
    }

    #[test]
    fn prop_order_is_preserved() {
        let elem: Element = serde_json::from_str(
            r#"{"_id": "a$b:m1", "cell": "nmos",
                "x": 0, "y": 0,
                "props": {"w": "2u", "l": "150n", "m": 4}}"#,
        )
        .unwrap();
        let keys: Vec<_> = elem.props.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["w", "l", "m"]);
    }

    #[test]
    fn unknown_cells_are_preserved() {
        let elem: Element =
            serde_json::from_str(r#"{"_id": "a$b:x1", "cell": "opamp", "x": 1, "y": 1}"#).unwrap();
        assert_eq!(elem.cell, CellKind::Other("opamp".into()));
        assert!(elem.cell.is_device());
    }
}
