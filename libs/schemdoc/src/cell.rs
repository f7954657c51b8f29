//! The `cell` discriminator.

use std::fmt::{self, Display, Formatter};

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

/// The kind of symbol a document places.
///
/// Unrecognized discriminators are preserved as [`CellKind::Other`]; whether
/// that is legal depends on context (a user-defined cell instance is an
/// `Other` with a matching model document, while an `Other` reached by the
/// wire sweep is a schema error).
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CellKind {
    /// A wire segment.
    Wire,
    /// A port label declaring an external pin.
    Port,
    /// A text annotation; carries no connectivity.
    Text,
    /// A resistor.
    Resistor,
    /// A capacitor.
    Capacitor,
    /// An inductor.
    Inductor,
    /// A diode.
    Diode,
    /// An independent voltage source.
    Vsource,
    /// An independent current source.
    Isource,
    /// An n-channel MOSFET.
    Nmos,
    /// A p-channel MOSFET.
    Pmos,
    /// An NPN bipolar transistor.
    Npn,
    /// A PNP bipolar transistor.
    Pnp,
    /// A user-defined cell, realized through its model document.
    Other(ArcStr),
}

impl CellKind {
    /// The canonical lowercase name of this cell kind.
    pub fn name(&self) -> &str {
        match self {
            Self::Wire => "wire",
            Self::Port => "port",
            Self::Text => "text",
            Self::Resistor => "resistor",
            Self::Capacitor => "capacitor",
            Self::Inductor => "inductor",
            Self::Diode => "diode",
            Self::Vsource => "vsource",
            Self::Isource => "isource",
            Self::Nmos => "nmos",
            Self::Pmos => "pmos",
            Self::Npn => "npn",
            Self::Pnp => "pnp",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for the built-in device families.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Resistor
                | Self::Capacitor
                | Self::Inductor
                | Self::Diode
                | Self::Vsource
                | Self::Isource
                | Self::Nmos
                | Self::Pmos
                | Self::Npn
                | Self::Pnp
        )
    }

    /// Returns `true` if this document participates in a netlist as a device
    /// (anything that is not a wire, port, or annotation).
    pub fn is_device(&self) -> bool {
        !matches!(self, Self::Wire | Self::Port | Self::Text)
    }

    /// The SPICE element letter used when instantiating this cell.
    pub fn element_letter(&self) -> Option<char> {
        Some(match self {
            Self::Resistor => 'R',
            Self::Capacitor => 'C',
            Self::Inductor => 'L',
            Self::Diode => 'D',
            Self::Vsource => 'V',
            Self::Isource => 'I',
            Self::Nmos | Self::Pmos => 'M',
            Self::Npn | Self::Pnp => 'Q',
            Self::Other(_) => 'X',
            Self::Wire | Self::Port | Self::Text => return None,
        })
    }

    /// The emission order of this primitive's ports, if fixed by the family.
    pub fn port_order(&self) -> Option<&'static [&'static str]> {
        Some(match self {
            Self::Nmos | Self::Pmos => &["D", "G", "S", "B"],
            Self::Npn | Self::Pnp => &["C", "B", "E"],
            Self::Resistor
            | Self::Capacitor
            | Self::Inductor
            | Self::Diode
            | Self::Vsource
            | Self::Isource => &["P", "N"],
            _ => return None,
        })
    }
}

impl From<String> for CellKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "wire" => Self::Wire,
            "port" => Self::Port,
            "text" => Self::Text,
            "resistor" => Self::Resistor,
            "capacitor" => Self::Capacitor,
            "inductor" => Self::Inductor,
            "diode" => Self::Diode,
            "vsource" => Self::Vsource,
            "isource" => Self::Isource,
            "nmos" => Self::Nmos,
            "pmos" => Self::Pmos,
            "npn" => Self::Npn,
            "pnp" => Self::Pnp,
            _ => Self::Other(s.into()),
        }
    }
}

impl From<CellKind> for String {
    fn from(kind: CellKind) -> Self {
        kind.name().to_string()
    }
}

impl Display for CellKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
