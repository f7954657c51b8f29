//! Save-vector synthesis.
//!
//! Builds the flat list of simulator vector identifiers to request when
//! simulating a schematic: node voltages for every labeled port and device
//! vectors (`@dev[vec]` forms) for every instance, walking into
//! schematic-realized subcircuits.

use schemdoc::{CellKind, Hierarchy, ModelType};

use crate::emit::spice_name;
use crate::{Error, Result};

/// Default per-family device vectors, used when a device has no simulator
/// model block.
fn default_vectors(cell: &CellKind) -> &'static [&'static str] {
    match cell {
        CellKind::Nmos | CellKind::Pmos => &["gm", "id", "vdsat"],
        CellKind::Npn | CellKind::Pnp => &["gm", "ic", "ib"],
        CellKind::Diode => &["id"],
        CellKind::Resistor
        | CellKind::Capacitor
        | CellKind::Inductor
        | CellKind::Vsource
        | CellKind::Isource => &["i"],
        _ => &[],
    }
}

/// A node name scoped by the instance path.
fn scoped(path: &[String], leaf: &str) -> String {
    if path.is_empty() {
        leaf.to_string()
    } else {
        format!("{}.{}", path.join("."), leaf)
    }
}

/// A device vector identifier. A bare top-level device saves as
/// `@dev[vec]`; anything nested saves as `@<typ>.<dotted path>[vec]`.
fn device_vector(typ: char, segments: &[String], vec: &str) -> String {
    if segments.len() == 1 {
        format!("@{}[{}]", segments[0], vec)
    } else {
        format!("@{}.{}[{}]", typ, segments.join("."), vec)
    }
}

/// Synthesizes the save list for `name`.
///
/// The walk is pure and deterministic: one identifier per labeled non-`gnd`
/// port and per device vector, all lowercase, in document order.
pub fn save_vectors(name: &str, hier: &Hierarchy, sim: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(name, hier, sim, &mut path, &mut out)?;
    Ok(out)
}

fn walk(
    name: &str,
    hier: &Hierarchy,
    sim: &str,
    path: &mut Vec<String>,
    out: &mut Vec<String>,
) -> Result<()> {
    let docs = hier
        .schematic(name)
        .ok_or_else(|| Error::MissingSchematic(name.to_string()))?;
    for doc in docs.values() {
        match &doc.cell {
            CellKind::Wire | CellKind::Text => {}
            CellKind::Port => {
                if let Some(pname) = &doc.name {
                    let pname = pname.to_lowercase();
                    if pname != "gnd" {
                        out.push(scoped(path, &pname));
                    }
                }
            }
            cell => {
                let inst = match &doc.name {
                    Some(n) => n.to_lowercase(),
                    None => spice_name(&doc.id).to_lowercase(),
                };
                let def = doc.model().and_then(|variant| {
                    hier.model(cell.name())
                        .and_then(|m| m.variant(variant))
                        .map(|def| (variant, def))
                });
                match def {
                    Some((variant, def)) if def.typ == ModelType::Schematic => {
                        path.push(format!("x{}", inst));
                        walk(&format!("{}${}", cell.name(), variant), hier, sim, path, out)?;
                        path.pop();
                    }
                    Some((_, def)) => {
                        let Some(block) = def.sim(sim) else {
                            continue;
                        };
                        let reftempl = block.reftempl.as_deref().unwrap_or("");
                        let typ = block
                            .component
                            .as_deref()
                            .and_then(|c| c.chars().next())
                            .or_else(|| reftempl.chars().next())
                            .unwrap_or('x')
                            .to_ascii_lowercase();
                        let dtyp = reftempl
                            .chars()
                            .next()
                            .unwrap_or('x')
                            .to_ascii_lowercase();
                        let mut segments: Vec<String> = path.clone();
                        segments.push(format!("{}{}", dtyp, inst));
                        if let Some(component) = &block.component {
                            segments.push(component.to_lowercase());
                        }
                        for vec in &block.vectors {
                            out.push(device_vector(typ, &segments, &vec.to_lowercase()));
                        }
                    }
                    None => {
                        let Some(letter) = cell.element_letter() else {
                            continue;
                        };
                        let letter = letter.to_ascii_lowercase();
                        let mut segments: Vec<String> = path.clone();
                        segments.push(format!("{}{}", letter, inst));
                        for vec in default_vectors(cell) {
                            out.push(device_vector(letter, &segments, vec));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
