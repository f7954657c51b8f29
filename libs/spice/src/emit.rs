//! Deck assembly.

use arcstr::ArcStr;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use netlist::extract;
use schemdoc::{CellKind, Element, Hierarchy, ModelTable, PropValue, SchemId};
use tracing::debug;

use crate::templates::{render_decl, render_ref};
use crate::{Error, Result};

/// Options controlling deck emission.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// The simulator whose model blocks apply (`ngspice`, `xyce`, …).
    pub sim: ArcStr,
    /// The process corner substituted into declaration templates.
    pub corner: ArcStr,
    /// User-provided text appended between the body and `.end`.
    pub extra: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            sim: arcstr::literal!("ngspice"),
            corner: arcstr::literal!("tt"),
            extra: String::new(),
        }
    }
}

/// The SPICE-facing tail of an identifier: everything after the last `-`.
///
/// Device ids end in an editor-assigned key; net and instance names derived
/// from them keep only that tail.
pub fn spice_name(n: &str) -> &str {
    n.rsplit_once('-').map_or(n, |(_, tail)| tail)
}

/// Formats a property bag for a device line: the `model` value is promoted
/// to the front, a `spice` value is appended verbatim, and every other
/// property renders as `k=v` in insertion order.
pub fn print_props(props: &IndexMap<ArcStr, PropValue>) -> String {
    let mut prs: Vec<String> = Vec::new();
    for (k, v) in props {
        match k.as_str() {
            "model" => prs.insert(0, v.to_string()),
            "spice" => prs.push(v.to_string()),
            _ => prs.push(format!("{}={}", k, v)),
        }
    }
    prs.join(" ")
}

/// Emits the instance lines for one schematic, accumulating model
/// declarations into `declarations`.
fn circuit_spice(
    docs: &IndexMap<ArcStr, Element>,
    models: &ModelTable,
    declarations: &mut IndexSet<String>,
    opts: &EmitOptions,
) -> Result<String> {
    // A user cell without its model document cannot be emitted at all;
    // surface it before extraction rather than dropping the instance.
    for doc in docs.values() {
        if let CellKind::Other(cell) = &doc.cell {
            if !models.contains_key(cell.as_str()) {
                return Err(Error::MissingModel(cell.to_string()));
            }
        }
    }

    let nl = extract(docs, models)?;
    let mut cir = Vec::with_capacity(nl.len());
    for (id, ports) in &nl {
        let Some(dev) = docs.get(id) else {
            continue;
        };
        let mname = dev.model().unwrap_or("");
        let name = match &dev.name {
            Some(n) => n.as_str(),
            None => spice_name(id),
        };
        let net = |port: &str| ports.get(port).map(|n| spice_name(n)).unwrap_or_default();

        let (portstr, mut templ) = if let CellKind::Other(cell) = &dev.cell {
            let model = models
                .get(cell.as_str())
                .ok_or_else(|| Error::MissingModel(cell.to_string()))?;
            let portstr = model.conn.iter().map(|c| net(c.port())).join(" ");
            (portstr, "X{name} {ports} {properties}".to_string())
        } else if let (Some(letter), Some(order)) =
            (dev.cell.element_letter(), dev.cell.port_order())
        {
            let portstr = order.iter().map(|p| net(p)).join(" ");
            (
                portstr,
                format!("{}{{name}} {{ports}} {{properties}}", letter),
            )
        } else {
            return Err(Error::NotDevice(dev.cell.to_string()));
        };

        // A model block can replace the reference line entirely, e.g. when a
        // MOSFET is really a foundry subcircuit.
        if let Some(sim) = models
            .get(dev.cell.name())
            .and_then(|m| m.variant(mname))
            .and_then(|d| d.sim(&opts.sim))
        {
            if let Some(reftempl) = &sim.reftempl {
                templ = reftempl.to_string();
            }
            if let Some(decltempl) = &sim.decltempl {
                declarations.insert(render_decl(decltempl, &opts.corner));
            }
        }

        let propstr = print_props(&dev.props);
        cir.push(render_ref(&templ, name, &portstr, &propstr));
    }
    Ok(cir.join("\n"))
}

/// Renders the full deck for `name` from a mirrored hierarchy.
///
/// Every schematic other than the top contributes a `.subckt` declaration;
/// declarations (subcircuits and model `decltempl` blocks) are emitted once
/// each, in first-use order.
pub fn deck(name: &str, hier: &Hierarchy, opts: &EmitOptions) -> Result<String> {
    let models = &hier.models;
    let mut declarations: IndexSet<String> = IndexSet::new();

    for (subname, docs) in &hier.schematics {
        if subname.as_str() == name {
            continue;
        }
        let id: SchemId = subname.parse()?;
        let model = models
            .get(id.cell.as_str())
            .ok_or_else(|| Error::MissingModel(id.cell.to_string()))?;
        let variant = id.variant.as_deref().unwrap_or(&id.cell);
        let ports = model.ports().join(" ");
        let body = circuit_spice(docs, models, &mut declarations, opts)?;
        declarations.insert(format!(
            ".subckt {} {}\n{}\n.ends {}",
            variant, ports, body, variant
        ));
    }

    let top = hier
        .schematic(name)
        .ok_or_else(|| Error::MissingSchematic(name.to_string()))?;
    let body = circuit_spice(top, models, &mut declarations, opts)?;

    let mut ckt: Vec<String> = Vec::with_capacity(declarations.len() + 4);
    ckt.push(format!("* {}", name));
    ckt.extend(declarations);
    ckt.push(body);
    ckt.push(opts.extra.clone());
    ckt.push(".end\n".to_string());
    let deck = ckt.join("\n");
    debug!(schematic = name, bytes = deck.len(), "emitted deck");
    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn elements(values: Vec<serde_json::Value>) -> IndexMap<ArcStr, Element> {
        values
            .into_iter()
            .map(|v| {
                let elem: Element = serde_json::from_value(v).unwrap();
                (elem.id.clone(), elem)
            })
            .collect()
    }

    fn resistor_top() -> IndexMap<ArcStr, Element> {
        elements(vec![
            json!({"_id": "top$top:p1", "cell": "port", "x": 0, "y": 0, "name": "IN"}),
            json!({"_id": "top$top:p2", "cell": "port", "x": 4, "y": 0, "name": "OUT"}),
            json!({"_id": "top$top:w1", "cell": "wire", "x": 0, "y": 0, "rx": 3, "ry": 0}),
            json!({"_id": "top$top:w2", "cell": "wire", "x": 3, "y": 2, "rx": 1, "ry": -2}),
            json!({"_id": "top$top:r1-a", "cell": "resistor", "x": 2, "y": 0, "name": "1",
                   "props": {"model": "rmod", "r": "1k"}}),
        ])
    }

    #[test]
    fn resistor_between_two_ports() {
        let mut hier = Hierarchy::new();
        hier.insert_schematic("top$top", resistor_top());
        let text = deck("top$top", &hier, &EmitOptions::default()).unwrap();
        assert!(text.starts_with("* top$top\n"));
        assert!(text.lines().any(|l| l == "R1 IN OUT rmod r=1k"));
        assert!(!text.contains("net0"));
        assert!(text.ends_with(".end\n"));
    }

    #[test]
    fn emission_is_stable() {
        let mut hier = Hierarchy::new();
        hier.insert_schematic("top$top", resistor_top());
        let opts = EmitOptions::default();
        assert_eq!(
            deck("top$top", &hier, &opts).unwrap(),
            deck("top$top", &hier, &opts).unwrap()
        );
    }

    #[test]
    fn model_block_overrides_template_and_declares() {
        let mut hier = Hierarchy::new();
        hier.upsert(
            "models:resistor",
            json!({"_id": "models:resistor", "conn": [],
                   "models": {"rmod": {"type": "spice",
                       "ngspice": {"reftempl": "R{name} {ports} {properties} TC=1,2",
                                   "decltempl": ".model rmod R res={corner}"}}}}),
        )
        .unwrap();
        hier.insert_schematic("top$top", resistor_top());
        let text = deck("top$top", &hier, &EmitOptions::default()).unwrap();
        assert!(text.lines().any(|l| l == "R1 IN OUT rmod r=1k TC=1,2"));
        assert!(text.lines().any(|l| l == ".model rmod R res=tt"));
    }

    #[test]
    fn subcircuit_declaration_and_instance() {
        let mut hier = Hierarchy::new();
        hier.upsert(
            "models:amp",
            json!({"_id": "models:amp",
                   "conn": [[0, 1, "INP"], [2, 1, "OUT"]],
                   "models": {"v1": {"type": "schematic"}}}),
        )
        .unwrap();
        // Inside amp$v1: one resistor between the two ports.
        hier.insert_schematic(
            "amp$v1",
            elements(vec![
                json!({"_id": "amp$v1:p1", "cell": "port", "x": 3, "y": 0, "name": "INP"}),
                json!({"_id": "amp$v1:p2", "cell": "port", "x": 3, "y": 2, "name": "OUT"}),
                json!({"_id": "amp$v1:r1-z", "cell": "resistor", "x": 2, "y": 0, "name": "1",
                       "props": {"r": "10k"}}),
            ]),
        );
        // Top: the amp instance with ports directly on its pins.
        hier.insert_schematic(
            "top$top",
            elements(vec![
                json!({"_id": "top$top:pa", "cell": "port", "x": 10, "y": 11, "name": "A"}),
                json!({"_id": "top$top:pb", "cell": "port", "x": 12, "y": 11, "name": "B"}),
                json!({"_id": "top$top:x1-q", "cell": "amp", "x": 10, "y": 10, "name": "inst",
                       "props": {"model": "v1"}}),
            ]),
        );
        let text = deck("top$top", &hier, &EmitOptions::default()).unwrap();
        assert!(text.contains(".subckt v1 INP OUT\nR1 INP OUT r=10k\n.ends v1"));
        assert!(text.lines().any(|l| l == "Xinst A B v1"));
    }

    #[test]
    fn missing_model_is_surfaced() {
        let mut hier = Hierarchy::new();
        hier.insert_schematic(
            "top$top",
            elements(vec![json!({
                "_id": "top$top:x1", "cell": "ghost", "x": 0, "y": 0,
                "props": {"model": "v1"}
            })]),
        );
        match deck("top$top", &hier, &EmitOptions::default()) {
            Err(Error::MissingModel(cell)) => assert_eq!(cell, "ghost"),
            other => panic!("expected MissingModel, got {:?}", other),
        }
    }

    #[test]
    fn props_render_in_order_with_model_first() {
        let props: IndexMap<ArcStr, PropValue> = serde_json::from_value(json!({
            "w": "2u", "model": "nfet", "l": "150n", "spice": "m=4"
        }))
        .unwrap();
        assert_eq!(print_props(&props), "nfet w=2u l=150n m=4");
    }

    #[test]
    fn spice_names_keep_the_key_tail() {
        assert_eq!(spice_name("top$top:r1-abc"), "abc");
        assert_eq!(spice_name("net0"), "net0");
    }
}
