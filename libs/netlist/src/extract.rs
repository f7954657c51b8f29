//! Connected-component net extraction.

use std::collections::VecDeque;

use arcstr::ArcStr;
use geometry::Point;
use indexmap::IndexMap;
use schemdoc::{CellKind, Element, ModelTable};
use tracing::debug;

use crate::place::pins;
use crate::{Error, Result};

/// The extracted netlist: device document id to port-name-to-net-name.
pub type Netlist = IndexMap<ArcStr, IndexMap<ArcStr, ArcStr>>;

/// One entry in the wire index: either a wire/port document or a synthetic
/// zero-length wire injected at a device pin.
#[derive(Debug, Copy, Clone)]
enum WireNode<'a> {
    Doc(&'a Element),
    Stub(Point),
}

/// Spatial indexes over one schematic.
struct Indexes<'a> {
    /// Wire and port documents (plus stubs) by pin coordinate.
    wires: IndexMap<Point, Vec<WireNode<'a>>>,
    /// Device ports by pin coordinate.
    devices: IndexMap<Point, Vec<(Option<ArcStr>, &'a Element)>>,
}

fn index<'a>(docs: &'a IndexMap<ArcStr, Element>, models: &ModelTable) -> Indexes<'a> {
    let mut wires: IndexMap<Point, Vec<WireNode<'a>>> = IndexMap::new();
    let mut devices: IndexMap<Point, Vec<(Option<ArcStr>, &'a Element)>> = IndexMap::new();
    for doc in docs.values() {
        let placed = pins(doc, models);
        match &doc.cell {
            CellKind::Wire | CellKind::Port => {
                for pt in placed.keys() {
                    wires.entry(*pt).or_default().push(WireNode::Doc(doc));
                }
            }
            CellKind::Text => {}
            _ => {
                for (pt, port) in placed {
                    devices.entry(pt).or_default().push((port, doc));
                    // A zero-length stub lets two touching device pins form
                    // a net without a drawn wire.
                    wires.entry(pt).or_insert_with(|| vec![WireNode::Stub(pt)]);
                }
            }
        }
    }
    Indexes { wires, devices }
}

/// Extracts nets from one schematic's documents.
///
/// Every device pin lands in exactly one net. A net takes the first wire
/// label encountered; a port label always overrides. Components with no
/// label at all are assigned `net<k>` with `k` counting only synthesized
/// names, scoped to this call.
pub fn extract(docs: &IndexMap<ArcStr, Element>, models: &ModelTable) -> Result<Netlist> {
    let Indexes {
        mut wires,
        devices,
    } = index(docs, models);

    // Net name to device id to ports on that net.
    let mut nets: IndexMap<ArcStr, IndexMap<ArcStr, Vec<ArcStr>>> = IndexMap::new();
    let mut netnum = 0u64;

    while let Some((_, seed)) = wires.pop() {
        let mut netname: Option<ArcStr> = None;
        let mut netdevs: IndexMap<ArcStr, Vec<ArcStr>> = IndexMap::new();
        let mut queue: VecDeque<WireNode> = seed.into();
        while let Some(node) = queue.pop_front() {
            let (endpoints, label): (Vec<Point>, Option<&ArcStr>) = match node {
                WireNode::Stub(pt) => (vec![pt], None),
                WireNode::Doc(doc) => match &doc.cell {
                    CellKind::Wire => (
                        vec![
                            doc.origin(),
                            Point::new(doc.x + doc.rx, doc.y + doc.ry),
                        ],
                        doc.name.as_ref(),
                    ),
                    CellKind::Port => {
                        // Port labels win over wire labels.
                        if doc.name.is_some() {
                            netname = doc.name.clone();
                        }
                        (vec![doc.origin()], None)
                    }
                    cell => return Err(Error::Schema(cell.to_string())),
                },
            };
            if netname.is_none() {
                netname = label.cloned();
            }
            for pt in endpoints {
                if let Some(more) = wires.shift_remove(&pt) {
                    queue.extend(more);
                }
                if let Some(found) = devices.get(&pt) {
                    for (port, dev) in found {
                        if let Some(port) = port {
                            netdevs
                                .entry(dev.id.clone())
                                .or_default()
                                .push(port.clone());
                        }
                    }
                }
            }
        }
        let netname = netname.unwrap_or_else(|| {
            let name = arcstr::format!("net{}", netnum);
            netnum += 1;
            name
        });
        debug!(net = %netname, devices = netdevs.len(), "extracted net");
        for (dev, ports) in netdevs {
            nets.entry(netname.clone())
                .or_default()
                .entry(dev)
                .or_default()
                .extend(ports);
        }
    }

    // Invert into device id -> port -> net.
    let mut netlist = Netlist::new();
    for (net, devs) in nets {
        for (dev, ports) in devs {
            let entry = netlist.entry(dev).or_default();
            for port in ports {
                entry.insert(port, net.clone());
            }
        }
    }
    Ok(netlist)
}
