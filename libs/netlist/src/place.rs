//! Pin placement under symbol transforms.

use arcstr::ArcStr;
use geometry::Point;
use indexmap::IndexMap;
use schemdoc::{CellKind, Element, ModelTable};

/// Placed pins: grid coordinate to port name. Wires contribute unnamed
/// (`None`) pins.
pub type PinMap = IndexMap<Point, Option<ArcStr>>;

/// Canonical MOSFET pin shape on a 3-wide symbol grid.
const MOSFET_SHAPE: &[(i64, i64, &str)] = &[(1, 0, "D"), (0, 1, "G"), (1, 1, "B"), (1, 2, "S")];

/// Canonical BJT pin shape.
const BJT_SHAPE: &[(i64, i64, &str)] = &[(1, 0, "C"), (0, 1, "B"), (1, 2, "E")];

/// Canonical two-terminal pin shape (R, C, L, D, V, I).
const TWOPORT_SHAPE: &[(i64, i64, &str)] = &[(1, 0, "P"), (1, 2, "N")];

/// Rotates a pin shape around the symbol center and lands it on the grid.
fn rotate<I>(shape: I, elem: &Element) -> PinMap
where
    I: IntoIterator<Item = (i64, i64, ArcStr)> + Clone,
{
    let width = shape
        .clone()
        .into_iter()
        .map(|(x, y, _)| x.max(y))
        .max()
        .unwrap_or(0)
        + 1;
    let mid = width as f64 / 2. - 0.5;
    let transform = elem.transform();
    let origin = elem.origin();
    shape
        .into_iter()
        .map(|(x, y, port)| {
            (
                transform.place(origin, mid, x as f64, y as f64),
                Some(port),
            )
        })
        .collect()
}

fn shape_pins(shape: &'static [(i64, i64, &str)]) -> impl Iterator<Item = (i64, i64, ArcStr)> + Clone {
    shape.iter().map(|&(x, y, p)| (x, y, ArcStr::from(p)))
}

/// Computes the grid coordinates of an element's pins.
///
/// Wires yield both endpoints unnamed; ports yield their single labeled
/// location; primitives and user cells yield their (model-declared) pin
/// shape rotated by the element's transform. Text annotations and unknown
/// cells without a model document have no pins.
pub fn pins(elem: &Element, models: &ModelTable) -> PinMap {
    match &elem.cell {
        CellKind::Wire => {
            let mut map = PinMap::new();
            map.insert(elem.origin(), None);
            map.insert(Point::new(elem.x + elem.rx, elem.y + elem.ry), None);
            map
        }
        CellKind::Port => {
            let mut map = PinMap::new();
            map.insert(elem.origin(), elem.name.clone());
            map
        }
        CellKind::Nmos | CellKind::Pmos => rotate(shape_pins(MOSFET_SHAPE), elem),
        CellKind::Npn | CellKind::Pnp => rotate(shape_pins(BJT_SHAPE), elem),
        CellKind::Resistor
        | CellKind::Capacitor
        | CellKind::Inductor
        | CellKind::Diode
        | CellKind::Vsource
        | CellKind::Isource => rotate(shape_pins(TWOPORT_SHAPE), elem),
        CellKind::Text => PinMap::new(),
        CellKind::Other(cell) => match models.get(cell.as_str()) {
            Some(model) => rotate(
                model
                    .conn
                    .iter()
                    .map(|c| (c.0, c.1, c.port().clone()))
                    .collect::<Vec<_>>(),
                elem,
            ),
            None => PinMap::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemdoc::ModelDoc;
    use serde_json::json;

    fn element(value: serde_json::Value) -> Element {
        serde_json::from_value(value).unwrap()
    }

    fn no_models() -> ModelTable {
        ModelTable::new()
    }

    #[test]
    fn single_point_wire_has_one_pin() {
        let wire = element(json!({
            "_id": "top$top:w1", "cell": "wire", "x": 3, "y": 4, "rx": 0, "ry": 0
        }));
        let map = pins(&wire, &no_models());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Point::new(3, 4)), Some(&None));
    }

    #[test]
    fn wire_yields_both_endpoints() {
        let wire = element(json!({
            "_id": "top$top:w1", "cell": "wire", "x": 0, "y": 0, "rx": 3, "ry": -1
        }));
        let map = pins(&wire, &no_models());
        assert_eq!(map.len(), 2);
        assert!(map.contains_key(&Point::new(0, 0)));
        assert!(map.contains_key(&Point::new(3, -1)));
    }

    #[test]
    fn identity_resistor_pins() {
        let res = element(json!({
            "_id": "top$top:r1", "cell": "resistor", "x": 2, "y": 0
        }));
        let map = pins(&res, &no_models());
        assert_eq!(map.get(&Point::new(3, 0)), Some(&Some("P".into())));
        assert_eq!(map.get(&Point::new(3, 2)), Some(&Some("N".into())));
    }

    #[test]
    fn rotated_nmos_pins() {
        let mos = element(json!({
            "_id": "top$top:m1", "cell": "nmos", "x": 5, "y": 5,
            "transform": [0, -1, 1, 0, 0, 0]
        }));
        let map = pins(&mos, &no_models());
        assert_eq!(map.get(&Point::new(5, 6)), Some(&Some("D".into())));
        assert_eq!(map.get(&Point::new(6, 7)), Some(&Some("G".into())));
        assert_eq!(map.get(&Point::new(6, 6)), Some(&Some("B".into())));
        assert_eq!(map.get(&Point::new(7, 6)), Some(&Some("S".into())));
    }

    #[test]
    fn subcircuit_pins_come_from_conn() {
        let mut models = ModelTable::new();
        let doc: ModelDoc = serde_json::from_value(json!({
            "_id": "models:amp",
            "conn": [[0, 1, "INP"], [2, 1, "OUT"]],
            "models": {}
        }))
        .unwrap();
        models.insert("amp".into(), doc);
        let inst = element(json!({
            "_id": "top$top:x1", "cell": "amp", "x": 10, "y": 10
        }));
        let map = pins(&inst, &models);
        assert_eq!(map.get(&Point::new(10, 11)), Some(&Some("INP".into())));
        assert_eq!(map.get(&Point::new(12, 11)), Some(&Some("OUT".into())));
    }

    #[test]
    fn unknown_cell_without_model_has_no_pins() {
        let inst = element(json!({
            "_id": "top$top:x1", "cell": "mystery", "x": 0, "y": 0
        }));
        assert!(pins(&inst, &no_models()).is_empty());
    }
}
