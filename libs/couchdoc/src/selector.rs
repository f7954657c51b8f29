//! Server-side change filters.

use serde::Serialize;
use serde_json::{json, Value};

/// A `_selector` filter body for the `_changes` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Selector(Value);

impl Selector {
    /// A selector matching every document id in `[name:, name:\u{fff0})`
    /// for each of `names`, the id range one schematic's documents occupy.
    pub fn id_ranges<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ors: Vec<Value> = names
            .into_iter()
            .map(|name| {
                json!({"_id": {
                    "$gt": format!("{}:", name.as_ref()),
                    "$lt": format!("{}:\u{fff0}", name.as_ref()),
                }})
            })
            .collect();
        Self(json!({ "$or": ors }))
    }

    /// The selector as a JSON value.
    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_or_of_id_ranges() {
        let sel = Selector::id_ranges(["models", "top$top"]);
        assert_eq!(
            sel.as_json(),
            &json!({"$or": [
                {"_id": {"$gt": "models:", "$lt": "models:\u{fff0}"}},
                {"_id": {"$gt": "top$top:", "$lt": "top$top:\u{fff0}"}},
            ]})
        );
    }
}
