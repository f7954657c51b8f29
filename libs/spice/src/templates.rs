//! Device template rendering.
//!
//! Reference and declaration templates arrive in model documents as format
//! strings with single-brace placeholders, e.g.
//! `X{name} {ports} {properties}` or `.lib models.lib {corner}`. The
//! placeholder set is fixed by that wire contract; anything else in the
//! template passes through untouched.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{(name|ports|properties|corner)\}").unwrap();
}

/// Renders a device reference template with the instance name, the
/// space-joined port nets, and the formatted property string.
pub fn render_ref(templ: &str, name: &str, ports: &str, properties: &str) -> String {
    PLACEHOLDER
        .replace_all(templ, |caps: &Captures| match &caps[1] {
            "name" => name.to_string(),
            "ports" => ports.to_string(),
            "properties" => properties.to_string(),
            other => format!("{{{}}}", other),
        })
        .into_owned()
}

/// Renders a declaration template with the process corner.
pub fn render_decl(templ: &str, corner: &str) -> String {
    PLACEHOLDER
        .replace_all(templ, |caps: &Captures| match &caps[1] {
            "corner" => corner.to_string(),
            other => format!("{{{}}}", other),
        })
        .into_owned()
}
