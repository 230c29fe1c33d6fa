//! Translation of user-facing error and result text.
//!
//! Locale tables are JSON files under `leafnotes-core/locales/`, embedded at
//! compile time. Keys are dotted paths into the JSON object
//! (`"error.invalidPackage"`). Translations are only ever used to build
//! display strings, never for control flow.

use serde_json::Value;

const LOCALES: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("de", include_str!("../../locales/de.json")),
];

/// Resolves a translation key to display text.
pub trait Translator: Send + Sync {
    /// Returns the text for `key`.
    fn t(&self, key: &str) -> String;
}

/// A locale table merged over the English base.
///
/// Partially translated locales fall back to English per key; a key missing
/// from every table translates to itself.
#[derive(Debug, Clone)]
pub struct Catalog {
    strings: Value,
}

impl Catalog {
    /// Loads the catalog for `lang`. Unknown languages get English.
    pub fn new(lang: &str) -> Self {
        let mut strings = parse_locale("en").unwrap_or_else(|| Value::Object(Default::default()));
        if lang != "en" {
            if let Some(target) = parse_locale(lang) {
                merge(&mut strings, target);
            }
        }
        Self { strings }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new("en")
    }
}

impl Translator for Catalog {
    fn t(&self, key: &str) -> String {
        key.split('.')
            .try_fold(&self.strings, |node, part| node.get(part))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }
}

/// Substitutes `{name}` placeholders in a translated template.
pub fn fill(template: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

fn parse_locale(lang: &str) -> Option<Value> {
    let json_str = LOCALES.iter().find(|(l, _)| *l == lang).map(|(_, s)| *s)?;
    serde_json::from_str(json_str).ok()
}

// Deep merge: objects merge key by key, anything else is overwritten.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (k, v) in overlay {
                match base.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        base.insert(k, v);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
