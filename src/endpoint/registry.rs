use std::collections::BTreeMap;

use serde_json::Value;

/// Relation names of a root link document mapped to where they live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, String>,
    templates: BTreeMap<String, String>,
}

fn href(link: &Value) -> Option<&str> {
    link.get("href").and_then(Value::as_str)
}

impl EndpointRegistry {
    /// Parses `_links` and `_embedded` of a root document.
    ///
    /// `self` is skipped, an array relation takes its first entry, and
    /// `templated` links become URI templates instead of base urls.
    pub fn from_root(root: &Value) -> Self {
        let mut registry = Self::default();

        if let Some(links) = root.get("_links").and_then(Value::as_object) {
            for (name, link) in links.iter().filter(|(name, _)| name.as_str() != "self") {
                let link = match link {
                    Value::Array(entries) => match entries.first() {
                        Some(first) => first,
                        None => continue,
                    },
                    other => other,
                };
                let Some(target) = href(link) else {
                    continue;
                };
                let templated = link.get("templated").and_then(Value::as_bool).unwrap_or(false);
                let table = if templated {
                    &mut registry.templates
                } else {
                    &mut registry.endpoints
                };
                table.insert(name.clone(), target.to_string());
            }
        }

        if let Some(embedded) = root.get("_embedded").and_then(Value::as_object) {
            for (name, item) in embedded {
                let item = item.as_array().and_then(|a| a.first()).unwrap_or(item);
                if let Some(target) = item.pointer("/_links/self").and_then(href) {
                    registry.endpoints.insert(name.clone(), target.to_string());
                }
            }
        }
        registry
    }

    pub fn base_url(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.endpoints.get(name).map(String::as_str)
    }

    pub fn template(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Fills the `{resource}` / `{+resource}` slot of a templated relation.
    pub fn expand(
        &self,
        name: &str,
        resource: &str,
    ) -> Option<String> {
        self.template(name).map(|t| {
            t.replace("{+resource}", resource)
                .replace("{resource}", resource)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty() && self.templates.is_empty()
    }
}
