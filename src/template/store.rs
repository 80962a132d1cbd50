use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{MocksmithError, MocksmithResult};
use crate::template::model::{Template, TemplateConfigDoc, deep_merge, resolve_settings};

/// Immutable lookup table of templates keyed by `(product_type, name)`.
///
/// Built once from a configuration document; reloading the config builds a
/// whole new store. Templates are owned value data and safe to share
/// read-only across batch workers.
#[derive(Clone, Debug)]
pub struct TemplateStore {
    templates: BTreeMap<(String, String), Template>,
}

impl TemplateStore {
    /// Load and validate from a parsed configuration value.
    pub fn load_value(doc: serde_json::Value) -> MocksmithResult<Self> {
        let doc: TemplateConfigDoc = serde_json::from_value(doc)
            .map_err(|e| MocksmithError::config(format!("template config malformed: {e}")))?;
        Self::load_doc(&doc)
    }

    /// Load and validate from a JSON file on disk.
    pub fn load_path(path: &Path) -> MocksmithResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read template config '{}'", path.display()))?;
        let doc: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            MocksmithError::config(format!(
                "template config '{}' is not valid JSON: {e}",
                path.display()
            ))
        })?;
        Self::load_value(doc)
    }

    /// Build the store from a typed document.
    ///
    /// Each template's settings are the category defaults deep-merged with the
    /// per-template block; any template failing validation fails the whole
    /// load.
    pub fn load_doc(doc: &TemplateConfigDoc) -> MocksmithResult<Self> {
        let mut templates = BTreeMap::new();
        for (product_type, category) in &doc.template_categories {
            for (name, block) in &category.templates {
                let merged = deep_merge(&category.default_settings, block);
                let settings = resolve_settings(product_type, name, &merged)?;
                templates.insert(
                    (product_type.clone(), name.clone()),
                    Template {
                        product_type: product_type.clone(),
                        name: name.clone(),
                        settings,
                    },
                );
            }
        }
        tracing::info!(templates = templates.len(), "template store loaded");
        Ok(Self { templates })
    }

    /// Lookup a template; unknown keys fail with a `Config` error.
    pub fn get(&self, product_type: &str, name: &str) -> MocksmithResult<&Template> {
        self.templates
            .get(&(product_type.to_string(), name.to_string()))
            .ok_or_else(|| {
                MocksmithError::config(format!(
                    "unknown template '{product_type}/{name}'"
                ))
            })
    }

    /// Template names available for a product type, in sorted order.
    pub fn template_names(&self, product_type: &str) -> Vec<&str> {
        self.templates
            .keys()
            .filter(|(pt, _)| pt == product_type)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Distinct product types, in sorted order.
    pub fn product_types(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .templates
            .keys()
            .map(|(pt, _)| pt.as_str())
            .collect();
        out.dedup();
        out
    }

    /// Total number of loaded templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the store holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/store.rs"]
mod tests;
