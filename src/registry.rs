//! Runtime references named in view JSON, resolved to functions once at load
//! time.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ViewError};
use crate::filter::expr::{FilterSchemasAndGroups, FilterTransform, TransformOutcome};
use crate::view::View;

/// String-keyed transform hooks.
#[derive(Clone, Debug, Default)]
pub struct Capabilities {
    transforms: HashMap<String, FilterTransform>,
}

impl Capabilities {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the string transforms `lowercase`,
    /// `uppercase`, `trim` and `wildcard` (wraps the value in `%`).
    pub fn with_builtins() -> Self {
        let mut caps = Self::new();
        caps.register_transform("lowercase", map_string(|s| s.to_lowercase()))
            .register_transform("uppercase", map_string(|s| s.to_uppercase()))
            .register_transform("trim", map_string(|s| s.trim().to_owned()))
            .register_transform("wildcard", map_string(|s| format!("%{s}%")));
        caps
    }

    /// Registers (or replaces) a transform under `key`.
    pub fn register_transform(
        &mut self,
        key: impl Into<String>,
        transform: FilterTransform,
    ) -> &mut Self {
        let key = key.into();
        debug!(key = %key, "registry.transform.registered");
        self.transforms.insert(key, transform);
        self
    }

    /// Transform registered under `key`.
    pub fn transform(&self, key: &str) -> Option<&FilterTransform> {
        self.transforms.get(key)
    }

    /// Attaches the transform named by every leaf's `transform_ref`.
    pub fn resolve(&self, schemas: &mut FilterSchemasAndGroups) -> Result<()> {
        for schema in &mut schemas.filters {
            schema.expression.try_for_each_leaf_mut(&mut |leaf| {
                let Some(key) = &leaf.transform_ref else {
                    return Ok(());
                };
                let transform = self.transform(key).ok_or_else(|| ViewError::UnknownCapability {
                    kind: "transform",
                    key: key.clone(),
                })?;
                leaf.transform = Some(transform.clone());
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Resolves the references of `view`'s filter schema.
    pub fn resolve_view(&self, view: &mut View) -> Result<()> {
        self.resolve(&mut view.filter_schema)
    }
}

/// Transform rewriting non-empty string values and passing everything else
/// through, so an empty input stays inactive.
fn map_string<F>(f: F) -> FilterTransform
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    FilterTransform::new(move |raw| TransformOutcome::Override {
        field: None,
        value: raw
            .as_str()
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(f(s))),
    })
}
