//! Data sources for fillable instances.

use std::collections::BTreeMap;

use crate::icon::{IconLayoutSpec, IconSpec};
use crate::lang::Language;

/// One data item driving a generated icon.
///
/// Every method but [`GuiFiller::data`] has a default: no owner, no
/// placeholder substitution, the layout's default stencil, and the stencil
/// instantiated unchanged.
pub trait GuiFiller<T>: Send + Sync {
    fn data(&self) -> &T;

    /// Id of the instance this filler was created for, if any.
    fn owner_instance(&self) -> Option<&str> {
        None
    }

    fn format_placeholders(&self, text: &str, _language: &Language) -> String {
        text.to_string()
    }

    fn format_placeholder_lines(&self, lines: &[String], language: &Language) -> Vec<String> {
        lines
            .iter()
            .map(|l| self.format_placeholders(l, language))
            .collect()
    }

    /// Stencil id to render this filler with; unknown ids fall back to the
    /// layout's default stencil.
    fn icon_layout(&self) -> Option<&str> {
        None
    }

    fn customize_icon(&self, stencil: &IconLayoutSpec) -> IconSpec {
        stencil.instantiate()
    }
}

/// Filler that substitutes `{key}` placeholders from a fixed table.
#[derive(Debug, Clone)]
pub struct PlaceholderFiller<T> {
    data: T,
    owner: Option<String>,
    icon_layout: Option<String>,
    placeholders: BTreeMap<String, String>,
}

impl<T> PlaceholderFiller<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            owner: None,
            icon_layout: None,
            placeholders: BTreeMap::new(),
        }
    }

    pub fn owned_by(mut self, instance_id: &str) -> Self {
        self.owner = Some(instance_id.to_string());
        self
    }

    pub fn with_icon_layout(mut self, stencil_id: &str) -> Self {
        self.icon_layout = Some(stencil_id.to_string());
        self
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.placeholders.insert(key.to_string(), value.to_string());
        self
    }
}

impl<T: Send + Sync> GuiFiller<T> for PlaceholderFiller<T> {
    fn data(&self) -> &T {
        &self.data
    }

    fn owner_instance(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn format_placeholders(&self, text: &str, _language: &Language) -> String {
        if !text.contains('{') {
            return text.to_string();
        }
        let mut out = text.to_string();
        for (key, value) in &self.placeholders {
            out = out.replace(&format!("{{{}}}", key), value);
        }
        out
    }

    fn icon_layout(&self) -> Option<&str> {
        self.icon_layout.as_deref()
    }
}
