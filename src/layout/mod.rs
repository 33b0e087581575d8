//! Immutable GUI templates.
//!
//! A layout is built once through [`LayoutBuilder`] or
//! [`FillableLayoutBuilder`] (or parsed from YAML by [`parse`]) and is shared
//! read-only by every instance created from it.

mod builder;
pub mod parse;

pub use builder::{FillableLayoutBuilder, LayoutBuilder};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::icon::{IconLayoutSpec, IconSpec, Sound};
use crate::lang::Language;

/// Slots per container row.
pub const ROW_WIDTH: usize = 9;

/// Largest container height.
pub const MAX_ROWS: usize = 6;

/// Side effects performed when a viewer opens an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenActions {
    #[serde(default)]
    pub messages: BTreeMap<Language, Vec<String>>,
    #[serde(default)]
    pub sound: Option<Sound>,
}

/// Inclusive slot range generated icons are placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillWindow {
    pub start: usize,
    pub end: usize,
}

impl FillWindow {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, slot: usize) -> bool {
        (self.start..=self.end).contains(&slot)
    }
}

/// Fields shared by every layout variant.
#[derive(Debug, Clone)]
pub struct LayoutCore {
    pub(crate) id: String,
    pub(crate) rows: usize,
    pub(crate) icons: Vec<Option<IconSpec>>,
    pub(crate) titles: BTreeMap<Language, String>,
    pub(crate) main_language: Language,
    pub(crate) open_actions: OpenActions,
    pub(crate) click_sound: Option<Sound>,
}

impl LayoutCore {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn size(&self) -> usize {
        self.rows * ROW_WIDTH
    }

    pub fn icons(&self) -> &[Option<IconSpec>] {
        &self.icons
    }

    pub fn icon_at(&self, position: usize) -> Option<&IconSpec> {
        self.icons.get(position).and_then(Option::as_ref)
    }

    pub fn main_language(&self) -> &Language {
        &self.main_language
    }

    /// Raw title for `language`, falling back to the main language.
    pub fn title(&self, language: &Language) -> &str {
        self.titles
            .get(language)
            .or_else(|| self.titles.get(&self.main_language))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Every language the layout carries text for.
    pub fn languages(&self) -> Vec<Language> {
        let mut langs: Vec<Language> = self.titles.keys().cloned().collect();
        for icon in self.icons.iter().flatten() {
            langs.extend(icon.display_name.keys().cloned());
        }
        langs.extend(self.open_actions.messages.keys().cloned());
        langs.sort();
        langs.dedup();
        langs
    }

    pub fn open_actions(&self) -> &OpenActions {
        &self.open_actions
    }

    pub fn click_sound(&self) -> Option<&Sound> {
        self.click_sound.as_ref()
    }
}

/// Layout rendered as exactly one page.
#[derive(Debug, Clone)]
pub struct SinglePageLayout {
    pub(crate) core: LayoutCore,
}

impl SinglePageLayout {
    pub fn core(&self) -> &LayoutCore {
        &self.core
    }
}

/// Paginated layout whose fill window is populated from fillers.
#[derive(Debug, Clone)]
pub struct FillableLayout {
    pub(crate) core: LayoutCore,
    pub(crate) fill_window: FillWindow,
    pub(crate) icon_layouts: Vec<IconLayoutSpec>,
    pub(crate) empty_list_icon: IconSpec,
}

impl FillableLayout {
    pub fn core(&self) -> &LayoutCore {
        &self.core
    }

    pub fn fill_window(&self) -> FillWindow {
        self.fill_window
    }

    pub fn icon_layouts(&self) -> &[IconLayoutSpec] {
        &self.icon_layouts
    }

    /// First registered stencil; used whenever a filler does not pick one.
    pub fn default_icon_layout(&self) -> &IconLayoutSpec {
        // build() guarantees at least one stencil
        &self.icon_layouts[0]
    }

    /// Stencil named `id`, or the default stencil when none matches.
    pub fn resolve_icon_layout(&self, id: Option<&str>) -> &IconLayoutSpec {
        match id {
            None => self.default_icon_layout(),
            Some(id) => match self.icon_layouts.iter().find(|s| s.id == id) {
                Some(stencil) => stencil,
                None => {
                    tracing::warn!(
                        "[layout] [stencil_fallback] layout={} stencil={} not found",
                        self.core.id,
                        id
                    );
                    self.default_icon_layout()
                }
            },
        }
    }

    pub fn empty_list_icon(&self) -> &IconSpec {
        &self.empty_list_icon
    }
}

/// A built layout of either variant.
#[derive(Debug, Clone)]
pub enum GuiLayout {
    SinglePage(Arc<SinglePageLayout>),
    Fillable(Arc<FillableLayout>),
}

impl GuiLayout {
    pub fn core(&self) -> &LayoutCore {
        match self {
            GuiLayout::SinglePage(l) => l.core(),
            GuiLayout::Fillable(l) => l.core(),
        }
    }

    pub fn id(&self) -> &str {
        self.core().id()
    }

    pub fn is_fillable(&self) -> bool {
        matches!(self, GuiLayout::Fillable(_))
    }
}

impl From<SinglePageLayout> for GuiLayout {
    fn from(layout: SinglePageLayout) -> Self {
        GuiLayout::SinglePage(Arc::new(layout))
    }
}

impl From<FillableLayout> for GuiLayout {
    fn from(layout: FillableLayout) -> Self {
        GuiLayout::Fillable(Arc::new(layout))
    }
}
