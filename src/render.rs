//! Rendering icons into host-neutral slot contents.

use std::sync::Arc;

use crate::icon::{
    Appearance, DyeColor, Enchantment, IconKind, IconSpec, PageDirection, StackCount, MAX_STACK,
};
use crate::lang::Language;

pub const CURRENT_PAGE_PLACEHOLDER: &str = "{current_page}";
pub const MAX_PAGE_PLACEHOLDER: &str = "{max_page}";

/// `(raw title, language, page index) -> title`
pub type TitleTranslator = Arc<dyn Fn(&str, &Language, usize) -> String + Send + Sync>;
/// `(text, language) -> text`
pub type StringTranslator = Arc<dyn Fn(&str, &Language) -> String + Send + Sync>;
/// `(lines, language) -> lines`
pub type ListTranslator = Arc<dyn Fn(&[String], &Language) -> Vec<String> + Send + Sync>;

/// Placeholder translators installed on an instance.
#[derive(Clone, Default)]
pub struct Translators {
    pub title: Option<TitleTranslator>,
    pub string: Option<StringTranslator>,
    pub list: Option<ListTranslator>,
}

/// Placeholder pass applied to an icon's text while rendering.
pub trait TextFormat {
    fn text(&self, text: &str, language: &Language) -> String;

    fn lines(&self, lines: &[String], language: &Language) -> Vec<String> {
        lines.iter().map(|l| self.text(l, language)).collect()
    }
}

/// Instance translators; text passes through unchanged when unset.
impl TextFormat for Translators {
    fn text(&self, text: &str, language: &Language) -> String {
        match &self.string {
            Some(translate) => translate(text, language),
            None => text.to_string(),
        }
    }

    fn lines(&self, lines: &[String], language: &Language) -> Vec<String> {
        match &self.list {
            Some(translate) => translate(lines, language),
            None => lines.to_vec(),
        }
    }
}

/// Position of a page within its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContext {
    pub index: usize,
    pub count: usize,
}

impl PageContext {
    pub const SINGLE: PageContext = PageContext { index: 0, count: 1 };

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.count
    }
}

/// Slot contents handed to the host, plus the behavior needed to handle a click.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedIcon {
    pub id: String,
    pub material: String,
    pub amount: u8,
    pub damage: u16,
    pub dye_color: Option<DyeColor>,
    pub skin: Option<String>,
    pub glow: bool,
    pub display_name: Option<String>,
    pub lore: Vec<String>,
    pub enchantments: Vec<Enchantment>,
    pub commands: Vec<String>,
    pub permission: Option<String>,
    pub keep_open: bool,
    /// Rendered from a page switcher, active or not.
    pub page_switcher: bool,
    /// Set only on page switchers whose target page exists.
    pub page_switch: Option<PageDirection>,
}

/// One fully rendered page for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub title: String,
    pub slots: Vec<Option<RenderedIcon>>,
}

impl RenderedPage {
    pub fn empty(title: String, size: usize) -> Self {
        Self {
            title,
            slots: vec![None; size],
        }
    }

    pub fn icon_at(&self, slot: usize) -> Option<&RenderedIcon> {
        self.slots.get(slot).and_then(Option::as_ref)
    }
}

/// Resolve a stack count; templates that do not yield a number render as 1.
pub fn resolve_amount(amount: &StackCount, format: impl Fn(&str) -> String) -> u8 {
    match amount {
        StackCount::Fixed(n) => (*n).clamp(1, MAX_STACK),
        StackCount::Template(template) => {
            let formatted = format(template);
            match formatted.trim().parse::<i64>() {
                Ok(n) => n.clamp(1, MAX_STACK as i64) as u8,
                Err(_) => {
                    tracing::warn!(
                        "[render] [amount_fallback] template={} value={:?}",
                        template,
                        formatted
                    );
                    1
                }
            }
        }
    }
}

/// Render `icon` for `language`. Returns `None` for a hidden slot (an
/// inactive page switcher without an inactive appearance).
pub fn render_icon(
    icon: &IconSpec,
    language: &Language,
    main_language: &Language,
    page: PageContext,
    format: &dyn TextFormat,
) -> Option<RenderedIcon> {
    let (appearance, page_switch): (&Appearance, Option<PageDirection>) = match &icon.kind {
        IconKind::PageSwitcher { direction, inactive } => {
            let active = match direction {
                PageDirection::Previous => page.has_previous(),
                PageDirection::Next => page.has_next(),
            };
            if active {
                (&icon.appearance, Some(*direction))
            } else {
                (inactive.as_deref()?, None)
            }
        }
        IconKind::Custom | IconKind::Generated => (&icon.appearance, None),
    };

    let text = |s: &str| format.text(s, language);
    Some(RenderedIcon {
        id: icon.id.clone(),
        material: text(appearance.material.as_str()),
        amount: resolve_amount(&appearance.amount, text),
        damage: appearance.damage,
        dye_color: appearance.dye_color,
        skin: appearance.skin.as_deref().map(text),
        glow: appearance.glow,
        display_name: icon.name_for(language, main_language).map(text),
        lore: format.lines(icon.lore_for(language, main_language), language),
        enchantments: icon.enchantments.clone(),
        commands: icon.on_click.iter().map(|c| text(c.as_str())).collect(),
        permission: icon.permission.clone(),
        keep_open: icon.keep_open,
        page_switcher: icon.kind.is_page_switcher(),
        page_switch,
    })
}

/// Title for one page: translator (if any) then page-number substitution.
pub fn page_title(
    raw: &str,
    language: &Language,
    page: PageContext,
    translator: Option<&TitleTranslator>,
) -> String {
    let title = match translator {
        Some(translate) => translate(raw, language, page.index),
        None => raw.to_string(),
    };
    title
        .replace(CURRENT_PAGE_PLACEHOLDER, &(page.index + 1).to_string())
        .replace(MAX_PAGE_PLACEHOLDER, &page.count.to_string())
}
