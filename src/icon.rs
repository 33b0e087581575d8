//! Icon definitions: what a slot looks like and what clicking it does.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lang::Language;

/// Largest stack count a slot can display.
pub const MAX_STACK: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDirection {
    Previous,
    Next,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IconKind {
    Custom,
    /// Turns the viewer's page. Rendered with `inactive` (or hidden when
    /// `None`) while there is no page in that direction.
    PageSwitcher {
        direction: PageDirection,
        inactive: Option<Box<Appearance>>,
    },
    /// Produced from a stencil for one filler entry.
    Generated,
}

impl IconKind {
    pub fn is_page_switcher(&self) -> bool {
        matches!(self, IconKind::PageSwitcher { .. })
    }
}

/// Literal stack count or a placeholder template resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCount {
    Fixed(u8),
    Template(String),
}

impl Default for StackCount {
    fn default() -> Self {
        StackCount::Fixed(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DyeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl DyeColor {
    /// Parses `#RRGGBB` or `r,g,b`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 {
                return None;
            }
            let rgb = u32::from_str_radix(hex, 16).ok()?;
            return Some(Self {
                r: (rgb >> 16) as u8,
                g: (rgb >> 8) as u8,
                b: rgb as u8,
            });
        }
        let mut parts = s.splitn(3, ',');
        let r = parts.next()?.trim().parse().ok()?;
        let g = parts.next()?.trim().parse().ok()?;
        let b = parts.next()?.trim().parse().ok()?;
        Some(Self { r, g, b })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enchantment {
    pub id: String,
    #[serde(default = "default_enchant_level")]
    pub level: u16,
}

fn default_enchant_level() -> u16 {
    1
}

/// A sound played through the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    pub id: String,
    #[serde(default = "default_sound_volume")]
    pub volume: f32,
    #[serde(default = "default_sound_pitch")]
    pub pitch: f32,
}

fn default_sound_volume() -> f32 {
    1.0
}

fn default_sound_pitch() -> f32 {
    1.0
}

impl Sound {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            volume: default_sound_volume(),
            pitch: default_sound_pitch(),
        }
    }
}

/// Visual part of an icon.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Appearance {
    pub material: String,
    pub amount: StackCount,
    pub damage: u16,
    pub dye_color: Option<DyeColor>,
    /// Skin reference for head items; may contain placeholders.
    pub skin: Option<String>,
    pub glow: bool,
}

impl Appearance {
    pub fn new(material: &str) -> Self {
        Self {
            material: material.to_string(),
            ..Self::default()
        }
    }
}

/// One renderable slot: visual and behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct IconSpec {
    pub id: String,
    pub kind: IconKind,
    pub appearance: Appearance,
    pub keep_open: bool,
    /// Fixed slot; `None` for generated icons until placed.
    pub position: Option<usize>,
    pub permission: Option<String>,
    pub on_click: Vec<String>,
    pub display_name: BTreeMap<Language, String>,
    pub lore: BTreeMap<Language, Vec<String>>,
    pub enchantments: Vec<Enchantment>,
}

impl IconSpec {
    pub fn new(id: &str, material: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: IconKind::Custom,
            appearance: Appearance::new(material),
            keep_open: false,
            position: None,
            permission: None,
            on_click: Vec::new(),
            display_name: BTreeMap::new(),
            lore: BTreeMap::new(),
            enchantments: Vec::new(),
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_kind(mut self, kind: IconKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_name(mut self, language: Language, name: &str) -> Self {
        self.display_name.insert(language, name.to_string());
        self
    }

    pub fn with_lore(mut self, language: Language, lines: &[&str]) -> Self {
        self.lore
            .insert(language, lines.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.on_click.push(command.to_string());
        self
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permission = Some(permission.to_string());
        self
    }

    pub fn keep_open(mut self, keep_open: bool) -> Self {
        self.keep_open = keep_open;
        self
    }

    /// Display name for `language`, falling back to `main`.
    pub fn name_for(&self, language: &Language, main: &Language) -> Option<&str> {
        self.display_name
            .get(language)
            .or_else(|| self.display_name.get(main))
            .map(String::as_str)
    }

    /// Lore for `language`, falling back to `main`.
    pub fn lore_for(&self, language: &Language, main: &Language) -> &[String] {
        self.lore
            .get(language)
            .or_else(|| self.lore.get(main))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Reusable stencil instantiated once per filler entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IconLayoutSpec {
    pub id: String,
    pub appearance: Appearance,
    pub keep_open: bool,
    pub permission: Option<String>,
    pub on_click: Vec<String>,
    pub display_name: BTreeMap<Language, String>,
    pub lore: BTreeMap<Language, Vec<String>>,
    pub enchantments: Vec<Enchantment>,
}

impl IconLayoutSpec {
    pub fn new(id: &str, material: &str) -> Self {
        Self::from_icon(IconSpec::new(id, material))
    }

    /// Strip the position off an icon definition.
    pub fn from_icon(icon: IconSpec) -> Self {
        Self {
            id: icon.id,
            appearance: icon.appearance,
            keep_open: icon.keep_open,
            permission: icon.permission,
            on_click: icon.on_click,
            display_name: icon.display_name,
            lore: icon.lore,
            enchantments: icon.enchantments,
        }
    }

    /// Concrete, unpositioned icon of kind [`IconKind::Generated`].
    pub fn instantiate(&self) -> IconSpec {
        IconSpec {
            id: self.id.clone(),
            kind: IconKind::Generated,
            appearance: self.appearance.clone(),
            keep_open: self.keep_open,
            position: None,
            permission: self.permission.clone(),
            on_click: self.on_click.clone(),
            display_name: self.display_name.clone(),
            lore: self.lore.clone(),
            enchantments: self.enchantments.clone(),
        }
    }
}
