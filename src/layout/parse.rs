//! YAML layout files.
//!
//! One layout per file; the layout id is the file stem. Example:
//!
//! ```yaml
//! settings:
//!   rows: 3
//!   type: fillable
//!   fill_window: [9, 17]
//!   click_sound: { id: ui.button.click }
//! titles:
//!   en: "Warps {current_page}/{max_page}"
//! icons:
//!   next:
//!     type: next_page
//!     position: 26
//!     material: arrow
//!     inactive_material: gray_dye
//! icon_layouts:
//!   - id: warp
//!     material: "{icon}"
//!     name: { en: "{name}" }
//!     on_click: ["warp {name} {player}"]
//! empty_list_icon:
//!   material: barrier
//!   name: { en: "No warps yet" }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use super::{FillableLayoutBuilder, GuiLayout, LayoutBuilder, OpenActions};
use crate::error::LayoutError;
use crate::icon::{
    Appearance, DyeColor, Enchantment, IconKind, IconLayoutSpec, IconSpec, PageDirection, Sound,
    StackCount, MAX_STACK,
};
use crate::lang::Language;

const EMPTY_LIST_ICON_ID: &str = "empty-list";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LayoutKind {
    #[default]
    Single,
    Fillable,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    rows: usize,
    #[serde(default, rename = "type")]
    kind: LayoutKind,
    #[serde(default)]
    fill_window: Option<[usize; 2]>,
    #[serde(default)]
    click_sound: Option<Sound>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawIconKind {
    #[default]
    Custom,
    PreviousPage,
    NextPage,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawIcon {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    kind: RawIconKind,
    #[serde(default)]
    position: Option<usize>,
    material: String,
    #[serde(default)]
    amount: Option<RawAmount>,
    #[serde(default)]
    damage: u16,
    #[serde(default)]
    dye_color: Option<String>,
    #[serde(default)]
    skin: Option<String>,
    #[serde(default)]
    glow: bool,
    #[serde(default)]
    keep_open: bool,
    #[serde(default)]
    permission: Option<String>,
    #[serde(default)]
    on_click: Vec<String>,
    #[serde(default)]
    name: BTreeMap<Language, String>,
    #[serde(default)]
    lore: BTreeMap<Language, Vec<String>>,
    #[serde(default)]
    enchantments: Vec<Enchantment>,
    #[serde(default)]
    inactive_material: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLayout {
    settings: RawSettings,
    #[serde(default)]
    titles: BTreeMap<Language, String>,
    #[serde(default)]
    open_actions: OpenActions,
    #[serde(default)]
    icons: BTreeMap<String, RawIcon>,
    #[serde(default)]
    icon_layouts: Vec<RawIcon>,
    #[serde(default)]
    empty_list_icon: Option<RawIcon>,
}

fn parse_amount(id: &str, amount: Option<RawAmount>) -> Result<StackCount, LayoutError> {
    let literal = match amount {
        None => return Ok(StackCount::Fixed(1)),
        Some(RawAmount::Text(text)) if text.contains('{') => {
            return Ok(StackCount::Template(text));
        }
        Some(RawAmount::Text(text)) => text.trim().parse::<i64>().map_err(|_| {
            LayoutError::InvalidIcon {
                id: id.to_string(),
                reason: format!("amount {:?} is neither a number nor a placeholder", text),
            }
        })?,
        Some(RawAmount::Number(n)) => n,
    };
    if !(1..=MAX_STACK as i64).contains(&literal) {
        return Err(LayoutError::InvalidStackCount {
            id: id.to_string(),
            amount: literal,
        });
    }
    Ok(StackCount::Fixed(literal as u8))
}

fn to_icon(id: &str, raw: RawIcon) -> Result<IconSpec, LayoutError> {
    let amount = parse_amount(id, raw.amount)?;
    let dye_color = match raw.dye_color {
        None => None,
        Some(color) => Some(DyeColor::parse(&color).ok_or_else(|| LayoutError::InvalidIcon {
            id: id.to_string(),
            reason: format!("bad dye color {:?}", color),
        })?),
    };
    let inactive = raw.inactive_material.map(|m| Box::new(Appearance::new(&m)));
    let kind = match raw.kind {
        RawIconKind::Custom => IconKind::Custom,
        RawIconKind::PreviousPage => IconKind::PageSwitcher {
            direction: PageDirection::Previous,
            inactive,
        },
        RawIconKind::NextPage => IconKind::PageSwitcher {
            direction: PageDirection::Next,
            inactive,
        },
    };
    Ok(IconSpec {
        id: id.to_string(),
        kind,
        appearance: Appearance {
            material: raw.material,
            amount,
            damage: raw.damage,
            dye_color,
            skin: raw.skin,
            glow: raw.glow,
        },
        keep_open: raw.keep_open,
        position: raw.position,
        permission: raw.permission,
        on_click: raw.on_click,
        display_name: raw.name,
        lore: raw.lore,
        enchantments: raw.enchantments,
    })
}

/// Parse and validate one layout from YAML source.
pub fn parse_layout(id: &str, source: &str, main_language: &Language) -> Result<GuiLayout, LayoutError> {
    let raw: RawLayout = serde_yaml::from_str(source)?;

    let mut base = LayoutBuilder::new(id, raw.settings.rows, main_language.clone())?;
    for (lang, title) in raw.titles {
        base.set_title(lang, &title);
    }
    base.set_open_actions(raw.open_actions);
    base.set_click_sound(raw.settings.click_sound);
    for (icon_id, raw_icon) in raw.icons {
        base.set_icon(to_icon(&icon_id, raw_icon)?)?;
    }

    match raw.settings.kind {
        LayoutKind::Single => Ok(base.build()?.into()),
        LayoutKind::Fillable => {
            let mut builder: FillableLayoutBuilder = base.fillable();
            if let Some([start, end]) = raw.settings.fill_window {
                builder.set_fill_window(start, end)?;
            }
            for raw_stencil in raw.icon_layouts {
                let stencil_id = raw_stencil.id.clone().unwrap_or_default();
                let stencil = to_icon(&stencil_id, raw_stencil)?;
                builder.set_icon_layout(IconLayoutSpec::from_icon(stencil))?;
            }
            if let Some(raw_empty) = raw.empty_list_icon {
                let empty_id = raw_empty
                    .id
                    .clone()
                    .unwrap_or_else(|| EMPTY_LIST_ICON_ID.to_string());
                builder.set_empty_list_icon(to_icon(&empty_id, raw_empty)?)?;
            }
            Ok(builder.build()?.into())
        }
    }
}

/// Load one layout file; the id is the file stem.
pub fn load_layout(path: &Path, main_language: &Language) -> Result<GuiLayout, LayoutError> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LayoutError::InvalidId(path.display().to_string()))?;
    let source = fs::read_to_string(path)?;
    parse_layout(id, &source, main_language)
}

fn is_layout_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Every `*.yml`/`*.yaml` file in `dir`, sorted by path.
pub fn layout_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read layout directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && is_layout_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every layout file in `dir`, skipping invalid files.
pub fn load_layouts_dir(dir: &Path, main_language: &Language) -> anyhow::Result<Vec<GuiLayout>> {
    let paths = layout_files(dir)?;
    let mut layouts = Vec::with_capacity(paths.len());
    for path in paths {
        match load_layout(&path, main_language) {
            Ok(layout) => layouts.push(layout),
            Err(e) => tracing::warn!("[layout] [skipped] file={} error={}", path.display(), e),
        }
    }
    tracing::info!("[layout] [loaded] dir={} count={}", dir.display(), layouts.len());
    Ok(layouts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> Language {
        Language::new("en")
    }

    const SHOP: &str = r#"
settings:
  rows: 3
  type: fillable
  fill_window: [9, 17]
  click_sound:
    id: ui.button.click
titles:
  en: "Shop {current_page}/{max_page}"
  de: "Laden {current_page}/{max_page}"
open_actions:
  sound:
    id: block.chest.open
    pitch: 1.5
  messages:
    en: ["Welcome to the shop"]
icons:
  previous:
    type: previous_page
    position: 18
    material: arrow
  next:
    type: next_page
    position: 26
    material: arrow
    inactive_material: gray_dye
  close:
    position: 22
    material: barrier
    amount: 1
    name:
      en: "Close"
      de: "Schließen"
icon_layouts:
  - id: offer
    material: "{material}"
    amount: "{stock}"
    name:
      en: "{name}"
    lore:
      en: ["Price: {price}"]
    on_click: ["buy {name} {player}"]
  - id: sold-out
    material: barrier
empty_list_icon:
  material: barrier
  name:
    en: "Nothing for sale"
"#;

    #[test]
    fn parses_fillable_layout() {
        let layout = parse_layout("shop", SHOP, &en()).unwrap();
        let GuiLayout::Fillable(shop) = layout else {
            panic!("expected fillable layout");
        };
        assert_eq!(shop.core().size(), 27);
        assert_eq!(shop.fill_window().start, 9);
        assert_eq!(shop.fill_window().end, 17);
        assert_eq!(shop.icon_layouts().len(), 2);
        assert_eq!(shop.default_icon_layout().id, "offer");
        assert_eq!(
            shop.default_icon_layout().appearance.amount,
            StackCount::Template("{stock}".to_string())
        );
        assert_eq!(shop.empty_list_icon().id, EMPTY_LIST_ICON_ID);
        assert_eq!(shop.core().title(&Language::new("de")), "Laden {current_page}/{max_page}");
        assert_eq!(shop.core().title(&Language::new("fr")), "Shop {current_page}/{max_page}");
        assert!(shop.core().icon_at(26).unwrap().kind.is_page_switcher());
        assert_eq!(shop.core().click_sound().unwrap().id, "ui.button.click");
        assert_eq!(shop.core().open_actions().sound.as_ref().unwrap().pitch, 1.5);
    }

    #[test]
    fn parses_single_page_layout() {
        let src = r##"
settings:
  rows: 1
titles:
  en: Main
icons:
  info:
    position: 4
    material: book
    dye_color: "#00FF00"
    enchantments:
      - id: unbreaking
        level: 3
"##;
        let layout = parse_layout("main", src, &en()).unwrap();
        assert!(!layout.is_fillable());
        let info = layout.core().icon_at(4).unwrap();
        assert_eq!(info.appearance.dye_color, Some(DyeColor { r: 0, g: 255, b: 0 }));
        assert_eq!(info.enchantments[0].level, 3);
    }

    #[test]
    fn missing_main_language_title() {
        let src = "settings:\n  rows: 1\ntitles:\n  de: Haupt\n";
        assert!(matches!(
            parse_layout("main", src, &en()),
            Err(LayoutError::MissingMainLanguageTitle(_))
        ));
    }

    #[test]
    fn rows_out_of_range() {
        let src = "settings:\n  rows: 7\ntitles:\n  en: Big\n";
        assert!(matches!(
            parse_layout("main", src, &en()),
            Err(LayoutError::InvalidRows(7))
        ));
    }

    #[test]
    fn icon_position_out_of_range() {
        let src = r#"
settings:
  rows: 3
titles:
  en: Main
icons:
  far:
    position: 40
    material: stone
"#;
        assert!(matches!(
            parse_layout("main", src, &en()),
            Err(LayoutError::PositionOutOfRange { position: 40, size: 27 })
        ));
    }

    #[test]
    fn bad_amounts() {
        assert!(matches!(
            parse_amount("x1", Some(RawAmount::Number(0))),
            Err(LayoutError::InvalidStackCount { amount: 0, .. })
        ));
        assert!(matches!(
            parse_amount("x1", Some(RawAmount::Text("lots".into()))),
            Err(LayoutError::InvalidIcon { .. })
        ));
        assert_eq!(
            parse_amount("x1", Some(RawAmount::Text("12".into()))).unwrap(),
            StackCount::Fixed(12)
        );
    }

    #[test]
    fn fillable_without_window_is_incomplete() {
        let src = r#"
settings:
  rows: 2
  type: fillable
titles:
  en: List
icon_layouts:
  - id: row
    material: paper
empty_list_icon:
  material: barrier
"#;
        assert!(matches!(
            parse_layout("list", src, &en()),
            Err(LayoutError::IncompleteLayout("fill window"))
        ));
    }

    #[test]
    fn invalid_yaml() {
        assert!(matches!(
            parse_layout("main", "settings: [oops", &en()),
            Err(LayoutError::Yaml(_))
        ));
    }

    #[test]
    fn load_dir_skips_invalid_files() {
        let dir = std::env::temp_dir().join(format!("invgui_layouts_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("shop.yml"), SHOP).unwrap();
        fs::write(dir.join("broken.yaml"), "settings:\n  rows: 9\n").unwrap();
        fs::write(dir.join("notes.txt"), "not a layout").unwrap();

        let layouts = load_layouts_dir(&dir, &en()).unwrap();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].id(), "shop");

        fs::remove_dir_all(dir).ok();
    }
}
