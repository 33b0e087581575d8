use std::collections::BTreeMap;

use super::{
    FillWindow, FillableLayout, LayoutCore, OpenActions, SinglePageLayout, MAX_ROWS, ROW_WIDTH,
};
use crate::error::LayoutError;
use crate::icon::{IconKind, IconLayoutSpec, IconSpec, Sound, StackCount, MAX_STACK};
use crate::ids::{is_valid_icon_id, is_valid_id};
use crate::lang::Language;

fn check_icon(icon: &IconSpec) -> Result<(), LayoutError> {
    if !is_valid_icon_id(&icon.id) {
        return Err(LayoutError::InvalidIconId(icon.id.clone()));
    }
    if let StackCount::Fixed(amount) = icon.appearance.amount {
        if amount == 0 || amount > MAX_STACK {
            return Err(LayoutError::InvalidStackCount {
                id: icon.id.clone(),
                amount: amount as i64,
            });
        }
    }
    Ok(())
}

/// Validating builder for the parts every layout shares.
///
/// Each mutator checks its input before touching state, so a failed call
/// leaves the builder unchanged.
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    id: String,
    rows: usize,
    icons: Vec<Option<IconSpec>>,
    titles: BTreeMap<Language, String>,
    main_language: Language,
    open_actions: OpenActions,
    click_sound: Option<Sound>,
}

impl LayoutBuilder {
    pub fn new(id: &str, rows: usize, main_language: Language) -> Result<Self, LayoutError> {
        if !is_valid_id(id) {
            return Err(LayoutError::InvalidId(id.to_string()));
        }
        if !(1..=MAX_ROWS).contains(&rows) {
            return Err(LayoutError::InvalidRows(rows));
        }
        Ok(Self {
            id: id.to_string(),
            rows,
            icons: vec![None; rows * ROW_WIDTH],
            titles: BTreeMap::new(),
            main_language,
            open_actions: OpenActions::default(),
            click_sound: None,
        })
    }

    pub fn size(&self) -> usize {
        self.icons.len()
    }

    pub fn icons(&self) -> &[Option<IconSpec>] {
        &self.icons
    }

    /// Place `icon` at its position, replacing whatever is there.
    ///
    /// Re-setting an icon id at the position it already occupies is allowed;
    /// the same id at a different position is not.
    pub fn set_icon(&mut self, icon: IconSpec) -> Result<&mut Self, LayoutError> {
        check_icon(&icon)?;
        let position = icon.position.ok_or_else(|| LayoutError::MissingPosition {
            id: icon.id.clone(),
        })?;
        let size = self.size();
        if position >= size {
            return Err(LayoutError::PositionOutOfRange { position, size });
        }
        let existing = self
            .icons
            .iter()
            .enumerate()
            .find(|(pos, slot)| *pos != position && matches!(slot, Some(i) if i.id == icon.id));
        if let Some((existing, _)) = existing {
            return Err(LayoutError::DuplicateIconId {
                id: icon.id,
                existing,
            });
        }
        self.icons[position] = Some(icon);
        Ok(self)
    }

    pub fn remove_icon(&mut self, position: usize) -> Result<Option<IconSpec>, LayoutError> {
        let size = self.size();
        if position >= size {
            return Err(LayoutError::PositionOutOfRange { position, size });
        }
        Ok(self.icons[position].take())
    }

    pub fn set_title(&mut self, language: Language, title: &str) -> &mut Self {
        self.titles.insert(language, title.to_string());
        self
    }

    pub fn set_open_actions(&mut self, actions: OpenActions) -> &mut Self {
        self.open_actions = actions;
        self
    }

    pub fn set_click_sound(&mut self, sound: Option<Sound>) -> &mut Self {
        self.click_sound = sound;
        self
    }

    fn into_core(self) -> Result<LayoutCore, LayoutError> {
        if !self.titles.contains_key(&self.main_language) {
            return Err(LayoutError::MissingMainLanguageTitle(
                self.main_language.to_string(),
            ));
        }
        Ok(LayoutCore {
            id: self.id,
            rows: self.rows,
            icons: self.icons,
            titles: self.titles,
            main_language: self.main_language,
            open_actions: self.open_actions,
            click_sound: self.click_sound,
        })
    }

    pub fn build(self) -> Result<SinglePageLayout, LayoutError> {
        Ok(SinglePageLayout {
            core: self.into_core()?,
        })
    }

    /// Continue as a fillable layout.
    pub fn fillable(self) -> FillableLayoutBuilder {
        FillableLayoutBuilder {
            base: self,
            fill_window: None,
            icon_layouts: Vec::new(),
            empty_list_icon: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FillableLayoutBuilder {
    base: LayoutBuilder,
    fill_window: Option<FillWindow>,
    icon_layouts: Vec<IconLayoutSpec>,
    empty_list_icon: Option<IconSpec>,
}

impl FillableLayoutBuilder {
    pub fn new(id: &str, rows: usize, main_language: Language) -> Result<Self, LayoutError> {
        Ok(LayoutBuilder::new(id, rows, main_language)?.fillable())
    }

    pub fn base(&mut self) -> &mut LayoutBuilder {
        &mut self.base
    }

    pub fn set_icon(&mut self, icon: IconSpec) -> Result<&mut Self, LayoutError> {
        self.base.set_icon(icon)?;
        Ok(self)
    }

    pub fn remove_icon(&mut self, position: usize) -> Result<Option<IconSpec>, LayoutError> {
        self.base.remove_icon(position)
    }

    pub fn set_title(&mut self, language: Language, title: &str) -> &mut Self {
        self.base.set_title(language, title);
        self
    }

    pub fn set_fill_window(&mut self, start: usize, end: usize) -> Result<&mut Self, LayoutError> {
        let size = self.base.size();
        if start > end || end >= size {
            return Err(LayoutError::InvalidRange { start, end, size });
        }
        self.fill_window = Some(FillWindow { start, end });
        Ok(self)
    }

    /// Register a stencil; a stencil with the same id is replaced in place.
    pub fn set_icon_layout(&mut self, stencil: IconLayoutSpec) -> Result<&mut Self, LayoutError> {
        if !is_valid_icon_id(&stencil.id) {
            return Err(LayoutError::InvalidIconId(stencil.id));
        }
        match self.icon_layouts.iter_mut().find(|s| s.id == stencil.id) {
            Some(existing) => *existing = stencil,
            None => self.icon_layouts.push(stencil),
        }
        Ok(self)
    }

    pub fn set_empty_list_icon(&mut self, icon: IconSpec) -> Result<&mut Self, LayoutError> {
        check_icon(&icon)?;
        self.empty_list_icon = Some(icon);
        Ok(self)
    }

    pub fn build(self) -> Result<FillableLayout, LayoutError> {
        let fill_window = self
            .fill_window
            .ok_or(LayoutError::IncompleteLayout("fill window"))?;
        if self.icon_layouts.is_empty() {
            return Err(LayoutError::IncompleteLayout("icon layout"));
        }
        let empty_list_icon = self
            .empty_list_icon
            .ok_or(LayoutError::IncompleteLayout("empty list icon"))?;

        for (position, icon) in self.base.icons.iter().enumerate() {
            if let Some(icon) = icon {
                if icon.kind.is_page_switcher() && fill_window.contains(position) {
                    return Err(LayoutError::PageSwitcherConflict {
                        id: icon.id.clone(),
                        position,
                    });
                }
            }
        }

        Ok(FillableLayout {
            core: self.base.into_core()?,
            fill_window,
            icon_layouts: self.icon_layouts,
            empty_list_icon: IconSpec {
                kind: IconKind::Generated,
                position: None,
                ..empty_list_icon
            },
        })
    }
}
