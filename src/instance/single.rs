use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use super::{
    dispatch_open, dispatch_unload, perform_open_actions, process_click, process_drag, GuiInstance,
    InstanceCore, Viewer,
};
use crate::context::GuiContext;
use crate::event::{ClickType, GuiEventKind};
use crate::host::{Player, PlayerId};
use crate::lang::Language;
use crate::layout::{GuiLayout, LayoutCore, SinglePageLayout};
use crate::render::{page_title, render_icon, PageContext, RenderedPage, Translators};

type Pages = BTreeMap<Language, RenderedPage>;

/// Instance of a [`SinglePageLayout`]: one rendered page per language.
pub struct SinglePageInstance {
    core: InstanceCore,
    layout: Arc<SinglePageLayout>,
    pages: RwLock<Arc<Pages>>,
    viewers: Mutex<HashMap<PlayerId, Viewer>>,
    refresh_lock: Mutex<()>,
}

impl SinglePageInstance {
    pub(crate) fn new(id: &str, layout: Arc<SinglePageLayout>, ctx: Arc<GuiContext>) -> Self {
        Self {
            core: InstanceCore::new(id, ctx),
            layout,
            pages: RwLock::new(Arc::new(Pages::new())),
            viewers: Mutex::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn single_page_layout(&self) -> &Arc<SinglePageLayout> {
        &self.layout
    }

    /// Published page for `language`, without rendering a missing one.
    pub fn rendered_page(&self, language: &Language) -> Option<RenderedPage> {
        self.published().get(language).cloned()
    }

    fn published(&self) -> Arc<Pages> {
        Arc::clone(&self.pages.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, pages: Pages) -> Arc<Pages> {
        let mut slot = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, Arc::new(pages))
    }

    fn viewers_lock(&self) -> MutexGuard<'_, HashMap<PlayerId, Viewer>> {
        self.viewers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, language: &Language, translators: &Translators) -> RenderedPage {
        let core = self.layout.core();
        let title = page_title(
            core.title(language),
            language,
            PageContext::SINGLE,
            translators.title.as_ref(),
        );
        let mut page = RenderedPage::empty(title, core.size());
        for (slot, icon) in core.icons().iter().enumerate() {
            if let Some(icon) = icon {
                page.slots[slot] = render_icon(
                    icon,
                    language,
                    core.main_language(),
                    PageContext::SINGLE,
                    translators,
                );
            }
        }
        page
    }

    /// Page for `language`, rendering it on first use. `None` once unloaded.
    fn page_for(&self, language: &Language) -> Option<RenderedPage> {
        if let Some(page) = self.published().get(language) {
            return Some(page.clone());
        }
        let _guard = self.refresh_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.published();
        if let Some(page) = current.get(language) {
            return Some(page.clone());
        }
        if !self.core.is_loaded() {
            return None;
        }
        let page = self.render(language, &self.core.translators());
        let mut pages = (*current).clone();
        pages.insert(language.clone(), page.clone());
        self.publish(pages);
        Some(page)
    }

    fn languages(&self) -> Vec<Language> {
        let mut languages = self.layout.core().languages();
        languages.push(self.layout.core().main_language().clone());
        languages.extend(self.viewers_lock().values().map(|v| v.language.clone()));
        languages.sort();
        languages.dedup();
        languages
    }
}

impl GuiInstance for SinglePageInstance {
    fn core(&self) -> &InstanceCore {
        &self.core
    }

    fn layout(&self) -> GuiLayout {
        GuiLayout::SinglePage(Arc::clone(&self.layout))
    }

    fn layout_core(&self) -> &LayoutCore {
        self.layout.core()
    }

    fn refresh(&self) {
        let id = self.core.id();
        let ctx = self.core.context();
        if ctx.dispatch(&id, None, GuiEventKind::Refresh).is_cancelled() {
            tracing::debug!("[gui] [refresh_cancelled] id={}", id);
            return;
        }
        let _guard = self.refresh_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let translators = self.core.translators();
        let pages: Pages = self
            .languages()
            .into_iter()
            .map(|lang| {
                let page = self.render(&lang, &translators);
                (lang, page)
            })
            .collect();
        let old = self.publish(pages);
        self.core.mark_loaded();
        tracing::debug!("[gui] [refresh] id={}", id);

        let current = self.published();
        let viewers: Vec<Viewer> = self.viewers_lock().values().cloned().collect();
        let host = ctx.host();
        for viewer in viewers {
            let Some(page) = current.get(&viewer.language) else {
                continue;
            };
            match old.get(&viewer.language) {
                Some(prev) if prev == page => {}
                Some(prev) if prev.title == page.title => host.update_container(&viewer.player, page),
                _ => host.open_container(&viewer.player, page.slots.len(), &page.title, page),
            }
        }
    }

    fn unload(&self) -> bool {
        if !self.core.mark_unloaded() {
            return false;
        }
        let viewers: Vec<Viewer> = self.viewers_lock().drain().map(|(_, v)| v).collect();
        let host = self.core.context().host();
        for viewer in &viewers {
            host.close_container(&viewer.player);
        }
        self.publish(Pages::new());
        dispatch_unload(&self.core);
        true
    }

    fn open(&self, player: &Player, perform_open: bool) -> bool {
        self.core.touch();
        if !dispatch_open(&self.core, player, 0) {
            self.viewers_lock().remove(&player.id);
            tracing::debug!("[gui] [open_cancelled] id={} player={}", self.core.id(), player.name);
            return false;
        }
        if !self.core.is_loaded() {
            self.load();
        }

        let host = self.core.context().host();
        let language = host.player_language(player);
        let Some(page) = self.page_for(&language) else {
            return false;
        };
        self.viewers_lock().insert(
            player.id,
            Viewer {
                player: player.clone(),
                language: language.clone(),
                page: 0,
            },
        );
        host.open_container(player, page.slots.len(), &page.title, &page);
        if perform_open {
            perform_open_actions(&self.core, self.layout.core(), player, &language);
        }
        tracing::debug!("[gui] [open] id={} player={}", self.core.id(), player.name);
        true
    }

    fn close(&self, player: &Player) {
        if self.viewers_lock().remove(&player.id).is_some() {
            self.core.context().host().close_container(player);
            tracing::debug!("[gui] [close] id={} player={}", self.core.id(), player.name);
        }
    }

    fn handle_close(&self, player: &Player) {
        self.viewers_lock().remove(&player.id);
    }

    fn handle_click(&self, player: &Player, slot: usize, click: ClickType) -> bool {
        self.core.touch();
        let language = match self.viewers_lock().get(&player.id) {
            Some(viewer) => viewer.language.clone(),
            None => self.core.context().host().player_language(player),
        };
        let page = self.page_for(&language);
        let outcome = process_click(
            &self.core,
            self.layout.core(),
            player,
            slot,
            click,
            page.as_ref().and_then(|p| p.icon_at(slot)),
        );
        if outcome.close {
            self.close(player);
        }
        outcome.cancelled
    }

    fn handle_drag(&self, player: &Player, slots: &[usize]) -> bool {
        self.core.touch();
        process_drag(&self.core, player, slots)
    }

    fn title(&self, language: &Language, page: usize) -> Option<String> {
        if page != 0 {
            return None;
        }
        self.page_for(language).map(|p| p.title)
    }

    fn viewers(&self) -> Vec<PlayerId> {
        self.viewers_lock().keys().copied().collect()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
