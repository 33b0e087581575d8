use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};

use rayon::prelude::*;

use super::{
    dispatch_open, dispatch_unload, perform_open_actions, process_click, process_drag, GuiInstance,
    InstanceCore, Viewer,
};
use crate::context::GuiContext;
use crate::event::{ClickType, GuiEventKind};
use crate::filler::GuiFiller;
use crate::host::{Player, PlayerId};
use crate::icon::{IconKind, IconSpec, PageDirection};
use crate::lang::Language;
use crate::layout::{FillableLayout, GuiLayout, LayoutCore};
use crate::render::{page_title, render_icon, PageContext, RenderedPage, TextFormat, Translators};

/// A generated icon and the filler it came from (`None` for empty-list icons).
struct GeneratedIcon<T> {
    icon: IconSpec,
    filler: Option<Arc<dyn GuiFiller<T>>>,
}

type GeneratedPages<T> = Vec<Vec<GeneratedIcon<T>>>;

/// One published page set. Every language holds as many pages as `generated`.
struct FillablePages<T> {
    generated: Arc<GeneratedPages<T>>,
    rendered: BTreeMap<Language, Vec<RenderedPage>>,
}

impl<T> FillablePages<T> {
    fn empty() -> Self {
        Self {
            generated: Arc::new(Vec::new()),
            rendered: BTreeMap::new(),
        }
    }
}

/// Text pass for a generated icon: instance translators win over the filler.
struct FillerFormat<'a, T> {
    translators: &'a Translators,
    filler: Option<&'a dyn GuiFiller<T>>,
}

impl<T> TextFormat for FillerFormat<'_, T> {
    fn text(&self, text: &str, language: &Language) -> String {
        match (&self.translators.string, self.filler) {
            (Some(translate), _) => translate(text, language),
            (None, Some(filler)) => filler.format_placeholders(text, language),
            (None, None) => text.to_string(),
        }
    }

    fn lines(&self, lines: &[String], language: &Language) -> Vec<String> {
        match (&self.translators.list, self.filler) {
            (Some(translate), _) => translate(lines, language),
            (None, Some(filler)) => filler.format_placeholder_lines(lines, language),
            (None, None) => lines.to_vec(),
        }
    }
}

/// Split the fillers into window-sized pages of positioned icons.
fn generate<T>(layout: &FillableLayout, fillers: &[Arc<dyn GuiFiller<T>>]) -> GeneratedPages<T> {
    let window = layout.fill_window();
    if fillers.is_empty() {
        let page = (0..window.len())
            .map(|i| GeneratedIcon {
                icon: IconSpec {
                    position: Some(window.start + i),
                    ..layout.empty_list_icon().clone()
                },
                filler: None,
            })
            .collect();
        return vec![page];
    }
    fillers
        .chunks(window.len())
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .map(|(i, filler)| {
                    let stencil = layout.resolve_icon_layout(filler.icon_layout());
                    let mut icon = filler.customize_icon(stencil);
                    icon.kind = IconKind::Generated;
                    icon.position = Some(window.start + i);
                    GeneratedIcon {
                        icon,
                        filler: Some(Arc::clone(filler)),
                    }
                })
                .collect()
        })
        .collect()
}

/// Render every generated page for one language, fixed icons on top.
fn render_pages<T>(
    layout: &FillableLayout,
    language: &Language,
    generated: &GeneratedPages<T>,
    translators: &Translators,
) -> Vec<RenderedPage> {
    let core = layout.core();
    let main = core.main_language();
    let count = generated.len();
    generated
        .iter()
        .enumerate()
        .map(|(index, icons)| {
            let ctx = PageContext { index, count };
            let title = page_title(core.title(language), language, ctx, translators.title.as_ref());
            let mut page = RenderedPage::empty(title, core.size());
            for generated in icons {
                let Some(slot) = generated.icon.position else {
                    continue;
                };
                let format = FillerFormat {
                    translators,
                    filler: generated.filler.as_deref(),
                };
                page.slots[slot] = render_icon(&generated.icon, language, main, ctx, &format);
            }
            for (slot, icon) in core.icons().iter().enumerate() {
                if let Some(icon) = icon {
                    page.slots[slot] = render_icon(icon, language, main, ctx, translators);
                }
            }
            page
        })
        .collect()
}

/// Instance of a [`FillableLayout`], paginated over a list of fillers.
pub struct FillableInstance<T> {
    core: InstanceCore,
    layout: Arc<FillableLayout>,
    fillers: RwLock<Vec<Arc<dyn GuiFiller<T>>>>,
    stale: AtomicBool,
    pages: RwLock<Arc<FillablePages<T>>>,
    viewers: Mutex<HashMap<PlayerId, Viewer>>,
    refresh_lock: Mutex<()>,
}

impl<T: Send + Sync + 'static> FillableInstance<T> {
    pub(crate) fn new(id: &str, layout: Arc<FillableLayout>, ctx: Arc<GuiContext>) -> Self {
        Self {
            core: InstanceCore::new(id, ctx),
            layout,
            fillers: RwLock::new(Vec::new()),
            stale: AtomicBool::new(true),
            pages: RwLock::new(Arc::new(FillablePages::empty())),
            viewers: Mutex::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn fillable_layout(&self) -> &Arc<FillableLayout> {
        &self.layout
    }

    // ============================================
    // Fillers
    // ============================================

    pub fn add_filler<F: GuiFiller<T> + 'static>(&self, filler: F) {
        self.fillers_mut().push(Arc::new(filler));
    }

    pub fn add_fillers<I>(&self, fillers: I)
    where
        I: IntoIterator<Item = Arc<dyn GuiFiller<T>>>,
    {
        self.fillers_mut().extend(fillers);
    }

    pub fn remove_filler_at(&self, index: usize) -> Option<Arc<dyn GuiFiller<T>>> {
        let mut fillers = self.fillers_mut();
        (index < fillers.len()).then(|| fillers.remove(index))
    }

    pub fn clear_fillers(&self) {
        self.fillers_mut().clear();
    }

    pub fn set_fillers(&self, fillers: Vec<Arc<dyn GuiFiller<T>>>) {
        *self.fillers_mut() = fillers;
    }

    /// Snapshot of the filler list.
    pub fn fillers(&self) -> Vec<Arc<dyn GuiFiller<T>>> {
        self.fillers.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn filler_count(&self) -> usize {
        self.fillers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Fillers changed since the last refresh.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    fn fillers_mut(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn GuiFiller<T>>>> {
        let guard = self.fillers.write().unwrap_or_else(PoisonError::into_inner);
        self.stale.store(true, Ordering::Release);
        guard
    }

    // ============================================
    // Pages
    // ============================================

    /// Number of published pages; 0 until loaded.
    pub fn page_count(&self) -> usize {
        self.published().generated.len()
    }

    /// Generated icons of page `index`, positioned inside the fill window.
    pub fn generated_page(&self, index: usize) -> Option<Vec<IconSpec>> {
        self.published()
            .generated
            .get(index)
            .map(|icons| icons.iter().map(|g| g.icon.clone()).collect())
    }

    /// Filler whose icon sits at `slot` of page `index`.
    pub fn filler_at(&self, index: usize, slot: usize) -> Option<Arc<dyn GuiFiller<T>>> {
        self.published()
            .generated
            .get(index)?
            .iter()
            .find(|g| g.icon.position == Some(slot))
            .and_then(|g| g.filler.clone())
    }

    /// Published page, without rendering a missing language.
    pub fn rendered_page(&self, language: &Language, index: usize) -> Option<RenderedPage> {
        self.published().rendered.get(language)?.get(index).cloned()
    }

    pub fn viewer_page(&self, player: PlayerId) -> Option<usize> {
        self.viewers_lock().get(&player).map(|v| v.page)
    }

    fn published(&self) -> Arc<FillablePages<T>> {
        Arc::clone(&self.pages.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, pages: FillablePages<T>) -> Arc<FillablePages<T>> {
        let mut slot = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, Arc::new(pages))
    }

    fn viewers_lock(&self) -> MutexGuard<'_, HashMap<PlayerId, Viewer>> {
        self.viewers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Page `index` for `language`, rendering the language on first use.
    fn page_for(&self, language: &Language, index: usize) -> Option<RenderedPage> {
        if let Some(pages) = self.published().rendered.get(language) {
            return pages.get(index).cloned();
        }
        let _guard = self.refresh_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.published();
        if let Some(pages) = current.rendered.get(language) {
            return pages.get(index).cloned();
        }
        if current.generated.is_empty() {
            return None;
        }
        let pages = render_pages(&self.layout, language, &current.generated, &self.core.translators());
        let page = pages.get(index).cloned();
        let mut rendered = current.rendered.clone();
        rendered.insert(language.clone(), pages);
        self.publish(FillablePages {
            generated: Arc::clone(&current.generated),
            rendered,
        });
        page
    }

    fn languages(&self) -> Vec<Language> {
        let core = self.layout.core();
        let mut languages = core.languages();
        languages.push(core.main_language().clone());
        languages.extend(self.viewers_lock().values().map(|v| v.language.clone()));
        languages.sort();
        languages.dedup();
        languages
    }

    fn viewer_language(&self, player: &Player) -> Language {
        match self.viewers_lock().get(&player.id) {
            Some(viewer) => viewer.language.clone(),
            None => self.core.context().host().player_language(player),
        }
    }

    // ============================================
    // Navigation
    // ============================================

    /// Open at `page`, clamped to the last page.
    pub fn open_page(&self, player: &Player, page: usize, perform_open: bool) -> bool {
        self.core.touch();
        if !self.core.is_loaded() {
            self.load();
        }
        let page = page.min(self.page_count().saturating_sub(1));
        if !dispatch_open(&self.core, player, page) {
            self.viewers_lock().remove(&player.id);
            tracing::debug!("[gui] [open_cancelled] id={} player={}", self.core.id(), player.name);
            return false;
        }

        let host = self.core.context().host();
        let language = host.player_language(player);
        let Some(rendered) = self.page_for(&language, page) else {
            self.viewers_lock().remove(&player.id);
            tracing::warn!("[gui] [open_failed] id={} not loaded", self.core.id());
            return false;
        };
        self.viewers_lock().insert(
            player.id,
            Viewer {
                player: player.clone(),
                language: language.clone(),
                page,
            },
        );
        host.open_container(player, rendered.slots.len(), &rendered.title, &rendered);
        if perform_open {
            perform_open_actions(&self.core, self.layout.core(), player, &language);
        }
        tracing::debug!(
            "[gui] [open] id={} player={} page={}",
            self.core.id(),
            player.name,
            page
        );
        true
    }

    pub fn next_page(&self, player: &Player) -> bool {
        self.core.touch();
        match self.viewer_page(player.id) {
            Some(page) => self.turn_page(player, page + 1),
            None => false,
        }
    }

    pub fn previous_page(&self, player: &Player) -> bool {
        self.core.touch();
        match self.viewer_page(player.id).and_then(|p| p.checked_sub(1)) {
            Some(page) => self.turn_page(player, page),
            None => false,
        }
    }

    /// Move an open viewer to `target`. A vetoed turn keeps the current page.
    fn turn_page(&self, player: &Player, target: usize) -> bool {
        let Some(viewer) = self.viewers_lock().get(&player.id).cloned() else {
            return false;
        };
        if target == viewer.page || target >= self.page_count() {
            return false;
        }
        if !dispatch_open(&self.core, player, target) {
            return false;
        }
        let Some(rendered) = self.page_for(&viewer.language, target) else {
            return false;
        };
        if let Some(v) = self.viewers_lock().get_mut(&player.id) {
            v.page = target;
        }
        self.core
            .context()
            .host()
            .open_container(player, rendered.slots.len(), &rendered.title, &rendered);
        tracing::debug!(
            "[gui] [page_turn] id={} player={} {} -> {}",
            self.core.id(),
            player.name,
            viewer.page,
            target
        );
        true
    }
}

impl<T: Send + Sync + 'static> GuiInstance for FillableInstance<T> {
    fn core(&self) -> &InstanceCore {
        &self.core
    }

    fn layout(&self) -> GuiLayout {
        GuiLayout::Fillable(Arc::clone(&self.layout))
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

        // cleared under the list lock so a concurrent mutation stays visible
        let fillers = {
            let list = self.fillers.read().unwrap_or_else(PoisonError::into_inner);
            self.stale.store(false, Ordering::Release);
            list.clone()
        };
        let generated = Arc::new(generate(&self.layout, &fillers));
        let translators = self.core.translators();
        let languages = self.languages();
        let rendered: BTreeMap<Language, Vec<RenderedPage>> = languages
            .par_iter()
            .map(|lang| {
                let pages = render_pages(&self.layout, lang, &generated, &translators);
                (lang.clone(), pages)
            })
            .collect();
        let count = generated.len();
        let old = self.publish(FillablePages {
            generated,
            rendered,
        });
        self.core.mark_loaded();
        tracing::debug!(
            "[gui] [refresh] id={} fillers={} pages={}",
            id,
            fillers.len(),
            count
        );

        let current = self.published();
        let host = ctx.host();
        let viewers: Vec<Viewer> = {
            let mut viewers = self.viewers_lock();
            let snapshot = viewers.values().cloned().collect();
            for viewer in viewers.values_mut() {
                viewer.page = viewer.page.min(count - 1);
            }
            snapshot
        };
        for viewer in viewers {
            let target = viewer.page.min(count - 1);
            let Some(page) = current.rendered.get(&viewer.language).and_then(|p| p.get(target)) else {
                continue;
            };
            let previous = old
                .rendered
                .get(&viewer.language)
                .and_then(|p| p.get(viewer.page));
            match previous {
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
        self.publish(FillablePages::empty());
        dispatch_unload(&self.core);
        true
    }

    fn open(&self, player: &Player, perform_open: bool) -> bool {
        self.open_page(player, 0, perform_open)
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
        let language = self.viewer_language(player);
        let index = self.viewer_page(player.id).unwrap_or(0);
        let page = self.page_for(&language, index);
        let outcome = process_click(
            &self.core,
            self.layout.core(),
            player,
            slot,
            click,
            page.as_ref().and_then(|p| p.icon_at(slot)),
        );
        match outcome.turn_page {
            Some(PageDirection::Next) => {
                self.turn_page(player, index + 1);
            }
            Some(PageDirection::Previous) if index > 0 => {
                self.turn_page(player, index - 1);
            }
            _ => {}
        }
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
        self.page_for(language, page).map(|p| p.title)
    }

    fn viewers(&self) -> Vec<PlayerId> {
        self.viewers_lock().keys().copied().collect()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
