//! Live GUI instances bound to a layout.
//!
//! Rendered pages are published by replacement: a refresh builds a complete
//! new page set and swaps the `Arc`, so readers see either the old or the
//! new pages. Refreshes of one instance are serialized by a per-instance lock.

mod fillable;
mod single;

pub use fillable::FillableInstance;
pub use single::SinglePageInstance;

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::context::GuiContext;
use crate::event::{ClickType, GuiEventKind};
use crate::host::{Player, PlayerId};
use crate::icon::PageDirection;
use crate::lang::Language;
use crate::layout::{GuiLayout, LayoutCore};
use crate::registry::PerPlayer;
use crate::render::{ListTranslator, RenderedIcon, StringTranslator, TitleTranslator, Translators};

/// Replaced with the player's name in icon commands and open messages.
pub const PLAYER_PLACEHOLDER: &str = "{player}";

/// Lang key sent to a player whose click hit the cooldown.
pub const CLICK_COOLDOWN_MESSAGE: &str = "gui.click-cooldown";

/// State shared by every instance variant.
pub struct InstanceCore {
    id: RwLock<String>,
    loaded: AtomicBool,
    translators: RwLock<Translators>,
    per_player: OnceLock<PerPlayer>,
    ctx: Arc<GuiContext>,
}

impl InstanceCore {
    pub(crate) fn new(id: &str, ctx: Arc<GuiContext>) -> Self {
        Self {
            id: RwLock::new(id.to_string()),
            loaded: AtomicBool::new(false),
            translators: RwLock::new(Translators::default()),
            per_player: OnceLock::new(),
            ctx,
        }
    }

    pub fn id(&self) -> String {
        self.id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Only the registry renames instances, under its index lock.
    pub(crate) fn set_id(&self, id: &str) {
        *self.id.write().unwrap_or_else(PoisonError::into_inner) = id.to_string();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Release);
    }

    /// Returns true if this call moved the instance from loaded to unloaded.
    pub(crate) fn mark_unloaded(&self) -> bool {
        self.loaded.swap(false, Ordering::AcqRel)
    }

    pub fn context(&self) -> &Arc<GuiContext> {
        &self.ctx
    }

    pub fn translators(&self) -> Translators {
        self.translators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installed translators take effect on the next refresh.
    pub fn set_title_translator(&self, translator: Option<TitleTranslator>) {
        self.translators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .title = translator;
    }

    pub fn set_string_translator(&self, translator: Option<StringTranslator>) {
        self.translators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .string = translator;
    }

    pub fn set_list_translator(&self, translator: Option<ListTranslator>) {
        self.translators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .list = translator;
    }

    pub fn per_player(&self) -> Option<&PerPlayer> {
        self.per_player.get()
    }

    pub(crate) fn attach_per_player(&self, per_player: PerPlayer) -> bool {
        self.per_player.set(per_player).is_ok()
    }

    /// Input activity: push back the eviction deadline of a per-player instance.
    pub(crate) fn touch(&self) {
        if let Some(per_player) = self.per_player.get() {
            per_player.timer().reset();
        }
    }
}

/// Viewer bookkeeping kept by each instance.
#[derive(Debug, Clone)]
pub(crate) struct Viewer {
    pub player: Player,
    pub language: Language,
    pub page: usize,
}

/// A live instance of either variant.
pub trait GuiInstance: Send + Sync + 'static {
    fn core(&self) -> &InstanceCore;

    fn layout(&self) -> GuiLayout;

    fn layout_core(&self) -> &LayoutCore;

    fn id(&self) -> String {
        self.core().id()
    }

    fn is_loaded(&self) -> bool {
        self.core().is_loaded()
    }

    /// Compute the rendered pages. Equivalent to [`GuiInstance::refresh`].
    fn load(&self) {
        self.refresh();
    }

    /// Recompute every rendered page and push the result to open viewers.
    fn refresh(&self);

    /// Close every viewer and drop the rendered pages. Returns true only for
    /// the call that actually unloaded the instance.
    fn unload(&self) -> bool;

    /// Show the instance to `player`. Returns false if an observer cancelled
    /// the open; the player is then not registered as a viewer.
    fn open(&self, player: &Player, perform_open_actions: bool) -> bool;

    /// Close the container of `player` from the server side.
    fn close(&self, player: &Player);

    /// The host reports that `player` closed the container.
    fn handle_close(&self, player: &Player);

    /// Returns true when the underlying click must be suppressed.
    fn handle_click(&self, player: &Player, slot: usize, click: ClickType) -> bool;

    /// Returns true when the underlying drag must be suppressed.
    fn handle_drag(&self, player: &Player, slots: &[usize]) -> bool;

    /// Rendered title of `page` for `language`.
    fn title(&self, language: &Language, page: usize) -> Option<String>;

    fn viewers(&self) -> Vec<PlayerId>;

    fn is_viewing(&self, player: PlayerId) -> bool {
        self.viewers().contains(&player)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// What an instance has to do after the shared click pipeline ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ClickOutcome {
    pub cancelled: bool,
    pub turn_page: Option<PageDirection>,
    pub close: bool,
}

impl ClickOutcome {
    fn cancelled(cancelled: bool) -> Self {
        Self {
            cancelled,
            ..Self::default()
        }
    }
}

/// Click pipeline shared by both variants: interact pre-check, empty slot
/// and permission gate, cooldown, icon click event, then the icon actions.
pub(crate) fn process_click(
    core: &InstanceCore,
    layout: &LayoutCore,
    player: &Player,
    slot: usize,
    click: ClickType,
    icon: Option<&RenderedIcon>,
) -> ClickOutcome {
    let id = core.id();
    let ctx = core.context();
    let host = ctx.host();

    let interact = ctx.dispatch(&id, Some(player), GuiEventKind::Interact { slot, click });
    if interact.is_cancelled() {
        tracing::debug!("[gui] [click_aborted] id={} player={} slot={}", id, player.name, slot);
        return ClickOutcome::cancelled(true);
    }

    let usable = icon.filter(|icon| {
        icon.permission
            .as_deref()
            .is_none_or(|perm| host.has_permission(player, perm))
    });
    let Some(icon) = usable else {
        let event = ctx.dispatch(&id, Some(player), GuiEventKind::EmptySlotClick { slot, click });
        return ClickOutcome::cancelled(event.is_cancelled());
    };

    if !ctx.try_click(player.id) {
        tracing::debug!("[gui] [click_cooldown] id={} player={}", id, player.name);
        let language = host.player_language(player);
        if let Some(message) = host.localized(&language, CLICK_COOLDOWN_MESSAGE) {
            host.send_message(player, &message);
        }
        return ClickOutcome::cancelled(true);
    }

    let event = ctx.dispatch(
        &id,
        Some(player),
        GuiEventKind::IconClick {
            slot,
            click,
            icon: icon.clone(),
            perform_actions: true,
        },
    );
    let mut outcome = ClickOutcome::cancelled(event.is_cancelled());
    // an inactive switcher has no page to turn to
    let inert = icon.page_switcher && icon.page_switch.is_none();
    if event.perform_actions() && !inert {
        for command in &icon.commands {
            host.execute_command(player, &command.replace(PLAYER_PLACEHOLDER, &player.name));
        }
        if let Some(sound) = layout.click_sound() {
            host.play_sound(player, sound);
        }
        outcome.turn_page = icon.page_switch;
        outcome.close = !icon.keep_open && !icon.page_switcher;
    }
    tracing::debug!(
        "[gui] [icon_click] id={} player={} icon={} actions={}",
        id,
        player.name,
        icon.id,
        event.perform_actions()
    );
    outcome
}

/// Drag pipeline shared by both variants.
pub(crate) fn process_drag(core: &InstanceCore, player: &Player, slots: &[usize]) -> bool {
    let event = core.context().dispatch(
        &core.id(),
        Some(player),
        GuiEventKind::Drag {
            slots: slots.to_vec(),
        },
    );
    event.is_cancelled()
}

/// Fire the open event; false when an observer vetoed the open.
pub(crate) fn dispatch_open(core: &InstanceCore, player: &Player, page: usize) -> bool {
    let event = core
        .context()
        .dispatch(&core.id(), Some(player), GuiEventKind::Open { page });
    !event.is_cancelled()
}

/// Send the layout's open messages and sound, if enabled.
pub(crate) fn perform_open_actions(core: &InstanceCore, layout: &LayoutCore, player: &Player, language: &Language) {
    let ctx = core.context();
    if !ctx.config().open_actions_enabled {
        return;
    }
    let host = ctx.host();
    let actions = layout.open_actions();
    let messages = actions
        .messages
        .get(language)
        .or_else(|| actions.messages.get(layout.main_language()));
    for message in messages.into_iter().flatten() {
        host.send_message(player, &message.replace(PLAYER_PLACEHOLDER, &player.name));
    }
    if let Some(sound) = &actions.sound {
        host.play_sound(player, sound);
    }
}

/// Announce an unload to observers.
pub(crate) fn dispatch_unload(core: &InstanceCore) {
    let id = core.id();
    core.context().dispatch(&id, None, GuiEventKind::Unload);
    tracing::info!("[gui] [unloaded] id={}", id);
}
