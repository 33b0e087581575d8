//! Cancellable GUI events and their observers.
//!
//! Events are dispatched synchronously to every observer before the default
//! action runs. A cancelled event is a normal outcome, not an error.

use std::sync::{Arc, PoisonError, RwLock};

use crate::host::Player;
use crate::render::RenderedIcon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    Left,
    Right,
    ShiftLeft,
    ShiftRight,
    Middle,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuiEventKind {
    /// A viewer is about to be shown `page`.
    Open { page: usize },
    /// Pre-check for any click inside an open instance.
    Interact { slot: usize, click: ClickType },
    /// Click on an empty slot or an icon the player may not use.
    EmptySlotClick { slot: usize, click: ClickType },
    IconClick {
        slot: usize,
        click: ClickType,
        icon: RenderedIcon,
        perform_actions: bool,
    },
    Drag { slots: Vec<usize> },
    /// Cancelling skips the recomputation; the old pages stay published.
    Refresh,
    /// The instance was unloaded. Notification only.
    Unload,
}

#[derive(Debug, Clone)]
pub struct GuiEvent {
    instance_id: String,
    player: Option<Player>,
    kind: GuiEventKind,
    cancelled: bool,
}

impl GuiEvent {
    pub fn new(instance_id: &str, player: Option<&Player>, kind: GuiEventKind) -> Self {
        // Input on a GUI container is suppressed unless an observer lets it through.
        let cancelled = matches!(
            kind,
            GuiEventKind::EmptySlotClick { .. }
                | GuiEventKind::IconClick { .. }
                | GuiEventKind::Drag { .. }
        );
        Self {
            instance_id: instance_id.to_string(),
            player: player.cloned(),
            kind,
            cancelled,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub fn kind(&self) -> &GuiEventKind {
        &self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    /// Whether an icon click should run its commands; false for other events.
    pub fn perform_actions(&self) -> bool {
        matches!(
            self.kind,
            GuiEventKind::IconClick {
                perform_actions: true,
                ..
            }
        )
    }

    /// Veto or allow the actions of an icon click; ignored for other events.
    pub fn set_perform_actions(&mut self, value: bool) {
        if let GuiEventKind::IconClick {
            perform_actions, ..
        } = &mut self.kind
        {
            *perform_actions = value;
        }
    }
}

pub trait GuiObserver: Send + Sync {
    fn on_event(&self, event: &mut GuiEvent);
}

impl<F> GuiObserver for F
where
    F: Fn(&mut GuiEvent) + Send + Sync,
{
    fn on_event(&self, event: &mut GuiEvent) {
        self(event)
    }
}

#[derive(Default)]
pub struct EventBus {
    observers: RwLock<Vec<Arc<dyn GuiObserver>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn GuiObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Run every observer in subscription order.
    ///
    /// The list is snapshotted first so observers may subscribe others.
    pub fn dispatch(&self, event: &mut GuiEvent) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_event(event);
        }
    }
}
