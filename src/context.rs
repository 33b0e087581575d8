//! Services shared by the registry and every instance it builds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::config::GuiConfig;
use crate::event::{EventBus, GuiEvent, GuiEventKind};
use crate::host::{Host, Player, PlayerId};

pub struct GuiContext {
    host: Arc<dyn Host>,
    events: EventBus,
    config: GuiConfig,
    /// player → time of the last accepted icon click
    last_clicks: Mutex<HashMap<PlayerId, Instant>>,
}

impl GuiContext {
    pub fn new(host: Arc<dyn Host>, config: GuiConfig) -> Self {
        Self {
            host,
            events: EventBus::new(),
            config,
            last_clicks: Mutex::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &GuiConfig {
        &self.config
    }

    /// Build an event, run it through the observers and hand it back.
    pub(crate) fn dispatch(&self, instance_id: &str, player: Option<&Player>, kind: GuiEventKind) -> GuiEvent {
        let mut event = GuiEvent::new(instance_id, player, kind);
        self.events.dispatch(&mut event);
        event
    }

    /// Record an icon click; false while the player is still on cooldown.
    pub(crate) fn try_click(&self, player: PlayerId) -> bool {
        let cooldown = self.config.click_cooldown();
        if cooldown.is_zero() {
            return true;
        }
        let now = Instant::now();
        let mut last = self.last_clicks.lock().unwrap_or_else(PoisonError::into_inner);
        match last.get(&player) {
            Some(prev) if now.duration_since(*prev) < cooldown => false,
            _ => {
                last.insert(player, now);
                true
            }
        }
    }

    pub(crate) fn forget_player(&self, player: PlayerId) {
        self.last_clicks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player);
    }
}
