//! Boundary to the game server.
//!
//! The framework never touches host inventory or item objects. Everything it
//! needs from the server goes through these traits, implemented once per
//! target platform and selected at startup.

mod recording;

pub use recording::{HostCall, RecordingHost};

use crate::icon::Sound;
use crate::lang::Language;
use crate::render::{RenderedIcon, RenderedPage};

/// Stable player identifier assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id: PlayerId(id),
            name: name.to_string(),
        }
    }
}

/// Container rendering and fire-and-forget side effects.
pub trait Renderer: Send + Sync {
    /// Open a container of `size` slots for `player`, filled with `page`.
    fn open_container(&self, player: &Player, size: usize, title: &str, page: &RenderedPage);

    fn set_item(&self, player: &Player, slot: usize, item: Option<&RenderedIcon>);

    /// Push new contents into an already open container.
    fn update_container(&self, player: &Player, page: &RenderedPage) {
        for (slot, item) in page.slots.iter().enumerate() {
            self.set_item(player, slot, item.as_ref());
        }
    }

    fn close_container(&self, player: &Player);

    fn play_sound(&self, player: &Player, sound: &Sound);

    fn execute_command(&self, player: &Player, command: &str);

    fn send_message(&self, player: &Player, message: &str);
}

pub trait PermissionOracle: Send + Sync {
    fn has_permission(&self, player: &Player, permission: &str) -> bool;
}

pub trait LanguageRegistry: Send + Sync {
    fn default_language(&self) -> Language;

    fn player_language(&self, player: &Player) -> Language;

    /// Localized message for `key`, if the language (or the default) has one.
    fn localized(&self, language: &Language, key: &str) -> Option<String>;
}

/// Everything the framework consumes from the server.
pub trait Host: Renderer + PermissionOracle + LanguageRegistry {}

impl<T: Renderer + PermissionOracle + LanguageRegistry> Host for T {}
