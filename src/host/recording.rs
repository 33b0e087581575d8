//! In-memory host that records every dispatch.
//!
//! Used by the test suites and by `gui_lint` to dry-render layouts without a
//! running server.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use super::{LanguageRegistry, PermissionOracle, Player, PlayerId, Renderer};
use crate::icon::Sound;
use crate::lang::{Language, StaticLanguages};
use crate::render::{RenderedIcon, RenderedPage};

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Open { player: PlayerId, size: usize, title: String, page: RenderedPage },
    SetItem { player: PlayerId, slot: usize, item: Option<RenderedIcon> },
    Update { player: PlayerId, page: RenderedPage },
    Close { player: PlayerId },
    Sound { player: PlayerId, sound: String },
    Command { player: PlayerId, command: String },
    Message { player: PlayerId, message: String },
}

pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    permissions: Mutex<HashSet<(PlayerId, String)>>,
    languages: StaticLanguages,
}

impl RecordingHost {
    pub fn new(default_language: Language) -> Self {
        Self::with_languages(StaticLanguages::new(default_language))
    }

    pub fn with_languages(languages: StaticLanguages) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            permissions: Mutex::new(HashSet::new()),
            languages,
        }
    }

    pub fn languages(&self) -> &StaticLanguages {
        &self.languages
    }

    pub fn grant(&self, player: PlayerId, permission: &str) {
        self.permissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((player, permission.to_string()));
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drain the recorded calls.
    pub fn take_calls(&self) -> Vec<HostCall> {
        std::mem::take(&mut *self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Commands dispatched so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Command { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

impl Renderer for RecordingHost {
    fn open_container(&self, player: &Player, size: usize, title: &str, page: &RenderedPage) {
        self.record(HostCall::Open {
            player: player.id,
            size,
            title: title.to_string(),
            page: page.clone(),
        });
    }

    fn set_item(&self, player: &Player, slot: usize, item: Option<&RenderedIcon>) {
        self.record(HostCall::SetItem {
            player: player.id,
            slot,
            item: item.cloned(),
        });
    }

    fn update_container(&self, player: &Player, page: &RenderedPage) {
        self.record(HostCall::Update {
            player: player.id,
            page: page.clone(),
        });
    }

    fn close_container(&self, player: &Player) {
        self.record(HostCall::Close { player: player.id });
    }

    fn play_sound(&self, player: &Player, sound: &Sound) {
        self.record(HostCall::Sound {
            player: player.id,
            sound: sound.id.clone(),
        });
    }

    fn execute_command(&self, player: &Player, command: &str) {
        self.record(HostCall::Command {
            player: player.id,
            command: command.to_string(),
        });
    }

    fn send_message(&self, player: &Player, message: &str) {
        self.record(HostCall::Message {
            player: player.id,
            message: message.to_string(),
        });
    }
}

impl PermissionOracle for RecordingHost {
    fn has_permission(&self, player: &Player, permission: &str) -> bool {
        self.permissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(player.id, permission.to_string()))
    }
}

impl LanguageRegistry for RecordingHost {
    fn default_language(&self) -> Language {
        self.languages.default_language()
    }

    fn player_language(&self, player: &Player) -> Language {
        self.languages.player_language(player)
    }

    fn localized(&self, language: &Language, key: &str) -> Option<String> {
        self.languages.localized(language, key)
    }
}
