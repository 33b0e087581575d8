//! Identifier grammars for instances, layouts and icons.
//!
//! All ids share the alphabet `[A-Za-z0-9_-]`; only the length bound differs.
//! Registry keys are compared case-insensitively via [`registry_key`].

/// Longest instance, layout or icon id.
pub const ID_MAX_LEN: usize = 36;

/// Longest layout id usable for per-player instances.
///
/// Leaves room for `-<player name>` (16 chars) inside [`ID_MAX_LEN`].
pub const PER_PLAYER_ID_MAX_LEN: usize = 19;

const ID_MIN_LEN: usize = 2;

fn matches_grammar(s: &str, max_len: usize) -> bool {
    s.len() >= ID_MIN_LEN
        && s.len() <= max_len
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// `^[A-Za-z0-9_-]{2,36}$`
pub fn is_valid_id(s: &str) -> bool {
    matches_grammar(s, ID_MAX_LEN)
}

/// Icon ids follow the same grammar as instance ids.
pub fn is_valid_icon_id(s: &str) -> bool {
    matches_grammar(s, ID_MAX_LEN)
}

/// `^[A-Za-z0-9_-]{2,19}$`
pub fn is_valid_per_player_id(s: &str) -> bool {
    matches_grammar(s, PER_PLAYER_ID_MAX_LEN)
}

/// Derive the id of a per-player instance: `"{layout_id}-{player_name}"`.
pub fn per_player_id(layout_id: &str, player_name: &str) -> String {
    format!("{}-{}", layout_id, player_name)
}

/// Case-folded key used by the registry index.
pub fn registry_key(id: &str) -> String {
    id.to_ascii_lowercase()
}
