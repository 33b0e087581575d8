//! invgui - inventory GUI framework
//!
//! Builds chest-style GUIs from validated layouts, paginates fillable lists,
//! routes click and drag input through cancellable events and evicts
//! per-player instances after inactivity. All server interaction goes through
//! the traits in [`host`].

// ============================================
// Layouts
// ============================================

/// Identifier grammars
pub mod ids;
/// Icon specs and stencils
pub mod icon;
/// Layout templates, builders and YAML parsing
pub mod layout;
/// Validation and registry errors
pub mod error;

// ============================================
// Runtime
// ============================================

/// Framework configuration (YAML)
pub mod config;
/// Languages and lang files
pub mod lang;
/// Host boundary: rendering, permissions, languages
pub mod host;
/// Icon and title rendering
pub mod render;
/// Data sources for fillable instances
pub mod filler;
/// Cancellable events and observers
pub mod event;
/// Services shared by all instances
pub mod context;
/// Live instances (single page and fillable)
pub mod instance;
/// Instance catalog, factory and eviction
pub mod registry;

pub use config::GuiConfig;
pub use error::{GuiError, LayoutError, RegistryError};
pub use event::{ClickType, GuiEvent, GuiEventKind, GuiObserver};
pub use filler::{GuiFiller, PlaceholderFiller};
pub use host::{Host, Player, PlayerId};
pub use icon::{IconLayoutSpec, IconSpec};
pub use instance::{FillableInstance, GuiInstance, SinglePageInstance};
pub use lang::Language;
pub use layout::{FillableLayoutBuilder, GuiLayout, LayoutBuilder};
pub use registry::{BuiltInstance, GuiRegistry};
