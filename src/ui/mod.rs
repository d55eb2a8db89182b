//! Terminal User Interface module.
//!
//! This module provides the dashboard TUI, including:
//! - Main event loop (`run`)
//! - Input handling for browse, reader, settings and prompts
//! - Rendering for group tabs, item list, reader and settings views
//! - Background task event processing
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `tasks` - Spawning backend requests
//! - `editor` - Raw configuration editing in `$EDITOR`
//! - `render` - View rendering dispatch
//! - `groups` - Group tab row widget
//! - `items` - Item list and preview widgets
//! - `reader` - Item reader widget
//! - `settings` - Settings view widget
//! - `status` - Status bar widget
//! - `help` - Help overlay

mod editor;
mod events;
mod groups;
mod help;
mod input;
mod items;
mod loop_runner;
pub mod reader;
mod render;
mod settings;
mod status;
mod tasks;

pub use loop_runner::{run, Action};
