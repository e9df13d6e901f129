pub mod clipboard;
pub mod global_hook;
pub mod input;
pub mod tray;
