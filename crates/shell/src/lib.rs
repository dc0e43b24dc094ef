#![deny(unsafe_code)]

//! Desktop assistant shell.
//!
//! A responsive window layout around a chat thread: the [`viewport`] classifier decides
//! narrow vs wide, [`layout`] owns the panel and loading state machine, and [`app`]
//! renders it with GPUI.

pub mod app;
pub mod chat;
pub mod header;
pub mod layout;
pub mod nav_panel;
pub mod settings;
pub mod viewport;
