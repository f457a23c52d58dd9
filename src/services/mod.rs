//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room state transitions and exercise storage so route
//! handlers can stay focused on protocol translation.

pub mod canonical;
pub mod exercise;
pub mod lobby;
pub mod room;
