//! Agentic iOS - natural language commands for iOS apps
//!
//! An instruction goes through the intent parser (`llm`), is checked against
//! the app catalog (`actions`, `command`) and is opened as a deep link on a
//! simulator or physical device (`device`).

pub mod actions;
pub mod command;
pub mod core;
pub mod device;
pub mod discovery;
pub mod llm;
