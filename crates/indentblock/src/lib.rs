//! Block indentation for the plate editing host.
//!
//! Registers the `indentblock` and `outdentblock` commands. They step the
//! indentation of every block touched by the selection, either through an
//! ordered list of CSS classes or by a fixed margin offset.

mod command;
mod config;
mod state;
mod step;

pub use crate::command::*;
pub use crate::config::*;
pub use crate::state::*;
pub use crate::step::*;
