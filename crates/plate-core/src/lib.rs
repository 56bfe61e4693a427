mod blocks;
mod core;
mod dom;
mod list;
mod ops;
mod path;
mod plugin;

pub use crate::blocks::*;
pub use crate::core::*;
pub use crate::dom::*;
pub use crate::list::*;
pub use crate::ops::*;
pub use crate::path::*;
pub use crate::plugin::*;
