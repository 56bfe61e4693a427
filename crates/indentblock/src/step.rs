use std::collections::HashSet;

use plate_core::{
    parse_css_int, ApplyError, AttrPatch, Draft, ElementNode, IndentDirection, Op, Path,
    TextDirection,
};
use tracing::{debug, trace};

use crate::config::{ClassSteps, IndentConfiguration, IndentMode, MarginSteps};

/// Blocks already stepped by one command execution.
///
/// Block iteration may reach the same element more than once; each element
/// moves at most one step per execution.
#[derive(Debug, Default)]
pub struct IndentPass {
    processed: HashSet<Path>,
}

impl IndentPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processed(&self, path: &[usize]) -> bool {
        self.processed.contains(path)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    fn mark(&mut self, path: &[usize]) {
        self.processed.insert(path.to_vec());
    }
}

/// Margin on the indenting side of `el`. Missing or non-numeric values read
/// as 0.
pub fn current_margin(el: &ElementNode, direction: TextDirection) -> i64 {
    el.style(direction.margin_property())
        .and_then(|value| parse_css_int(&value))
        .unwrap_or(0)
}

/// Indent step of `el` as the configuration counts it: the class index in
/// class mode, the margin value in margin mode.
pub fn current_level(el: &ElementNode, config: &IndentConfiguration, direction: TextDirection) -> i64 {
    match config.mode() {
        IndentMode::Classes(steps) => steps.level_of(el.class_name()) as i64,
        IndentMode::Margin(_) => current_margin(el, direction),
    }
}

/// Level and `class` value after one step, or `None` below level 0. Stepping
/// past the last class stays on it.
pub fn class_step(
    class_name: &str,
    steps: &ClassSteps,
    direction: IndentDirection,
) -> Option<(usize, String)> {
    let level = steps.level_of(class_name) as i64 + direction.sign();
    if level < 0 {
        return None;
    }
    let level = (level as usize).min(steps.len());

    let mut classes = steps.strip(class_name);
    if let Some(class) = steps.class_for(level) {
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str(class);
    }
    Some((level, classes))
}

/// Margin after one step, rounded up to a multiple of the offset. `None`
/// below zero or past `i64::MAX`.
pub fn margin_step(current: i64, steps: &MarginSteps, direction: IndentDirection) -> Option<i64> {
    let offset = i64::from(steps.offset());
    let next = current.checked_add(direction.sign() * offset)?;
    if next < 0 {
        return None;
    }
    next.checked_add(offset - 1).map(|next| next / offset * offset)
}

/// Moves the block at `path` one step. Returns `false` when the block was
/// already handled by `pass` or cannot move further.
pub fn step(
    draft: &mut Draft,
    pass: &mut IndentPass,
    path: &[usize],
    config: &IndentConfiguration,
    direction: IndentDirection,
    text_direction: TextDirection,
) -> Result<bool, ApplyError> {
    if pass.is_processed(path) {
        return Ok(false);
    }
    let Some(el) = draft.doc().element(path) else {
        return Ok(false);
    };

    let patch = match config.mode() {
        IndentMode::Classes(steps) => {
            let Some((level, classes)) = class_step(el.class_name(), steps, direction) else {
                debug!(?path, "block already at level 0");
                return Ok(false);
            };
            if classes == el.class_name() {
                debug!(?path, level, "block already at the last class");
                pass.mark(path);
                return Ok(false);
            }
            trace!(?path, level, "class step");
            if classes.is_empty() {
                AttrPatch::default().remove("class")
            } else {
                AttrPatch::default().set("class", classes)
            }
        }
        IndentMode::Margin(steps) => {
            let current = current_margin(el, text_direction);
            let Some(next) = margin_step(current, steps, direction) else {
                debug!(?path, current, "margin out of range");
                return Ok(false);
            };
            trace!(?path, current, next, "margin step");
            let value = (next > 0).then(|| format!("{next}{}", steps.unit()));
            let style = el.style_with(text_direction.margin_property(), value.as_deref());
            if style.is_empty() {
                AttrPatch::default().remove("style")
            } else {
                AttrPatch::default().set("style", style)
            }
        }
    };

    draft.apply(Op::SetNodeAttrs {
        path: path.to_vec(),
        patch,
    })?;
    pass.mark(path);
    Ok(true)
}
