//! List indentation. Items keep their nesting depth in `data-level`.

use serde_json::Value;
use tracing::debug;

use crate::blocks::range_intersects;
use crate::core::{ApplyError, AttrPatch, Document, Draft, Editor, ElementNode, Selection};
use crate::dom::{is_list_item_tag, is_list_tag};
use crate::ops::{Op, Path};
use crate::path::ElementPath;
use crate::plugin::{
    CommandError, CommandSpec, CommandState, IndentDirection, PlatePlugin, QuerySpec,
};

pub const MAX_LIST_LEVEL: u64 = 8;
pub const LIST_LEVEL_ATTR: &str = "data-level";
pub const LIST_INDENT_PRIORITY: u32 = 10;

pub fn list_item_level(el: &ElementNode) -> u64 {
    el.attr(LIST_LEVEL_ATTR)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0)
        .min(MAX_LIST_LEVEL)
}

/// List helpers the host lends to other indentation features.
pub trait ListIndent: Send + Sync {
    fn is_list_item(&self, el: &ElementNode) -> bool;

    /// Whether the innermost list item of `path` is the first item of its list.
    fn is_first_list_item_in_path(&self, path: &ElementPath<'_>) -> bool;

    /// Indents or outdents every item of the list at `list`.
    fn indent_list(
        &self,
        editor: &mut Editor,
        list: &[usize],
        direction: IndentDirection,
    ) -> Result<bool, CommandError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HostListHelpers;

impl ListIndent for HostListHelpers {
    fn is_list_item(&self, el: &ElementNode) -> bool {
        is_list_item_tag(&el.tag)
    }

    fn is_first_list_item_in_path(&self, path: &ElementPath<'_>) -> bool {
        let Some(item) = path.contains(|el| self.is_list_item(el)) else {
            return false;
        };
        let Some((ix, parent)) = item.split_last() else {
            return false;
        };
        list_item_indexes(path.doc(), parent).first() == Some(ix)
    }

    fn indent_list(
        &self,
        editor: &mut Editor,
        list: &[usize],
        direction: IndentDirection,
    ) -> Result<bool, CommandError> {
        let items = list_item_indexes(editor.doc(), list);
        shift_and_commit(editor, list, &items, direction)
    }
}

fn list_item_indexes(doc: &Document, list: &[usize]) -> Vec<usize> {
    doc.children_at(list)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .filter(|(_, node)| node.as_element().is_some_and(|el| is_list_item_tag(&el.tag)))
        .map(|(ix, _)| ix)
        .collect()
}

/// The nearest list at the selection start and the items of it the
/// selection touches. Selecting the first item targets the whole list.
fn list_targets(doc: &Document, selection: &Selection) -> Option<(Path, Vec<usize>)> {
    let (start, end) = selection.ordered();
    let path = ElementPath::new(doc, &start.path);
    let list = path.contains(|el| is_list_tag(&el.tag))?.clone();

    let items = list_item_indexes(doc, &list);
    let selected: Vec<usize> = items
        .iter()
        .copied()
        .filter(|&ix| {
            let mut item = list.clone();
            item.push(ix);
            range_intersects(&item, &item, start, end)
        })
        .collect();

    if selected.is_empty() {
        return None;
    }
    if selected.first() == items.first() {
        return Some((list, items));
    }
    Some((list, selected))
}

fn shift_items(
    draft: &mut Draft,
    list: &[usize],
    items: &[usize],
    direction: IndentDirection,
) -> Result<bool, ApplyError> {
    let mut changed = false;
    for &ix in items {
        let mut path = list.to_vec();
        path.push(ix);
        let Some(el) = draft.doc().element(&path) else {
            continue;
        };
        let level = list_item_level(el);
        let next = match direction {
            IndentDirection::Indent => (level + 1).min(MAX_LIST_LEVEL),
            IndentDirection::Outdent => level.saturating_sub(1),
        };
        if next == level {
            continue;
        }
        let patch = if next == 0 {
            AttrPatch::default().remove(LIST_LEVEL_ATTR)
        } else {
            AttrPatch::default().set(LIST_LEVEL_ATTR, next.to_string())
        };
        draft.apply(Op::SetNodeAttrs { path, patch })?;
        changed = true;
    }
    Ok(changed)
}

fn shift_and_commit(
    editor: &mut Editor,
    list: &[usize],
    items: &[usize],
    direction: IndentDirection,
) -> Result<bool, CommandError> {
    let mut draft = editor.draft();
    shift_items(&mut draft, list, items, direction)
        .map_err(|e| CommandError::new(format!("Failed to shift list items: {e}")))?;
    let source = format!("command:{}", list_command_id(direction));
    editor
        .commit(draft, source)
        .map_err(|e| CommandError::new(format!("Failed to indent list: {e}")))
}

fn list_command_id(direction: IndentDirection) -> &'static str {
    match direction {
        IndentDirection::Indent => "indentlist",
        IndentDirection::Outdent => "outdentlist",
    }
}

fn list_state(editor: &Editor, direction: IndentDirection) -> CommandState {
    let Some((list, items)) = list_targets(editor.doc(), editor.selection()) else {
        return CommandState::Disabled;
    };
    let mut levels = items.iter().filter_map(|&ix| {
        let mut path = list.clone();
        path.push(ix);
        editor.doc().element(&path).map(list_item_level)
    });
    let movable = match direction {
        IndentDirection::Indent => levels.any(|level| level < MAX_LIST_LEVEL),
        IndentDirection::Outdent => levels.any(|level| level > 0),
    };
    if movable {
        CommandState::Off
    } else {
        CommandState::Disabled
    }
}

fn list_command(direction: IndentDirection) -> CommandSpec {
    let label = match direction {
        IndentDirection::Indent => "Indent list",
        IndentDirection::Outdent => "Outdent list",
    };
    CommandSpec::new(list_command_id(direction), label, move |editor, _args| {
        let Some((list, items)) = list_targets(editor.doc(), editor.selection()) else {
            return Ok(false);
        };
        debug!(?list, items = items.len(), ?direction, "shifting list items");
        shift_and_commit(editor, &list, &items, direction)
    })
    .priority(LIST_INDENT_PRIORITY)
    .related_global(direction.global_command())
    .refresh(move |editor, _path| list_state(editor, direction))
}

pub struct ListPlugin;

impl PlatePlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            list_command(IndentDirection::Indent)
                .description("Nest the selected list items one level deeper.")
                .keywords(["list", "indent", "nest"]),
            list_command(IndentDirection::Outdent)
                .description("Move the selected list items one level up.")
                .keywords(["list", "outdent"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("list.level", |editor, _args| {
            let path = editor.element_path();
            let level = path
                .contains(|el| is_list_item_tag(&el.tag))
                .and_then(|item| editor.doc().element(item))
                .map(list_item_level)
                .unwrap_or(0);
            Ok(Value::from(level))
        })]
    }
}
