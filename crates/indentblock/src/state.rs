use plate_core::{
    resolve_direction, CommandState, EditorConfig, ElementPath, EnterMode, IndentDirection,
    ListIndent,
};
use tracing::trace;

use crate::config::{IndentConfiguration, IndentMode};
use crate::step::current_margin;

/// Command state of indent or outdent for the selection described by `path`.
///
/// The first block is the nearest paragraph-level element, or the block limit
/// when the selection sits directly in one. Enter mode and content direction
/// come from the editor.
pub fn evaluate(
    path: &ElementPath<'_>,
    config: &IndentConfiguration,
    direction: IndentDirection,
    lists: &dyn ListIndent,
    editor_config: &EditorConfig,
) -> CommandState {
    let first_block = path.block().or(path.block_limit());
    let first = first_block.and_then(|block| path.element(block).map(|el| (block, el)));

    // List items belong to the list commands.
    if first.is_some_and(|(_, el)| lists.is_list_item(el)) {
        trace!("first block is a list item");
        return CommandState::Disabled;
    }

    if editor_config.enter_mode != EnterMode::Br
        && !path.elements().any(|(_, el)| config.in_scope(&el.tag))
    {
        trace!("selection outside indentable elements");
        return CommandState::Disabled;
    }

    match config.mode() {
        IndentMode::Classes(steps) => {
            let level = first.map_or(0, |(_, el)| steps.level_of(el.class_name()));
            let movable = match direction {
                IndentDirection::Indent => level < steps.len(),
                IndentDirection::Outdent => level > 0,
            };
            if movable {
                CommandState::Off
            } else {
                CommandState::Disabled
            }
        }
        IndentMode::Margin(_) if direction.is_indent() => CommandState::Off,
        IndentMode::Margin(_) => {
            let Some((block, el)) = first else {
                return CommandState::Disabled;
            };
            let text_direction = resolve_direction(path.doc(), block, editor_config.content_direction);
            if current_margin(el, text_direction) > 0 {
                CommandState::Off
            } else {
                CommandState::Disabled
            }
        }
    }
}
