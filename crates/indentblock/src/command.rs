use std::sync::Arc;

use plate_core::{
    is_list_tag, resolve_direction, ApplyError, BlockIterator, CommandError, CommandSpec,
    CommandState, Draft, Editor, EditorConfig, EditorMode, ElementPath, HostListHelpers,
    IndentDirection, KeyHandlerSpec, ListIndent, PlatePlugin, PluginRegistry, QuerySpec,
};
use serde_json::Value;
use tracing::debug;

use crate::config::IndentConfiguration;
use crate::state::evaluate;
use crate::step::{current_level, step, IndentPass};

/// Runs after the list commands when both serve a global indent.
pub const INDENT_BLOCK_PRIORITY: u32 = 20;
pub const LEVEL_QUERY: &str = "indentblock.level";

/// One direction of block indentation.
pub struct IndentBlockCommand {
    direction: IndentDirection,
    config: Arc<IndentConfiguration>,
    lists: Arc<dyn ListIndent>,
}

impl IndentBlockCommand {
    pub fn new(
        direction: IndentDirection,
        config: Arc<IndentConfiguration>,
        lists: Arc<dyn ListIndent>,
    ) -> Self {
        Self {
            direction,
            config,
            lists,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.direction {
            IndentDirection::Indent => "indentblock",
            IndentDirection::Outdent => "outdentblock",
        }
    }

    pub fn direction(&self) -> IndentDirection {
        self.direction
    }

    pub fn refresh(&self, editor: &Editor, path: &ElementPath<'_>) -> CommandState {
        evaluate(
            path,
            &self.config,
            self.direction,
            self.lists.as_ref(),
            editor.config(),
        )
    }

    /// Selections inside a list are handed to the list helpers whole. Other
    /// selections move every block they touch one step, as one undo step.
    pub fn execute(&self, editor: &mut Editor) -> Result<bool, CommandError> {
        let list = editor.element_path().contains(|el| is_list_tag(&el.tag)).cloned();
        if let Some(list) = list {
            debug!(command = self.name(), ?list, "delegating to list indentation");
            return self.lists.indent_list(editor, &list, self.direction);
        }

        let mut draft = editor.draft();
        let changed = self
            .apply(&mut draft, editor.config())
            .map_err(|e| CommandError::new(format!("Failed to {}: {e}", self.name())))?;
        debug!(command = self.name(), changed, "stepped blocks");

        editor
            .commit(draft, format!("command:{}", self.name()))
            .map_err(|e| CommandError::new(format!("Failed to commit {}: {e}", self.name())))?;
        Ok(true)
    }

    /// Steps every block of the draft selection once. Returns how many
    /// blocks changed.
    pub fn apply(&self, draft: &mut Draft, config: &EditorConfig) -> Result<usize, ApplyError> {
        let mut pass = IndentPass::new();
        let mut changed = 0;
        let block_tag = config.enter_mode.block_tag();
        for block in BlockIterator::new(draft, block_tag)? {
            let text_direction = resolve_direction(draft.doc(), &block, config.content_direction);
            if step(draft, &mut pass, &block, &self.config, self.direction, text_direction)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn into_spec(self: Arc<Self>) -> CommandSpec {
        let (label, description, keywords) = match self.direction {
            IndentDirection::Indent => (
                "Increase indent",
                "Indent the selected blocks one step.",
                ["indent", "margin", "nest"],
            ),
            IndentDirection::Outdent => (
                "Decrease indent",
                "Outdent the selected blocks one step.",
                ["outdent", "margin", "unindent"],
            ),
        };
        let exec = Arc::clone(&self);
        let state = Arc::clone(&self);
        CommandSpec::new(self.name(), label, move |editor, _args| exec.execute(editor))
            .description(description)
            .keywords(keywords)
            .priority(INDENT_BLOCK_PRIORITY)
            .related_global(self.direction.global_command())
            .allowed_content(self.config.allowed_content())
            .required_content(self.config.required_content())
            .refresh(move |editor, path| state.refresh(editor, path))
    }
}

/// Block indentation for editors. Registers `indentblock` and
/// `outdentblock`, Tab handling on first list items, and the
/// `indentblock.level` query.
pub struct IndentBlockPlugin {
    config: Arc<IndentConfiguration>,
    lists: Arc<dyn ListIndent>,
}

impl IndentBlockPlugin {
    pub fn new(config: IndentConfiguration, lists: Arc<dyn ListIndent>) -> Self {
        Self {
            config: Arc::new(config),
            lists,
        }
    }

    pub fn with_host_lists(config: IndentConfiguration) -> Self {
        Self::new(config, Arc::new(HostListHelpers))
    }

    pub fn config(&self) -> &IndentConfiguration {
        &self.config
    }

    fn command(&self, direction: IndentDirection) -> Arc<IndentBlockCommand> {
        Arc::new(IndentBlockCommand::new(
            direction,
            Arc::clone(&self.config),
            Arc::clone(&self.lists),
        ))
    }

    fn key_handler(&self, direction: IndentDirection) -> KeyHandlerSpec {
        let lists = Arc::clone(&self.lists);
        let id = format!("indentblock.{}", direction.global_command());
        KeyHandlerSpec::new(id, move |editor, keystroke| {
            if editor.mode() != EditorMode::Wysiwyg || keystroke != direction.keystroke() {
                return false;
            }
            if !lists.is_first_list_item_in_path(&editor.element_path()) {
                return false;
            }
            let global = direction.global_command();
            match editor.exec_global(global) {
                Ok(ran) => debug!(global, ran, "tab on first list item"),
                Err(err) => debug!(global, %err, "tab on first list item failed"),
            }
            true
        })
    }
}

impl PlatePlugin for IndentBlockPlugin {
    fn id(&self) -> &'static str {
        "indentblock"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            self.command(IndentDirection::Indent).into_spec(),
            self.command(IndentDirection::Outdent).into_spec(),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        let config = Arc::clone(&self.config);
        vec![QuerySpec::new(LEVEL_QUERY, move |editor, _args| {
            let path = editor.element_path();
            let level = path
                .block()
                .or(path.block_limit())
                .and_then(|block| {
                    let el = editor.doc().element(block)?;
                    let direction =
                        resolve_direction(editor.doc(), block, editor.config().content_direction);
                    Some(current_level(el, &config, direction))
                })
                .unwrap_or(0);
            Ok(Value::from(level))
        })]
    }

    fn key_handlers(&self) -> Vec<KeyHandlerSpec> {
        vec![
            self.key_handler(IndentDirection::Indent),
            self.key_handler(IndentDirection::Outdent),
        ]
    }
}

/// Host core plugins plus block indentation.
pub fn indent_registry(config: IndentConfiguration) -> Result<PluginRegistry, String> {
    let mut registry = PluginRegistry::core();
    registry.register_plugin(Box::new(IndentBlockPlugin::with_host_lists(config)))?;
    Ok(registry)
}
