use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Editor;
use crate::list::ListPlugin;
use crate::path::ElementPath;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// UI enablement of a command. `Off` means available but not toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    On,
    Off,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentDirection {
    Indent,
    Outdent,
}

impl IndentDirection {
    pub fn is_indent(self) -> bool {
        self == IndentDirection::Indent
    }

    pub fn sign(self) -> i64 {
        match self {
            IndentDirection::Indent => 1,
            IndentDirection::Outdent => -1,
        }
    }

    /// Global command the direction-specific commands are dispatched from.
    pub fn global_command(self) -> &'static str {
        match self {
            IndentDirection::Indent => "indent",
            IndentDirection::Outdent => "outdent",
        }
    }

    pub fn keystroke(self) -> Keystroke {
        match self {
            IndentDirection::Indent => Keystroke::TAB,
            IndentDirection::Outdent => Keystroke::SHIFT_TAB,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Tab,
    Enter,
    Backspace,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keystroke {
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
}

impl Keystroke {
    pub const TAB: Keystroke = Keystroke::plain(Key::Tab);
    pub const SHIFT_TAB: Keystroke = Keystroke {
        key: Key::Tab,
        shift: true,
        ctrl: false,
        alt: false,
    };

    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
            alt: false,
        }
    }
}

/// Markup a command may produce, for the host's content filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRule {
    pub tags: Vec<String>,
    /// Only adds properties to elements some other rule already allows.
    #[serde(default)]
    pub properties_only: bool,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
}

impl ContentRule {
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn properties_only(mut self) -> Self {
        self.properties_only = true;
        self
    }

    pub fn styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.styles = styles.into_iter().map(Into::into).collect();
        self
    }

    pub fn classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Markup that must be allowed for a command to be usable at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredContent {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
}

type CommandHandler = Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<bool, CommandError> + Send + Sync>;
type RefreshHandler = Arc<dyn Fn(&Editor, &ElementPath<'_>) -> CommandState + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    /// Lower runs first when several commands serve the same global command.
    pub priority: u32,
    pub related_global: Option<String>,
    pub allowed_content: Vec<ContentRule>,
    pub required_content: Option<RequiredContent>,
    pub handler: CommandHandler,
    pub refresh: Option<RefreshHandler>,
}

impl CommandSpec {
    pub const DEFAULT_PRIORITY: u32 = 10;

    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<bool, CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            priority: Self::DEFAULT_PRIORITY,
            related_global: None,
            allowed_content: Vec::new(),
            required_content: None,
            handler: Arc::new(handler),
            refresh: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn related_global(mut self, name: impl Into<String>) -> Self {
        self.related_global = Some(name.into());
        self
    }

    pub fn allowed_content(mut self, rules: Vec<ContentRule>) -> Self {
        self.allowed_content = rules;
        self
    }

    pub fn required_content(mut self, required: RequiredContent) -> Self {
        self.required_content = Some(required);
        self
    }

    pub fn refresh(
        mut self,
        refresh: impl Fn(&Editor, &ElementPath<'_>) -> CommandState + Send + Sync + 'static,
    ) -> Self {
        self.refresh = Some(Arc::new(refresh));
        self
    }

    /// Commands without a refresh handler are always available.
    pub fn state(&self, editor: &Editor, path: &ElementPath<'_>) -> CommandState {
        match &self.refresh {
            Some(refresh) => refresh(editor, path),
            None => CommandState::Off,
        }
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Clone)]
pub struct KeyHandlerSpec {
    pub id: String,
    /// Returns `true` when the keystroke was consumed.
    pub handler: Arc<dyn Fn(&mut Editor, Keystroke) -> bool + Send + Sync>,
}

impl KeyHandlerSpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&mut Editor, Keystroke) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
    fn key_handlers(&self) -> Vec<KeyHandlerSpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<&'static str>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
    key_handlers: Vec<KeyHandlerSpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Host features every editor carries: list indentation.
    pub fn core() -> Self {
        let plugins: Vec<Box<dyn PlatePlugin>> = vec![Box::new(ListPlugin)];
        Self::new(plugins).expect("core registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), String> {
        let id = plugin.id();
        if self.plugins.contains(&id) {
            return Err(format!("Duplicate plugin id: {id}"));
        }

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        self.key_handlers.extend(plugin.key_handlers());
        self.plugins.push(id);
        Ok(())
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.plugins.contains(&id)
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    /// Commands serving the global command `name`, lowest priority first.
    pub fn related_commands(&self, name: &str) -> Vec<CommandSpec> {
        let mut related: Vec<CommandSpec> = self
            .commands
            .values()
            .filter(|cmd| cmd.related_global.as_deref() == Some(name))
            .cloned()
            .collect();
        related.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        related
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn key_handlers(&self) -> &[KeyHandlerSpec] {
        &self.key_handlers
    }

    pub fn allowed_content(&self) -> Vec<&ContentRule> {
        let mut ids: Vec<&String> = self.commands.keys().collect();
        ids.sort();
        ids.into_iter()
            .flat_map(|id| self.commands[id].allowed_content.iter())
            .collect()
    }

    pub fn required_content(&self, command: &str) -> Option<&RequiredContent> {
        self.commands.get(command)?.required_content.as_ref()
    }
}
