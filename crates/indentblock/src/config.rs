use std::collections::BTreeSet;

use plate_core::{ContentRule, EnterMode, RequiredContent};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_INDENT_OFFSET: u32 = 40;
pub const DEFAULT_INDENT_UNIT: &str = "px";

/// Elements that put a selection inside the reach of block indentation.
const SCOPE_TAGS: &[&str] = &[
    "div", "dl", "h1", "h2", "h3", "h4", "h5", "h6", "ol", "p", "pre", "table", "ul",
];

/// Elements that may carry the indentation style or classes.
const INDENTABLE_TAGS: &[&str] = &[
    "div", "h1", "h2", "h3", "h4", "h5", "h6", "ol", "p", "pre", "ul",
];

/// Raw editor settings for block indentation, e.g. from a JSON config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndentSettings {
    /// Classes for successive indent steps. Enables class mode when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_classes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_unit: Option<String>,
}

impl IndentSettings {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("indent class list must not be empty")]
    EmptyClassSequence,
    #[error("invalid indent class name: {0:?}")]
    InvalidClassName(String),
    #[error("indent offset must be greater than zero")]
    ZeroOffset,
    #[error("indent unit must not be empty")]
    EmptyUnit,
    #[error("failed to build indent class matcher: {0}")]
    Regex(#[from] regex::Error),
    #[error("failed to parse indent settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered indent classes. Step `n` is represented by the `n`th class, step 0
/// by none of them.
#[derive(Debug, Clone)]
pub struct ClassSteps {
    sequence: Vec<String>,
    matcher: Regex,
}

impl ClassSteps {
    pub fn new(sequence: Vec<String>) -> Result<Self, ConfigError> {
        if sequence.is_empty() {
            return Err(ConfigError::EmptyClassSequence);
        }
        if let Some(bad) = sequence
            .iter()
            .find(|class| class.is_empty() || class.contains(char::is_whitespace))
        {
            return Err(ConfigError::InvalidClassName(bad.clone()));
        }

        let alternatives = sequence
            .iter()
            .map(|class| regex::escape(class))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&format!(r"(?:^|\s)({alternatives})(?:\s|$)"))?;
        Ok(Self { sequence, matcher })
    }

    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    /// Highest step.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Step encoded in a `class` attribute value.
    pub fn level_of(&self, class_name: &str) -> usize {
        self.matcher
            .captures(class_name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| self.sequence.iter().position(|class| class == m.as_str()))
            .map_or(0, |ix| ix + 1)
    }

    pub fn class_for(&self, level: usize) -> Option<&str> {
        level
            .checked_sub(1)
            .and_then(|ix| self.sequence.get(ix))
            .map(String::as_str)
    }

    /// `class_name` without any indent class.
    pub fn strip(&self, class_name: &str) -> String {
        let mut stripped = class_name.to_string();
        // Adjacent indent classes share a separator, so one pass can miss some.
        while self.matcher.is_match(&stripped) {
            stripped = self.matcher.replace_all(&stripped, " ").into_owned();
        }
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarginSteps {
    offset: u32,
    unit: String,
}

impl MarginSteps {
    pub fn new(offset: u32, unit: impl Into<String>) -> Result<Self, ConfigError> {
        let unit = unit.into();
        if offset == 0 {
            return Err(ConfigError::ZeroOffset);
        }
        if unit.trim().is_empty() {
            return Err(ConfigError::EmptyUnit);
        }
        Ok(Self { offset, unit })
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl Default for MarginSteps {
    fn default() -> Self {
        Self {
            offset: DEFAULT_INDENT_OFFSET,
            unit: DEFAULT_INDENT_UNIT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum IndentMode {
    Classes(ClassSteps),
    Margin(MarginSteps),
}

/// Shared by the indent and outdent commands of one editor.
#[derive(Debug, Clone)]
pub struct IndentConfiguration {
    mode: IndentMode,
    enter_mode: EnterMode,
    scope_tags: BTreeSet<String>,
}

impl IndentConfiguration {
    pub fn new(mode: IndentMode) -> Self {
        Self {
            mode,
            enter_mode: EnterMode::default(),
            scope_tags: SCOPE_TAGS.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    pub fn classes<I, S>(classes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps = ClassSteps::new(classes.into_iter().map(Into::into).collect())?;
        Ok(Self::new(IndentMode::Classes(steps)))
    }

    pub fn margin(offset: u32, unit: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self::new(IndentMode::Margin(MarginSteps::new(offset, unit)?)))
    }

    pub fn from_settings(settings: &IndentSettings) -> Result<Self, ConfigError> {
        match &settings.indent_classes {
            Some(classes) => Self::classes(classes.iter().cloned()),
            None => Self::margin(
                settings.indent_offset.unwrap_or(DEFAULT_INDENT_OFFSET),
                settings
                    .indent_unit
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INDENT_UNIT.to_string()),
            ),
        }
    }

    pub fn with_enter_mode(mut self, enter_mode: EnterMode) -> Self {
        self.enter_mode = enter_mode;
        self
    }

    pub fn mode(&self) -> &IndentMode {
        &self.mode
    }

    pub fn enter_mode(&self) -> EnterMode {
        self.enter_mode
    }

    pub fn scope_tags(&self) -> &BTreeSet<String> {
        &self.scope_tags
    }

    pub fn in_scope(&self, tag: &str) -> bool {
        self.scope_tags.contains(tag)
    }

    /// Markup the indentation commands may write.
    pub fn allowed_content(&self) -> Vec<ContentRule> {
        let rule = ContentRule::tags(INDENTABLE_TAGS.iter().copied()).properties_only();
        let rule = match &self.mode {
            IndentMode::Classes(steps) => rule.classes(steps.sequence().iter().cloned()),
            IndentMode::Margin(_) => rule.styles(["margin-left", "margin-right"]),
        };
        let mut rules = vec![rule];
        if self.enter_mode == EnterMode::Br {
            rules.push(ContentRule::tags(["div"]));
        }
        rules
    }

    pub fn required_content(&self) -> RequiredContent {
        let tag = match self.enter_mode {
            EnterMode::Br => "div",
            EnterMode::P | EnterMode::Div => "p",
        };
        match &self.mode {
            IndentMode::Classes(steps) => RequiredContent {
                tag: tag.to_string(),
                style: None,
                classes: steps.sequence().to_vec(),
            },
            IndentMode::Margin(_) => RequiredContent {
                tag: tag.to_string(),
                style: Some("margin-left".to_string()),
                classes: Vec::new(),
            },
        }
    }
}

impl Default for IndentConfiguration {
    fn default() -> Self {
        Self::new(IndentMode::Margin(MarginSteps::default()))
    }
}
