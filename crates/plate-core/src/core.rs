use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::dom::TextDirection;
use crate::ops::{Op, Path, Transaction};
use crate::path::ElementPath;
use crate::plugin::{CommandError, CommandState, Keystroke, PluginRegistry, QueryError};

pub type Attrs = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        self.node(path).and_then(Node::as_element)
    }

    /// Children of the element at `parent`, or of the document root for an empty path.
    pub fn children_at(&self, parent: &[usize]) -> Option<&[Node]> {
        if parent.is_empty() {
            return Some(&self.children);
        }
        self.element(parent).map(|el| el.children.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode { text: text.into() })
    }

    pub fn element(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(ElementNode::new(tag).with_children(children))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element("p", vec![Node::text(text)])
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }
}

impl From<ElementNode> for Node {
    fn from(el: ElementNode) -> Self {
        Node::Element(el)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Attrs::default(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// Anchor and focus in document order.
    pub fn ordered(&self) -> (&Point, &Point) {
        let (a, b) = (&self.anchor, &self.focus);
        if (&b.path, b.offset) < (&a.path, a.offset) {
            (b, a)
        } else {
            (a, b)
        }
    }
}

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnterMode {
    #[default]
    P,
    Div,
    Br,
}

impl EnterMode {
    /// Tag used when bare inline content has to be wrapped in a block.
    pub fn block_tag(self) -> &'static str {
        match self {
            EnterMode::P => "p",
            EnterMode::Div | EnterMode::Br => "div",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    #[default]
    Wysiwyg,
    Source,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub enter_mode: EnterMode,
    pub content_direction: TextDirection,
}

impl EditorConfig {
    fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        self
    }
}

/// Working copy of the document that commands stage ops against before
/// committing them as a single transaction.
#[derive(Debug, Clone)]
pub struct Draft {
    doc: Document,
    selection: Selection,
    ops: Vec<Op>,
}

impl Draft {
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn apply(&mut self, op: Op) -> Result<(), ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op.clone())?;
        self.ops.push(op);
        Ok(())
    }
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    registry: PluginRegistry,
    config: EditorConfig,
    mode: EditorMode,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let selection = normalize_selection(&doc, &selection);
        Self {
            doc,
            selection,
            registry,
            config: config.with_defaults(),
            mode: EditorMode::default(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn with_core_plugins() -> Self {
        let doc = Document::new(vec![Node::paragraph("")]);
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Self::new(doc, selection, PluginRegistry::core())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = normalize_selection(&self.doc, &selection);
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    /// Element path at the start of the selection.
    pub fn element_path(&self) -> ElementPath<'_> {
        let (start, _) = self.selection.ordered();
        ElementPath::new(&self.doc, &start.path)
    }

    pub fn draft(&self) -> Draft {
        Draft {
            doc: self.doc.clone(),
            selection: self.selection.clone(),
            ops: Vec::new(),
        }
    }

    /// Applies the ops staged on `draft` as one undo step. Returns `false`
    /// when nothing was staged.
    pub fn commit(&mut self, draft: Draft, source: impl Into<String>) -> Result<bool, ApplyError> {
        if draft.is_empty() {
            return Ok(false);
        }
        let Draft { selection, ops, .. } = draft;
        self.apply(Transaction::new(ops).selection_after(selection).source(source))?;
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };
        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let redo_ops = self.replay(inverse_ops);
        self.selection = normalize_selection(&self.doc, &selection_before);

        self.redo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: redo_ops,
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };
        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let undo_ops = self.replay(inverse_ops);
        self.selection = normalize_selection(&self.doc, &selection_after);

        self.undo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: undo_ops,
        });
        true
    }

    fn replay(&mut self, ops: Vec<Op>) -> Vec<Op> {
        let mut inverse: Vec<Op> = Vec::new();
        for op in ops {
            match apply_op_to(&mut self.doc, &mut self.selection, op) {
                Ok(inv) => inverse.push(inv),
                Err(err) => {
                    // Stop mutating once the history no longer lines up with the document.
                    debug!(%err, "history replay stopped");
                    break;
                }
            }
        }
        inverse.reverse();
        inverse
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        trace!(ops = tx.ops.len(), source = ?tx.meta.source, "applying transaction");
        let selection_before = self.selection.clone();

        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in tx.ops {
            let inv = apply_op_to(&mut self.doc, &mut self.selection, op)?;
            inverse_ops.push(inv);
        }
        inverse_ops.reverse();

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }
        self.selection = normalize_selection(&self.doc, &self.selection);

        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after: self.selection.clone(),
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }

        Ok(())
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<bool, CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        if self.mode != EditorMode::Wysiwyg {
            debug!(command = id, "command ignored outside wysiwyg mode");
            return Ok(false);
        }
        (command.handler)(self, args)
    }

    pub fn command_state(&self, id: &str) -> Result<CommandState, CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        if self.mode != EditorMode::Wysiwyg {
            return Ok(CommandState::Disabled);
        }
        let path = self.element_path();
        Ok(command.state(self, &path))
    }

    /// Runs the first enabled command related to the global command `name`,
    /// in ascending priority order.
    pub fn exec_global(&mut self, name: &str) -> Result<bool, CommandError> {
        for command in self.registry.related_commands(name) {
            if self.command_state(&command.id)? == CommandState::Disabled {
                trace!(global = name, command = %command.id, "skipping disabled command");
                continue;
            }
            debug!(
                global = name,
                command = %command.id,
                priority = command.priority,
                "dispatching global command"
            );
            return self.run_command(&command.id, None);
        }
        Ok(false)
    }

    pub fn global_state(&self, name: &str) -> Result<CommandState, CommandError> {
        for command in self.registry.related_commands(name) {
            if self.command_state(&command.id)? != CommandState::Disabled {
                return Ok(CommandState::Off);
            }
        }
        Ok(CommandState::Disabled)
    }

    /// Offers `keystroke` to the registered key handlers. Returns `true` when
    /// a handler consumed it.
    pub fn handle_key(&mut self, keystroke: Keystroke) -> bool {
        let handlers = self.registry.key_handlers().to_vec();
        for handler in handlers {
            if (handler.handler)(self, keystroke) {
                debug!(handler = %handler.id, ?keystroke, "key consumed");
                return true;
            }
        }
        false
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }
}

fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<Op, ApplyError> {
    match op {
        Op::SetNodeAttrs { path, patch } => {
            let el = element_mut(doc, &path)?;
            let old = patch_apply(&mut el.attrs, &patch);
            Ok(Op::SetNodeAttrs { path, patch: old })
        }
        Op::WrapNodes {
            path,
            len,
            mut wrapper,
        } => {
            let (parent, index) = split_path(&path)?;
            let children = children_mut(doc, parent)?;
            if index + len > children.len() {
                return Err(PathError::OutOfBounds {
                    depth: parent.len(),
                    index: index + len,
                    len: children.len(),
                }
                .into());
            }
            wrapper.children = children.drain(index..index + len).collect();
            children.insert(index, Node::Element(wrapper));
            transform_selection_wrap(selection, parent, index, len);
            Ok(Op::UnwrapNode { path })
        }
        Op::UnwrapNode { path } => {
            let (parent, index) = split_path(&path)?;
            let children = children_mut(doc, parent)?;
            if index >= children.len() {
                return Err(PathError::OutOfBounds {
                    depth: parent.len(),
                    index,
                    len: children.len(),
                }
                .into());
            }
            let Node::Element(_) = &children[index] else {
                return Err(PathError::NotAnElement { path: path.clone() }.into());
            };
            let Node::Element(mut wrapper) = children.remove(index) else {
                return Err(PathError::NotAnElement { path: path.clone() }.into());
            };
            let moved = std::mem::take(&mut wrapper.children);
            let len = moved.len();
            children.splice(index..index, moved);
            transform_selection_unwrap(selection, parent, index, len);
            Ok(Op::WrapNodes { path, len, wrapper })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("path out of bounds at depth {depth}: {index} > {len}")]
    OutOfBounds {
        depth: usize,
        index: usize,
        len: usize,
    },
    #[error("non-container node at depth {depth}")]
    NotAContainer { depth: usize },
    #[error("expected an element at {path:?}")]
    NotAnElement { path: Path },
}

fn split_path(path: &[usize]) -> Result<(&[usize], usize), PathError> {
    let (last, parent) = path.split_last().ok_or(PathError::Empty)?;
    Ok((parent, *last))
}

fn children_mut<'a>(doc: &'a mut Document, parent: &[usize]) -> Result<&'a mut Vec<Node>, PathError> {
    let mut children = &mut doc.children;
    for (depth, &ix) in parent.iter().enumerate() {
        let len = children.len();
        children = match children.get_mut(ix) {
            Some(Node::Element(el)) => &mut el.children,
            Some(Node::Text(_)) => return Err(PathError::NotAContainer { depth }),
            None => {
                return Err(PathError::OutOfBounds {
                    depth,
                    index: ix,
                    len,
                });
            }
        };
    }
    Ok(children)
}

fn element_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut ElementNode, PathError> {
    let (parent, index) = split_path(path)?;
    let children = children_mut(doc, parent)?;
    let len = children.len();
    match children.get_mut(index) {
        Some(Node::Element(el)) => Ok(el),
        Some(Node::Text(_)) => Err(PathError::NotAnElement {
            path: path.to_vec(),
        }),
        None => Err(PathError::OutOfBounds {
            depth: parent.len(),
            index,
            len,
        }),
    }
}

fn transform_selection_wrap(selection: &mut Selection, parent: &[usize], index: usize, len: usize) {
    let depth = parent.len();
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= depth || !point.path.starts_with(parent) {
            continue;
        }
        let ix = point.path[depth];
        if ix >= index + len {
            point.path[depth] = ix + 1 - len;
        } else if ix >= index {
            point.path[depth] = index;
            point.path.insert(depth + 1, ix - index);
        }
    }
}

fn transform_selection_unwrap(
    selection: &mut Selection,
    parent: &[usize],
    index: usize,
    len: usize,
) {
    let depth = parent.len();
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= depth || !point.path.starts_with(parent) {
            continue;
        }
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix + len - 1;
        } else if ix == index && point.path.len() > depth + 1 {
            let child = point.path.remove(depth + 1);
            point.path[depth] = index + child;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.insert(name.into(), value.into());
        self
    }

    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.remove.push(name.into());
        self
    }
}

fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) -> AttrPatch {
    let mut old_set: Attrs = Attrs::new();
    let mut old_remove: Vec<String> = Vec::new();

    for (k, v) in &patch.set {
        if let Some(prev) = attrs.insert(k.clone(), v.clone()) {
            old_set.insert(k.clone(), prev);
        } else {
            old_remove.push(k.clone());
        }
    }

    for key in &patch.remove {
        if let Some(prev) = attrs.remove(key) {
            old_set.insert(key.clone(), prev);
        }
    }

    AttrPatch {
        set: old_set,
        remove: old_remove,
    }
}

/// Moves both selection points onto nodes that exist in `doc`, preferring
/// text leaves.
fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let fallback = Point::new(vec![0], 0);
    let anchor = normalize_point(doc, &selection.anchor)
        .or_else(|| normalize_point(doc, &selection.focus))
        .unwrap_or(fallback);
    let focus = normalize_point(doc, &selection.focus).unwrap_or_else(|| anchor.clone());
    Selection { anchor, focus }
}

fn normalize_point(doc: &Document, point: &Point) -> Option<Point> {
    fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => return Some(Point::new(path.clone(), 0)),
                Node::Element(el) => {
                    if let Some(point) = first_text_descendant(&el.children, path) {
                        return Some(point);
                    }
                }
            }
            path.pop();
        }
        None
    }

    if doc.children.is_empty() {
        return None;
    }

    let mut resolved: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;
    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point::new(resolved, point.offset.min(t.text.len())));
            }
            Node::Element(el) => children = &el.children,
        }
    }

    if resolved.is_empty() {
        resolved.push(0);
        children = match &doc.children[0] {
            Node::Element(el) => &el.children,
            Node::Text(t) => return Some(Point::new(resolved, point.offset.min(t.text.len()))),
        };
    }

    // Empty elements keep the caret on the element itself.
    let mut descend = resolved.clone();
    Some(first_text_descendant(children, &mut descend).unwrap_or_else(|| Point::new(resolved, 0)))
}
