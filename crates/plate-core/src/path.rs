use crate::core::{Document, ElementNode};
use crate::dom::is_block_limit_tag;
use crate::ops::Path;

/// Ancestor chain of a document position, innermost element first.
#[derive(Debug, Clone)]
pub struct ElementPath<'a> {
    doc: &'a Document,
    elements: Vec<Path>,
    block: Option<Path>,
    block_limit: Option<Path>,
}

impl<'a> ElementPath<'a> {
    pub fn new(doc: &'a Document, point_path: &[usize]) -> Self {
        let elements: Vec<Path> = (1..=point_path.len())
            .rev()
            .map(|len| point_path[..len].to_vec())
            .filter(|path| doc.element(path).is_some())
            .collect();

        let mut block = None;
        let mut block_limit = None;
        for path in &elements {
            let Some(el) = doc.element(path) else {
                continue;
            };
            if block.is_none() && el.is_paragraph() {
                block = Some(path.clone());
            }
            if is_block_limit_tag(&el.tag) {
                block_limit = Some(path.clone());
                break;
            }
        }

        Self {
            doc,
            elements,
            block,
            block_limit,
        }
    }

    pub fn doc(&self) -> &'a Document {
        self.doc
    }

    /// Nearest paragraph-level element inside the block limit.
    pub fn block(&self) -> Option<&Path> {
        self.block.as_ref()
    }

    /// Nearest element bounding block editing, such as a table cell. `None`
    /// means the document root.
    pub fn block_limit(&self) -> Option<&Path> {
        self.block_limit.as_ref()
    }

    pub fn element(&self, path: &[usize]) -> Option<&'a ElementNode> {
        self.doc.element(path)
    }

    pub fn elements(&self) -> impl Iterator<Item = (&Path, &'a ElementNode)> + '_ {
        self.elements
            .iter()
            .filter_map(|path| Some((path, self.doc.element(path)?)))
    }

    /// Nearest element satisfying `pred`.
    pub fn contains(&self, pred: impl Fn(&ElementNode) -> bool) -> Option<&Path> {
        self.elements().find(|(_, el)| pred(el)).map(|(path, _)| path)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
