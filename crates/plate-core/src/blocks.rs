use crate::core::{ApplyError, Draft, ElementNode, Node, Point};
use crate::dom::{is_flow_container_tag, is_inline_node};
use crate::ops::{Op, Path};

/// Walks the selection of a [`Draft`] at block granularity.
///
/// Construction enlarges the range to whole blocks: bare inline runs touching
/// the range are wrapped into `block_tag` elements on the draft. Iteration
/// then yields every paragraph-level block intersecting the range, in
/// document order, once.
#[derive(Debug)]
pub struct BlockIterator {
    blocks: std::vec::IntoIter<Path>,
}

impl BlockIterator {
    pub fn new(draft: &mut Draft, block_tag: &str) -> Result<Self, ApplyError> {
        let runs = {
            let (start, end) = draft.selection().ordered();
            let mut runs = Vec::new();
            collect_inline_runs(&draft.doc().children, &mut Vec::new(), true, start, end, &mut runs);
            runs
        };

        // Later runs first so earlier paths stay valid.
        for run in runs.into_iter().rev() {
            draft.apply(Op::WrapNodes {
                path: run.path,
                len: run.len,
                wrapper: ElementNode::new(block_tag),
            })?;
        }

        let (start, end) = draft.selection().ordered();
        let mut blocks = Vec::new();
        collect_blocks(&draft.doc().children, &mut Vec::new(), start, end, &mut blocks);

        Ok(Self {
            blocks: blocks.into_iter(),
        })
    }
}

impl Iterator for BlockIterator {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        self.blocks.next()
    }
}

struct InlineRun {
    path: Path,
    len: usize,
}

fn before_start(path: &[usize], start: &Point) -> bool {
    path < start.path.as_slice() && !start.path.starts_with(path)
}

fn after_end(path: &[usize], end: &Point) -> bool {
    path > end.path.as_slice()
}

pub(crate) fn range_intersects(first: &[usize], last: &[usize], start: &Point, end: &Point) -> bool {
    !before_start(last, start) && !after_end(first, end)
}

fn is_blank_run(nodes: &[Node]) -> bool {
    nodes.iter().all(|node| match node {
        Node::Text(t) => t.text.trim().is_empty(),
        Node::Element(_) => false,
    })
}

fn collect_inline_runs(
    children: &[Node],
    path: &mut Path,
    flow: bool,
    start: &Point,
    end: &Point,
    out: &mut Vec<InlineRun>,
) {
    let mut ix = 0;
    while ix < children.len() {
        if is_inline_node(&children[ix]) {
            let run_start = ix;
            while ix < children.len() && is_inline_node(&children[ix]) {
                ix += 1;
            }
            if !flow || is_blank_run(&children[run_start..ix]) {
                continue;
            }
            let mut first = path.clone();
            first.push(run_start);
            let mut last = path.clone();
            last.push(ix - 1);
            if range_intersects(&first, &last, start, end) {
                out.push(InlineRun {
                    path: first,
                    len: ix - run_start,
                });
            }
            continue;
        }

        if let Node::Element(el) = &children[ix] {
            if !el.is_paragraph() {
                path.push(ix);
                collect_inline_runs(
                    &el.children,
                    path,
                    is_flow_container_tag(&el.tag),
                    start,
                    end,
                    out,
                );
                path.pop();
            }
        }
        ix += 1;
    }
}

fn collect_blocks(
    children: &[Node],
    path: &mut Path,
    start: &Point,
    end: &Point,
    out: &mut Vec<Path>,
) {
    for (ix, node) in children.iter().enumerate() {
        let Node::Element(el) = node else {
            continue;
        };
        path.push(ix);
        if range_intersects(path, path, start, end) {
            if el.is_paragraph() {
                out.push(path.clone());
            } else {
                collect_blocks(&el.children, path, start, end, out);
            }
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Document, Editor, Selection};
    use crate::plugin::PluginRegistry;
    use pretty_assertions::assert_eq;

    fn editor(doc: Document, anchor: Point, focus: Point) -> Editor {
        Editor::new(doc, Selection { anchor, focus }, PluginRegistry::default())
    }

    #[test]
    fn yields_each_paragraph_in_range_once() {
        let doc = Document::new(vec![
            Node::paragraph("a"),
            Node::paragraph("b"),
            Node::paragraph("c"),
            Node::paragraph("d"),
        ]);
        let editor = editor(doc, Point::new(vec![2, 0], 0), Point::new(vec![0, 0], 1));
        let mut draft = editor.draft();

        let blocks: Vec<Path> = BlockIterator::new(&mut draft, "p").unwrap().collect();

        assert_eq!(blocks, vec![vec![0], vec![1], vec![2]]);
        assert!(draft.is_empty());
    }

    #[test]
    fn wraps_bare_inline_content_into_blocks() {
        let doc = Document::new(vec![
            Node::text("loose "),
            Node::element("b", vec![Node::text("bold")]),
            Node::paragraph("kept"),
        ]);
        let editor = editor(doc, Point::new(vec![0], 1), Point::new(vec![2, 0], 1));
        let mut draft = editor.draft();

        let blocks: Vec<Path> = BlockIterator::new(&mut draft, "div").unwrap().collect();

        assert_eq!(blocks, vec![vec![0], vec![1]]);
        assert_eq!(
            draft.doc().children[0],
            Node::element(
                "div",
                vec![
                    Node::text("loose "),
                    Node::element("b", vec![Node::text("bold")]),
                ]
            )
        );
        assert_eq!(draft.selection().anchor, Point::new(vec![0, 0], 1));
        assert_eq!(draft.selection().focus, Point::new(vec![1, 0], 1));
    }

    #[test]
    fn wraps_text_directly_inside_table_cells() {
        let cell = Node::element("td", vec![Node::text("cell")]);
        let doc = Document::new(vec![Node::element(
            "table",
            vec![Node::element("tr", vec![cell])],
        )]);
        let editor = editor(
            doc,
            Point::new(vec![0, 0, 0, 0], 0),
            Point::new(vec![0, 0, 0, 0], 0),
        );
        let mut draft = editor.draft();

        let blocks: Vec<Path> = BlockIterator::new(&mut draft, "p").unwrap().collect();

        assert_eq!(blocks, vec![vec![0, 0, 0, 0]]);
        assert_eq!(
            draft.doc().element(&[0, 0, 0, 0]).map(|el| el.tag.as_str()),
            Some("p")
        );
    }

    #[test]
    fn runs_outside_the_range_are_left_alone() {
        let doc = Document::new(vec![
            Node::paragraph("a"),
            Node::text("tail"),
        ]);
        let editor = editor(doc, Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 0));
        let mut draft = editor.draft();

        let blocks: Vec<Path> = BlockIterator::new(&mut draft, "p").unwrap().collect();

        assert_eq!(blocks, vec![vec![0]]);
        assert!(draft.is_empty());
    }
}
