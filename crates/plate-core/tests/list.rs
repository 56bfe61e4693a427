use plate_core::{
    CommandState, Document, Editor, ElementNode, Node, PluginRegistry, Point, Selection,
    MAX_LIST_LEVEL,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn item(text: &str, level: Option<u64>) -> Node {
    let mut el = ElementNode::new("li").with_children(vec![Node::text(text)]);
    if let Some(level) = level {
        el = el.with_attr("data-level", level.to_string());
    }
    Node::Element(el)
}

fn list_editor(items: Vec<Node>, anchor: Vec<usize>, focus: Vec<usize>) -> Editor {
    let doc = Document::new(vec![Node::element("ol", items)]);
    let selection = Selection {
        anchor: Point::new(anchor, 0),
        focus: Point::new(focus, 0),
    };
    Editor::new(doc, selection, PluginRegistry::core())
}

fn levels(editor: &Editor) -> Vec<u64> {
    editor
        .doc()
        .children_at(&[0])
        .unwrap_or_default()
        .iter()
        .filter_map(Node::as_element)
        .map(plate_core::list_item_level)
        .collect()
}

#[test]
fn indenting_later_items_only_moves_the_selection() {
    let mut editor = list_editor(
        vec![item("a", None), item("b", None), item("c", None)],
        vec![0, 1, 0],
        vec![0, 2, 0],
    );

    assert!(editor.run_command("indentlist", None).unwrap());

    assert_eq!(levels(&editor), vec![0, 1, 1]);
    assert_eq!(editor.run_query::<u64>("list.level", None).unwrap(), 1);
}

#[test]
fn indenting_from_the_first_item_moves_the_whole_list() {
    let mut editor = list_editor(
        vec![item("a", None), item("b", Some(2))],
        vec![0, 0, 0],
        vec![0, 0, 0],
    );

    editor.run_command("indentlist", None).unwrap();

    assert_eq!(levels(&editor), vec![1, 3]);
}

#[rstest]
#[case(vec![None, None], "indentlist", CommandState::Off)]
#[case(vec![None, None], "outdentlist", CommandState::Disabled)]
#[case(vec![Some(1), None], "outdentlist", CommandState::Off)]
#[case(vec![Some(MAX_LIST_LEVEL), Some(MAX_LIST_LEVEL)], "indentlist", CommandState::Disabled)]
fn list_state_follows_item_levels(
    #[case] item_levels: Vec<Option<u64>>,
    #[case] command: &str,
    #[case] expected: CommandState,
) {
    let items = item_levels
        .into_iter()
        .enumerate()
        .map(|(ix, level)| item(&ix.to_string(), level))
        .collect();
    let editor = list_editor(items, vec![0, 0, 0], vec![0, 0, 0]);

    assert_eq!(editor.command_state(command).unwrap(), expected);
}

#[test]
fn outdenting_to_zero_drops_the_level_attribute() {
    let mut editor = list_editor(vec![item("a", Some(1))], vec![0, 0, 0], vec![0, 0, 0]);

    editor.run_command("outdentlist", None).unwrap();

    let Some(el) = editor.doc().element(&[0, 0]) else {
        panic!("expected list item");
    };
    assert_eq!(el.attr("data-level"), None);
}

#[test]
fn list_commands_are_disabled_outside_lists() {
    let doc = Document::new(vec![Node::paragraph("x")]);
    let editor = Editor::new(
        doc,
        Selection::collapsed(Point::new(vec![0, 0], 0)),
        PluginRegistry::core(),
    );
    assert_eq!(editor.command_state("indentlist").unwrap(), CommandState::Disabled);
    assert_eq!(editor.global_state("indent").unwrap(), CommandState::Disabled);
}
