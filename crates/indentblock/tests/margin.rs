use plate_core::{
    CommandState, Document, Editor, EditorConfig, EditorMode, ElementNode, EnterMode, Node, Point,
    Selection, TextDirection,
};
use plate_indentblock::{indent_registry, IndentConfiguration};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn editor(children: Vec<Node>, selection: Selection) -> Editor {
    editor_with(children, selection, IndentConfiguration::default(), EditorConfig::default())
}

fn editor_with(
    children: Vec<Node>,
    selection: Selection,
    indent: IndentConfiguration,
    config: EditorConfig,
) -> Editor {
    init_tracing();
    let registry = indent_registry(indent).unwrap();
    Editor::with_config(Document::new(children), selection, registry, config)
}

fn caret(path: Vec<usize>) -> Selection {
    Selection::collapsed(Point::new(path, 0))
}

fn styled(style: &str, text: &str) -> Node {
    Node::Element(
        ElementNode::new("p")
            .with_attr("style", style)
            .with_children(vec![Node::text(text)]),
    )
}

fn style_at(editor: &Editor, path: &[usize]) -> Option<String> {
    editor
        .doc()
        .element(path)
        .and_then(|el| el.attr("style"))
        .map(str::to_string)
}

#[test]
fn indent_and_outdent_round_trip_through_margins() {
    let mut editor = editor(vec![Node::paragraph("x")], caret(vec![0, 0]));
    assert_eq!(editor.command_state("outdentblock").unwrap(), CommandState::Disabled);

    assert!(editor.run_command("indentblock", None).unwrap());
    assert_eq!(style_at(&editor, &[0]).as_deref(), Some("margin-left: 40px;"));
    assert_eq!(editor.run_query::<i64>("indentblock.level", None).unwrap(), 40);

    editor.run_command("indentblock", None).unwrap();
    assert_eq!(style_at(&editor, &[0]).as_deref(), Some("margin-left: 80px;"));
    assert_eq!(editor.command_state("outdentblock").unwrap(), CommandState::Off);

    editor.run_command("outdentblock", None).unwrap();
    editor.run_command("outdentblock", None).unwrap();
    assert_eq!(style_at(&editor, &[0]), None);
    assert_eq!(editor.run_query::<i64>("indentblock.level", None).unwrap(), 0);
    assert_eq!(editor.command_state("outdentblock").unwrap(), CommandState::Disabled);
}

#[test]
fn each_selected_paragraph_moves_one_step() {
    let selection = Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![2, 0], 1),
    };
    let mut editor = editor(
        vec![
            Node::paragraph("a"),
            styled("margin-left: 40px;", "b"),
            Node::paragraph("c"),
            Node::paragraph("d"),
        ],
        selection,
    );

    editor.run_command("indentblock", None).unwrap();

    assert_eq!(style_at(&editor, &[0]).as_deref(), Some("margin-left: 40px;"));
    assert_eq!(style_at(&editor, &[1]).as_deref(), Some("margin-left: 80px;"));
    assert_eq!(style_at(&editor, &[2]).as_deref(), Some("margin-left: 40px;"));
    assert_eq!(style_at(&editor, &[3]), None);
}

#[rstest]
#[case("margin-left: abc", "indentblock", Some("margin-left: 40px;"))]
#[case("margin-left: 25px", "indentblock", Some("margin-left: 80px;"))]
#[case("margin-left: 55px", "outdentblock", Some("margin-left: 40px;"))]
#[case("margin-left: 40px", "outdentblock", None)]
#[case("color: red; margin-left: 40px", "outdentblock", Some("color: red;"))]
#[case("color: red", "indentblock", Some("color: red; margin-left: 40px;"))]
#[case(
    "background: url(data:image/png;base64,AAAA); margin-left: 40px",
    "indentblock",
    Some("background: url(data:image/png;base64,AAAA); margin-left: 80px;")
)]
#[case(
    "font-family: \"a;b\"",
    "indentblock",
    Some("font-family: \"a;b\"; margin-left: 40px;")
)]
#[case(
    "margin-left: 9223372036854775807px",
    "indentblock",
    Some("margin-left: 9223372036854775807px")
)]
fn margins_snap_to_the_offset(
    #[case] before: &str,
    #[case] command: &str,
    #[case] after: Option<&str>,
) {
    let mut editor = editor(vec![styled(before, "x")], caret(vec![0, 0]));

    editor.run_command(command, None).unwrap();

    assert_eq!(style_at(&editor, &[0]).as_deref(), after);
}

#[test]
fn non_numeric_margin_cannot_be_outdented() {
    let editor = editor(vec![styled("margin-left: abc", "x")], caret(vec![0, 0]));
    assert_eq!(editor.command_state("outdentblock").unwrap(), CommandState::Disabled);
    assert_eq!(editor.command_state("indentblock").unwrap(), CommandState::Off);
}

#[test]
fn rtl_blocks_indent_on_the_right() {
    let rtl = Node::Element(
        ElementNode::new("p")
            .with_attr("dir", "rtl")
            .with_children(vec![Node::text("x")]),
    );
    let mut editor = editor(vec![rtl], caret(vec![0, 0]));

    editor.run_command("indentblock", None).unwrap();

    assert_eq!(style_at(&editor, &[0]).as_deref(), Some("margin-right: 40px;"));
    assert_eq!(editor.command_state("outdentblock").unwrap(), CommandState::Off);
}

#[test]
fn content_direction_applies_to_blocks_without_dir() {
    let config = EditorConfig {
        content_direction: TextDirection::Rtl,
        ..EditorConfig::default()
    };
    let mut editor = editor_with(
        vec![Node::paragraph("x")],
        caret(vec![0, 0]),
        IndentConfiguration::margin(2, "em").unwrap(),
        config,
    );

    editor.run_command("indentblock", None).unwrap();

    assert_eq!(style_at(&editor, &[0]).as_deref(), Some("margin-right: 2em;"));
}

fn enter_mode(enter_mode: EnterMode) -> EditorConfig {
    EditorConfig {
        enter_mode,
        ..EditorConfig::default()
    }
}

#[test]
fn bare_inline_content_is_wrapped_before_indenting() {
    let indent = IndentConfiguration::default().with_enter_mode(EnterMode::Br);
    let mut editor = editor_with(
        vec![
            Node::text("loose "),
            Node::element("b", vec![Node::text("bold")]),
            Node::paragraph("kept"),
        ],
        caret(vec![0]),
        indent,
        enter_mode(EnterMode::Br),
    );
    assert_eq!(editor.command_state("indentblock").unwrap(), CommandState::Off);

    editor.run_command("indentblock", None).unwrap();

    let Node::Element(wrapper) = &editor.doc().children[0] else {
        panic!("expected wrapper block");
    };
    assert_eq!(wrapper.tag, "div");
    assert_eq!(wrapper.children.len(), 2);
    assert_eq!(wrapper.attr("style"), Some("margin-left: 40px;"));
    assert_eq!(style_at(&editor, &[1]), None);
    assert_eq!(editor.selection().anchor.path, vec![0, 0]);
}

#[test]
fn selection_outside_indentable_elements_is_disabled() {
    let editor = editor(
        vec![Node::element("blockquote", vec![Node::text("quote")])],
        caret(vec![0, 0]),
    );
    assert_eq!(editor.command_state("indentblock").unwrap(), CommandState::Disabled);
    assert_eq!(editor.command_state("outdentblock").unwrap(), CommandState::Disabled);
}

#[test]
fn table_cells_are_in_scope() {
    let cell = Node::element("td", vec![Node::text("cell")]);
    let table = Node::element("table", vec![Node::element("tr", vec![cell])]);
    let mut editor = editor(vec![table], caret(vec![0, 0, 0, 0]));
    assert_eq!(editor.command_state("indentblock").unwrap(), CommandState::Off);

    editor.run_command("indentblock", None).unwrap();

    let Some(block) = editor.doc().element(&[0, 0, 0, 0]) else {
        panic!("expected wrapped cell content");
    };
    assert_eq!(block.tag, "p");
    assert_eq!(block.attr("style"), Some("margin-left: 40px;"));
}

#[test]
fn editor_enter_mode_picks_the_wrapper_tag() {
    let cell = Node::element("td", vec![Node::text("cell")]);
    let table = Node::element("table", vec![Node::element("tr", vec![cell])]);
    let mut editor = editor_with(
        vec![table],
        caret(vec![0, 0, 0, 0]),
        IndentConfiguration::default(),
        enter_mode(EnterMode::Div),
    );

    editor.run_command("indentblock", None).unwrap();

    let Some(block) = editor.doc().element(&[0, 0, 0, 0]) else {
        panic!("expected wrapped cell content");
    };
    assert_eq!(block.tag, "div");
    assert_eq!(block.attr("style"), Some("margin-left: 40px;"));
}

#[test]
fn br_enter_mode_on_the_editor_lifts_the_scope_check() {
    let quote = vec![Node::element("blockquote", vec![Node::text("quote")])];
    let br = editor_with(
        quote.clone(),
        caret(vec![0, 0]),
        IndentConfiguration::default(),
        enter_mode(EnterMode::Br),
    );
    assert_eq!(br.command_state("indentblock").unwrap(), CommandState::Off);

    let paragraphs = editor(quote, caret(vec![0, 0]));
    assert_eq!(paragraphs.command_state("indentblock").unwrap(), CommandState::Disabled);
}

#[test]
fn one_execution_is_one_undo_step() {
    let selection = Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![1, 0], 0),
    };
    let mut editor = editor(vec![Node::paragraph("a"), Node::paragraph("b")], selection);
    let before = editor.doc().clone();

    editor.run_command("indentblock", None).unwrap();
    assert_ne!(editor.doc(), &before);

    assert!(editor.undo());
    assert_eq!(editor.doc(), &before);
    assert!(!editor.can_undo());

    assert!(editor.redo());
    assert_eq!(style_at(&editor, &[1]).as_deref(), Some("margin-left: 40px;"));
}

#[test]
fn outdent_at_zero_records_no_history() {
    let mut editor = editor(vec![Node::paragraph("x")], caret(vec![0, 0]));

    assert!(editor.run_command("outdentblock", None).unwrap());

    assert!(!editor.can_undo());
    assert_eq!(style_at(&editor, &[0]), None);
}

#[test]
fn source_mode_disables_the_commands() {
    let mut editor = editor(vec![Node::paragraph("x")], caret(vec![0, 0]));
    editor.set_mode(EditorMode::Source);

    assert_eq!(editor.command_state("indentblock").unwrap(), CommandState::Disabled);
    assert!(!editor.run_command("indentblock", None).unwrap());
    assert_eq!(style_at(&editor, &[0]), None);
}

#[test]
fn global_indent_falls_through_to_block_indentation() {
    let mut editor = editor(vec![Node::paragraph("x")], caret(vec![0, 0]));
    assert_eq!(editor.global_state("indent").unwrap(), CommandState::Off);
    assert_eq!(editor.global_state("outdent").unwrap(), CommandState::Disabled);

    assert!(editor.exec_global("indent").unwrap());

    assert_eq!(style_at(&editor, &[0]).as_deref(), Some("margin-left: 40px;"));
}
