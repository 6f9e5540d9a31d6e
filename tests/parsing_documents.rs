//! Whole-document parsing tests, including the file entry point.

use std::path::Path;

use story_weaver::parsing::{parse_file, parse_string, DocumentError};
use story_weaver::story::{ChapterId, GroupId, ListScope, NodeId, TagKind, ValueType};

#[test]
fn parse_file_reads_the_fixture_document() {
    let graph = parse_file(Path::new("tests/fixtures/village.sdc")).expect("fixture parses");
    assert_eq!(graph.states().len(), 3);
    assert_eq!(graph.global_variables().len(), 3);
    assert_eq!(graph.linked_lists().len(), 2);
    assert_eq!(graph.characters().len(), 2);
    assert_eq!(graph.tag_definitions().len(), 2);
    assert_eq!(graph.chapters().len(), 1);
    assert_eq!(graph.groups().len(), 1);
    assert_eq!(graph.nodes().len(), 3);

    let group = graph.get_group(GroupId::new(10)).expect("group 10");
    assert_eq!(group.chapter, ChapterId::new(1));
    assert_eq!(group.linked_lists, ["Profession"]);
    let node_graph = group.node_graph.as_ref().expect("node graph");
    assert_eq!(node_graph.points[&NodeId::new(1)], [NodeId::new(2)]);

    let reputation = graph.get_linked_list("Reputation").expect("Reputation");
    assert_eq!(reputation.scope, ListScope::Both);
    let mood = graph.get_tag_definition("Mood").expect("Mood");
    assert_eq!(mood.kind, TagKind::KeyValue);
    let day = graph.get_global_variable("Day").expect("Day");
    assert_eq!(day.value_type, ValueType::Int);

    let node = graph.get_node(NodeId::new(2)).expect("node 2");
    assert_eq!(node.title, "The Stalls");
    assert_eq!(node.timeline.len(), 2);
}

#[test]
fn parse_file_reports_missing_files_as_io_errors() {
    let error = parse_file(Path::new("tests/fixtures/no-such-file.sdc")).unwrap_err();
    assert!(matches!(error, DocumentError::Io(_)));
}

#[test]
fn sections_may_appear_in_any_order() {
    let source = r#"
        node 1 { title: "First" }
        chapter 1 { name: "Later" }
        states [ "calm" ]
    "#;
    let graph = parse_string(source).expect("parse");
    assert_eq!(graph.nodes().len(), 1);
    assert_eq!(graph.chapters().len(), 1);
    assert_eq!(graph.states(), ["calm"]);
}

#[test]
fn commas_are_optional_and_trailing_commas_are_permitted() {
    let with_commas = r#"states [ "a", "b", "c", ]"#;
    let without_commas = r#"states [ "a" "b" "c" ]"#;
    let first = parse_string(with_commas).expect("parse with commas");
    let second = parse_string(without_commas).expect("parse without commas");
    assert_eq!(first, second);
}

#[test]
fn crlf_documents_parse_like_lf_documents() {
    let lf = "chapter 1 {\n  name: \"One\"\n}\n";
    let crlf = lf.replace('\n', "\r\n");
    assert_eq!(
        parse_string(lf).expect("lf parses"),
        parse_string(&crlf).expect("crlf parses")
    );
}

#[test]
fn the_first_error_wins_across_sections() {
    let source = "states [ 1 ]\nchapter \"x\" { }";
    let error = parse_string(source).unwrap_err();
    assert_eq!(error.line, 1);
    assert!(error.message.contains("expected state name"));
}

#[test]
fn error_messages_are_stable() {
    let error = parse_string("chapter \"one\" { }").unwrap_err();
    insta::assert_snapshot!(
        error.to_string(),
        @r#"Error at line 1, column 9: expected chapter id (got '"one"')"#
    );

    let error = parse_string("node 1 { timeline: { dialogue 1 { } } }").unwrap_err();
    insta::assert_snapshot!(
        error.to_string(),
        @"Error at line 1, column 35: dialogue must contain at least one line (got '}')"
    );
}
