//! Invariant checks over a corpus of representative documents.

use std::collections::HashSet;
use std::fs;

use story_weaver::execution::{ExecutionResult, StoryCursor, Target};
use story_weaver::parsing::{parse_string, tokenize};
use story_weaver::story::{validate_references, ChapterId, GroupId, NodeId, RefKind, StoryGraph};

fn fixture() -> String {
    fs::read_to_string("tests/fixtures/village.sdc").expect("fixture should be readable")
}

fn corpus() -> Vec<String> {
    vec![
        fixture(),
        r#"states [ "calm" ]"#.to_string(),
        "chapter 1 { name: \"CR\" }\r\nchapter 2 { name: \"LF\" }\n".to_string(),
        r#"node 1 { timeline: { action 1 { type: "code" <! a = "b#c"; !> } } }"#.to_string(),
    ]
}

/// The source minus whitespace and comments, leaving string and code-block
/// interiors untouched.
fn strip_trivia(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            out.push(c);
            i += 1;
            while i < chars.len() {
                out.push(chars[i]);
                if chars[i] == '"' {
                    i += 1;
                    break;
                }
                i += 1;
            }
        } else if c == '<' && chars.get(i + 1) == Some(&'!') {
            out.push_str("<!");
            i += 2;
            while i < chars.len() {
                if chars[i] == '!' && chars.get(i + 1) == Some(&'>') {
                    out.push_str("!>");
                    i += 2;
                    break;
                }
                out.push(chars[i]);
                i += 1;
            }
        } else if c == '#' {
            while i < chars.len() && chars[i] != '\n' && chars[i] != '\r' {
                i += 1;
            }
        } else if c.is_whitespace() {
            i += 1;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

#[test]
fn lexeme_concatenation_reproduces_the_source() {
    for source in corpus() {
        parse_string(&source).expect("corpus documents should parse");
        let concatenated: String = tokenize(&source)
            .iter()
            .map(|token| token.lexeme.as_str())
            .collect();
        assert_eq!(concatenated, strip_trivia(&source));
    }
}

#[test]
fn token_lines_count_preceding_terminators() {
    // each of \n, \r, and \r\n advances the line exactly once
    let source = "states\n[\r\"a\"\r\n]";
    let positions: Vec<_> = tokenize(source)
        .iter()
        .map(|token| (token.line, token.column))
        .collect();
    assert_eq!(positions, vec![(1, 1), (2, 1), (3, 1), (4, 1), (4, 2)]);
}

#[test]
fn parsed_graphs_have_unique_ids_and_names() {
    for source in corpus() {
        let graph = parse_string(&source).expect("corpus documents should parse");
        assert_unique(graph.chapters().iter().map(|c| c.id.into_inner()));
        assert_unique(graph.groups().iter().map(|g| g.id.into_inner()));
        assert_unique(graph.nodes().iter().map(|n| n.id.into_inner()));
        assert_unique(graph.states().iter().cloned());
        assert_unique(graph.global_variables().iter().map(|v| v.name.clone()));
        assert_unique(graph.tag_definitions().iter().map(|t| t.name.clone()));
        assert_unique(graph.linked_lists().iter().map(|l| l.name.clone()));
        assert_unique(graph.characters().iter().map(|c| c.name.clone()));
    }
}

fn assert_unique<T: std::hash::Hash + Eq + std::fmt::Debug>(items: impl Iterator<Item = T>) {
    let mut seen = HashSet::new();
    for item in items {
        assert!(seen.insert(item), "duplicate entry in parsed graph");
    }
}

#[test]
fn variable_defaults_match_their_declared_types() {
    for source in corpus() {
        let graph = parse_string(&source).expect("corpus documents should parse");
        for variable in graph.global_variables() {
            assert_eq!(variable.default.value_type(), variable.value_type);
        }
    }
}

#[test]
fn validator_accepts_fully_resolved_documents() {
    let graph = parse_string(&fixture()).expect("fixture should parse");
    assert_eq!(validate_references(&graph), Ok(()));
}

#[test]
fn validator_names_the_first_unresolved_reference() {
    let source = r#"
        node 1 { timeline: { action 1 { type: "event" goto: @node(99) } } }
    "#;
    let graph = parse_string(source).expect("parse");
    let error = validate_references(&graph).unwrap_err();
    assert_eq!(error.kind, RefKind::Node);
    assert_eq!(error.id, 99);
    assert_eq!(error.context, "node 1");
    assert_eq!(
        error.to_string(),
        "unresolved node reference 99 in node 1"
    );
}

#[test]
fn validator_checks_group_edges_and_choice_actions() {
    let missing_chapter = parse_string("group 1 { chapter: 7 }").expect("parse");
    let error = validate_references(&missing_chapter).unwrap_err();
    assert_eq!(error.kind, RefKind::Chapter);
    assert_eq!(error.id, 7);

    let missing_point = parse_string(
        r#"
        chapter 1 { name: "A" }
        group 1 { chapter: 1, nodes: { start: 1, end: 1, points: { 1: [5] } } }
        node 1 { }
        "#,
    )
    .expect("parse");
    let error = validate_references(&missing_point).unwrap_err();
    assert_eq!(error.kind, RefKind::Node);
    assert_eq!(error.id, 5);

    let nested = parse_string(
        r#"
        node 1 { timeline: { action 1 { type: "choice" choices: [
            { text: "Go" choice: { action 2 { type: "event" enter: @group(42) } } },
        ] } } }
        "#,
    )
    .expect("parse");
    let error = validate_references(&nested).unwrap_err();
    assert_eq!(error.kind, RefKind::Group);
    assert_eq!(error.id, 42);
}

fn run_fixture(graph: &StoryGraph, selections: &[usize]) -> Vec<ExecutionResult> {
    let mut cursor = StoryCursor::new(graph);
    cursor.start(ChapterId::new(1), GroupId::new(10), NodeId::new(1));
    let mut selections = selections.iter().copied();
    let mut results = Vec::new();
    for _ in 0..32 {
        let result = cursor.step();
        let is_end = matches!(result, ExecutionResult::End(_));
        let is_choice = matches!(result, ExecutionResult::Choice { .. });
        results.push(result);
        if is_choice {
            let index = selections.next().expect("a selection for every choice");
            cursor.select_choice(index).expect("valid selection");
        }
        if is_end {
            break;
        }
    }
    results
}

#[test]
fn stepping_is_deterministic_for_identical_inputs() {
    let graph = parse_string(&fixture()).expect("fixture should parse");
    for selections in [&[0usize][..], &[1usize][..]] {
        let first = run_fixture(&graph, selections);
        let second = run_fixture(&graph, selections);
        assert_eq!(first, second);
        assert!(matches!(first.last(), Some(ExecutionResult::End(_))));
    }
}

#[test]
fn parameters_never_survive_a_non_choice_step() {
    let graph = parse_string(&fixture()).expect("fixture should parse");
    let mut cursor = StoryCursor::new(&graph);
    cursor.start(ChapterId::new(1), GroupId::new(10), NodeId::new(1));
    let mut selections = [0usize].iter().copied();
    for _ in 0..32 {
        cursor.add_parameter("Profession", "Value", story_weaver::story::Value::Int(1));
        let result = cursor.step();
        match &result {
            ExecutionResult::Choice { .. } => {
                assert!(cursor.has_parameters());
                let index = selections.next().expect("selection");
                cursor.select_choice(index).expect("valid selection");
            }
            ExecutionResult::End(_) => {
                assert!(!cursor.has_parameters());
                return;
            }
            _ => assert!(!cursor.has_parameters()),
        }
    }
    panic!("fixture run did not end");
}

#[test]
fn transitions_reset_the_timeline_to_their_target() {
    let graph = parse_string(&fixture()).expect("fixture should parse");
    let mut cursor = StoryCursor::new(&graph);
    cursor.start(ChapterId::new(1), GroupId::new(10), NodeId::new(1));
    let mut selections = [0usize].iter().copied();
    for _ in 0..32 {
        let result = cursor.step();
        match result {
            ExecutionResult::Transition(Target::Node(node)) => {
                assert_eq!(cursor.current_node(), Some(node));
                assert_eq!(cursor.timeline_index(), 0);
            }
            ExecutionResult::Transition(Target::Group(group)) => {
                assert_eq!(cursor.current_group(), Some(group));
                assert_eq!(cursor.timeline_index(), 0);
            }
            ExecutionResult::Choice { .. } => {
                let index = selections.next().expect("selection");
                cursor.select_choice(index).expect("valid selection");
            }
            ExecutionResult::End(_) => return,
            _ => {}
        }
    }
    panic!("fixture run did not end");
}
