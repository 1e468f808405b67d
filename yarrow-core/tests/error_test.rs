use yarrow_core::{Yaml, YamlError};

fn load_err(input: &str) -> YamlError {
    Yaml::new().load(input).unwrap_err()
}

#[test]
fn an_unclosed_flow_sequence_is_reported_where_it_ends() {
    let error = load_err("key: [1, 2\n");
    match error {
        YamlError::Parser(marked) => {
            assert_eq!(marked.context.as_deref(), Some("while parsing a flow sequence"));
            assert!(marked.problem.contains("expected ',' or ']'"));
        }
        other => panic!("expected a parser error, got {other}"),
    }
}

#[test]
fn duplicate_keys_name_both_occurrences() {
    let error = load_err("a: 1\nother: 2\na: 3\n");
    match error {
        YamlError::DuplicateKey(marked) => {
            assert!(marked.problem.contains("found duplicate key \"a\""));
            assert_eq!(marked.context_mark.map(|m| m.line), Some(0));
            assert_eq!(marked.problem_mark.map(|m| m.line), Some(2));
        }
        other => panic!("expected a duplicate key error, got {other}"),
    }
}

#[test]
fn an_undefined_alias_is_refused() {
    let error = load_err("b: *nothing\n");
    match error {
        YamlError::Composer(marked) => {
            assert!(marked.problem.contains("found undefined alias \"nothing\""));
        }
        other => panic!("expected a composer error, got {other}"),
    }
}

#[test]
fn a_second_document_without_markers_is_refused_by_load() {
    let error = load_err("a: 1\n---\nb: 2\n");
    assert!(matches!(error, YamlError::Composer(_)));
    assert!(error.to_string().contains("single document"));
}

#[test]
fn tab_indentation_is_refused() {
    assert!(Yaml::new().load("a:\n\tb: 1\n").is_err());
}

#[test]
fn invalid_utf8_is_a_decode_error() {
    let error = Yaml::new().load_bytes(&[b'a', b':', b' ', 0xc3, 0x28]).unwrap_err();
    assert!(matches!(
        error,
        YamlError::Decode {
            encoding: "utf-8",
            ..
        }
    ));
}

#[test]
fn control_characters_are_refused_with_their_position() {
    let error = load_err("a: b\u{8}c\n");
    assert_eq!(
        error,
        YamlError::NonPrintable {
            code: 8,
            position: 4
        }
    );
}

#[test]
fn errors_render_with_one_based_positions() {
    let error = load_err("b: *nothing\n");
    assert!(error.to_string().contains("line 1, column 4"));
}
