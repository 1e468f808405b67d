mod common;

use common::assert_round_trip;
use yarrow_core::{Yaml, YamlData, YamlError};

const TWO_DOCS: &str = "---\na: 1\n---\nb: 2\n";
const VERSIONED: &str = "%YAML 1.1\n---\noctal: 017\nswitch: Yes\n...\n---\nplain: 019\n";

#[test]
fn document_streams_round_trip() {
    let mut yaml = Yaml::new();
    for input in [TWO_DOCS, VERSIONED] {
        let docs = yaml.load_all(input).unwrap();
        assert_eq!(yaml.dump_all(&docs).unwrap(), input, "input was {input:?}");
    }
}

#[test]
fn the_version_directive_scopes_to_its_document() {
    let mut yaml = Yaml::new();
    let docs = yaml.load_all(VERSIONED).unwrap();
    let first = &docs[0];
    let root = first.root().unwrap();
    assert_eq!(first.version, Some((1, 1)));
    assert_eq!(first.as_i64(first.map_get(root, "octal").unwrap()), Some(15));
    assert_eq!(
        first.as_bool(first.map_get(root, "switch").unwrap()),
        Some(true)
    );
    let second = &docs[1];
    let root = second.root().unwrap();
    assert_eq!(second.version, None);
    assert_eq!(second.as_i64(second.map_get(root, "plain").unwrap()), Some(19));
}

#[test]
fn a_bare_document_round_trips_without_markers() {
    assert_round_trip("a: 1\n");
}

#[test]
fn explicit_end_markers_survive() {
    assert_round_trip("---\na: 1\n...\n");
}

// Inputs the engine rewrites once; the rewritten form then holds steady.
#[test]
fn normalizations_are_stable_after_one_pass() {
    let cases = [
        ("just a string\n", "just a string\n...\n"),
        ("keep: |+\n  kept\n\n", "keep: |+\n  kept\n\n...\n"),
        ("? short\n: v\n", "short: v\n"),
        ("a:   spaced   out\n", "a: spaced   out\n"),
        ("a: 1 \nb: 2\n", "a: 1\nb: 2\n"),
        ("a: 1\r\nb: 2\r\n", "a: 1\nb: 2\n"),
        ("f: [1,2]\n", "f: [1, 2]\n"),
        ("nan: .NaN\n", "nan: .nan\n"),
        ("explicit: !!str 123\n", "explicit: '123'\n"),
    ];
    let mut yaml = Yaml::new();
    for (input, expected) in cases {
        let data = yaml.load(input).unwrap();
        assert_eq!(yaml.dump(&data).unwrap(), expected, "input was {input:?}");
        let again = yaml.load(expected).unwrap();
        assert_eq!(yaml.dump(&again).unwrap(), expected, "via {expected:?}");
    }
}

#[test]
fn dumping_a_rootless_document_is_refused() {
    let mut yaml = Yaml::new();
    let data = YamlData::new();
    assert!(matches!(yaml.dump(&data), Err(YamlError::Serializer(_))));
}

#[test]
fn load_all_accepts_an_empty_stream() {
    let mut yaml = Yaml::new();
    assert!(yaml.load_all("").unwrap().is_empty());
    assert!(yaml.load_all("# only comments\n").unwrap().is_empty());
}
