mod common;

use common::{dump, load};
use yarrow_core::{IntScalar, Map, StrScalar, Value, Yaml, YamlData};

#[test]
fn replacing_a_value_touches_one_line() {
    let mut data = load("a: 1 # stay\nb: 2\nc: 3 # also stays\n");
    let root = data.root().unwrap();
    let b = data.map_get(root, "b").unwrap();
    *data.value_mut(b) = Value::Str(StrScalar::new("replaced"));
    assert_eq!(dump(&data), "a: 1 # stay\nb: replaced\nc: 3 # also stays\n");
}

#[test]
fn inserting_a_key_appends_its_line() {
    let mut data = load("a: 1\nb: 2\n");
    let root = data.root().unwrap();
    let key = data.alloc(Value::Str(StrScalar::new("c")));
    let value = data.alloc(Value::Int(IntScalar::plain(3)));
    data.map_insert(root, key, value);
    assert_eq!(dump(&data), "a: 1\nb: 2\nc: 3\n");
}

#[test]
fn inserting_at_a_position_shifts_later_comments_with_their_entries() {
    let mut data = load("a: 1 # first\nb: 2 # second\n");
    let root = data.root().unwrap();
    let key = data.alloc(Value::Str(StrScalar::new("mid")));
    let value = data.alloc(Value::Int(IntScalar::plain(9)));
    data.map_insert_at(root, 1, key, value);
    assert_eq!(dump(&data), "a: 1 # first\nmid: 9\nb: 2 # second\n");
}

#[test]
fn removing_a_key_takes_its_comment_along() {
    let mut data = load("a: 1\nb: 2 # gone\nc: 3 # kept\n");
    let root = data.root().unwrap();
    let removed = data.map_remove(root, "b").unwrap();
    assert_eq!(data.as_i64(removed), Some(2));
    assert_eq!(dump(&data), "a: 1\nc: 3 # kept\n");
}

#[test]
fn removing_a_merge_shadowing_key_uncovers_the_merged_value() {
    let mut data = load("base: &b\n  x: 1\nd:\n  <<: *b\n  x: 2\n");
    let root = data.root().unwrap();
    let d = data.map_get(root, "d").unwrap();
    let removed = data.map_remove(d, "x").unwrap();
    assert_eq!(data.as_i64(removed), Some(2));
    assert_eq!(data.as_i64(data.map_get(d, "x").unwrap()), Some(1));
    assert!(!data.map_key_is_own(d, "x"));
    assert_eq!(dump(&data), "base: &b\n  x: 1\nd:\n  <<: *b\n");
}

#[test]
fn pushing_a_sequence_item_appends_its_line() {
    let mut data = load("l:\n- 1\n- 2\n");
    let root = data.root().unwrap();
    let l = data.map_get(root, "l").unwrap();
    let item = data.alloc(Value::Int(IntScalar::plain(3)));
    data.seq_push(l, item);
    assert_eq!(dump(&data), "l:\n- 1\n- 2\n- 3\n");
}

#[test]
fn a_document_built_from_scratch_dumps_plain() {
    let mut yaml = Yaml::new();
    let mut data = YamlData::new();
    let map = data.alloc(Value::Map(Map::default()));
    data.set_root(map);
    let key = data.alloc(Value::Str(StrScalar::new("greeting")));
    let value = data.alloc(Value::Str(StrScalar::new("hello")));
    data.map_insert(map, key, value);
    assert_eq!(yaml.dump(&data).unwrap(), "greeting: hello\n");
}
