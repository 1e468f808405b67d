mod common;

use common::{assert_round_trip, load};
use yarrow_core::Yaml;

const ANCHORED_SCALAR: &str = "a: &num 1\nb: *num\n";
const ANCHORED_MAP: &str = "base: &base\n  x: 1\nderived:\n  <<: *base\n  y: 2\n";
const CYCLE: &str = "node: &loop\n  next: *loop\n";
const LIST_MERGE: &str = "a: &one\n  p: 1\nb: &two\n  q: 2\nc:\n  <<: [*one, *two]\n  r: 3\n";
const TEMPLATED: &str = "- &id001 x\n- *id001\n";

#[test]
fn anchored_documents_round_trip() {
    assert_round_trip(ANCHORED_SCALAR);
    assert_round_trip(ANCHORED_MAP);
    assert_round_trip(CYCLE);
    assert_round_trip(LIST_MERGE);
    assert_round_trip(TEMPLATED);
}

#[test]
fn aliases_share_one_value() {
    let data = load("a: &k [1]\nb: *k\n");
    let root = data.root().unwrap();
    assert_eq!(data.map_get(root, "a"), data.map_get(root, "b"));
}

#[test]
fn cycles_point_back_at_their_owner() {
    let data = load(CYCLE);
    let root = data.root().unwrap();
    let node = data.map_get(root, "node").unwrap();
    assert_eq!(data.map_get(node, "next"), Some(node));
}

#[test]
fn merged_keys_resolve_through_the_alias() {
    let data = load(ANCHORED_MAP);
    let root = data.root().unwrap();
    let derived = data.map_get(root, "derived").unwrap();
    assert_eq!(data.as_i64(data.map_get(derived, "x").unwrap()), Some(1));
    assert_eq!(data.as_i64(data.map_get(derived, "y").unwrap()), Some(2));
    assert!(!data.map_key_is_own(derived, "x"));
    assert!(data.map_key_is_own(derived, "y"));
}

#[test]
fn the_first_merge_source_wins() {
    let data = load("a: &one\n  k: 1\nb: &two\n  k: 2\nc:\n  <<: [*one, *two]\n");
    let root = data.root().unwrap();
    let c = data.map_get(root, "c").unwrap();
    assert_eq!(data.as_i64(data.map_get(c, "k").unwrap()), Some(1));
}

#[test]
fn own_entries_override_merged_ones() {
    let data = load("base: &b\n  k: 1\nd:\n  <<: *b\n  k: 2\n");
    let root = data.root().unwrap();
    let d = data.map_get(root, "d").unwrap();
    assert_eq!(data.as_i64(data.map_get(d, "k").unwrap()), Some(2));
}

#[test]
fn a_reused_anchor_rebinds_and_warns() {
    let mut yaml = Yaml::new();
    let data = yaml.load("a: &x 1\nb: &x 2\nc: *x\n").unwrap();
    let root = data.root().unwrap();
    assert_eq!(data.as_i64(data.map_get(root, "c").unwrap()), Some(2));
    let warnings = yaml.take_warnings();
    assert!(matches!(
        warnings.as_slice(),
        [yarrow_core::Warning::ReusedAnchor { anchor, .. }] if anchor == "x"
    ));
}
