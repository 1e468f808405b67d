mod common;

use common::assert_round_trip;

const SCALARS: &str = r#"plain: word
single: 'quoted'
double: "esc\tape"
time: 10:30:00
breaks: "two\nlines"
empty:
null_word: null
tilde: ~
"#;

#[test]
fn scalar_styles_survive() {
    assert_round_trip(SCALARS);
}

const NUMBERS: &str = r#"int: 42
neg: -7
hex: 0x1F
oct: 0o17
bin: 0b1010
under: 12_345
zeros: 007
float: 3.14
padded: 007.25
exp: 6.02e23
inf: -.inf
nan: .nan
"#;

#[test]
fn number_spellings_survive() {
    assert_round_trip(NUMBERS);
}

const STRUCTURE: &str = r#"top:
  child: 1
  other: two
list:
- a
- b
mixed:
- x: 1
  y: 2
- z: 3
deep:
  inner:
  - - 1
    - 2
  - 3
"#;

#[test]
fn block_structure_survives() {
    assert_round_trip(STRUCTURE);
}

const FLOW: &str = r#"f1: [1, 2, 3]
f2: {a: 1, b: x}
f3: [a, [b, c], {d: e}]
knot: {}
nil: []
"#;

#[test]
fn flow_structure_survives() {
    assert_round_trip(FLOW);
}

const BLOCK_SCALARS: &str = r#"lit: |
  line one
  line two
strip: |-
  no final break
fold: >
  wrapped words
  here
folded_strip: >-
  stay
"#;

#[test]
fn block_scalars_survive() {
    assert_round_trip(BLOCK_SCALARS);
}

const UNICODE: &str = "name: café\ncup: ☕\n";

#[test]
fn unicode_text_survives() {
    assert_round_trip(UNICODE);
}

const TAGGED: &str = "custom: !mytag value\nshouted: !shout [1, 2]\n";

#[test]
fn unknown_tags_survive() {
    assert_round_trip(TAGGED);
}

const QUOTED_ROOT: &str = "\"a quoted root\"\n";

#[test]
fn a_quoted_root_scalar_survives() {
    assert_round_trip(QUOTED_ROOT);
}
