//! The arena-backed document tree.
//!
//! Values live in a flat arena addressed by [`ValueId`]; aliases and cycles
//! are repeated ids, so identity survives construction and mutation.
//! Containers carry lazily-created side-tables (comments, positions) keyed
//! by entry index; every structural edit renumbers them so they stay
//! aligned with the entries.

use crate::comment::Comment;
use crate::scalar::{
    BoolScalar, FloatScalar, IntScalar, NullScalar, StrScalar, TimestampScalar,
};
use crate::{YamlVersion, ScalarStyle};
use std::collections::{BTreeMap, HashSet};

/// Index of a value in the document arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ValueId(pub usize);

/// An anchor attached to a value. `always_dump` forces the anchor out even
/// when nothing references it.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Anchor {
    pub name: String,
    pub always_dump: bool,
}

impl Anchor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Anchor {
        Anchor {
            name: name.into(),
            always_dump: false,
        }
    }
}

/// Original tag text of a value that round-trips a non-default tag:
/// either a full URI (`tag:yaml.org,2002:set`) or the verbatim source
/// form (`!local`, `!!po`, `!<x>`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub text: String,
}

impl Tag {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Tag {
        Tag { text: text.into() }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Comment slots of one attachment point: the comment trailing it on its
/// line and the run of whole lines (comments and blanks) before it.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ItemComments {
    pub eol: Option<Comment>,
    pub pre: Vec<Comment>,
}

impl ItemComments {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.eol.is_none() && self.pre.is_empty()
    }
}

/// Comment slots of one container entry. Mapping entries use both halves;
/// sequence items only the value half.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct EntryComments {
    pub key: ItemComments,
    pub value: ItemComments,
}

impl EntryComments {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.value.is_empty()
    }
}

/// Per-container comment table: per-entry slots keyed by the entry's
/// current index, the container's own slots, and the run that sat at the
/// container's end.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CommentTable {
    pub entries: BTreeMap<usize, EntryComments>,
    pub own: ItemComments,
    pub end: Vec<Comment>,
}

impl CommentTable {
    pub fn entry_mut(&mut self, index: usize) -> &mut EntryComments {
        self.entries.entry(index).or_default()
    }

    fn renumber_insert(&mut self, index: usize) {
        shift_up(&mut self.entries, index);
    }

    fn renumber_remove(&mut self, index: usize) {
        shift_down(&mut self.entries, index);
    }
}

fn shift_up<V>(table: &mut BTreeMap<usize, V>, index: usize) {
    let moved: Vec<usize> = table.range(index..).map(|(k, _)| *k).rev().collect();
    for k in moved {
        if let Some(v) = table.remove(&k) {
            table.insert(k + 1, v);
        }
    }
}

fn shift_down<V>(table: &mut BTreeMap<usize, V>, index: usize) {
    table.remove(&index);
    let moved: Vec<usize> = table.range(index + 1..).map(|(k, _)| *k).collect();
    for k in moved {
        if let Some(v) = table.remove(&k) {
            table.insert(k - 1, v);
        }
    }
}

/// Source position of an entry; sequence items leave `value` empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryPosition {
    pub key: (u32, u32),
    pub value: Option<(u32, u32)>,
}

/// Metadata slots every arena cell carries. All lazily populated; a plain
/// programmatic value has none of them.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct NodeAttrs {
    pub anchor: Option<Anchor>,
    pub tag: Option<Tag>,
    /// Explicit flow (`true`) or block (`false`) override for containers.
    pub flow: Option<bool>,
    /// The node's own source position.
    pub line_col: Option<(u32, u32)>,
    comments: Option<Box<CommentTable>>,
    positions: Option<Box<BTreeMap<usize, EntryPosition>>>,
}

impl NodeAttrs {
    #[must_use]
    pub fn comments(&self) -> Option<&CommentTable> {
        self.comments.as_deref()
    }

    pub fn comments_mut(&mut self) -> &mut CommentTable {
        self.comments.get_or_insert_with(Box::default)
    }

    #[must_use]
    pub fn positions(&self) -> Option<&BTreeMap<usize, EntryPosition>> {
        self.positions.as_deref()
    }

    pub fn positions_mut(&mut self) -> &mut BTreeMap<usize, EntryPosition> {
        self.positions.get_or_insert_with(Box::default)
    }

    fn renumber_insert(&mut self, index: usize) {
        if let Some(table) = self.comments.as_deref_mut() {
            table.renumber_insert(index);
        }
        if let Some(table) = self.positions.as_deref_mut() {
            shift_up(table, index);
        }
    }

    fn renumber_remove(&mut self, index: usize) {
        if let Some(table) = self.comments.as_deref_mut() {
            table.renumber_remove(index);
        }
        if let Some(table) = self.positions.as_deref_mut() {
            shift_down(table, index);
        }
    }
}

/// An ordered sequence of arena values.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Seq {
    pub items: Vec<ValueId>,
}

/// One mapping entry. `own` distinguishes keys written in this mapping
/// from keys made visible by a `<<` merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapEntry {
    pub key: ValueId,
    pub value: ValueId,
    pub own: bool,
}

/// An ordered mapping. `merges` records `<<` entries as
/// `(original position, merged mapping)` so dumping re-inserts the merge
/// key where it was written.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Map {
    pub entries: Vec<MapEntry>,
    pub merges: Vec<(usize, ValueId)>,
}

impl Map {
    /// Entries written in this mapping, in source order.
    pub fn own_entries(&self) -> impl Iterator<Item = &MapEntry> {
        self.entries.iter().filter(|e| e.own)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null(NullScalar),
    Bool(BoolScalar),
    Int(IntScalar),
    Float(FloatScalar),
    Str(StrScalar),
    Timestamp(TimestampScalar),
    Seq(Seq),
    Map(Map),
}

impl Value {
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Seq(_) | Value::Map(_))
    }
}

#[derive(Debug)]
struct Cell {
    value: Value,
    attrs: NodeAttrs,
}

/// One loaded (or programmatically built) document.
#[derive(Debug, Default)]
pub struct YamlData {
    cells: Vec<Cell>,
    root: Option<ValueId>,
    /// `%YAML` directive seen when loading, re-emitted when dumping.
    pub version: Option<YamlVersion>,
    /// `%TAG` directives seen when loading, `(handle, prefix)`.
    pub tag_directives: Vec<(String, String)>,
    /// Whether the document carried an explicit `---` / `...`.
    pub explicit_start: bool,
    pub explicit_end: bool,
    /// Comment lines that sat before the directives and `---`.
    pub leading: Vec<Comment>,
}

impl YamlData {
    #[must_use]
    pub fn new() -> YamlData {
        YamlData::default()
    }

    #[must_use]
    pub fn root(&self) -> Option<ValueId> {
        self.root
    }

    pub fn set_root(&mut self, id: ValueId) {
        self.root = Some(id);
    }

    pub fn alloc(&mut self, value: Value) -> ValueId {
        let id = ValueId(self.cells.len());
        self.cells.push(Cell {
            value,
            attrs: NodeAttrs::default(),
        });
        id
    }

    #[must_use]
    pub fn value(&self, id: ValueId) -> &Value {
        &self.cells[id.0].value
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.cells[id.0].value
    }

    #[must_use]
    pub fn attrs(&self, id: ValueId) -> &NodeAttrs {
        &self.cells[id.0].attrs
    }

    pub fn attrs_mut(&mut self, id: ValueId) -> &mut NodeAttrs {
        &mut self.cells[id.0].attrs
    }

    // ------------------------------------------------------------------
    // convenience constructors

    pub fn new_str(&mut self, value: impl Into<String>) -> ValueId {
        self.alloc(Value::Str(StrScalar::new(value)))
    }

    pub fn new_styled_str(&mut self, value: impl Into<String>, style: ScalarStyle) -> ValueId {
        self.alloc(Value::Str(StrScalar::styled(value, style)))
    }

    pub fn new_int(&mut self, value: i64) -> ValueId {
        self.alloc(Value::Int(IntScalar::plain(value)))
    }

    pub fn new_float(&mut self, value: f64) -> ValueId {
        self.alloc(Value::Float(FloatScalar::plain(value)))
    }

    pub fn new_bool(&mut self, value: bool) -> ValueId {
        self.alloc(Value::Bool(BoolScalar::from_value(value)))
    }

    pub fn new_null(&mut self) -> ValueId {
        self.alloc(Value::Null(NullScalar::canonical()))
    }

    pub fn new_seq(&mut self) -> ValueId {
        self.alloc(Value::Seq(Seq::default()))
    }

    pub fn new_map(&mut self) -> ValueId {
        self.alloc(Value::Map(Map::default()))
    }

    // ------------------------------------------------------------------
    // typed reads

    #[must_use]
    pub fn as_str(&self, id: ValueId) -> Option<&str> {
        match self.value(id) {
            Value::Str(s) => Some(&s.value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self, id: ValueId) -> Option<i64> {
        match self.value(id) {
            Value::Int(i) => Some(i.value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self, id: ValueId) -> Option<f64> {
        match self.value(id) {
            Value::Float(f) => Some(f.value),
            Value::Int(i) => Some(i.value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self, id: ValueId) -> Option<bool> {
        match self.value(id) {
            Value::Bool(b) => Some(b.value),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self, id: ValueId) -> bool {
        matches!(self.value(id), Value::Null(_))
    }

    #[must_use]
    pub fn as_seq(&self, id: ValueId) -> Option<&Seq> {
        match self.value(id) {
            Value::Seq(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self, id: ValueId) -> Option<&Map> {
        match self.value(id) {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // equality used for key lookup and duplicate detection

    /// Structural equality of two values. Identical ids are equal by
    /// definition, which also grounds the recursion for aliased keys.
    #[must_use]
    pub fn value_eq(&self, a: ValueId, b: ValueId) -> bool {
        let mut visited = HashSet::new();
        self.value_eq_inner(a, b, &mut visited)
    }

    fn value_eq_inner(
        &self,
        a: ValueId,
        b: ValueId,
        visited: &mut HashSet<(ValueId, ValueId)>,
    ) -> bool {
        if a == b {
            return true;
        }
        if !visited.insert((a, b)) {
            return true;
        }
        match (self.value(a), self.value(b)) {
            (Value::Null(_), Value::Null(_)) => true,
            (Value::Bool(x), Value::Bool(y)) => x.value == y.value,
            (Value::Int(x), Value::Int(y)) => x.value == y.value,
            (Value::Float(x), Value::Float(y)) => x.value == y.value,
            (Value::Str(x), Value::Str(y)) => x.value == y.value,
            (Value::Timestamp(x), Value::Timestamp(y)) => x.text == y.text,
            (Value::Seq(x), Value::Seq(y)) => {
                x.items.len() == y.items.len()
                    && x.items
                        .iter()
                        .zip(&y.items)
                        .all(|(i, j)| self.value_eq_inner(*i, *j, visited))
            }
            (Value::Map(x), Value::Map(y)) => {
                x.entries.len() == y.entries.len()
                    && x.entries.iter().zip(&y.entries).all(|(i, j)| {
                        self.value_eq_inner(i.key, j.key, visited)
                            && self.value_eq_inner(i.value, j.value, visited)
                    })
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // mapping operations (arena level: keys are values)

    /// Index of the entry whose key equals `key`, own or merged.
    #[must_use]
    pub fn map_find(&self, map: ValueId, key: ValueId) -> Option<usize> {
        let m = self.as_map(map)?;
        m.entries
            .iter()
            .position(|e| self.value_eq(e.key, key))
    }

    fn map_find_str(&self, map: ValueId, key: &str) -> Option<usize> {
        let m = self.as_map(map)?;
        m.entries
            .iter()
            .position(|e| self.as_str(e.key) == Some(key))
    }

    /// Merge-aware lookup by string key.
    #[must_use]
    pub fn map_get(&self, map: ValueId, key: &str) -> Option<ValueId> {
        let idx = self.map_find_str(map, key)?;
        Some(self.as_map(map)?.entries[idx].value)
    }

    #[must_use]
    pub fn map_contains(&self, map: ValueId, key: &str) -> bool {
        self.map_find_str(map, key).is_some()
    }

    /// Whether `key` was written in this mapping rather than merged in.
    #[must_use]
    pub fn map_key_is_own(&self, map: ValueId, key: &str) -> bool {
        match (self.map_find_str(map, key), self.as_map(map)) {
            (Some(idx), Some(m)) => m.entries[idx].own,
            _ => false,
        }
    }

    /// Inserts or replaces. An existing own entry keeps its position; a
    /// merge-visible key is overridden by a new own entry at the end.
    pub fn map_insert(&mut self, map: ValueId, key: ValueId, value: ValueId) {
        let found = self.map_find(map, key);
        if let Value::Map(m) = self.value_mut(map) {
            match found {
                Some(idx) if m.entries[idx].own => m.entries[idx].value = value,
                Some(idx) => {
                    m.entries[idx] = MapEntry {
                        key,
                        value,
                        own: true,
                    };
                }
                None => m.entries.push(MapEntry {
                    key,
                    value,
                    own: true,
                }),
            }
        }
    }

    /// Inserts a new own entry at `index`, renumbering the side-tables.
    /// Replaces in place when the key already exists.
    pub fn map_insert_at(&mut self, map: ValueId, index: usize, key: ValueId, value: ValueId) {
        if self.map_find(map, key).is_some() {
            self.map_insert(map, key, value);
            return;
        }
        if let Value::Map(m) = self.value_mut(map) {
            let index = index.min(m.entries.len());
            m.entries.insert(
                index,
                MapEntry {
                    key,
                    value,
                    own: true,
                },
            );
            for merge in &mut m.merges {
                if merge.0 >= index {
                    merge.0 += 1;
                }
            }
        } else {
            return;
        }
        self.attrs_mut(map).renumber_insert(index);
    }

    /// Removes an own key. When a `<<` merge also supplies the key, the
    /// entry stays at its position with the merged value re-resolved;
    /// otherwise the entry and its side-table rows are gone. Keys only
    /// visible through a merge are not removable here.
    pub fn map_remove(&mut self, map: ValueId, key: &str) -> Option<ValueId> {
        let idx = self.map_find_str(map, key)?;
        let (entry, merges) = match self.as_map(map) {
            Some(m) => (m.entries[idx], m.merges.clone()),
            None => return None,
        };
        if !entry.own {
            return None;
        }
        let fallback = merges
            .iter()
            .find_map(|(_, merged)| self.map_get(*merged, key));
        if let Value::Map(m) = self.value_mut(map) {
            match fallback {
                Some(value) => {
                    m.entries[idx] = MapEntry {
                        key: entry.key,
                        value,
                        own: false,
                    };
                }
                None => {
                    m.entries.remove(idx);
                    for merge in &mut m.merges {
                        if merge.0 > idx {
                            merge.0 -= 1;
                        }
                    }
                }
            }
        }
        if fallback.is_none() {
            self.attrs_mut(map).renumber_remove(idx);
        }
        Some(entry.value)
    }

    // ------------------------------------------------------------------
    // sequence operations

    pub fn seq_push(&mut self, seq: ValueId, item: ValueId) {
        if let Value::Seq(s) = self.value_mut(seq) {
            s.items.push(item);
        }
    }

    pub fn seq_insert(&mut self, seq: ValueId, index: usize, item: ValueId) {
        if let Value::Seq(s) = self.value_mut(seq) {
            let index = index.min(s.items.len());
            s.items.insert(index, item);
        } else {
            return;
        }
        self.attrs_mut(seq).renumber_insert(index);
    }

    pub fn seq_remove(&mut self, seq: ValueId, index: usize) -> Option<ValueId> {
        let removed = match self.value_mut(seq) {
            Value::Seq(s) if index < s.items.len() => Some(s.items.remove(index)),
            _ => None,
        };
        if removed.is_some() {
            self.attrs_mut(seq).renumber_remove(index);
        }
        removed
    }

    #[must_use]
    pub fn seq_get(&self, seq: ValueId, index: usize) -> Option<ValueId> {
        self.as_seq(seq)?.items.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::{CommentKind, Comment};
    use crate::Marker;

    fn line_comment(text: &str) -> Comment {
        Comment::new(CommentKind::Line, text.to_string(), Marker::default())
    }

    fn sample(data: &mut YamlData) -> ValueId {
        let map = data.new_map();
        let k1 = data.new_str("a");
        let v1 = data.new_int(1);
        let k2 = data.new_str("b");
        let v2 = data.new_int(2);
        data.map_insert(map, k1, v1);
        data.map_insert(map, k2, v2);
        map
    }

    #[test]
    fn map_insert_replaces_in_place() {
        let mut data = YamlData::new();
        let map = sample(&mut data);
        let k = data.new_str("a");
        let v = data.new_int(9);
        data.map_insert(map, k, v);
        let m = data.as_map(map).unwrap();
        assert_eq!(m.entries.len(), 2);
        assert_eq!(data.as_i64(m.entries[0].value), Some(9));
    }

    #[test]
    fn comment_table_follows_insert_and_remove() {
        let mut data = YamlData::new();
        let map = sample(&mut data);
        data.attrs_mut(map)
            .comments_mut()
            .entry_mut(1)
            .key
            .pre
            .push(line_comment("# before b"));

        let k = data.new_str("z");
        let v = data.new_int(0);
        data.map_insert_at(map, 0, k, v);
        let table = data.attrs(map).comments().unwrap();
        assert!(table.entries.get(&1).is_none());
        assert_eq!(table.entries[&2].key.pre[0].value, "# before b");

        data.map_remove(map, "z");
        let table = data.attrs(map).comments().unwrap();
        assert_eq!(table.entries[&1].key.pre[0].value, "# before b");
    }

    #[test]
    fn merge_backed_key_survives_removal() {
        let mut data = YamlData::new();
        let base = data.new_map();
        let bk = data.new_str("y");
        let bv = data.new_int(2);
        data.map_insert(base, bk, bv);

        let child = data.new_map();
        let ck = data.new_str("y");
        let cv = data.new_int(3);
        data.map_insert(child, ck, cv);
        if let Value::Map(m) = data.value_mut(child) {
            m.merges.push((0, base));
        }

        assert_eq!(data.map_get(child, "y").and_then(|v| data.as_i64(v)), Some(3));
        data.map_remove(child, "y");
        assert_eq!(data.map_get(child, "y").and_then(|v| data.as_i64(v)), Some(2));
        assert!(!data.map_key_is_own(child, "y"));
    }

    #[test]
    fn value_eq_handles_aliased_and_structural_keys() {
        let mut data = YamlData::new();
        let a = data.new_str("x");
        let b = data.new_str("x");
        let c = data.new_int(1);
        assert!(data.value_eq(a, a));
        assert!(data.value_eq(a, b));
        assert!(!data.value_eq(a, c));
    }
}
