//! Field Path Resolution
//!
//! Field names are path expressions: `.` separates nesting levels and a bare
//! `*` segment stands for "every element of a sequence". Both characters can
//! be escaped with `\` to become part of a key (`a\.b` is the single key
//! `a.b`, `\*` is a literal `*` key, `\\` is a backslash).
//!
//! A name is parsed once into a [`FieldPath`]. At run time the path is walked
//! against an input tree with [`resolve`], which expands wildcards into one
//! [`Slot`] per element, and accepted values are written into an
//! [`OutputTree`] at the slot's concrete [`Step`] location.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{FormError, Result};

const SEPARATOR: char = '.';
const WILDCARD: char = '*';
const ESCAPE: char = '\\';

// =============================================================================
// Parsed Paths
// =============================================================================

/// One segment of a parsed field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A literal mapping key (already unescaped)
    Key(String),
    /// Every element of a sequence
    Wildcard,
}

impl PathSegment {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "{}", WILDCARD),
            Self::Key(key) => {
                for c in key.chars() {
                    if c == SEPARATOR || c == WILDCARD || c == ESCAPE {
                        write!(f, "{}", ESCAPE)?;
                    }
                    write!(f, "{}", c)?;
                }
                Ok(())
            }
        }
    }
}

/// A field name parsed into segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a field name.
    ///
    /// Fails on an empty name or an empty segment (`a..b`, `.a`, `a.`).
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(FormError::EmptyPath);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut escaped_wildcard = false;
        let mut chars = name.chars();

        let mut finish = |current: &mut String, escaped_wildcard: &mut bool| -> Result<()> {
            if current.is_empty() {
                return Err(FormError::EmptySegment {
                    name: name.to_string(),
                });
            }
            let segment = if current.as_str() == "*" && !*escaped_wildcard {
                PathSegment::Wildcard
            } else {
                PathSegment::Key(std::mem::take(current))
            };
            current.clear();
            *escaped_wildcard = false;
            segments.push(segment);
            Ok(())
        };

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some(next @ (SEPARATOR | ESCAPE)) => current.push(next),
                    Some(WILDCARD) => {
                        current.push(WILDCARD);
                        escaped_wildcard = true;
                    }
                    // Unknown escapes are kept verbatim
                    Some(other) => {
                        current.push(ESCAPE);
                        current.push(other);
                    }
                    None => current.push(ESCAPE),
                },
                SEPARATOR => finish(&mut current, &mut escaped_wildcard)?,
                other => current.push(other),
            }
        }
        finish(&mut current, &mut escaped_wildcard)?;

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// True when any non-final segment is a wildcard
    pub fn wants_array(&self) -> bool {
        let n = self.segments.len();
        self.segments[..n.saturating_sub(1)]
            .iter()
            .any(PathSegment::is_wildcard)
    }

    /// True when any segment, final included, is a wildcard
    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(PathSegment::is_wildcard)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// A concrete step into a tree: a mapping key or a sequence index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Key(String),
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Concrete location reached by expanding a field path against a tree
pub type Location = Vec<Step>;

/// Format a location as a dotted string
pub fn format_location(location: &[Step]) -> String {
    location
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// One expansion of a field path
#[derive(Debug, Clone, PartialEq)]
pub struct Slot<'a> {
    pub location: Location,
    /// `None` when some segment along the path did not resolve
    pub value: Option<&'a Value>,
}

/// Every slot a field path expands to, plus the sequences crossed by wildcards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution<'a> {
    pub slots: Vec<Slot<'a>>,
    pub sequences: Vec<Location>,
}

impl<'a> Resolution<'a> {
    /// True when nothing at all was found for the path
    pub fn is_missing(&self) -> bool {
        self.sequences.is_empty() && self.slots.iter().all(|s| s.value.is_none())
    }

    /// Values of the slots that resolved, in order
    pub fn found(&self) -> impl Iterator<Item = &'a Value> + '_ {
        self.slots.iter().filter_map(|s| s.value)
    }
}

/// Walk `tree` along `path`.
///
/// Without wildcards this yields exactly one slot. At a wildcard the value
/// must be a sequence, and the rest of the path is applied to each element
/// independently; a wildcard over anything else yields one unresolved slot.
pub fn resolve<'a>(tree: &'a Value, path: &FieldPath) -> Resolution<'a> {
    let mut resolution = Resolution::default();
    walk(Some(tree), path.segments(), Vec::new(), &mut resolution);
    resolution
}

fn walk<'a>(
    node: Option<&'a Value>,
    segments: &[PathSegment],
    mut location: Location,
    out: &mut Resolution<'a>,
) {
    let Some((first, rest)) = segments.split_first() else {
        out.slots.push(Slot { location, value: node });
        return;
    };

    match first {
        PathSegment::Key(key) => {
            let next = node.and_then(Value::as_object).and_then(|map| map.get(key));
            location.push(Step::Key(key.clone()));
            walk(next, rest, location, out);
        }
        PathSegment::Wildcard => match node.and_then(Value::as_array) {
            Some(items) => {
                out.sequences.push(location.clone());
                for (index, item) in items.iter().enumerate() {
                    let mut item_location = location.clone();
                    item_location.push(Step::Index(index));
                    walk(Some(item), rest, item_location, out);
                }
            }
            None => out.slots.push(Slot { location, value: None }),
        },
    }
}

/// Values found at `path`, dropping unresolved slots
pub fn lookup<'a>(tree: &'a Value, path: &FieldPath) -> Vec<&'a Value> {
    resolve(tree, path).found().collect()
}

// =============================================================================
// Output Tree
// =============================================================================

#[derive(Debug, Clone)]
enum Node {
    Leaf(Value),
    Map(BTreeMap<String, Node>),
    // Sparse: unwritten indices vanish on conversion
    Seq(BTreeMap<usize, Node>),
}

impl Default for Node {
    fn default() -> Self {
        Node::Map(BTreeMap::new())
    }
}

impl Node {
    fn for_step(step: &Step) -> Self {
        match step {
            Step::Key(_) => Node::Map(BTreeMap::new()),
            Step::Index(_) => Node::Seq(BTreeMap::new()),
        }
    }

    /// Split a stored mapping or sequence into child nodes so later writes
    /// land inside it instead of replacing it
    fn open(&mut self) {
        let Node::Leaf(value) = self else {
            return;
        };
        *self = match std::mem::take(value) {
            Value::Object(map) => Node::Map(map.into_iter().map(|(k, v)| (k, Node::Leaf(v))).collect()),
            Value::Array(items) => {
                Node::Seq(items.into_iter().map(Node::Leaf).enumerate().collect())
            }
            other => Node::Leaf(other),
        };
    }

    /// Child at `step`, replacing this node if it has the wrong shape
    fn child(&mut self, step: &Step) -> &mut Node {
        self.open();
        match (self, step) {
            (Node::Map(map), Step::Key(key)) => map.entry(key.clone()).or_default(),
            (Node::Seq(items), Step::Index(index)) => items.entry(*index).or_default(),
            (node, step) => {
                *node = Node::for_step(step);
                node.child(step)
            }
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Node::Leaf(value) => value.clone(),
            Node::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect::<Map<String, Value>>(),
            ),
            Node::Seq(items) => Value::Array(items.values().map(Node::to_value).collect()),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Node::Leaf(value) => value,
            Node::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect::<Map<String, Value>>(),
            ),
            Node::Seq(items) => Value::Array(items.into_values().map(Node::into_value).collect()),
        }
    }
}

/// Output record under construction
///
/// Values are written at their original input location. Sequence indices
/// that never receive a value are dropped on conversion, so elements
/// filtered out during validation leave no holes while sibling fields that
/// write into the same element stay aligned.
#[derive(Debug, Clone, Default)]
pub struct OutputTree {
    root: Node,
}

impl OutputTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `location`, creating intermediate nodes as needed,
    /// and return the stored slot for in-place edits.
    pub fn insert(&mut self, location: &[Step], value: Value) -> &mut Value {
        let node = location.iter().fold(&mut self.root, |node, step| node.child(step));
        *node = Node::Leaf(value);
        match node {
            Node::Leaf(stored) => stored,
            Node::Map(_) | Node::Seq(_) => unreachable!("leaf stored above"),
        }
    }

    /// Make sure a (possibly empty) sequence exists at `location`
    pub fn ensure_sequence(&mut self, location: &[Step]) {
        let node = location.iter().fold(&mut self.root, |node, step| node.child(step));
        node.open();
        if !matches!(node, Node::Seq(_)) {
            *node = Node::Seq(BTreeMap::new());
        }
    }

    /// Snapshot of the tree built so far
    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }

    pub fn into_value(self) -> Value {
        self.root.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    #[test]
    fn test_parse_simple_and_nested() {
        let path = FieldPath::parse("a.b.c").unwrap();
        assert_eq!(path.segments(), &[key("a"), key("b"), key("c")]);
        assert!(!path.wants_array());
    }

    #[test]
    fn test_parse_wildcards() {
        let path = FieldPath::parse("arr.*.k").unwrap();
        assert_eq!(path.segments(), &[key("arr"), PathSegment::Wildcard, key("k")]);
        assert!(path.wants_array());

        let trailing = FieldPath::parse("tags.*").unwrap();
        assert!(!trailing.wants_array());
        assert!(trailing.has_wildcard());
    }

    #[test]
    fn test_parse_escapes() {
        let path = FieldPath::parse(r"a\.b.\*.c\\d").unwrap();
        assert_eq!(path.segments(), &[key("a.b"), key("*"), key(r"c\d")]);
        assert!(!path.has_wildcard());
    }

    #[test]
    fn test_display_round_trips_escapes() {
        let name = r"a\.b.*.\*";
        assert_eq!(FieldPath::parse(name).unwrap().to_string(), name);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(FieldPath::parse(""), Err(FormError::EmptyPath)));
        assert!(matches!(FieldPath::parse("a..b"), Err(FormError::EmptySegment { .. })));
        assert!(matches!(FieldPath::parse("a."), Err(FormError::EmptySegment { .. })));
    }

    #[test]
    fn test_resolve_plain_path() {
        let tree = json!({"a": {"b": 1}});
        let found = resolve(&tree, &FieldPath::parse("a.b").unwrap());
        assert_eq!(found.slots.len(), 1);
        assert_eq!(found.slots[0].value, Some(&json!(1)));
        assert_eq!(format_location(&found.slots[0].location), "a.b");

        let missing = resolve(&tree, &FieldPath::parse("a.c").unwrap());
        assert!(missing.is_missing());

        let through_scalar = resolve(&tree, &FieldPath::parse("a.b.c").unwrap());
        assert!(through_scalar.is_missing());
    }

    #[test]
    fn test_resolve_wildcard_expands_elements() {
        let tree = json!({"arr": [{"k": 1}, {"j": 2}, {"k": 3}]});
        let path = FieldPath::parse("arr.*.k").unwrap();
        let resolution = resolve(&tree, &path);

        assert_eq!(resolution.slots.len(), 3);
        assert_eq!(resolution.sequences, vec![vec![Step::Key("arr".into())]]);
        assert!(resolution.slots[1].value.is_none());
        assert_eq!(lookup(&tree, &path), vec![&json!(1), &json!(3)]);
    }

    #[test]
    fn test_resolve_wildcard_over_non_sequence() {
        let tree = json!({"arr": {"k": 1}});
        let resolution = resolve(&tree, &FieldPath::parse("arr.*.k").unwrap());
        assert!(resolution.is_missing());
        assert_eq!(resolution.slots.len(), 1);
    }

    #[test]
    fn test_resolve_nested_wildcards() {
        let tree = json!({"m": [[1, 2], "x", [3]]});
        let path = FieldPath::parse("m.*.*").unwrap();
        assert_eq!(lookup(&tree, &path), vec![&json!(1), &json!(2), &json!(3)]);
        assert_eq!(resolve(&tree, &path).sequences.len(), 3);
    }

    #[test]
    fn test_output_tree_compacts_sequences() {
        let mut out = OutputTree::new();
        let arr = Step::Key("arr".into());
        out.ensure_sequence(&[arr.clone()]);
        out.insert(&[arr.clone(), Step::Index(0), Step::Key("k".into())], json!(1));
        out.insert(&[arr.clone(), Step::Index(2), Step::Key("k".into())], json!(3));
        out.insert(&[arr, Step::Index(2), Step::Key("j".into())], json!(4));

        assert_eq!(out.into_value(), json!({"arr": [{"k": 1}, {"k": 3, "j": 4}]}));
    }

    #[test]
    fn test_output_tree_insert_returns_stored_slot() {
        let mut out = OutputTree::new();
        let slot = out.insert(&[Step::Key("a".into()), Step::Key("b".into())], json!("x"));
        *slot = json!("y");
        assert_eq!(out.to_value(), json!({"a": {"b": "y"}}));
    }

    #[test]
    fn test_output_tree_replaces_scalar_with_mapping() {
        let mut out = OutputTree::new();
        out.insert(&[Step::Key("a".into())], json!(5));
        out.insert(&[Step::Key("a".into()), Step::Key("b".into())], json!(6));
        assert_eq!(out.into_value(), json!({"a": {"b": 6}}));
    }

    #[test]
    fn test_output_tree_writes_into_stored_mapping() {
        let mut out = OutputTree::new();
        out.insert(&[Step::Key("a".into())], json!({"b": "5", "c": 2}));
        out.insert(&[Step::Key("a".into()), Step::Key("b".into())], json!(5));
        assert_eq!(out.into_value(), json!({"a": {"b": 5, "c": 2}}));
    }

    #[test]
    fn test_output_tree_keeps_stored_sequence_elements() {
        let mut out = OutputTree::new();
        let arr = Step::Key("arr".into());
        out.insert(&[arr.clone()], json!([{"k": "1", "x": 9}, {"j": 2}]));
        out.ensure_sequence(&[arr.clone()]);
        out.insert(&[arr, Step::Index(0), Step::Key("k".into())], json!(1));
        assert_eq!(out.into_value(), json!({"arr": [{"k": 1, "x": 9}, {"j": 2}]}));
    }
}
