// File: rusty-forms-types/src/path.rs
// Purpose: Dotted/indexed field paths and copy-on-write access into a FieldValue tree

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::PathError;
use crate::value::{FieldMap, FieldValue};

static UNDEFINED: FieldValue = FieldValue::Undefined;

// =============================================================================
// FieldPath
// =============================================================================

/// One resolved step of a [`FieldPath`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Object key (`social` in `social.twitter`)
    Key(&'a str),
    /// Sequence position (`0` in `phoneNumbers.0`)
    Index(usize),
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Location of a value inside the form value tree
///
/// Segments are separated by `.`; an all-digit segment addresses a position in
/// a sequence. Paths are validated once at parse time, so every `FieldPath`
/// has at least one non-empty segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    /// Parse and validate a path string
    pub fn parse(raw: impl Into<String>) -> Result<Self, PathError> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(PathError::malformed(&raw, "path is empty"));
        }

        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(PathError::malformed(&raw, "path has an empty segment"));
            }
            if is_numeric(segment) && segment.parse::<usize>().is_err() {
                return Err(PathError::malformed(&raw, "index segment is out of range"));
            }
        }

        Ok(Self { raw })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Iterate over the resolved segments, left to right
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.raw.split('.').map(|segment| {
            if is_numeric(segment) {
                // parse() guarantees the index fits in usize
                Segment::Index(segment.parse().unwrap_or(usize::MAX))
            } else {
                Segment::Key(segment)
            }
        })
    }

    /// Append a child segment (`phNumbers` + `0` -> `phNumbers.0`)
    pub fn child(&self, segment: impl fmt::Display) -> Result<Self, PathError> {
        Self::parse(format!("{}.{}", self.raw, segment))
    }

    /// Parent path, `None` for a single-segment path
    pub fn parent(&self) -> Option<Self> {
        self.raw
            .rsplit_once('.')
            .map(|(parent, _)| Self { raw: parent.to_string() })
    }

    /// Segment-wise prefix test (`a.b` is under `a`, `ab` is not)
    pub fn is_within(&self, ancestor: &FieldPath) -> bool {
        self.raw == ancestor.raw || self.relative_to(ancestor).is_some()
    }

    /// The part of this path below `ancestor`, if it is a strict descendant
    pub fn relative_to(&self, ancestor: &FieldPath) -> Option<&str> {
        self.raw
            .strip_prefix(ancestor.raw.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
    }

    /// For a path under a sequence at `base`, the element index it belongs to
    ///
    /// `phNumbers.2.number` relative to `phNumbers` yields `2`.
    pub fn index_under(&self, base: &FieldPath) -> Option<usize> {
        let rest = self.relative_to(base)?;
        let head = rest.split('.').next()?;
        if is_numeric(head) {
            head.parse().ok()
        } else {
            None
        }
    }

    /// Rewrite the element index under `base` (`phNumbers.2.number` -> `phNumbers.1.number`)
    pub fn with_index_under(&self, base: &FieldPath, index: usize) -> Option<Self> {
        let rest = self.relative_to(base)?;
        let tail = match rest.split_once('.') {
            Some((head, tail)) if is_numeric(head) => Some(tail),
            None if is_numeric(rest) => None,
            _ => return None,
        };

        let raw = match tail {
            Some(tail) => format!("{}.{}.{}", base.raw, index, tail),
            None => format!("{}.{}", base.raw, index),
        };
        Some(Self { raw })
    }
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&FieldPath> for FieldPath {
    type Error = PathError;

    fn try_from(path: &FieldPath) -> Result<Self, Self::Error> {
        Ok(path.clone())
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl Borrow<str> for FieldPath {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Accessors
// =============================================================================

/// Borrow the value at `path`
///
/// Returns `Ok(None)` when an intermediate container is missing, `Undefined`
/// or `Null`. Addressing into a location of the wrong shape is `InvalidPath`.
pub fn lookup<'a>(root: &'a FieldValue, path: &FieldPath) -> Result<Option<&'a FieldValue>, PathError> {
    let mut node = root;

    for segment in path.segments() {
        node = match (segment, node) {
            (_, FieldValue::Undefined | FieldValue::Null) => return Ok(None),
            (Segment::Key(key), FieldValue::Object(map)) => match map.get(key) {
                Some(child) => child,
                None => return Ok(None),
            },
            (Segment::Index(index), FieldValue::Array(items)) => match items.get(index) {
                Some(child) => child,
                None => return Ok(None),
            },
            (Segment::Index(_), _) => {
                return Err(PathError::invalid(path, segment, "index into a non-sequence value"))
            }
            (Segment::Key(_), _) => {
                return Err(PathError::invalid(path, segment, "key into a non-object value"))
            }
        };
    }

    Ok(Some(node))
}

/// Value at `path`, `Undefined` when nothing is there
pub fn get(root: &FieldValue, path: &FieldPath) -> Result<FieldValue, PathError> {
    Ok(lookup(root, path)?.cloned().unwrap_or_default())
}

/// Return a copy of `root` with `value` written at `path`
///
/// Unchanged branches are shared with `root`. Missing containers are created
/// along the way (a sequence for an index segment, an object otherwise), and a
/// sequence shorter than the target index is padded with `Undefined`.
pub fn set(root: &FieldValue, path: &FieldPath, value: FieldValue) -> Result<FieldValue, PathError> {
    let segments: Vec<Segment<'_>> = path.segments().collect();
    set_in(root, &segments, value, path)
}

fn set_in(
    node: &FieldValue,
    segments: &[Segment<'_>],
    value: FieldValue,
    path: &FieldPath,
) -> Result<FieldValue, PathError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(value);
    };

    match (*segment, node) {
        (Segment::Key(key), FieldValue::Object(map)) => {
            let child = map.get(key).unwrap_or(&UNDEFINED);
            let child = set_in(child, rest, value, path)?;
            let mut map = FieldMap::clone(map);
            map.insert(key.to_string(), child);
            Ok(FieldValue::Object(Arc::new(map)))
        }
        (Segment::Key(key), FieldValue::Undefined | FieldValue::Null) => {
            let child = set_in(&UNDEFINED, rest, value, path)?;
            let mut map = FieldMap::new();
            map.insert(key.to_string(), child);
            Ok(FieldValue::Object(Arc::new(map)))
        }
        (Segment::Index(index), FieldValue::Array(items)) => {
            let mut items = Vec::clone(items);
            if index >= items.len() {
                items.resize(padded_len(index, path, *segment)?, FieldValue::Undefined);
            }
            let child = set_in(&items[index], rest, value, path)?;
            items[index] = child;
            Ok(FieldValue::Array(Arc::new(items)))
        }
        (Segment::Index(index), FieldValue::Undefined | FieldValue::Null) => {
            let mut items = vec![FieldValue::Undefined; padded_len(index, path, *segment)?];
            let child = set_in(&UNDEFINED, rest, value, path)?;
            items[index] = child;
            Ok(FieldValue::Array(Arc::new(items)))
        }
        (Segment::Index(_), _) => Err(PathError::invalid(path, *segment, "index into a non-sequence value")),
        (Segment::Key(_), _) => Err(PathError::invalid(path, *segment, "key into a non-object value")),
    }
}

/// Largest index `set` will pad a sequence out to
pub const MAX_INDEX: usize = 65_535;

fn padded_len(index: usize, path: &FieldPath, segment: Segment<'_>) -> Result<usize, PathError> {
    if index > MAX_INDEX {
        return Err(PathError::invalid(path, segment, "index too large"));
    }
    Ok(index + 1)
}

/// Return a copy of `root` with the location at `path` cleared
///
/// Object keys are removed; sequence slots become `Undefined` so later
/// positions keep their indices. A missing location leaves the tree unchanged.
pub fn unset(root: &FieldValue, path: &FieldPath) -> Result<FieldValue, PathError> {
    if lookup(root, path)?.is_none() {
        return Ok(root.clone());
    }

    let Some(parent) = path.parent() else {
        let mut map = root.as_object().cloned().unwrap_or_default();
        map.remove(path.as_str());
        return Ok(FieldValue::Object(Arc::new(map)));
    };

    let updated = match lookup(root, &parent)? {
        Some(FieldValue::Object(map)) => {
            let mut map = FieldMap::clone(map);
            if let Some(Segment::Key(key)) = path.segments().last() {
                map.remove(key);
            }
            FieldValue::Object(Arc::new(map))
        }
        Some(FieldValue::Array(items)) => {
            let mut items = Vec::clone(items);
            if let Some(Segment::Index(index)) = path.segments().last() {
                if let Some(slot) = items.get_mut(index) {
                    *slot = FieldValue::Undefined;
                }
            }
            FieldValue::Array(Arc::new(items))
        }
        _ => return Ok(root.clone()),
    };

    set(root, &parent, updated)
}

/// Apply a structural edit to the sequence at `path`
///
/// A missing location is treated as an empty sequence. Returns the new root
/// together with whatever the edit closure returns.
pub fn update_sequence<R>(
    root: &FieldValue,
    path: &FieldPath,
    edit: impl FnOnce(&mut Vec<FieldValue>) -> R,
) -> Result<(FieldValue, R), PathError> {
    let mut items = match lookup(root, path)? {
        None => Vec::new(),
        Some(FieldValue::Array(items)) => Vec::clone(items),
        Some(_) => {
            let segment = path.segments().last().unwrap_or(Segment::Key(""));
            return Err(PathError::invalid(path, segment, "location is not a sequence"));
        }
    };

    let result = edit(&mut items);
    let root = set(root, path, FieldValue::Array(Arc::new(items)))?;
    Ok((root, result))
}

/// Every scalar leaf path under `value`, which lives at `base`
///
/// Empty containers and scalars count as leaves themselves.
pub fn leaf_paths(value: &FieldValue, base: &FieldPath) -> Result<Vec<FieldPath>, PathError> {
    let mut out = Vec::new();
    collect_leaves(value, base, &mut out)?;
    Ok(out)
}

fn collect_leaves(value: &FieldValue, at: &FieldPath, out: &mut Vec<FieldPath>) -> Result<(), PathError> {
    match value {
        FieldValue::Object(map) if !map.is_empty() => {
            for (key, child) in map.iter() {
                collect_leaves(child, &at.child(key)?, out)?;
            }
        }
        FieldValue::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                collect_leaves(child, &at.child(index)?, out)?;
            }
        }
        _ => out.push(at.clone()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn sample() -> FieldValue {
        FieldValue::from(json!({
            "username": "John Doe",
            "social": { "facebook": "john_doe_fb", "twitter": "john_doe_tw" },
            "phoneNumbers": ["1234567890", "9876543210"],
            "phNumbers": [{ "number": "5555555555" }]
        }))
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("social.")]
    #[case("a..b")]
    #[case("list.99999999999999999999999")]
    fn test_malformed_paths(#[case] raw: &str) {
        assert!(matches!(FieldPath::parse(raw), Err(PathError::Malformed { .. })));
    }

    #[test]
    fn test_segments() {
        let binding = p("phNumbers.0.number");
        let segments: Vec<_> = binding.segments().collect();
        assert_eq!(
            segments,
            vec![Segment::Key("phNumbers"), Segment::Index(0), Segment::Key("number")]
        );
    }

    #[test]
    fn test_get_nested_and_indexed() {
        let root = sample();
        assert_eq!(get(&root, &p("social.twitter")).unwrap(), FieldValue::from("john_doe_tw"));
        assert_eq!(get(&root, &p("phoneNumbers.1")).unwrap(), FieldValue::from("9876543210"));
        assert_eq!(get(&root, &p("phNumbers.0.number")).unwrap(), FieldValue::from("5555555555"));
        assert!(get(&root, &p("social.instagram")).unwrap().is_undefined());
        assert!(get(&root, &p("missing.deep.path")).unwrap().is_undefined());
    }

    #[test]
    fn test_index_into_object_is_invalid() {
        let root = sample();
        assert!(matches!(get(&root, &p("social.0")), Err(PathError::InvalidPath { .. })));
        assert!(matches!(
            set(&root, &p("social.0"), FieldValue::from("x")),
            Err(PathError::InvalidPath { .. })
        ));
        assert!(matches!(
            set(&root, &p("username.first"), FieldValue::from("x")),
            Err(PathError::InvalidPath { .. })
        ));
    }

    #[rstest]
    #[case("username", FieldValue::from("Jane"))]
    #[case("social.twitter", FieldValue::from("jane_tw"))]
    #[case("phoneNumbers.0", FieldValue::from("000"))]
    #[case("phNumbers.0.number", FieldValue::Null)]
    #[case("brand.new.nested", FieldValue::Number(3.0))]
    #[case("fresh.2", FieldValue::Bool(true))]
    fn test_set_then_get_round_trips(#[case] raw: &str, #[case] value: FieldValue) {
        let root = sample();
        let path = p(raw);
        let updated = set(&root, &path, value.clone()).unwrap();
        assert_eq!(get(&updated, &path).unwrap(), value);
    }

    #[test]
    fn test_set_does_not_mutate_and_shares_branches() {
        let root = sample();
        let updated = set(&root, &p("social.twitter"), FieldValue::from("new")).unwrap();

        assert_eq!(get(&root, &p("social.twitter")).unwrap(), FieldValue::from("john_doe_tw"));

        let (FieldValue::Object(before), FieldValue::Object(after)) = (&root, &updated) else {
            panic!("root must stay an object");
        };
        match (&before["phoneNumbers"], &after["phoneNumbers"]) {
            (FieldValue::Array(a), FieldValue::Array(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("phoneNumbers must stay an array"),
        }
    }

    #[test]
    fn test_set_past_end_pads_with_undefined() {
        let root = sample();
        let updated = set(&root, &p("phoneNumbers.4"), FieldValue::from("x")).unwrap();
        let items = get(&updated, &p("phoneNumbers")).unwrap();
        let items = items.as_array().unwrap();

        assert_eq!(items.len(), 5);
        assert!(items[2].is_undefined());
        assert!(items[3].is_undefined());
        assert_eq!(items[4], FieldValue::from("x"));
    }

    #[rstest]
    #[case("list.18446744073709551615")]
    #[case("list.65536")]
    #[case("fresh.18446744073709551615.name")]
    fn test_set_rejects_huge_index(#[case] raw: &str) {
        let root = FieldValue::from(json!({ "list": [] }));
        let err = set(&root, &p(raw), FieldValue::from("x")).unwrap_err();
        assert!(matches!(err, PathError::InvalidPath { reason: "index too large", .. }));
    }

    #[test]
    fn test_unset() {
        let root = sample();
        let updated = unset(&root, &p("social.facebook")).unwrap();
        assert!(get(&updated, &p("social.facebook")).unwrap().is_undefined());
        assert_eq!(get(&updated, &p("social.twitter")).unwrap(), FieldValue::from("john_doe_tw"));

        let updated = unset(&root, &p("phoneNumbers.0")).unwrap();
        let items = get(&updated, &p("phoneNumbers")).unwrap();
        assert_eq!(items.as_array().unwrap().len(), 2);
        assert!(items.as_array().unwrap()[0].is_undefined());

        let untouched = unset(&root, &p("nothing.here")).unwrap();
        assert_eq!(untouched, root);
    }

    #[test]
    fn test_update_sequence() {
        let root = sample();
        let (updated, removed) = update_sequence(&root, &p("phoneNumbers"), |items| items.remove(0)).unwrap();

        assert_eq!(removed, FieldValue::from("1234567890"));
        assert_eq!(get(&updated, &p("phoneNumbers.0")).unwrap(), FieldValue::from("9876543210"));

        assert!(update_sequence(&root, &p("username"), |items| items.len()).is_err());
    }

    #[test]
    fn test_leaf_paths() {
        let element = FieldValue::from(json!({ "number": "", "ext": { "code": "1" } }));
        let leaves = leaf_paths(&element, &p("phNumbers.2")).unwrap();
        assert_eq!(leaves, vec![p("phNumbers.2.ext.code"), p("phNumbers.2.number")]);
    }

    #[test]
    fn test_index_rewriting() {
        let base = p("phNumbers");
        let path = p("phNumbers.2.number");

        assert_eq!(path.index_under(&base), Some(2));
        assert_eq!(path.with_index_under(&base, 1), Some(p("phNumbers.1.number")));
        assert_eq!(p("phNumbers.3").with_index_under(&base, 0), Some(p("phNumbers.0")));
        assert_eq!(p("phNumbersX.0").index_under(&base), None);
        assert!(p("phNumbers.0.number").is_within(&base));
        assert!(!p("phNumbersX").is_within(&base));
    }
}
