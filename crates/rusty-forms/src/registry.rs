// File: rusty-forms/src/registry.rs
// Purpose: Registered field paths, their rules and per-field flags

use rusty_forms_types::{path, FieldPath, FieldValue};
use rusty_forms_validation::RuleSet;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Bookkeeping for one registered path
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub path: FieldPath,
    pub rules: Arc<RuleSet>,
    pub is_touched: bool,
    /// Current value differs from the captured default
    pub is_dirty: bool,
    pub is_disabled: bool,
}

impl FieldEntry {
    fn new(path: FieldPath, rules: Arc<RuleSet>) -> Self {
        Self {
            path,
            rules,
            is_touched: false,
            is_dirty: false,
            is_disabled: false,
        }
    }
}

/// All live field entries, one per path, in path order
#[derive(Debug, Default)]
pub struct FieldRegistry {
    entries: BTreeMap<FieldPath, FieldEntry>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path`, or replace its rules if it is already registered
    ///
    /// Touched and dirty flags survive re-registration. Returns `true` for a
    /// new entry.
    pub fn register(&mut self, path: FieldPath, rules: Arc<RuleSet>) -> bool {
        match self.entries.get_mut(&path) {
            Some(entry) => {
                entry.rules = rules;
                false
            }
            None => {
                self.entries.insert(path.clone(), FieldEntry::new(path, rules));
                true
            }
        }
    }

    pub fn unregister(&mut self, path: &FieldPath) -> Option<FieldEntry> {
        self.entries.remove(path)
    }

    /// Remove `base` and every entry below it
    pub fn unregister_within(&mut self, base: &FieldPath) -> Vec<FieldEntry> {
        let doomed: Vec<FieldPath> = self
            .entries
            .keys()
            .filter(|path| path.is_within(base))
            .cloned()
            .collect();
        doomed.iter().filter_map(|path| self.entries.remove(path)).collect()
    }

    pub fn get(&self, path: &FieldPath) -> Option<&FieldEntry> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &FieldPath) -> Option<&mut FieldEntry> {
        self.entries.get_mut(path)
    }

    pub fn get_rules(&self, path: &FieldPath) -> Option<Arc<RuleSet>> {
        self.entries.get(path).map(|entry| entry.rules.clone())
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FieldEntry> {
        self.entries.values()
    }

    /// Registered paths that are not disabled
    pub fn enabled_paths(&self) -> Vec<FieldPath> {
        self.entries
            .values()
            .filter(|entry| !entry.is_disabled)
            .map(|entry| entry.path.clone())
            .collect()
    }

    pub fn dirty_paths(&self) -> Vec<FieldPath> {
        self.paths_where(|entry| entry.is_dirty)
    }

    pub fn touched_paths(&self) -> Vec<FieldPath> {
        self.paths_where(|entry| entry.is_touched)
    }

    pub fn disabled_paths(&self) -> Vec<FieldPath> {
        self.paths_where(|entry| entry.is_disabled)
    }

    fn paths_where(&self, keep: impl Fn(&FieldEntry) -> bool) -> Vec<FieldPath> {
        self.entries
            .values()
            .filter(|entry| keep(entry))
            .map(|entry| entry.path.clone())
            .collect()
    }

    /// Re-evaluate every disabled predicate against `values`
    ///
    /// Returns the paths that just became disabled.
    pub fn refresh_disabled(&mut self, values: &FieldValue) -> Vec<FieldPath> {
        let mut newly_disabled = Vec::new();
        for entry in self.entries.values_mut() {
            let disabled = entry.rules.disabled.evaluate(values);
            if disabled && !entry.is_disabled {
                newly_disabled.push(entry.path.clone());
            }
            entry.is_disabled = disabled;
        }
        newly_disabled
    }

    /// Recompute dirty flags for entries related to `scope` (at, above or below it)
    pub fn refresh_dirty(&mut self, scope: &FieldPath, values: &FieldValue, defaults: &FieldValue) {
        for entry in self.entries.values_mut() {
            if entry.path.is_within(scope) || scope.is_within(&entry.path) {
                entry.is_dirty = differs(values, defaults, &entry.path);
            }
        }
    }

    /// Mark entries at or below `scope` touched
    pub fn touch(&mut self, scope: &FieldPath) -> bool {
        let mut changed = false;
        for entry in self.entries.values_mut() {
            if entry.path.is_within(scope) && !entry.is_touched {
                entry.is_touched = true;
                changed = true;
            }
        }
        changed
    }

    pub fn any_dirty(&self) -> bool {
        self.entries.values().any(|entry| entry.is_dirty)
    }

    /// Reset every touched and dirty flag
    pub fn clear_flags(&mut self) {
        for entry in self.entries.values_mut() {
            entry.is_touched = false;
            entry.is_dirty = false;
        }
    }

    /// Move entries under the sequence at `base` to new element indices
    ///
    /// `remap` maps an old index to its new one, or `None` to drop the entry.
    pub fn remap_indices(&mut self, base: &FieldPath, remap: impl FnMut(usize) -> Option<usize>) {
        remap_indices(&mut self.entries, base, remap);
        for (path, entry) in self.entries.iter_mut() {
            if path.is_within(base) {
                entry.path = path.clone();
            }
        }
    }
}

fn differs(values: &FieldValue, defaults: &FieldValue, at: &FieldPath) -> bool {
    let current = path::lookup(values, at).ok().flatten();
    let default = path::lookup(defaults, at).ok().flatten();
    match (current, default) {
        (Some(current), Some(default)) => current != default,
        (None, None) => false,
        (Some(value), None) | (None, Some(value)) => !value.is_undefined(),
    }
}

/// Re-key every entry of `map` that lives under an element of the sequence at `base`
///
/// All affected keys are taken out before any is reinserted, so swaps and
/// shifts never collide. Returns the entries `remap` dropped.
pub(crate) fn remap_indices<V>(
    map: &mut BTreeMap<FieldPath, V>,
    base: &FieldPath,
    mut remap: impl FnMut(usize) -> Option<usize>,
) -> Vec<(FieldPath, V)> {
    let affected: Vec<FieldPath> = map
        .keys()
        .filter(|path| path.index_under(base).is_some())
        .cloned()
        .collect();

    let mut moved = Vec::with_capacity(affected.len());
    for path in affected {
        if let Some(value) = map.remove(&path) {
            moved.push((path, value));
        }
    }

    let mut dropped = Vec::new();
    for (path, value) in moved {
        let target = path
            .index_under(base)
            .and_then(&mut remap)
            .and_then(|index| path.with_index_under(base, index));
        match target {
            Some(target) => {
                map.insert(target, value);
            }
            None => dropped.push((path, value)),
        }
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn rules(message: &str) -> Arc<RuleSet> {
        Arc::new(RuleSet::new().required(message))
    }

    #[test]
    fn test_reregister_replaces_rules_and_keeps_flags() {
        let mut registry = FieldRegistry::new();
        assert!(registry.register(p("username"), rules("first")));
        registry.get_mut(&p("username")).unwrap().is_touched = true;

        assert!(!registry.register(p("username"), rules("second")));
        let entry = registry.get(&p("username")).unwrap();
        assert!(entry.is_touched);
        assert_eq!(entry.rules.required.as_ref().unwrap().message, "second");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_within() {
        let mut registry = FieldRegistry::new();
        for raw in ["phNumbers.0.number", "phNumbers.1.number", "phoneNumbers.0", "username"] {
            registry.register(p(raw), Arc::new(RuleSet::new()));
        }

        let removed = registry.unregister_within(&p("phNumbers"));
        assert_eq!(removed.len(), 2);
        assert!(registry.contains(&p("phoneNumbers.0")));
        assert!(registry.unregister(&p("username")).is_some());
        assert!(registry.get_rules(&p("username")).is_none());
    }

    #[test]
    fn test_refresh_disabled_reports_transitions() {
        let mut registry = FieldRegistry::new();
        let channel_empty = |values: &FieldValue| {
            values.as_object().and_then(|m| m.get("channel")).and_then(|v| v.as_str()) == Some("")
        };
        registry.register(p("social.twitter"), Arc::new(RuleSet::new().disabled_when(channel_empty)));

        let empty = FieldValue::from(json!({ "channel": "" }));
        let filled = FieldValue::from(json!({ "channel": "john" }));

        assert_eq!(registry.refresh_disabled(&empty), vec![p("social.twitter")]);
        assert!(registry.refresh_disabled(&empty).is_empty());
        assert!(registry.refresh_disabled(&filled).is_empty());
        assert!(registry.disabled_paths().is_empty());
        assert_eq!(registry.enabled_paths(), vec![p("social.twitter")]);
    }

    #[test]
    fn test_refresh_dirty_against_defaults() {
        let mut registry = FieldRegistry::new();
        registry.register(p("social.twitter"), Arc::new(RuleSet::new()));
        registry.register(p("username"), Arc::new(RuleSet::new()));

        let defaults = FieldValue::from(json!({ "username": "a", "social": { "twitter": "t" } }));
        let values = FieldValue::from(json!({ "username": "b", "social": { "twitter": "t2" } }));

        registry.refresh_dirty(&p("social"), &values, &defaults);
        assert_eq!(registry.dirty_paths(), vec![p("social.twitter")]);

        registry.refresh_dirty(&p("social.twitter"), &defaults, &defaults);
        assert!(!registry.any_dirty());
    }

    #[test]
    fn test_remap_shifts_and_drops() {
        let mut registry = FieldRegistry::new();
        for raw in ["phNumbers.0.number", "phNumbers.1.number", "phNumbers.2.number"] {
            registry.register(p(raw), Arc::new(RuleSet::new()));
        }
        registry.get_mut(&p("phNumbers.2.number")).unwrap().is_touched = true;

        // remove index 1
        registry.remap_indices(&p("phNumbers"), |i| match i {
            1 => None,
            i if i > 1 => Some(i - 1),
            i => Some(i),
        });

        let paths: Vec<_> = registry.entries().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["phNumbers.0.number", "phNumbers.1.number"]);
        assert!(registry.get(&p("phNumbers.1.number")).unwrap().is_touched);
    }

    #[test]
    fn test_remap_swap_does_not_collide() {
        let mut map = BTreeMap::new();
        map.insert(p("list.0"), "a");
        map.insert(p("list.1"), "b");

        let dropped = remap_indices(&mut map, &p("list"), |i| Some(1 - i));
        assert!(dropped.is_empty());
        assert_eq!(map[&p("list.0")], "b");
        assert_eq!(map[&p("list.1")], "a");
    }
}
