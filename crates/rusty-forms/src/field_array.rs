// File: rusty-forms/src/field_array.rs
// Purpose: Ordered, insertable/removable rows under one base path

use rusty_forms_types::{path, FieldPath, FieldValue, PathError};
use rusty_forms_validation::RuleSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{FormError, Result};
use crate::registry::remap_indices;
use crate::state::FormState;
use crate::store::Form;
use crate::watch::ChangeKind;

/// One row of a field array: stable id plus its current position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayFieldEntry {
    pub id: String,
    pub index: usize,
}

/// How a field array is declared
///
/// `rules` is keyed by the leaf path inside one element (`"number"` for
/// `phNumbers.N.number`); the empty key applies to scalar elements.
#[derive(Debug, Clone, Default)]
pub struct FieldArrayOptions {
    /// The first `min_length` rows are fixed and cannot be removed
    pub min_length: usize,
    pub rules: BTreeMap<String, Arc<RuleSet>>,
}

impl FieldArrayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Rules for the leaf `leaf` of every element
    pub fn rule(mut self, leaf: impl Into<String>, rules: RuleSet) -> Self {
        self.rules.insert(leaf.into(), Arc::new(rules));
        self
    }

    /// Rules for elements that are scalars themselves
    pub fn element_rule(self, rules: RuleSet) -> Self {
        self.rule("", rules)
    }

    fn rules_for(&self, leaf: &str) -> Arc<RuleSet> {
        self.rules.get(leaf).cloned().unwrap_or_default()
    }
}

pub(crate) struct ArrayField {
    options: FieldArrayOptions,
    ids: Vec<String>,
}

/// Declared field arrays by base path
#[derive(Default)]
pub(crate) struct FieldArrays {
    fields: BTreeMap<FieldPath, ArrayField>,
}

impl FieldArrays {
    pub fn bases(&self) -> impl Iterator<Item = &FieldPath> {
        self.fields.keys()
    }

    /// Whether `path` lies inside an element of a declared array
    pub fn owns(&self, path: &FieldPath) -> bool {
        self.fields.keys().any(|base| path.index_under(base).is_some())
    }

    fn get(&self, base: &FieldPath) -> Result<&ArrayField> {
        self.fields
            .get(base)
            .ok_or_else(|| FormError::NotAFieldArray(base.clone()))
    }

    fn get_mut(&mut self, base: &FieldPath) -> Result<&mut ArrayField> {
        self.fields
            .get_mut(base)
            .ok_or_else(|| FormError::NotAFieldArray(base.clone()))
    }

    fn entries(&self, base: &FieldPath) -> Result<Vec<ArrayFieldEntry>> {
        Ok(self
            .get(base)?
            .ids
            .iter()
            .enumerate()
            .map(|(index, id)| ArrayFieldEntry { id: id.clone(), index })
            .collect())
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// State-level operations (run under the form lock)
// =============================================================================

impl FormState {
    fn declare_array(&mut self, base: &FieldPath, options: FieldArrayOptions) -> Result<()> {
        if path::lookup(&self.values, base)?.is_none() {
            let empty = FieldValue::array(Vec::<FieldValue>::new());
            self.values = path::set(&self.values, base, empty.clone())?;
            if path::lookup(&self.defaults, base)?.is_none() {
                self.defaults = path::set(&self.defaults, base, empty)?;
            }
        }

        match self.arrays.fields.get_mut(base) {
            Some(existing) => existing.options = options,
            None => {
                self.arrays.fields.insert(
                    base.clone(),
                    ArrayField {
                        options,
                        ids: Vec::new(),
                    },
                );
            }
        }

        self.sync_array(base)?;
        let len = self.arrays.get(base)?.ids.len();
        for index in 0..len {
            self.register_element(base, index)?;
        }
        self.refresh_disabled();
        Ok(())
    }

    fn array_len(&self, base: &FieldPath) -> Result<usize> {
        Ok(path::lookup(&self.values, base)?
            .and_then(|value| value.as_array())
            .map(|items| items.len())
            .unwrap_or(0))
    }

    /// Bring the id list for `base` in line with the stored sequence length
    pub(crate) fn sync_array(&mut self, base: &FieldPath) -> Result<()> {
        let len = self.array_len(base)?;
        let known = self.arrays.get(base)?.ids.len();

        if len < known {
            for index in len..known {
                let element = base.child(index)?;
                self.registry.unregister_within(&element);
                self.errors.retain(|path, _| !path.is_within(&element));
                self.invalidate_within(&element);
            }
            self.arrays.get_mut(base)?.ids.truncate(len);
        } else if len > known {
            self.arrays.get_mut(base)?.ids.extend((known..len).map(|_| new_id()));
            for index in known..len {
                self.register_element(base, index)?;
            }
        }
        Ok(())
    }

    pub(crate) fn sync_all_arrays(&mut self) -> Result<()> {
        let bases: Vec<FieldPath> = self.arrays.bases().cloned().collect();
        for base in &bases {
            self.sync_array(base)?;
        }
        Ok(())
    }

    /// Fresh ids for every row of every array
    pub(crate) fn regenerate_array_ids(&mut self) -> Result<()> {
        let bases: Vec<FieldPath> = self.arrays.bases().cloned().collect();
        for base in &bases {
            let len = self.array_len(base)?;
            let known = self.arrays.get(base)?.ids.len();
            for index in len..known {
                self.registry.unregister_within(&base.child(index)?);
            }
            self.arrays.get_mut(base)?.ids = (0..len).map(|_| new_id()).collect();
            for index in 0..len {
                self.register_element(base, index)?;
            }
        }
        Ok(())
    }

    /// Register every leaf of element `index` with the array's per-leaf rules
    fn register_element(&mut self, base: &FieldPath, index: usize) -> Result<()> {
        let element_path = base.child(index)?;
        let element = path::get(&self.values, &element_path)?;
        let leaves = path::leaf_paths(&element, &element_path)?;

        let array = self.arrays.get(base)?;
        let registrations: Vec<(FieldPath, Arc<RuleSet>)> = leaves
            .into_iter()
            .map(|leaf| {
                let rules = array.options.rules_for(leaf.relative_to(&element_path).unwrap_or(""));
                (leaf, rules)
            })
            .collect();

        for (leaf, rules) in registrations {
            self.registry.register(leaf, rules);
        }
        Ok(())
    }

    /// Shift per-row state under `base` after a structural edit
    fn remap_rows(&mut self, base: &FieldPath, remap: impl Fn(usize) -> Option<usize>) {
        self.registry.remap_indices(base, &remap);
        remap_indices(&mut self.errors, base, &remap);
        self.invalidate_within(base);
    }

    fn finish_structural_change(&mut self, base: &FieldPath) {
        self.refresh_dirty(base);
        self.refresh_disabled();
    }

    fn insert_row(&mut self, base: &FieldPath, index: usize, value: FieldValue) -> Result<ArrayFieldEntry> {
        let len = self.arrays.get(base)?.ids.len();
        if index > len {
            return Err(FormError::IndexOutOfBounds {
                path: base.clone(),
                index,
                len,
            });
        }

        let (values, _) = path::update_sequence(&self.values, base, |items| {
            let at = index.min(items.len());
            items.insert(at, value);
        })?;
        self.values = values;

        self.remap_rows(base, |i| Some(if i >= index { i + 1 } else { i }));
        let id = new_id();
        self.arrays.get_mut(base)?.ids.insert(index, id.clone());
        self.register_element(base, index)?;
        self.finish_structural_change(base);

        debug!(%base, index, %id, "field array row inserted");
        Ok(ArrayFieldEntry { id, index })
    }

    fn remove_row(&mut self, base: &FieldPath, index: usize) -> Result<()> {
        let array = self.arrays.get(base)?;
        let len = array.ids.len();
        if index >= len {
            return Err(FormError::IndexOutOfBounds {
                path: base.clone(),
                index,
                len,
            });
        }
        if index < array.options.min_length {
            warn!(%base, index, min_length = array.options.min_length, "refusing to remove a fixed row");
            return Err(FormError::MinLength {
                path: base.clone(),
                index,
                min_length: array.options.min_length,
            });
        }

        let (values, _) = path::update_sequence(&self.values, base, |items| {
            if index < items.len() {
                items.remove(index);
            }
        })?;
        self.values = values;

        let id = self.arrays.get_mut(base)?.ids.remove(index);
        self.remap_rows(base, |i| match i {
            i if i == index => None,
            i if i > index => Some(i - 1),
            i => Some(i),
        });
        self.finish_structural_change(base);

        debug!(%base, index, %id, "field array row removed");
        Ok(())
    }

    fn swap_rows(&mut self, base: &FieldPath, a: usize, b: usize) -> Result<()> {
        let len = self.arrays.get(base)?.ids.len();
        if let Some(index) = [a, b].into_iter().find(|&index| index >= len) {
            return Err(FormError::IndexOutOfBounds {
                path: base.clone(),
                index,
                len,
            });
        }

        let (values, _) = path::update_sequence(&self.values, base, |items| {
            if a < items.len() && b < items.len() {
                items.swap(a, b);
            }
        })?;
        self.values = values;

        self.arrays.get_mut(base)?.ids.swap(a, b);
        self.remap_rows(base, |i| {
            Some(if i == a {
                b
            } else if i == b {
                a
            } else {
                i
            })
        });
        self.finish_structural_change(base);

        debug!(%base, a, b, "field array rows swapped");
        Ok(())
    }
}

// =============================================================================
// Public API
// =============================================================================

impl Form {
    /// Declare `base` as a field array and get a handle to it
    ///
    /// Rows already present in the values get ids and registered leaves.
    /// Declaring again replaces the options and keeps the ids.
    pub fn field_array<P>(&self, base: P, options: FieldArrayOptions) -> Result<FieldArray>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let base = base.try_into()?;
        self.with_state(|state| state.declare_array(&base, options))?;
        Ok(FieldArray {
            form: self.clone(),
            base,
        })
    }

    /// Add a row at the end
    pub fn append<P>(&self, base: P, value: impl Into<FieldValue>) -> Result<ArrayFieldEntry>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let base = base.try_into()?;
        let value = value.into();
        self.structural_change(&base, |state| {
            let len = state.arrays.get(&base)?.ids.len();
            state.insert_row(&base, len, value)
        })
    }

    /// Insert a row at `index`, shifting later rows up
    pub fn insert<P>(&self, base: P, index: usize, value: impl Into<FieldValue>) -> Result<ArrayFieldEntry>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let base = base.try_into()?;
        let value = value.into();
        self.structural_change(&base, |state| state.insert_row(&base, index, value))
    }

    /// Remove the row at `index`
    ///
    /// Rows below the array's `min_length` are fixed: removing one is
    /// [`FormError::MinLength`].
    pub fn remove<P>(&self, base: P, index: usize) -> Result<()>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let base = base.try_into()?;
        self.structural_change(&base, |state| state.remove_row(&base, index))
    }

    pub fn swap<P>(&self, base: P, a: usize, b: usize) -> Result<()>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let base = base.try_into()?;
        self.structural_change(&base, |state| state.swap_rows(&base, a, b))
    }

    /// Current rows of `base` in order
    pub fn list<P>(&self, base: P) -> Result<Vec<ArrayFieldEntry>>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let base = base.try_into()?;
        self.with_state(|state| state.arrays.entries(&base))
    }

    fn structural_change<T>(&self, base: &FieldPath, change: impl FnOnce(&mut FormState) -> Result<T>) -> Result<T> {
        let (result, event) = self.with_state(|state| {
            let result = change(state)?;
            let event = state.commit(Some(base.clone()), ChangeKind::ArrayStructure);
            Ok::<_, FormError>((result, event))
        })?;
        self.emit(event);
        Ok(result)
    }
}

/// Handle to one declared field array
#[derive(Clone)]
pub struct FieldArray {
    form: Form,
    base: FieldPath,
}

impl FieldArray {
    pub fn base(&self) -> &FieldPath {
        &self.base
    }

    /// Rows in order, each with its stable id
    pub fn fields(&self) -> Vec<ArrayFieldEntry> {
        self.form.list(&self.base).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append(&self, value: impl Into<FieldValue>) -> Result<ArrayFieldEntry> {
        self.form.append(&self.base, value)
    }

    pub fn insert(&self, index: usize, value: impl Into<FieldValue>) -> Result<ArrayFieldEntry> {
        self.form.insert(&self.base, index, value)
    }

    pub fn remove(&self, index: usize) -> Result<()> {
        self.form.remove(&self.base, index)
    }

    pub fn swap(&self, a: usize, b: usize) -> Result<()> {
        self.form.swap(&self.base, a, b)
    }
}

impl std::fmt::Debug for FieldArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldArray").field("base", &self.base).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn phone_form() -> (Form, FieldArray) {
        let form = Form::new(FormConfig::default().with_defaults(json!({
            "phNumbers": [{ "number": "111" }, { "number": "222" }]
        })));
        let numbers = form
            .field_array(
                "phNumbers",
                FieldArrayOptions::new()
                    .min_length(1)
                    .rule("number", RuleSet::new().required("Phone number is required")),
            )
            .unwrap();
        (form, numbers)
    }

    fn ids(array: &FieldArray) -> Vec<String> {
        array.fields().into_iter().map(|entry| entry.id).collect()
    }

    #[test]
    fn test_declare_registers_existing_rows() {
        let (form, numbers) = phone_form();
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers.fields()[1].index, 1);

        let state = form.form_state();
        assert!(state.dirty_fields.is_empty());
        assert!(!state.meta.is_dirty);
    }

    #[test]
    fn test_remove_fixed_row_is_rejected() {
        let (form, numbers) = phone_form();
        let before = ids(&numbers);

        assert!(matches!(numbers.remove(0), Err(FormError::MinLength { index: 0, min_length: 1, .. })));
        assert_eq!(ids(&numbers), before);

        numbers.remove(1).unwrap();
        assert_eq!(ids(&numbers), vec![before[0].clone()]);
        assert_eq!(form.get_value("phNumbers").unwrap(), FieldValue::from(json!([{ "number": "111" }])));
    }

    #[test]
    fn test_out_of_bounds() {
        let (_form, numbers) = phone_form();
        assert!(matches!(numbers.remove(5), Err(FormError::IndexOutOfBounds { index: 5, len: 2, .. })));
        assert!(matches!(numbers.insert(3, json!({})), Err(FormError::IndexOutOfBounds { .. })));
        assert!(matches!(numbers.swap(0, 2), Err(FormError::IndexOutOfBounds { index: 2, .. })));
    }

    #[test]
    fn test_append_then_remove_restores_ids() {
        let (form, numbers) = phone_form();
        let before = ids(&numbers);

        let added = numbers.append(json!({ "number": "" })).unwrap();
        assert_eq!(added.index, 2);
        assert!(form.form_state().meta.is_dirty);

        numbers.remove(2).unwrap();
        assert_eq!(ids(&numbers), before);
        assert!(!form.form_state().meta.is_dirty);
    }

    #[test]
    fn test_insert_and_swap_move_ids_not_positions() {
        let (form, numbers) = phone_form();
        let before = ids(&numbers);

        let inserted = numbers.insert(1, json!({ "number": "999" })).unwrap();
        assert_eq!(ids(&numbers), vec![before[0].clone(), inserted.id.clone(), before[1].clone()]);

        numbers.swap(0, 2).unwrap();
        assert_eq!(ids(&numbers), vec![before[1].clone(), inserted.id, before[0].clone()]);
        assert_eq!(form.get_value("phNumbers.0.number").unwrap(), FieldValue::from("222"));
    }

    #[test]
    fn test_undeclared_base() {
        let (form, _numbers) = phone_form();
        assert!(matches!(form.append("phoneNumbers", "x"), Err(FormError::NotAFieldArray(_))));
        assert!(matches!(form.list("nope"), Err(FormError::NotAFieldArray(_))));
    }

    #[tokio::test]
    async fn test_errors_follow_their_row() {
        let (form, numbers) = phone_form();
        numbers.append(json!({ "number": "" })).unwrap();

        assert!(!form.trigger(["phNumbers.2.number"]).await.unwrap());
        numbers.swap(1, 2).unwrap();

        let errors = form.form_state().errors;
        assert_eq!(errors.keys().map(|p| p.as_str()).collect::<Vec<_>>(), vec!["phNumbers.1.number"]);

        numbers.remove(1).unwrap();
        assert!(form.form_state().errors.is_empty());
    }
}
