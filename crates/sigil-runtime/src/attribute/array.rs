//! Array primitives on attributes. Each logs exactly the positional entries
//! it performed, rather than diffing the result.

use serde_json::Value;

use super::{Attribute, AttributeState, Change};
use crate::error::ChangeError;

/// Resolve a possibly negative relative index against `len`.
fn relative(index: isize, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(len)
    }
}

fn at(index: usize) -> Vec<String> {
    vec![index.to_string()]
}

impl Attribute {
    fn items(&self) -> Result<&Vec<Value>, ChangeError> {
        match &self.value {
            Value::Array(items) if self.state == AttributeState::Active => Ok(items),
            _ => Err(ChangeError::NotAnArray {
                attribute: self.name.clone(),
            }),
        }
    }

    /// Apply `entries` to the value, then validate and record them.
    fn perform(&mut self, entries: Vec<Change>) -> Result<Vec<Change>, ChangeError> {
        let mut value = self.value.clone();
        for entry in &entries {
            entry.apply(&mut value)?;
        }
        let hooks = self.schema.hooks();
        self.check_hook(&hooks, &value);
        self.value = value;
        self.record(&hooks, &entries);
        Ok(entries)
    }

    /// Append `values`; returns the new length.
    pub fn push(&mut self, values: Vec<Value>) -> Result<usize, ChangeError> {
        let len = self.items()?.len();
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Change::add(at(len + i), value))
            .collect();
        Ok(len + self.perform(entries)?.len())
    }

    pub fn pop(&mut self) -> Result<Option<Value>, ChangeError> {
        let Some(last) = self.items()?.last().cloned() else {
            return Ok(None);
        };
        let len = self.items()?.len();
        self.perform(vec![Change::remove(at(len - 1), last.clone())])?;
        Ok(Some(last))
    }

    pub fn shift(&mut self) -> Result<Option<Value>, ChangeError> {
        let Some(first) = self.items()?.first().cloned() else {
            return Ok(None);
        };
        self.perform(vec![Change::remove(at(0), first.clone())])?;
        Ok(Some(first))
    }

    /// Prepend `values`, keeping their order; returns the new length.
    pub fn unshift(&mut self, values: Vec<Value>) -> Result<usize, ChangeError> {
        let len = self.items()?.len();
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Change::add(at(i), value))
            .collect();
        Ok(len + self.perform(entries)?.len())
    }

    /// Remove `delete_count` elements at `start` and insert `items` there;
    /// returns the removed elements. Replaced positions log as `change`.
    pub fn splice(&mut self, start: isize, delete_count: usize, items: Vec<Value>) -> Result<Vec<Value>, ChangeError> {
        let current = self.items()?;
        let start = relative(start, current.len());
        let delete_count = delete_count.min(current.len() - start);
        let removed: Vec<Value> = current[start..start + delete_count].to_vec();

        let paired = removed.len().min(items.len());
        let mut entries = Vec::new();
        for (t, (old, new)) in removed.iter().zip(&items).enumerate() {
            entries.push(Change::change(at(start + t), new.clone(), old.clone()));
        }
        for old in &removed[paired..] {
            entries.push(Change::remove(at(start + paired), old.clone()));
        }
        for (r, new) in items.into_iter().skip(paired).enumerate() {
            entries.push(Change::add(at(start + paired + r), new));
        }

        self.perform(entries)?;
        Ok(removed)
    }

    /// Write `value` over `[start, end)`.
    pub fn fill(&mut self, value: Value, start: isize, end: Option<isize>) -> Result<(), ChangeError> {
        let current = self.items()?;
        let len = current.len();
        let start = relative(start, len);
        let end = end.map_or(len, |end| relative(end, len));
        let entries = (start..end)
            .map(|i| Change::change(at(i), value.clone(), current[i].clone()))
            .collect();
        self.perform(entries)?;
        Ok(())
    }

    /// Copy `[start, end)` to `target` within the array, like
    /// `Array.prototype.copyWithin`.
    pub fn copy_within(&mut self, target: isize, start: isize, end: Option<isize>) -> Result<(), ChangeError> {
        let current = self.items()?;
        let len = current.len();
        let target = relative(target, len);
        let start = relative(start, len);
        let end = end.map_or(len, |end| relative(end, len));
        let count = end.saturating_sub(start).min(len - target);

        let source: Vec<Value> = current[start..start + count].to_vec();
        let entries = source
            .into_iter()
            .enumerate()
            .map(|(i, value)| Change::change(at(target + i), value, current[target + i].clone()))
            .collect();
        self.perform(entries)?;
        Ok(())
    }

    /// Positional write. Writing at `len` appends.
    pub fn set_index(&mut self, index: usize, value: Value) -> Result<(), ChangeError> {
        let current = self.items()?;
        let entry = match current.get(index) {
            Some(old) => Change::change(at(index), value, old.clone()),
            None if index == current.len() => Change::add(at(index), value),
            None => {
                return Err(ChangeError::IndexOutOfBounds {
                    index,
                    len: current.len(),
                })
            }
        };
        self.perform(vec![entry])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ChangeKind;
    use crate::schema::AttributeSchema;
    use crate::store::MetadataStore;
    use serde_json::json;
    use sigil_engine::{AttrMetadata, MetadataType};
    use std::sync::{Arc, Weak};

    fn tags(initial: Value) -> (Arc<MetadataStore>, Attribute) {
        let store = MetadataStore::new();
        let metadata = AttrMetadata {
            name: "tags".into(),
            is_required: true,
            is_read_only: false,
            is_internal: false,
            is_lazy: false,
            ty: MetadataType::array(MetadataType::Mixed),
        };
        let schema = Arc::new(AttributeSchema::new(&store, "Post", metadata, json!({}), json!({})));
        let mut attribute = Attribute::new(schema, Weak::new(), 10_000);
        attribute.initialize(initial);
        (store, attribute)
    }

    fn logged(attr: &Attribute) -> Vec<(ChangeKind, String)> {
        attr.get_changes()[1..]
            .iter()
            .map(|c| (c.kind, c.path_string()))
            .collect()
    }

    #[test]
    fn test_push_pop_shift_unshift() {
        let (_store, mut attr) = tags(json!([1]));
        assert_eq!(attr.push(vec![json!(2), json!(3)]).unwrap(), 3);
        assert_eq!(attr.pop().unwrap(), Some(json!(3)));
        assert_eq!(attr.unshift(vec![json!(-1), json!(0)]).unwrap(), 4);
        assert_eq!(attr.shift().unwrap(), Some(json!(-1)));
        assert_eq!(attr.get(), &json!([0, 1, 2]));
        assert_eq!(
            logged(&attr),
            vec![
                (ChangeKind::Add, "1".to_string()),
                (ChangeKind::Add, "2".to_string()),
                (ChangeKind::Remove, "2".to_string()),
                (ChangeKind::Add, "0".to_string()),
                (ChangeKind::Add, "1".to_string()),
                (ChangeKind::Remove, "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_pop_empty() {
        let (_store, mut attr) = tags(json!([]));
        assert_eq!(attr.pop().unwrap(), None);
        assert_eq!(attr.shift().unwrap(), None);
        assert_eq!(attr.get_changes().len(), 1);
    }

    #[test]
    fn test_splice_negative_start() {
        let (_store, mut attr) = tags(json!(["a", "b", "c", "d"]));
        let removed = attr.splice(-3, 2, vec![json!("x")]).unwrap();
        assert_eq!(removed, vec![json!("b"), json!("c")]);
        assert_eq!(attr.get(), &json!(["a", "x", "d"]));
        assert_eq!(
            logged(&attr),
            vec![(ChangeKind::Change, "1".to_string()), (ChangeKind::Remove, "2".to_string())]
        );
    }

    #[test]
    fn test_fill_and_copy_within() {
        let (_store, mut attr) = tags(json!([1, 2, 3, 4, 5]));
        attr.copy_within(0, 3, None).unwrap();
        assert_eq!(attr.get(), &json!([4, 5, 3, 4, 5]));
        attr.fill(json!(0), 1, Some(-2)).unwrap();
        assert_eq!(attr.get(), &json!([4, 0, 0, 4, 5]));
    }

    #[test]
    fn test_set_index_bounds() {
        let (_store, mut attr) = tags(json!([1]));
        attr.set_index(0, json!(7)).unwrap();
        attr.set_index(1, json!(8)).unwrap();
        assert_eq!(attr.get(), &json!([7, 8]));
        assert_eq!(
            attr.set_index(5, json!(0)),
            Err(ChangeError::IndexOutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_primitives_need_an_array() {
        let (_store, mut attr) = tags(json!("text"));
        assert!(matches!(attr.push(vec![json!(1)]), Err(ChangeError::NotAnArray { .. })));
    }
}
