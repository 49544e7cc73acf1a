//! The classes an evaluation produces, and where it finds classes it did not create.

use std::collections::btree_map;
use std::collections::BTreeMap;

use dashmap::DashMap;
use jbpl_bytecode::{ClassNode, FieldNode, MethodNode};
use jbpl_core::error::{Error, Result};
use jbpl_core::span::TokenRange;

use crate::error::interpretation_error_at;

/// Resolves classes that exist outside the current evaluation.
pub trait ClassProvider: Send + Sync {
    fn find_class(&self, name: &str) -> Option<ClassNode>;
}

impl<F> ClassProvider for F
where
    F: Fn(&str) -> Option<ClassNode> + Send + Sync,
{
    fn find_class(&self, name: &str) -> Option<ClassNode> {
        self(name)
    }
}

/// Concurrent class store, shareable between evaluations of different files.
#[derive(Debug, Default)]
pub struct ClassPool {
    classes: DashMap<String, ClassNode>,
}

impl ClassPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, class: ClassNode) -> Option<ClassNode> {
        self.classes.insert(class.name.clone(), class)
    }

    pub fn get(&self, name: &str) -> Option<ClassNode> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, name: &str) -> Option<ClassNode> {
        self.classes.remove(name).map(|(_, class)| class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassProvider for ClassPool {
    fn find_class(&self, name: &str) -> Option<ClassNode> {
        self.get(name)
    }
}

/// Edited classes by internal name. `None` is a tombstone: the class is to be
/// deleted from the output, which is different from never being touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputMap {
    classes: BTreeMap<String, Option<ClassNode>>,
}

impl OutputMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A live class; tombstoned and untouched classes yield `None`.
    pub fn class(&self, name: &str) -> Option<&ClassNode> {
        self.classes.get(name).and_then(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn is_tombstone(&self, name: &str) -> bool {
        matches!(self.classes.get(name), Some(None))
    }

    pub fn add_class(&mut self, class: ClassNode) {
        jbpl_core::debug!("adding class {}", class.name);
        self.classes.insert(class.name.clone(), Some(class));
    }

    pub fn remove_class(&mut self, name: &str) {
        jbpl_core::debug!("removing class {}", name);
        self.classes.insert(name.to_string(), None);
    }

    /// Applies `edit` to the edited version of `name`, or to the provider's
    /// copy when this evaluation has not touched it yet, and keeps the result.
    pub fn transform_class<T>(
        &mut self,
        name: &str,
        provider: &dyn ClassProvider,
        range: TokenRange,
        edit: impl FnOnce(&mut ClassNode) -> Result<T>,
    ) -> Result<T> {
        let mut class = match self.classes.get(name) {
            Some(Some(class)) => class.clone(),
            Some(None) => {
                return Err(Error::MissingTarget {
                    message: format!("Class '{}' was removed from the output", name),
                    range,
                })
            }
            None => provider.find_class(name).ok_or_else(|| {
                interpretation_error_at(format!("Could not find class '{}'", name), range)
            })?,
        };
        let result = edit(&mut class)?;
        self.classes.insert(name.to_string(), Some(class));
        Ok(result)
    }

    /// Adds a method, replacing one with the same name and descriptor.
    pub fn put_method(
        &mut self,
        owner: &str,
        method: MethodNode,
        provider: &dyn ClassProvider,
        range: TokenRange,
    ) -> Result<()> {
        self.transform_class(owner, provider, range, |class| {
            match class
                .methods
                .iter_mut()
                .find(|it| it.name == method.name && it.descriptor == method.descriptor)
            {
                Some(existing) => *existing = method,
                None => class.methods.push(method),
            }
            Ok(())
        })
    }

    pub fn remove_method(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        provider: &dyn ClassProvider,
        range: TokenRange,
    ) -> Result<MethodNode> {
        self.transform_class(owner, provider, range, |class| {
            let index = class
                .methods
                .iter()
                .position(|it| it.name == name && it.descriptor == descriptor)
                .ok_or_else(|| Error::MissingTarget {
                    message: format!("Method {}.{}{} does not exist", owner, name, descriptor),
                    range,
                })?;
            Ok(class.methods.remove(index))
        })
    }

    /// Adds a field, replacing one with the same name and descriptor.
    pub fn put_field(
        &mut self,
        owner: &str,
        field: FieldNode,
        provider: &dyn ClassProvider,
        range: TokenRange,
    ) -> Result<()> {
        self.transform_class(owner, provider, range, |class| {
            match class
                .fields
                .iter_mut()
                .find(|it| it.name == field.name && it.descriptor == field.descriptor)
            {
                Some(existing) => *existing = field,
                None => class.fields.push(field),
            }
            Ok(())
        })
    }

    pub fn remove_field(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        provider: &dyn ClassProvider,
        range: TokenRange,
    ) -> Result<FieldNode> {
        self.transform_class(owner, provider, range, |class| {
            let index = class
                .fields
                .iter()
                .position(|it| it.name == name && it.descriptor == descriptor)
                .ok_or_else(|| Error::MissingTarget {
                    message: format!("Field {}.{}:{} does not exist", owner, name, descriptor),
                    range,
                })?;
            Ok(class.fields.remove(index))
        })
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Option<ClassNode>> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl IntoIterator for OutputMap {
    type Item = (String, Option<ClassNode>);
    type IntoIter = btree_map::IntoIter<String, Option<ClassNode>>;

    fn into_iter(self) -> Self::IntoIter {
        self.classes.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edits_start_from_the_provider_copy() {
        let pool = ClassPool::new();
        pool.insert(ClassNode::new("a/Existing"));
        let mut output = OutputMap::new();

        output
            .put_field(
                "a/Existing",
                FieldNode::new(0, "count", "I"),
                &pool,
                TokenRange::Synthetic,
            )
            .unwrap();

        assert_eq!(output.class("a/Existing").unwrap().fields.len(), 1);
        assert!(pool.get("a/Existing").unwrap().fields.is_empty());
    }

    #[test]
    fn tombstones_block_further_edits() {
        let pool = ClassPool::new();
        let mut output = OutputMap::new();
        output.add_class(ClassNode::new("a/Gone"));
        output.remove_class("a/Gone");

        assert!(output.is_tombstone("a/Gone"));
        assert!(output.class("a/Gone").is_none());
        let error = output
            .put_method("a/Gone", MethodNode::new(0, "m", "()V"), &pool, TokenRange::Synthetic)
            .unwrap_err();
        assert!(matches!(error, Error::MissingTarget { .. }));
    }

    #[test]
    fn unknown_classes_are_errors() {
        let provider = |_: &str| -> Option<ClassNode> { None };
        let mut output = OutputMap::new();
        let error = output
            .remove_field("a/Nope", "x", "I", &provider, TokenRange::Synthetic)
            .unwrap_err();
        assert_eq!(error.to_string(), "Could not find class 'a/Nope'");
    }
}
