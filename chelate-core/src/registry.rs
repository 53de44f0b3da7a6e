use indexmap::IndexSet;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::node::{Class, Entity};
use crate::value::Fields;

/// Error reported by a [`TypeRegistry`] implementation.
///
/// The serializer never handles these: they abort the whole call.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RegistryError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RegistryError {
    pub fn new(message: impl Into<String>) -> Self {
        RegistryError {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        RegistryError {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Field-filtering policy for a registered type tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOptions {
    #[serde(default)]
    pub include: Option<IndexSet<String>>,
    #[serde(default)]
    pub exclude: Option<IndexSet<String>>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Filters `fields`.
    ///
    /// `exclude` is applied first and keeps the original field order. `include`
    /// is applied to what remains and yields fields in `include` order; names
    /// that are not present are skipped.
    pub fn apply(&self, mut fields: Fields) -> Fields {
        if let Some(exclude) = &self.exclude {
            fields.retain(|name, _| !exclude.contains(name));
        }
        if let Some(include) = &self.include {
            fields = include
                .iter()
                .filter_map(|name| fields.shift_remove_entry(name))
                .collect();
        }
        fields
    }
}

/// Type metadata consumed by the serializer.
///
/// Implementations must be deterministic and free of side effects; the
/// serializer neither caches nor re-validates answers within a call.
pub trait TypeRegistry {
    /// Returns true if instances of `class` may be serialized.
    fn has_type(&self, class: &Class) -> Result<bool, RegistryError>;

    /// Returns the field options registered under a type tag.
    fn get_options(&self, type_tag: &str) -> Result<Option<FieldOptions>, RegistryError>;
}

impl<R: TypeRegistry + ?Sized> TypeRegistry for &R {
    fn has_type(&self, class: &Class) -> Result<bool, RegistryError> {
        (**self).has_type(class)
    }

    fn get_options(&self, type_tag: &str) -> Result<Option<FieldOptions>, RegistryError> {
        (**self).get_options(type_tag)
    }
}

impl<R: TypeRegistry + ?Sized> TypeRegistry for Box<R> {
    fn has_type(&self, class: &Class) -> Result<bool, RegistryError> {
        (**self).has_type(class)
    }

    fn get_options(&self, type_tag: &str) -> Result<Option<FieldOptions>, RegistryError> {
        (**self).get_options(type_tag)
    }
}

/// An in-memory registry keyed by class name.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    classes: HashSet<Arc<str>>,
    options: HashMap<String, FieldOptions>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class. Options are stored under the class's declared tag,
    /// if it has one.
    pub fn register(&mut self, class: &Class, options: Option<FieldOptions>) -> &mut Self {
        self.classes.insert(Arc::from(class.name()));
        if let (Some(tag), Some(options)) = (class.tag(), options) {
            self.options.insert(tag.to_string(), options);
        }
        self
    }

    pub fn register_entity<T: Entity>(&mut self) -> &mut Self {
        self.register(&T::class(), None)
    }

    pub fn register_entity_with<T: Entity>(&mut self, options: FieldOptions) -> &mut Self {
        self.register(&T::class(), Some(options))
    }

    /// Replaces the options stored under a type tag.
    pub fn set_options(&mut self, tag: impl Into<String>, options: FieldOptions) -> &mut Self {
        self.options.insert(tag.into(), options);
        self
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains(class_name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl TypeRegistry for MemoryRegistry {
    fn has_type(&self, class: &Class) -> Result<bool, RegistryError> {
        Ok(self.classes.contains(class.name()))
    }

    fn get_options(&self, type_tag: &str) -> Result<Option<FieldOptions>, RegistryError> {
        Ok(self.options.get(type_tag).cloned())
    }
}
