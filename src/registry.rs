/// Tag registry: which names are structural tags and which are meta-blocks.
///
/// The parser only consults a registry; it never owns or mutates one. The
/// embedding application decides which names are renderable and passes its
/// registry to [`crate::Parser`].
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{ParseError, Result};

/// Classification of a registered tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Structural,
    Meta,
}

/// Read-only lookup of recognized tag names.
///
/// Implementations must tolerate concurrent reads: independent parses may
/// share one registry across threads.
pub trait TagRegistry: Send + Sync {
    /// Is `name` a structural tag whose body is parsed recursively?
    fn is_structural_tag(&self, name: &str) -> bool;

    /// Is `name` a meta tag whose body is opaque?
    fn is_meta_tag(&self, name: &str) -> bool;

    /// Classifies `name`; meta wins if an implementation reports both.
    fn classify(&self, name: &str) -> Option<TagClass> {
        if self.is_meta_tag(name) {
            Some(TagClass::Meta)
        } else if self.is_structural_tag(name) {
            Some(TagClass::Structural)
        } else {
            None
        }
    }
}

impl<T: TagRegistry + ?Sized> TagRegistry for &T {
    fn is_structural_tag(&self, name: &str) -> bool {
        (**self).is_structural_tag(name)
    }

    fn is_meta_tag(&self, name: &str) -> bool {
        (**self).is_meta_tag(name)
    }
}

impl<T: TagRegistry + ?Sized> TagRegistry for Box<T> {
    fn is_structural_tag(&self, name: &str) -> bool {
        (**self).is_structural_tag(name)
    }

    fn is_meta_tag(&self, name: &str) -> bool {
        (**self).is_meta_tag(name)
    }
}

impl<T: TagRegistry + ?Sized> TagRegistry for Arc<T> {
    fn is_structural_tag(&self, name: &str) -> bool {
        (**self).is_structural_tag(name)
    }

    fn is_meta_tag(&self, name: &str) -> bool {
        (**self).is_meta_tag(name)
    }
}

/// A set-backed registry with ASCII-case-insensitive names.
#[derive(Debug, Default, Clone)]
pub struct TagSet {
    structural: HashSet<String>,
    meta: HashSet<String>,
}

impl TagSet {
    /// Creates an empty registry. Nothing is recognized until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from two name lists.
    pub fn from_names<S, M>(structural: S, meta: M) -> Result<Self>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        let mut set = Self::new();
        for name in structural {
            set.register_structural(name.as_ref())?;
        }
        for name in meta {
            set.register_meta(name.as_ref())?;
        }
        Ok(set)
    }

    pub fn register_structural(&mut self, name: &str) -> Result<()> {
        let key = self.checked_key(name)?;
        self.structural.insert(key);
        Ok(())
    }

    pub fn register_meta(&mut self, name: &str) -> Result<()> {
        let key = self.checked_key(name)?;
        self.meta.insert(key);
        Ok(())
    }

    fn checked_key(&self, name: &str) -> Result<String> {
        if crate::lexer::rules::identifier(name)
            .map(|(rest, _)| !rest.is_empty())
            .unwrap_or(true)
        {
            return Err(ParseError::registry_error(format!(
                "'{}' is not a valid tag name",
                name
            )));
        }
        let key = name.to_ascii_lowercase();
        if self.contains(&key) {
            return Err(ParseError::registry_error(format!(
                "Tag '{}' is already registered",
                name
            )));
        }
        Ok(key)
    }

    /// Returns true if `name` is registered in either class.
    pub fn contains(&self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        self.structural.contains(&key) || self.meta.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.structural.len() + self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names (lowercased), sorted for stable output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .structural
            .iter()
            .chain(self.meta.iter())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn clear(&mut self) {
        self.structural.clear();
        self.meta.clear();
    }
}

impl TagRegistry for TagSet {
    fn is_structural_tag(&self, name: &str) -> bool {
        self.structural.contains(&name.to_ascii_lowercase())
    }

    fn is_meta_tag(&self, name: &str) -> bool {
        self.meta.contains(&name.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry_recognizes_nothing() {
        let registry = TagSet::new();
        assert!(registry.is_empty());
        assert_eq!(registry.classify("task"), None);
    }

    #[test]
    fn test_registration_and_lookup() {
        let registry = TagSet::from_names(["task", "hint"], ["meta"]).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.is_structural_tag("Task"));
        assert!(registry.is_meta_tag("META"));
        assert!(!registry.is_structural_tag("meta"));
        assert_eq!(registry.classify("hint"), Some(TagClass::Structural));
        assert_eq!(registry.classify("meta"), Some(TagClass::Meta));
        assert_eq!(registry.names(), vec!["hint", "meta", "task"]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = TagSet::new();
        registry.register_structural("task").unwrap();
        assert!(registry.register_structural("TASK").is_err());
        assert!(registry.register_meta("task").is_err());
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let mut registry = TagSet::new();
        assert!(registry.register_structural("").is_err());
        assert!(registry.register_structural("two words").is_err());
        assert!(registry.register_structural("9x").is_err());
        assert!(registry.register_structural("output-format").is_ok());
    }

    #[test]
    fn test_forwarding_impls() {
        let registry = Arc::new(TagSet::from_names(["p"], Vec::<&str>::new()).unwrap());
        let boxed: Box<dyn TagRegistry> = Box::new(registry.clone());
        assert!(boxed.is_structural_tag("p"));
        assert!(registry.is_structural_tag("P"));
    }
}
