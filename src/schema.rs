use std::collections::BTreeSet;

use crate::error::ConfigError;

/// How many times a named part may or must appear.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Required, not repeatable.
    ExactlyOnce,
    /// Required, repeatable.
    AtLeastOnce,
    /// Optional, not repeatable.
    AtMostOnce,
    /// Optional, repeatable.
    ZeroOrMore,
}

/// Declarative cardinality rules over part names.
///
/// The four name sets must be disjoint; [`PartSchema::validate`] checks it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartSchema {
    /// Names that must appear exactly once.
    pub exactly_once: BTreeSet<String>,
    /// Names that must appear one or more times.
    pub at_least_once: BTreeSet<String>,
    /// Names that may appear zero or one time.
    pub at_most_once: BTreeSet<String>,
    /// Names that may appear any number of times.
    pub zero_or_more: BTreeSet<String>,
    /// Whether names outside the four sets, and unnamed parts, pass through.
    pub allows_unknown_parts: bool,
}

impl PartSchema {
    /// Creates an empty schema that rejects unknown parts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` under `cardinality`.
    pub fn part(mut self, name: impl Into<String>, cardinality: Cardinality) -> Self {
        let name = name.into();
        match cardinality {
            Cardinality::ExactlyOnce => self.exactly_once.insert(name),
            Cardinality::AtLeastOnce => self.at_least_once.insert(name),
            Cardinality::AtMostOnce => self.at_most_once.insert(name),
            Cardinality::ZeroOrMore => self.zero_or_more.insert(name),
        };
        self
    }

    /// Shorthand for [`Cardinality::ExactlyOnce`].
    pub fn exactly_once(self, name: impl Into<String>) -> Self {
        self.part(name, Cardinality::ExactlyOnce)
    }

    /// Shorthand for [`Cardinality::AtLeastOnce`].
    pub fn at_least_once(self, name: impl Into<String>) -> Self {
        self.part(name, Cardinality::AtLeastOnce)
    }

    /// Shorthand for [`Cardinality::AtMostOnce`].
    pub fn at_most_once(self, name: impl Into<String>) -> Self {
        self.part(name, Cardinality::AtMostOnce)
    }

    /// Shorthand for [`Cardinality::ZeroOrMore`].
    pub fn zero_or_more(self, name: impl Into<String>) -> Self {
        self.part(name, Cardinality::ZeroOrMore)
    }

    /// Sets whether unknown and unnamed parts are accepted.
    pub fn allow_unknown_parts(mut self, allow: bool) -> Self {
        self.allows_unknown_parts = allow;
        self
    }

    /// Returns the rule declared for `name`.
    pub fn cardinality_of(&self, name: &str) -> Option<Cardinality> {
        if self.exactly_once.contains(name) {
            Some(Cardinality::ExactlyOnce)
        } else if self.at_least_once.contains(name) {
            Some(Cardinality::AtLeastOnce)
        } else if self.at_most_once.contains(name) {
            Some(Cardinality::AtMostOnce)
        } else if self.zero_or_more.contains(name) {
            Some(Cardinality::ZeroOrMore)
        } else {
            None
        }
    }

    /// Rejects empty names and names listed under more than one rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        let all = self
            .exactly_once
            .iter()
            .chain(&self.at_least_once)
            .chain(&self.at_most_once)
            .chain(&self.zero_or_more);

        for name in all {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyPartName);
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::OverlappingPartName { name: name.clone() });
            }
        }

        Ok(())
    }
}
