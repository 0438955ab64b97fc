//! Ordered rule list of a schema.
//!
//! Every rule pairs a descriptor (declared settings to a text fragment) with
//! a validator (resolved settings and live context to a [`Flow`]). Both live in
//! one [`Rule`], so the two can never drift apart. Leaf types place their rules
//! relative to named anchors instead of raw positions.

use super::Schema;
use super::settings::{ResolvedSettings, Settings};
use crate::context::Context;
use crate::error::{ConfigError, ConfigResult, ValidationResult};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Anchor of the stage handling absent values.
pub const OPTIONAL: &str = "optional";
/// Anchor of the stage checking allow and deny lists.
pub const ALLOW: &str = "allow";
/// Anchor of the stage restoring the original value.
pub const RAW: &str = "raw";

/// How the pipeline continues after a validator succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next rule
    Continue,
    /// Skip all remaining rules without failing
    Stop,
}

/// Produces a description fragment from the declared settings.
pub type Descriptor = fn(&Settings) -> Option<String>;

/// Checks and transforms the value of a context.
pub type Validator = for<'a> fn(
    &'a Schema,
    &'a ResolvedSettings,
    &'a Arc<Context>,
) -> BoxFuture<'a, ValidationResult<Flow>>;

/// A named descriptor and validator pair.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub describe: Descriptor,
    pub validate: Validator,
}

impl Rule {
    pub fn new(name: &'static str, describe: Descriptor, validate: Validator) -> Self {
        Self {
            name,
            describe,
            validate,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({})", self.name)
    }
}

/// The ordered rules of a schema.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    rules: Vec<Rule>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule at the end.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Insert a rule directly before the rule named `anchor`.
    pub fn insert_before(&mut self, anchor: &str, rule: Rule) -> ConfigResult<()> {
        let index = self.position(anchor)?;
        self.rules.insert(index, rule);
        Ok(())
    }

    /// Insert a rule directly after the rule named `anchor`.
    pub fn insert_after(&mut self, anchor: &str, rule: Rule) -> ConfigResult<()> {
        let index = self.position(anchor)?;
        self.rules.insert(index + 1, rule);
        Ok(())
    }

    fn position(&self, anchor: &str) -> ConfigResult<usize> {
        self.rules
            .iter()
            .position(|rule| rule.name == anchor)
            .ok_or_else(|| ConfigError::UnknownAnchor {
                anchor: anchor.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.name == name)
    }

    /// Rule names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for Rules {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}
