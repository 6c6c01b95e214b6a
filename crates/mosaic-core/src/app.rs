//! Application identity and registration records.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, CoreResult};

/// Unique, stable application identifier.
///
/// Names double as the suffix of the style namespace class, so they are
/// restricted to ASCII alphanumerics, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AppName(String);

impl<'de> Deserialize<'de> for AppName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl AppName {
    /// Create a validated application name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidName`] if the name is empty or contains
    /// characters outside `[A-Za-z0-9_-]`.
    pub fn new(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The CSS class every style rule of this application is scoped under.
    #[must_use]
    pub fn namespace(&self) -> String {
        format!("mosaic-{}", self.0)
    }

    fn validate(name: &str) -> CoreResult<()> {
        if name.is_empty() {
            return Err(CoreError::InvalidName {
                name: name.to_string(),
                reason: "name must not be empty",
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidName {
                name: name.to_string(),
                reason: "only ASCII alphanumerics, '-' and '_' are allowed",
            });
        }
        Ok(())
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AppName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AppName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AppName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Path-prefix activation predicate.
///
/// A rule matches a path when the path equals the rule or starts with it.
/// Plain string prefix semantics: `/a` also matches `/about`. Overlaps are
/// resolved by registration order in the registry, not by specificity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ActivationRule(String);

impl<'de> Deserialize<'de> for ActivationRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl ActivationRule {
    /// Create a prefix rule.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRule`] if the rule does not start with `/`.
    pub fn new(prefix: impl Into<String>) -> CoreResult<Self> {
        let prefix = prefix.into();
        if !prefix.starts_with('/') {
            return Err(CoreError::InvalidRule(prefix));
        }
        Ok(Self(prefix))
    }

    /// Whether `path` activates this rule.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.0)
    }

    /// The raw prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable registration record of an embedded application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    name: AppName,
    entry: Url,
    container: String,
    active_rule: ActivationRule,
}

impl AppDescriptor {
    /// Build a descriptor from raw registration values.
    ///
    /// # Errors
    ///
    /// Returns a [`CoreError`] if any field fails validation.
    pub fn new(
        name: impl Into<String>,
        entry: &str,
        container: impl Into<String>,
        active_rule: impl Into<String>,
    ) -> CoreResult<Self> {
        let entry = Url::parse(entry).map_err(|e| CoreError::InvalidEntry {
            entry: entry.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_parts(
            AppName::new(name)?,
            entry,
            container,
            ActivationRule::new(active_rule)?,
        )
    }

    /// Build a descriptor from already-validated parts.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyContainer`] if the container selector is blank.
    pub fn from_parts(
        name: AppName,
        entry: Url,
        container: impl Into<String>,
        active_rule: ActivationRule,
    ) -> CoreResult<Self> {
        let container = container.into();
        if container.trim().is_empty() {
            return Err(CoreError::EmptyContainer);
        }
        Ok(Self {
            name,
            entry,
            container,
            active_rule,
        })
    }

    /// The unique application name.
    #[must_use]
    pub fn name(&self) -> &AppName {
        &self.name
    }

    /// Where the application's root document is fetched from.
    #[must_use]
    pub fn entry(&self) -> &Url {
        &self.entry
    }

    /// Selector of the mount target in the host document.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// The activation rule.
    #[must_use]
    pub fn active_rule(&self) -> &ActivationRule {
        &self.active_rule
    }

    /// Shorthand for `self.active_rule().matches(path)`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.active_rule.matches(path)
    }
}
