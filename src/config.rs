//! Engine configuration.
//!
//! All construction-time validation happens in [`HashConfigBuilder::build`]:
//! a malformed exclusion specification fails fast, before any traversal
//! begins. Once a [`HashConfig`] exists it is valid by construction and the
//! traversal itself never raises; per-node outcomes are recorded as node
//! statuses instead (see [`crate::model::Status`]).
//!
//! There is no process-wide mutable state anywhere in this crate: every
//! knob, including the hash function, is an explicit config value threaded
//! through the engine.

use std::collections::BTreeSet;
use std::fmt;

use regex_lite::Regex;

use crate::digest::{default_hasher, DigestFn};

/// Default display name of the traversal root in rendered paths.
pub const DEFAULT_ROOT_NAME: &str = "root";

/// Error raised for an invalid configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An exclusion pattern failed to compile.
    #[error("invalid exclusion pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// The regex engine's complaint.
        message: String,
    },
    /// A literal exclusion path was empty.
    #[error("exclusion paths must not be empty")]
    EmptyExcludePath,
}

/// Validated configuration for one fingerprint computation.
#[derive(Clone)]
pub struct HashConfig {
    exclude_paths: BTreeSet<String>,
    exclude_patterns: Vec<Regex>,
    exclude_types: BTreeSet<String>,
    pub(crate) significant_digits: Option<u32>,
    pub(crate) hasher: DigestFn,
    pub(crate) ignore_repetition: bool,
    pub(crate) root_name: String,
}

impl HashConfig {
    /// Start building a config.
    pub fn builder() -> HashConfigBuilder {
        HashConfigBuilder::default()
    }

    /// Whether a rendered strict-mode path matches an exclusion rule.
    ///
    /// Literal paths compare exactly; patterns match anywhere in the path
    /// (anchor with `^` to match from the start).
    pub fn is_path_excluded(&self, path: &str) -> bool {
        if self.exclude_paths.contains(path) {
            return true;
        }
        self.exclude_patterns.iter().any(|re| re.is_match(path))
    }

    /// Whether a type tag is excluded.
    pub fn is_type_excluded(&self, tag: &str) -> bool {
        self.exclude_types.contains(tag)
    }

    /// Whether repeated siblings collapse out of the aggregate hash.
    pub fn ignore_repetition(&self) -> bool {
        self.ignore_repetition
    }

    /// The configured number of significant fractional digits, if any.
    pub fn significant_digits(&self) -> Option<u32> {
        self.significant_digits
    }

    /// The root display name used in rendered paths.
    pub fn root_name(&self) -> &str {
        &self.root_name
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        // The builder cannot fail on an empty specification.
        HashConfigBuilder::default()
            .build()
            .expect("empty config is valid")
    }
}

impl fmt::Debug for HashConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashConfig")
            .field("exclude_paths", &self.exclude_paths)
            .field(
                "exclude_patterns",
                &self
                    .exclude_patterns
                    .iter()
                    .map(|re| re.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("exclude_types", &self.exclude_types)
            .field("significant_digits", &self.significant_digits)
            .field("ignore_repetition", &self.ignore_repetition)
            .field("root_name", &self.root_name)
            .finish_non_exhaustive()
    }
}

/// Builder for [`HashConfig`].
#[derive(Default)]
pub struct HashConfigBuilder {
    exclude_paths: Vec<String>,
    exclude_patterns: Vec<String>,
    exclude_types: Vec<String>,
    significant_digits: Option<u32>,
    hasher: Option<DigestFn>,
    include_repetition: bool,
    root_name: Option<String>,
}

impl HashConfigBuilder {
    /// Exclude one literal path, e.g. `root['password']`.
    ///
    /// Double quotes are normalized to single quotes at build time so
    /// matching is quote-insensitive.
    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.exclude_paths.push(path.into());
        self
    }

    /// Exclude every path matched by a regex pattern.
    pub fn exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Exclude every value whose type tag equals `tag`.
    pub fn exclude_type(mut self, tag: impl Into<String>) -> Self {
        self.exclude_types.push(tag.into());
        self
    }

    /// Normalize float leaves to this many fractional digits before hashing.
    pub fn significant_digits(mut self, digits: u32) -> Self {
        self.significant_digits = Some(digits);
        self
    }

    /// Replace the digest function.
    pub fn hasher(mut self, hasher: DigestFn) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Keep repeated siblings in the aggregate hash instead of collapsing
    /// them (repetition is ignored by default).
    pub fn keep_repetition(mut self) -> Self {
        self.include_repetition = true;
        self
    }

    /// Use a different root display name in rendered paths.
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Validate and produce the config.
    pub fn build(self) -> Result<HashConfig, ConfigError> {
        let mut exclude_paths = BTreeSet::new();
        for path in self.exclude_paths {
            if path.is_empty() {
                return Err(ConfigError::EmptyExcludePath);
            }
            // Single quotes are the canonical string-index quoting.
            exclude_paths.insert(path.replace('"', "'"));
        }

        let mut exclude_patterns = Vec::with_capacity(self.exclude_patterns.len());
        for pattern in self.exclude_patterns {
            let compiled = Regex::new(&pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            exclude_patterns.push(compiled);
        }

        Ok(HashConfig {
            exclude_paths,
            exclude_patterns,
            exclude_types: self.exclude_types.into_iter().collect(),
            significant_digits: self.significant_digits,
            hasher: self.hasher.unwrap_or_else(default_hasher),
            ignore_repetition: !self.include_repetition,
            root_name: self
                .root_name
                .unwrap_or_else(|| DEFAULT_ROOT_NAME.to_string()),
        })
    }
}
