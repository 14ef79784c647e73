//! Translating an rsync-style filter pattern into a compiled glob matcher.

use globset::{Glob, GlobMatcher};

use crate::rule::{FilterAction, FilterRule};

/// A [`FilterRule`] with its pattern compiled into a [`GlobMatcher`] and its
/// anchoring/directory-only flags resolved.
#[derive(Debug)]
pub struct CompiledRule {
    pub(crate) rule: FilterRule,
    pub(crate) matcher: GlobMatcher,
    pub(crate) directory_only: bool,
}

/// A pattern failed to compile into a glob.
#[derive(Debug, thiserror::Error)]
#[error("invalid filter pattern {pattern:?}: {source}")]
pub struct PatternError {
    pattern: String,
    #[source]
    source: globset::Error,
}

impl CompiledRule {
    /// Compiles `rule`'s pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the pattern is not a valid glob once
    /// rsync's anchoring rules are applied.
    pub fn compile(rule: FilterRule) -> Result<Self, PatternError> {
        let raw = rule.pattern();
        let directory_only = raw.ends_with('/') && raw.len() > 1;
        let trimmed = if directory_only { &raw[..raw.len() - 1] } else { raw };

        // A pattern is anchored to the transfer root if it starts with `/`
        // or contains a `/` elsewhere; a pattern with no embedded slash
        // (other than an optional trailing one, already stripped above)
        // matches at any depth.
        let anchored = trimmed.contains('/');
        let stripped = trimmed.strip_prefix('/').unwrap_or(trimmed);

        let glob_text = if anchored {
            stripped.to_string()
        } else {
            format!("**/{stripped}")
        };

        let matcher = Glob::new(&glob_text)
            .map_err(|source| PatternError {
                pattern: rule.pattern().to_string(),
                source,
            })?
            .compile_matcher();

        Ok(Self { rule, matcher, directory_only })
    }

    /// Returns whether this rule's pattern matches `relative_path`, given
    /// whether that path is a directory.
    #[must_use]
    pub fn matches(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.directory_only && !is_dir {
            return false;
        }
        self.matcher.is_match(relative_path)
    }

    /// The effective "this path should be kept" decision if this rule
    /// matches, accounting for its negate modifier.
    #[must_use]
    pub fn decision(&self) -> bool {
        self.rule.action().allows_by_default() ^ self.rule.is_negated()
    }

    /// The rule this was compiled from.
    #[must_use]
    pub fn rule(&self) -> &FilterRule {
        &self.rule
    }
}

/// Whether `action` is something [`crate::FilterSet::allows`] should ever
/// consider (merge directives and clear are compile-time-only).
pub(crate) const fn is_matchable(action: FilterAction) -> bool {
    !matches!(action, FilterAction::Merge | FilterAction::DirMerge | FilterAction::Clear)
}
