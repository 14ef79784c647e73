//! [`FilterSet`]: a compiled, ordered list of filter rules, ready to answer
//! "should this path be transferred?" for each entry a file-list walk
//! visits.

use std::io;
use std::path::Path;

use crate::cvs::cvs_exclusion_rules;
use crate::parse::{read_rules, FilterError};
use crate::pattern::{is_matchable, CompiledRule, PatternError};
use crate::rule::{FilterAction, FilterRule};

/// A compiled, ordered rule list.
///
/// Rules are evaluated in order; the first one whose pattern matches a
/// path decides that path's fate. A path with no matching rule is
/// included by default, matching upstream rsync's behavior.
#[derive(Debug, Default)]
pub struct FilterSet {
    rules: Vec<CompiledRule>,
}

impl FilterSet {
    /// Compiles `rules` into a [`FilterSet`].
    ///
    /// A [`crate::FilterAction::Clear`] rule discards every rule before it
    /// (including itself); only rules after the last clear take effect.
    /// Merge and dir-merge rules are retained for introspection but never
    /// participate in matching — callers that need to honor them should
    /// expand `.`-merges via [`crate::read_rules_recursive`] before calling
    /// this, and resolve `:`-dir-merges per directory via
    /// [`Self::merge_directory`] during their own tree walk.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if any rule's pattern fails to compile.
    pub fn from_rules(rules: impl IntoIterator<Item = FilterRule>) -> Result<Self, PatternError> {
        let mut all: Vec<FilterRule> = rules.into_iter().collect();
        if let Some(last_clear) = all.iter().rposition(FilterRule::is_clear) {
            all.drain(..=last_clear);
        }

        let compiled = all
            .into_iter()
            .filter(|rule| is_matchable(rule.action()) || rule.is_merge() || rule.is_dir_merge())
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules: compiled })
    }

    /// As [`Self::from_rules`], but first installs `--cvs-exclude`'s
    /// default exclusion list when `cvs_exclude` is true, ahead of the
    /// caller's own rules (so the caller's rules can still override them).
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if any rule's pattern fails to compile.
    pub fn from_rules_with_cvs(rules: impl IntoIterator<Item = FilterRule>, cvs_exclude: bool) -> Result<Self, PatternError> {
        let mut all = Vec::new();
        if cvs_exclude {
            all.extend(cvs_exclusion_rules());
        }
        all.extend(rules);
        Self::from_rules(all)
    }

    /// Returns whether `relative_path` should be transferred, considering
    /// every ancestor directory along the way: a directory excluded by an
    /// earlier rule keeps everything beneath it from ever being reached,
    /// the way a real directory walk would never descend into it.
    #[must_use]
    pub fn allows(&self, relative_path: &Path, is_dir: bool) -> bool {
        let Some(path_str) = relative_path.to_str() else {
            return true;
        };
        let path_str = path_str.trim_start_matches('/');

        let mut ancestor = String::new();
        for component in path_str.split('/') {
            if component.is_empty() {
                continue;
            }
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(component);
            let at_leaf = ancestor == path_str;
            let decision = self.decide(&ancestor, if at_leaf { is_dir } else { true });
            if !decision && !at_leaf {
                return false;
            }
            if at_leaf {
                return decision;
            }
        }
        true
    }

    /// Returns whether `relative_path` is protected from deletion.
    ///
    /// Protection is inherited down the tree: a `protect` rule matching an
    /// ancestor directory protects everything beneath it, and a deeper
    /// `risk` rule can un-protect a more specific subtree. Defaults to "not
    /// protected" (deletable) when nothing matches.
    #[must_use]
    pub fn protects(&self, relative_path: &Path) -> bool {
        let Some(path_str) = relative_path.to_str() else {
            return false;
        };
        let path_str = path_str.trim_start_matches('/');

        let mut protected = false;
        let mut ancestor = String::new();
        for component in path_str.split('/') {
            if component.is_empty() {
                continue;
            }
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(component);
            if let Some(compiled) = self.rules.iter().find(|compiled| {
                matches!(compiled.rule().action(), FilterAction::Protect | FilterAction::Risk)
                    && (compiled.matches(&ancestor, true) || compiled.matches(&ancestor, false))
            }) {
                protected = matches!(compiled.rule().action(), FilterAction::Protect) ^ compiled.rule().is_negated();
            }
        }
        protected
    }

    fn decide(&self, path_str: &str, is_dir: bool) -> bool {
        for compiled in &self.rules {
            if !is_matchable(compiled.rule().action()) {
                continue;
            }
            if compiled.matches(path_str, is_dir) {
                return compiled.decision();
            }
        }
        true
    }

    /// Looks for `dir_merge_rule`'s named file directly inside `dir`, and
    /// if present, returns a new [`FilterSet`] with that file's rules
    /// layered after this set's own rules (so they take precedence, the
    /// way deeper `.rsync-filter` files override shallower ones).
    ///
    /// Returns a clone of `self` unchanged if the merge file isn't
    /// present. Honors [`FilterRule::is_no_inherit`]: callers walking
    /// subdirectories of `dir` should keep using `self` (not the returned
    /// set) when the rule is no-inherit, since this method doesn't know
    /// about its own future callers.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the merge file exists but cannot be read,
    /// or [`PatternError`] (wrapped) if its contents don't parse.
    pub fn merge_directory(&self, dir_merge_rule: &FilterRule, dir: &Path) -> Result<Self, MergeDirectoryError> {
        let candidate = dir.join(dir_merge_rule.pattern());
        let mut combined: Vec<FilterRule> = self.rules.iter().map(|compiled| compiled.rule().clone()).collect();
        if candidate.is_file() {
            #[cfg(feature = "tracing")]
            tracing::debug!(path = %candidate.display(), "merging per-directory filter file");
            combined.extend(read_rules(&candidate)?);
        }
        Self::from_rules(combined).map_err(MergeDirectoryError::Pattern)
    }

    /// Number of compiled rules (including inert merge/dir-merge markers).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// An error merging a per-directory filter file.
#[derive(Debug, thiserror::Error)]
pub enum MergeDirectoryError {
    /// The merge file couldn't be read or parsed.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// The merged rules failed to compile.
    #[error(transparent)]
    Pattern(PatternError),
}

impl From<io::Error> for MergeDirectoryError {
    fn from(source: io::Error) -> Self {
        Self::Filter(FilterError::Io {
            path: String::new(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_include() {
        let set = FilterSet::from_rules([]).unwrap();
        assert!(set.allows(Path::new("anything.txt"), false));
    }

    #[test]
    fn first_matching_rule_wins() {
        let set = FilterSet::from_rules([FilterRule::exclude("*.txt"), FilterRule::include("important.txt")]).unwrap();
        assert!(!set.allows(Path::new("important.txt"), false));
    }

    #[test]
    fn rule_order_can_be_reversed_to_change_outcome() {
        let set = FilterSet::from_rules([FilterRule::include("important.txt"), FilterRule::exclude("*.txt")]).unwrap();
        assert!(set.allows(Path::new("important.txt"), false));
        assert!(!set.allows(Path::new("other.txt"), false));
    }

    #[test]
    fn excluded_directory_prunes_its_descendants() {
        let set = FilterSet::from_rules([FilterRule::exclude(".git/")]).unwrap();
        assert!(!set.allows(Path::new(".git"), true));
        assert!(!set.allows(Path::new(".git/objects/pack/pack.idx"), false));
    }

    #[test]
    fn clear_discards_every_earlier_rule() {
        let set = FilterSet::from_rules([FilterRule::exclude("*.tmp"), FilterRule::clear(), FilterRule::exclude("*.bak")]).unwrap();
        assert!(set.allows(Path::new("scratch.tmp"), false));
        assert!(!set.allows(Path::new("scratch.bak"), false));
    }

    #[test]
    fn negated_exclude_acts_as_an_override() {
        let set = FilterSet::from_rules([FilterRule::exclude("*.txt").with_negate(true), FilterRule::include("**")]).unwrap();
        assert!(set.allows(Path::new("readme.txt"), false));
    }

    #[test]
    fn protect_rules_shield_paths_from_deletion() {
        let set = FilterSet::from_rules([FilterRule::protect("important.dat")]).unwrap();
        assert!(set.protects(Path::new("important.dat")));
        assert!(!set.protects(Path::new("other.dat")));
    }

    #[test]
    fn risk_overrides_a_broader_protect() {
        let set = FilterSet::from_rules([FilterRule::risk("backups/daily/"), FilterRule::protect("backups/")]).unwrap();
        assert!(!set.protects(Path::new("backups/daily")));
        assert!(set.protects(Path::new("backups/weekly")));
    }

    #[test]
    fn cvs_defaults_exclude_common_vcs_directories() {
        let set = FilterSet::from_rules_with_cvs(Vec::new(), true).unwrap();
        assert!(!set.allows(Path::new(".git"), true));
        assert!(!set.allows(Path::new(".git/config"), false));
    }

    #[test]
    fn dir_merge_rules_compile_without_touching_the_filesystem() {
        let set = FilterSet::from_rules([FilterRule::dir_merge(".rsync-filter"), FilterRule::include("*.txt")]).unwrap();
        assert!(set.allows(Path::new("readme.txt"), false));
    }

    #[test]
    fn merge_directory_layers_a_found_rules_file_over_the_base_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".rsync-filter"), "- *.bak\n").unwrap();

        let base = FilterSet::from_rules([FilterRule::include("*.txt")]).unwrap();
        let rule = FilterRule::dir_merge(".rsync-filter");
        let merged = base.merge_directory(&rule, dir.path()).unwrap();

        assert!(merged.allows(Path::new("notes.txt"), false));
        assert!(!merged.allows(Path::new("notes.bak"), false));
    }

    #[test]
    fn merge_directory_is_a_no_op_when_the_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let base = FilterSet::from_rules([FilterRule::include("*.txt")]).unwrap();
        let rule = FilterRule::dir_merge(".rsync-filter");
        let merged = base.merge_directory(&rule, dir.path()).unwrap();
        assert_eq!(merged.len(), base.len());
    }
}
