//! [`FilterRule`]: one line of a filter/include/exclude rule set.

/// What a matched rule does to the path it matches.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterAction {
    /// Transfer the path (`+`).
    Include,
    /// Skip the path entirely (`-`).
    Exclude,
    /// Skip the path when building the sender's file list, but still let
    /// the receiver delete it during `--delete` (`H`).
    Hide,
    /// Cancel a previous hide for paths matching this pattern (`S`).
    Show,
    /// Never delete a matching path during `--delete` (`P`).
    Protect,
    /// Allow deletion of a path a broader protect rule would otherwise
    /// keep (`R`).
    Risk,
    /// Splice another rules file in at this point, once (`.`).
    Merge,
    /// Merge a per-directory rules file whenever that directory is visited
    /// during the walk (`:`).
    DirMerge,
    /// Discard every rule defined before this point (`!`).
    Clear,
}

impl FilterAction {
    /// Returns whether this action, unnegated, means "transfer the path".
    #[must_use]
    pub const fn allows_by_default(self) -> bool {
        matches!(self, Self::Include | Self::Show | Self::Risk)
    }
}

/// One compiled-from-text filter rule: a pattern, an action, and the
/// modifiers that changed how it's applied (`rsync`'s `!`, `p`, `s`, `r`
/// suffix letters).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilterRule {
    action: FilterAction,
    pattern: String,
    negate: bool,
    perishable: bool,
    applies_to_sender: bool,
    applies_to_receiver: bool,
    no_inherit: bool,
}

impl FilterRule {
    fn new(action: FilterAction, pattern: impl Into<String>) -> Self {
        Self {
            action,
            pattern: pattern.into(),
            negate: false,
            perishable: false,
            applies_to_sender: true,
            applies_to_receiver: true,
            no_inherit: false,
        }
    }

    /// Builds an include rule (`+`).
    #[must_use]
    pub fn include(pattern: impl Into<String>) -> Self {
        Self::new(FilterAction::Include, pattern)
    }

    /// Builds an exclude rule (`-`).
    #[must_use]
    pub fn exclude(pattern: impl Into<String>) -> Self {
        Self::new(FilterAction::Exclude, pattern)
    }

    /// Builds a hide rule (`H`).
    #[must_use]
    pub fn hide(pattern: impl Into<String>) -> Self {
        Self::new(FilterAction::Hide, pattern)
    }

    /// Builds a show rule (`S`).
    #[must_use]
    pub fn show(pattern: impl Into<String>) -> Self {
        Self::new(FilterAction::Show, pattern)
    }

    /// Builds a protect rule (`P`).
    #[must_use]
    pub fn protect(pattern: impl Into<String>) -> Self {
        Self::new(FilterAction::Protect, pattern)
    }

    /// Builds a risk rule (`R`).
    #[must_use]
    pub fn risk(pattern: impl Into<String>) -> Self {
        Self::new(FilterAction::Risk, pattern)
    }

    /// Builds a one-shot merge rule (`.`), pointing at another rules file.
    #[must_use]
    pub fn merge(path: impl Into<String>) -> Self {
        Self::new(FilterAction::Merge, path)
    }

    /// Builds a per-directory merge rule (`:`), naming the file to look
    /// for in each visited directory (e.g. `.rsync-filter`).
    #[must_use]
    pub fn dir_merge(file_name: impl Into<String>) -> Self {
        Self::new(FilterAction::DirMerge, file_name)
    }

    /// Builds a clear rule (`!`), which discards every rule before it.
    #[must_use]
    pub fn clear() -> Self {
        Self::new(FilterAction::Clear, "")
    }

    /// Returns a copy of this rule with its negate modifier set.
    #[must_use]
    pub fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    /// Returns a copy of this rule with its perishable modifier set. A
    /// perishable rule is dropped once its source file list has been
    /// entirely skipped (unused here since we don't model transfer
    /// restarts, but tracked for round-tripping rule text).
    #[must_use]
    pub fn with_perishable(mut self, perishable: bool) -> Self {
        self.perishable = perishable;
        self
    }

    /// Restricts this rule to the sending side only (`s` modifier).
    #[must_use]
    pub fn with_sender_only(mut self) -> Self {
        self.applies_to_sender = true;
        self.applies_to_receiver = false;
        self
    }

    /// Restricts this rule to the receiving side only (`r` modifier).
    #[must_use]
    pub fn with_receiver_only(mut self) -> Self {
        self.applies_to_sender = false;
        self.applies_to_receiver = true;
        self
    }

    /// Marks a dir-merge rule as non-inheriting (`n` modifier): its rules
    /// apply only within the directory where the merge file was found, not
    /// to subdirectories.
    #[must_use]
    pub fn with_no_inherit(mut self, no_inherit: bool) -> Self {
        self.no_inherit = no_inherit;
        self
    }

    /// The rule's action.
    #[must_use]
    pub const fn action(&self) -> FilterAction {
        self.action
    }

    /// The rule's pattern text (or, for merge/dir-merge, the file path).
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the `!` negation modifier was applied.
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negate
    }

    /// Whether the `p` perishable modifier was applied.
    #[must_use]
    pub const fn is_perishable(&self) -> bool {
        self.perishable
    }

    /// Whether this rule applies while building the sender's file list.
    #[must_use]
    pub const fn applies_to_sender(&self) -> bool {
        self.applies_to_sender
    }

    /// Whether this rule applies while the receiver is deciding deletions.
    #[must_use]
    pub const fn applies_to_receiver(&self) -> bool {
        self.applies_to_receiver
    }

    /// Whether a dir-merge rule's effects should stop at the directory
    /// they were loaded from, rather than being inherited by descendants.
    #[must_use]
    pub const fn is_no_inherit(&self) -> bool {
        self.no_inherit
    }

    /// Shorthand for `action() == FilterAction::DirMerge`.
    #[must_use]
    pub const fn is_dir_merge(&self) -> bool {
        matches!(self.action, FilterAction::DirMerge)
    }

    /// Shorthand for `action() == FilterAction::Merge`.
    #[must_use]
    pub const fn is_merge(&self) -> bool {
        matches!(self.action, FilterAction::Merge)
    }

    /// Shorthand for `action() == FilterAction::Clear`.
    #[must_use]
    pub const fn is_clear(&self) -> bool {
        matches!(self.action, FilterAction::Clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_the_expected_action() {
        assert_eq!(FilterRule::include("a").action(), FilterAction::Include);
        assert_eq!(FilterRule::exclude("a").action(), FilterAction::Exclude);
        assert_eq!(FilterRule::hide("a").action(), FilterAction::Hide);
        assert_eq!(FilterRule::show("a").action(), FilterAction::Show);
        assert_eq!(FilterRule::protect("a").action(), FilterAction::Protect);
        assert_eq!(FilterRule::risk("a").action(), FilterAction::Risk);
        assert!(FilterRule::clear().is_clear());
        assert!(FilterRule::dir_merge(".rsync-filter").is_dir_merge());
        assert!(FilterRule::merge("/etc/rules").is_merge());
    }

    #[test]
    fn builder_modifiers_compose() {
        let rule = FilterRule::exclude("*.tmp").with_negate(true).with_perishable(true);
        assert!(rule.is_negated());
        assert!(rule.is_perishable());
    }

    #[test]
    fn side_restriction_defaults_to_both() {
        let rule = FilterRule::exclude("*.tmp");
        assert!(rule.applies_to_sender());
        assert!(rule.applies_to_receiver());

        let sender_only = FilterRule::exclude("*.tmp").with_sender_only();
        assert!(sender_only.applies_to_sender());
        assert!(!sender_only.applies_to_receiver());
    }
}
