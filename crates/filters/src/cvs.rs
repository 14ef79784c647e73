//! The default exclusion list `--cvs-exclude` installs, matching the names
//! CVS, Git, Subversion, Mercurial, and Bazaar all ignore by convention.

use crate::rule::FilterRule;

/// Patterns excluded by `--cvs-exclude`, independent of any `.cvsignore`
/// file contents.
#[must_use]
pub const fn cvs_default_patterns() -> &'static [&'static str] {
    &[
        "RCS/", "SCCS/", "CVS/", "CVS.adm", "RCSLOG", "cvslog.*", "tags", "TAGS", ".make.state",
        ".nse_depinfo", "*~", "#*", ".#*", ",*", "_$*", "*$", "*.old", "*.bak", "*.BAK", "*.orig",
        "*.rej", ".del-*", "*.a", "*.olb", "*.o", "*.obj", "*.so", "*.exe", "*.Z", "*.elc", "*.ln",
        "core", ".svn/", ".git/", ".hg/", ".bzr/",
    ]
}

/// Builds the exclude rules `--cvs-exclude` installs before any
/// user-supplied rules.
#[must_use]
pub fn cvs_exclusion_rules() -> Vec<FilterRule> {
    cvs_default_patterns().iter().map(|pattern| FilterRule::exclude(*pattern)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_common_vcs_directories() {
        let patterns = cvs_default_patterns();
        assert!(patterns.contains(&".git/"));
        assert!(patterns.contains(&".svn/"));
        assert!(patterns.contains(&"CVS/"));
    }

    #[test]
    fn builds_one_rule_per_pattern() {
        let rules = cvs_exclusion_rules();
        assert_eq!(rules.len(), cvs_default_patterns().len());
    }
}
