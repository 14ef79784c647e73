//! Parsing `--filter` rule text, the shorthand upstream rsync accepts on
//! the command line and in merge files.

use std::fs;
use std::path::Path;

use crate::rule::{FilterAction, FilterRule};

const LONG_FORMS: &[(&str, FilterAction)] = &[
    ("include", FilterAction::Include),
    ("exclude", FilterAction::Exclude),
    ("hide", FilterAction::Hide),
    ("show", FilterAction::Show),
    ("protect", FilterAction::Protect),
    ("risk", FilterAction::Risk),
    ("dir-merge", FilterAction::DirMerge),
    ("merge", FilterAction::Merge),
    ("clear", FilterAction::Clear),
];

/// A rule line could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The line didn't start with a recognized short code or long keyword.
    #[error("unrecognized filter rule: {0:?}")]
    UnknownRule(String),
    /// A pattern failed to compile as a glob.
    #[error(transparent)]
    Pattern(#[from] crate::pattern::PatternError),
    /// Reading a rules file failed.
    #[error("reading filter rules from {path}: {source}")]
    Io {
        /// The file that failed to read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn split_modifiers(rest: &str) -> (&str, &str) {
    let mut end = 0;
    for c in rest.chars() {
        if "!psrn".contains(c) {
            end += c.len_utf8();
        } else {
            break;
        }
    }
    let (mods, remainder) = rest.split_at(end);
    if remainder.is_empty() || remainder.starts_with(char::is_whitespace) {
        (mods, remainder.trim_start())
    } else {
        ("", rest)
    }
}

fn build_rule(action: FilterAction, pattern: &str, modifiers: &str, base_dir: &Path) -> FilterRule {
    let pattern = if matches!(action, FilterAction::Merge) && !pattern.is_empty() && !Path::new(pattern).is_absolute() {
        base_dir.join(pattern).to_string_lossy().into_owned()
    } else {
        pattern.to_string()
    };

    let mut rule = match action {
        FilterAction::Include => FilterRule::include(pattern),
        FilterAction::Exclude => FilterRule::exclude(pattern),
        FilterAction::Hide => FilterRule::hide(pattern),
        FilterAction::Show => FilterRule::show(pattern),
        FilterAction::Protect => FilterRule::protect(pattern),
        FilterAction::Risk => FilterRule::risk(pattern),
        FilterAction::Merge => FilterRule::merge(pattern),
        FilterAction::DirMerge => FilterRule::dir_merge(pattern),
        FilterAction::Clear => FilterRule::clear(),
    };

    for modifier in modifiers.chars() {
        rule = match modifier {
            '!' => rule.with_negate(true),
            'p' => rule.with_perishable(true),
            's' => rule.with_sender_only(),
            'r' => rule.with_receiver_only(),
            'n' => rule.with_no_inherit(true),
            _ => rule,
        };
    }
    rule
}

/// Parses one rule line. Returns `None` for blank lines and comments
/// (`;`/`#`).
///
/// # Errors
///
/// Returns [`FilterError::UnknownRule`] if the line matches neither a long
/// keyword nor a recognized short code.
pub fn parse_line(line: &str, base_dir: &Path) -> Result<Option<FilterRule>, FilterError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
        return Ok(None);
    }

    let lower = line.to_ascii_lowercase();
    for (keyword, action) in LONG_FORMS {
        if let Some(rest) = lower.strip_prefix(keyword) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                let pattern = line[keyword.len()..].trim_start();
                return Ok(Some(build_rule(*action, pattern, "", base_dir)));
            }
        }
    }

    let mut chars = line.chars();
    let first = chars.next().ok_or_else(|| FilterError::UnknownRule(line.to_string()))?;
    let action = match first {
        '+' => FilterAction::Include,
        '-' => FilterAction::Exclude,
        '.' => FilterAction::Merge,
        ':' => FilterAction::DirMerge,
        '!' => FilterAction::Clear,
        'H' | 'h' => FilterAction::Hide,
        'S' | 's' => FilterAction::Show,
        'P' => FilterAction::Protect,
        'R' => FilterAction::Risk,
        _ => return Err(FilterError::UnknownRule(line.to_string())),
    };

    let rest = &line[first.len_utf8()..];
    let (mods, pattern) = split_modifiers(rest);
    Ok(Some(build_rule(action, pattern, mods, base_dir)))
}

/// Parses every non-blank, non-comment line of `text` into a rule.
///
/// `base_dir` resolves relative merge-file paths (`.`-prefixed rules); it
/// has no effect on any other rule type.
///
/// # Errors
///
/// Returns the first [`FilterError`] encountered.
pub fn parse_rules(text: &str, base_dir: &Path) -> Result<Vec<FilterRule>, FilterError> {
    text.lines().filter_map(|line| parse_line(line, base_dir).transpose()).collect()
}

/// Reads and parses a rules file, resolving merge paths relative to the
/// file's own directory.
///
/// # Errors
///
/// Returns [`FilterError::Io`] if the file cannot be read, or a parse
/// error from its contents.
pub fn read_rules(path: &Path) -> Result<Vec<FilterRule>, FilterError> {
    let text = fs::read_to_string(path).map_err(|source| FilterError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_rules(&text, base_dir)
}

/// As [`read_rules`], but recursively expands `.`-merge rules by reading
/// and splicing in their target files in place. Dir-merge (`:`) rules are
/// left unexpanded: they describe per-directory files discovered during a
/// tree walk, not a one-shot include.
///
/// # Errors
///
/// Returns [`FilterError::Io`] if `path` or any merged file cannot be
/// read, or a parse error from their contents.
pub fn read_rules_recursive(path: &Path) -> Result<Vec<FilterRule>, FilterError> {
    let mut expanded = Vec::new();
    for rule in read_rules(path)? {
        if rule.is_merge() {
            expanded.extend(read_rules_recursive(Path::new(rule.pattern()))?);
        } else {
            expanded.push(rule);
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_with_and_without_space() {
        let a = parse_rules("+ *.txt", Path::new(".")).unwrap();
        let b = parse_rules("+*.txt", Path::new(".")).unwrap();
        assert_eq!(a[0].pattern(), "*.txt");
        assert_eq!(b[0].pattern(), "*.txt");
        assert_eq!(a[0].action(), FilterAction::Include);
    }

    #[test]
    fn long_form_is_case_insensitive() {
        let rules = parse_rules("INCLUDE *.txt", Path::new(".")).unwrap();
        assert_eq!(rules[0].action(), FilterAction::Include);
        assert_eq!(rules[0].pattern(), "*.txt");
    }

    #[test]
    fn modifiers_are_recognized_before_a_space() {
        let rules = parse_rules("+! *.txt\n+p *.tmp\n+s *.log\n+r *.bin", Path::new(".")).unwrap();
        assert!(rules[0].is_negated());
        assert!(rules[1].is_perishable());
        assert!(rules[2].applies_to_sender() && !rules[2].applies_to_receiver());
        assert!(!rules[3].applies_to_sender() && rules[3].applies_to_receiver());
    }

    #[test]
    fn clear_and_dir_merge_short_codes() {
        let rules = parse_rules("!\n: .rsync-filter", Path::new(".")).unwrap();
        assert!(rules[0].is_clear());
        assert!(rules[1].is_dir_merge());
        assert_eq!(rules[1].pattern(), ".rsync-filter");
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let rules = parse_rules("\n; a comment\n# another\n+ *.txt\n", Path::new(".")).unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn unknown_rule_is_rejected() {
        assert!(parse_rules("@ nonsense", Path::new(".")).is_err());
    }

    #[test]
    fn relative_merge_paths_resolve_against_base_dir() {
        let rules = parse_rules(". rules.txt", Path::new("/etc/rsync")).unwrap();
        assert_eq!(rules[0].pattern(), "/etc/rsync/rules.txt");
    }
}
