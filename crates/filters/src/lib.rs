//! Ordered include/exclude/protect/hide filter rules, the same shape
//! `--filter`, `--include`, `--exclude`, and per-directory `.rsync-filter`
//! merges produce upstream.
//!
//! # Overview
//!
//! A transfer's filter configuration is a single ordered list of
//! [`FilterRule`]s. Compiling that list into a [`FilterSet`] resolves each
//! rule's pattern into a glob matcher and applies rsync's anchoring
//! conventions (a pattern containing `/` is anchored to the transfer root;
//! a trailing `/` restricts the rule to directories). Asking a compiled set
//! [`FilterSet::allows`] for a path walks every ancestor directory along
//! the way, so excluding a directory also excludes everything beneath it —
//! matching how a real directory walk would simply never descend into it.
//!
//! # Design
//!
//! - [`rule`] defines [`FilterAction`] and [`FilterRule`], the rule types
//!   and their modifiers (negate, perishable, sender/receiver scoping,
//!   dir-merge inheritance).
//! - [`pattern`] compiles one rule's pattern into a [`globset`] matcher.
//! - [`parse`] implements rsync's `--filter` shorthand (`+`/`-`/`H`/`S`/
//!   `P`/`R`/`.`/`:`/`!` and their long-form spellings) plus rules-file
//!   reading.
//! - [`cvs`] supplies the `--cvs-exclude` default pattern list.
//! - [`set`] ties it together as [`FilterSet`], the thing callers actually
//!   query.
//!
//! # Non-goals
//!
//! Dynamic per-directory dir-merge resolution during a live tree walk is
//! the walker's job, not this crate's: [`FilterSet::merge_directory`] is a
//! pure function callers invoke once per visited directory, with no
//! internal traversal state of its own.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod cvs;
pub mod parse;
pub mod pattern;
pub mod rule;
pub mod set;

pub use cvs::{cvs_default_patterns, cvs_exclusion_rules};
pub use parse::{parse_line, parse_rules, read_rules, read_rules_recursive, FilterError};
pub use pattern::{CompiledRule, PatternError};
pub use rule::{FilterAction, FilterRule};
pub use set::{FilterSet, MergeDirectoryError};
