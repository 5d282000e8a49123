//! Native placeholder grammars
//!
//! A grammar decides which substrings of a message are variables that must survive
//! translation untouched. Two grammars are supported and an instance of the
//! normalizer uses exactly one of them:
//!
//! - [`VariableGrammar::Printf`]: `%s`, `%d`, `%5.2f`, `%2$d`, `%-10s`
//! - [`VariableGrammar::Named`]: `%(name)s`, `%(count)d`, `%(total).2f`
//!
//! Both accept the flags `-+0#`. The `%%` escape is a literal percent sign, not a
//! variable, and stays in the text.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::sync::error::{SyncError, SyncResult};

// `%%` is matched first so its second `%` can never start a specifier
const ESCAPED_PERCENT: &str = "%%";

static PRINTF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%%|%(?:\d+\$)?[-+0#]*\d*(?:\.\d+)?[bcdeEfFgGiosuxX]")
        .expect("printf pattern is valid")
});

static NAMED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%%|%\([^()]+\)[-+0#]*\d*(?:\.\d+)?[a-zA-Z]").expect("named pattern is valid")
});

/// A native variable occurrence captured at extraction time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fragment {
    /// Exact source text of the variable, e.g. `%2$d` or `%(name)s`
    pub raw: String,
    /// Byte offset of the fragment in the string it was extracted from
    pub offset: usize,
}

impl Fragment {
    pub fn new(raw: impl Into<String>, offset: usize) -> Self {
        Fragment {
            raw: raw.into(),
            offset,
        }
    }
}

/// True when both sequences carry the same variables, in any order
pub fn same_variables(left: &[Fragment], right: &[Fragment]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut left: Vec<&str> = left.iter().map(|f| f.raw.as_str()).collect();
    let mut right: Vec<&str> = right.iter().map(|f| f.raw.as_str()).collect();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}

/// Placeholder grammar used by a normalizer instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableGrammar {
    /// Positional printf-style specifiers
    Printf,
    /// Dictionary-style `%(name)x` specifiers
    Named,
}

impl VariableGrammar {
    /// Identifier accepted by [`FromStr`] and used in configuration files
    pub fn identifier(&self) -> &'static str {
        match self {
            VariableGrammar::Printf => "printf",
            VariableGrammar::Named => "named",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            VariableGrammar::Printf => &PRINTF_PATTERN,
            VariableGrammar::Named => &NAMED_PATTERN,
        }
    }

    /// All fragments of `text` in appearance order.
    ///
    /// Appearance order is the only order that matters: `%2$d` appearing first is
    /// fragment 0 even though it names argument 2.
    pub fn find_fragments(&self, text: &str) -> Vec<Fragment> {
        self.pattern()
            .find_iter(text)
            .filter(|m| m.as_str() != ESCAPED_PERCENT)
            .map(|m| Fragment::new(m.as_str(), m.start()))
            .collect()
    }
}

impl FromStr for VariableGrammar {
    type Err = SyncError;

    fn from_str(identifier: &str) -> SyncResult<Self> {
        match identifier.trim().to_ascii_lowercase().as_str() {
            "printf" => Ok(VariableGrammar::Printf),
            "named" => Ok(VariableGrammar::Named),
            other => Err(SyncError::Configuration(format!(
                "Unsupported variable grammar '{}', expected 'printf' or 'named'",
                other
            ))),
        }
    }
}

impl fmt::Display for VariableGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}
