//! Substitution sites: one variable region inside a template.

use std::borrow::Cow;

use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pattern::{capture_count, has_leading_context, invert, render, tokenize};
use crate::value::Value;

const PREFIX: &str = "prefix";
const SUFFIX: &str = "suffix";

/// Regex flags applied to a site pattern and to its complement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
}

impl SiteFlags {
    fn build(&self, pattern: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(self.case_insensitive)
            .multi_line(self.multi_line)
            .dot_matches_new_line(self.dot_matches_new_line)
            .build()
    }
}

/// A pattern locating one variable region, plus its complementary pattern
/// capturing the context around that region.
#[derive(Debug, Clone)]
pub struct Site {
    pattern: String,
    matcher: Regex,
    complement: Regex,
}

impl Site {
    pub fn new(pattern: &str, flags: SiteFlags) -> Result<Self, ConfigError> {
        let invalid = |source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(source),
        };

        let matcher = flags.build(pattern).map_err(invalid)?;

        let tokens = tokenize(pattern);
        let found = capture_count(&tokens);
        if found != 1 {
            return Err(ConfigError::CaptureCount {
                pattern: pattern.to_string(),
                found,
            });
        }

        // Context groups that survive inversion keep their order: the one
        // before the region exists only if the pattern has text before it.
        let mut names = Vec::with_capacity(2);
        if has_leading_context(&tokens) {
            names.push(PREFIX);
        }
        names.push(SUFFIX);

        let complement = flags
            .build(&render(&invert(&tokens), &names))
            .map_err(invalid)?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            complement,
        })
    }

    /// The pattern as authored
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The complementary pattern used for rewriting
    #[must_use]
    pub fn complement(&self) -> &str {
        self.complement.as_str()
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    /// Whether the complementary pattern finds a region to rewrite in `text`
    #[must_use]
    pub fn can_rewrite(&self, text: &str) -> bool {
        self.complement.is_match(text)
    }

    /// Replace every occurrence of the variable region with `value`, keeping
    /// the surrounding context exactly as it appears in `text`.
    #[must_use]
    pub fn substitute<'t>(&self, text: &'t str, value: &Value) -> Cow<'t, str> {
        let value = value.to_string();
        self.complement.replace_all(text, |caps: &Captures<'_>| {
            let prefix = caps.name(PREFIX).map_or("", |m| m.as_str());
            let suffix = caps.name(SUFFIX).map_or("", |m| m.as_str());
            format!("{prefix}{value}{suffix}")
        })
    }
}
