mod ast;
mod error;
mod eval;
mod lexer;
mod parser;

pub use ast::{CompareOp, Criterion, TimeField};
pub use error::{CriteriaError, CriteriaErrorKind};
pub use eval::MatchOptions;

use std::fmt;
use std::str::FromStr;

use crate::entity::Entity;

/// A parsed selection expression. Parsing is the only point of failure;
/// a built value is immutable and evaluates without I/O, so it can be
/// shared freely across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    root: Criterion,
    source: String,
    options: MatchOptions,
}

impl Criteria {
    pub fn parse(input: &str) -> Result<Self, CriteriaError> {
        let root = parser::parse(input)?;
        Ok(Self {
            root,
            source: input.to_string(),
            options: MatchOptions::default(),
        })
    }

    /// Name patterns ignore case by default; pass `false` for exact-case
    /// matching.
    pub fn case_insensitive(mut self, value: bool) -> Self {
        self.options.case_insensitive = value;
        self
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        eval::matches(entity, &self.root, self.options)
    }

    pub fn root(&self) -> &Criterion {
        &self.root
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }
}

impl FromStr for Criteria {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
