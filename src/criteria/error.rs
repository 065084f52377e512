use std::fmt;

/// Which construction rule a criteria string broke.
///
/// `Syntax` covers the grammar: unknown nouns, operators that are not one of
/// the six comparisons or not allowed for the noun, unbalanced parentheses,
/// missing operands. `Format` covers a recognized clause whose literal value
/// does not convert to the noun's type (size not an integer, date not
/// `yyyy-mm-dd`, attribute not a known flag letter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaErrorKind {
    Syntax,
    Format,
}

impl CriteriaErrorKind {
    pub fn as_code_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax_error",
            Self::Format => "format_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaError {
    pub kind: CriteriaErrorKind,
    pub message: String,
    /// Byte offset of the offending token in the input.
    pub at: usize,
}

impl CriteriaError {
    pub(super) fn syntax(message: impl Into<String>, at: usize) -> Self {
        Self {
            kind: CriteriaErrorKind::Syntax,
            message: message.into(),
            at,
        }
    }

    pub(super) fn format(message: impl Into<String>, at: usize) -> Self {
        Self {
            kind: CriteriaErrorKind::Format,
            message: message.into(),
            at,
        }
    }
}

impl fmt::Display for CriteriaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.at)
    }
}

impl std::error::Error for CriteriaError {}
