use super::ast::CompareOp;
use super::error::CriteriaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word(String),
    Quoted(String),
    Op(CompareOp),
    /// A run of operator characters that is not one of the six comparisons
    /// (`==`, `~=`, ...). Kept as a token so the parser can reject it
    /// instead of silently reinterpreting it.
    UnknownOp(String),
    /// `and` / `or` in any case. Position decides whether it acts as a
    /// connective; in value position the parser treats it as plain text.
    Keyword(String),
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

fn is_op_char(c: char) -> bool {
    matches!(c, '=' | '!' | '<' | '>' | '~')
}

pub fn lex(input: &str) -> Result<Vec<Token>, CriteriaError> {
    let mut out = Vec::new();
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut i = 0usize;

    while i < chars.len() {
        let (start, ch) = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch == '(' {
            out.push(Token {
                kind: TokenKind::LParen,
                span: Span {
                    start,
                    end: start + ch.len_utf8(),
                },
            });
            i += 1;
            continue;
        }
        if ch == ')' {
            out.push(Token {
                kind: TokenKind::RParen,
                span: Span {
                    start,
                    end: start + ch.len_utf8(),
                },
            });
            i += 1;
            continue;
        }
        if ch == '\'' {
            let mut value = String::new();
            let mut j = i + 1;
            let mut closed = false;
            while j < chars.len() {
                let (_, c) = chars[j];
                if c == '\'' {
                    let end = chars[j].0 + c.len_utf8();
                    out.push(Token {
                        kind: TokenKind::Quoted(value),
                        span: Span { start, end },
                    });
                    i = j + 1;
                    closed = true;
                    break;
                }
                value.push(c);
                j += 1;
            }
            if !closed {
                return Err(CriteriaError::syntax("Unclosed quote", start));
            }
            continue;
        }
        if is_op_char(ch) {
            let mut run = String::new();
            let mut j = i;
            while j < chars.len() {
                let (_, c) = chars[j];
                if !is_op_char(c) {
                    break;
                }
                run.push(c);
                j += 1;
            }
            let end = if j == chars.len() {
                input.len()
            } else {
                chars[j].0
            };
            let kind = match run.as_str() {
                "=" => TokenKind::Op(CompareOp::Eq),
                "!=" => TokenKind::Op(CompareOp::Ne),
                ">" => TokenKind::Op(CompareOp::Gt),
                ">=" => TokenKind::Op(CompareOp::Ge),
                "<" => TokenKind::Op(CompareOp::Lt),
                "<=" => TokenKind::Op(CompareOp::Le),
                _ => TokenKind::UnknownOp(run),
            };
            out.push(Token {
                kind,
                span: Span { start, end },
            });
            i = j;
            continue;
        }

        let mut value = String::new();
        let mut j = i;
        while j < chars.len() {
            let (_, c) = chars[j];
            if c.is_whitespace() || c == '(' || c == ')' || c == '\'' || is_op_char(c) {
                break;
            }
            value.push(c);
            j += 1;
        }
        let end = if j == chars.len() {
            input.len()
        } else {
            chars[j].0
        };
        let kind = if value.eq_ignore_ascii_case("and") || value.eq_ignore_ascii_case("or") {
            TokenKind::Keyword(value)
        } else {
            TokenKind::Word(value)
        };
        out.push(Token {
            kind,
            span: Span { start, end },
        });
        i = j;
    }

    Ok(out)
}
