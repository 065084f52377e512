use chrono::{NaiveDate, NaiveTime};

use super::{
    ast::{CompareOp, Criterion, TimeField},
    error::CriteriaError,
    lexer::{lex, Span, Token, TokenKind},
};
use crate::entity::Attributes;

pub fn parse(input: &str) -> Result<Criterion, CriteriaError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(CriteriaError::syntax("Empty criteria", 0));
    }
    let mut p = Parser { tokens, idx: 0 };
    let expr = p.parse_expression()?;
    if let Some(tok) = p.peek() {
        return Err(CriteriaError::syntax("Unexpected token", tok.span.start));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx).cloned();
        if tok.is_some() {
            self.idx += 1;
        }
        tok
    }

    fn end_pos(&self) -> usize {
        self.tokens.last().map(|t| t.span.end).unwrap_or(0)
    }

    // AND and OR bind equally; the fold keeps them left-associative.
    fn parse_expression(&mut self) -> Result<Criterion, CriteriaError> {
        let mut expr = self.parse_term()?;
        loop {
            if self.consume_keyword("AND") {
                let rhs = self.parse_term()?;
                expr = Criterion::And(Box::new(expr), Box::new(rhs));
            } else if self.consume_keyword("OR") {
                let rhs = self.parse_term()?;
                expr = Criterion::Or(Box::new(expr), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Criterion, CriteriaError> {
        let Some(tok) = self.peek().cloned() else {
            return Err(CriteriaError::syntax("Expected clause", self.end_pos()));
        };
        match tok.kind {
            TokenKind::LParen => {
                self.bump();
                let expr = self.parse_expression()?;
                let Some(close) = self.bump() else {
                    return Err(CriteriaError::syntax("Unclosed group", tok.span.start));
                };
                if !matches!(close.kind, TokenKind::RParen) {
                    return Err(CriteriaError::syntax("Expected ')'", close.span.start));
                }
                Ok(expr)
            }
            TokenKind::RParen => Err(CriteriaError::syntax("Unexpected ')'", tok.span.start)),
            _ => self.parse_clause(),
        }
    }

    fn parse_clause(&mut self) -> Result<Criterion, CriteriaError> {
        let Some(tok) = self.bump() else {
            return Err(CriteriaError::syntax("Expected clause", self.end_pos()));
        };
        match tok.kind {
            // A bare pattern is shorthand for `name = <pattern>`.
            TokenKind::Quoted(pattern) => Ok(Criterion::Name {
                op: CompareOp::Eq,
                pattern,
            }),
            TokenKind::Word(word) => {
                if let Some((op, op_span)) = self.bump_op() {
                    self.parse_noun_clause(&word, tok.span, op, op_span)
                } else if let Some((bad, bad_span)) = self.bump_unknown_op() {
                    Err(CriteriaError::syntax(
                        format!("Unrecognized operator '{bad}'"),
                        bad_span.start,
                    ))
                } else {
                    Ok(Criterion::Name {
                        op: CompareOp::Eq,
                        pattern: word,
                    })
                }
            }
            TokenKind::UnknownOp(op) => Err(CriteriaError::syntax(
                format!("Unrecognized operator '{op}'"),
                tok.span.start,
            )),
            TokenKind::Op(op) => Err(CriteriaError::syntax(
                format!("Unexpected '{}'", op.as_str()),
                tok.span.start,
            )),
            TokenKind::Keyword(word) => Err(CriteriaError::syntax(
                format!("Unexpected '{word}'"),
                tok.span.start,
            )),
            TokenKind::LParen | TokenKind::RParen => {
                Err(CriteriaError::syntax("Expected clause", tok.span.start))
            }
        }
    }

    fn parse_noun_clause(
        &mut self,
        noun: &str,
        noun_span: Span,
        op: CompareOp,
        op_span: Span,
    ) -> Result<Criterion, CriteriaError> {
        let Some(key) = parse_noun(noun) else {
            return Err(CriteriaError::syntax(
                format!("Unknown noun '{noun}'"),
                noun_span.start,
            ));
        };
        let (value, value_span) = self.bump_value(op_span)?;
        match key {
            Noun::Name => {
                require_eq_ne(op, "name", op_span)?;
                Ok(Criterion::Name { op, pattern: value })
            }
            Noun::Size => {
                let bytes = value.parse::<i64>().map_err(|_| {
                    CriteriaError::format(
                        format!("Invalid size '{value}', expected a byte count"),
                        value_span.start,
                    )
                })?;
                Ok(Criterion::Size { op, bytes })
            }
            Noun::Time(field) => {
                let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
                    CriteriaError::format(
                        format!("Invalid date '{value}', expected yyyy-mm-dd"),
                        value_span.start,
                    )
                })?;
                Ok(Criterion::Time {
                    field,
                    op,
                    when: date.and_time(NaiveTime::MIN),
                })
            }
            Noun::Attributes => {
                require_eq_ne(op, "attributes", op_span)?;
                let Some(flag) = Attributes::from_letter(&value) else {
                    return Err(CriteriaError::format(
                        format!("Invalid attribute '{value}', expected one of R H S A D"),
                        value_span.start,
                    ));
                };
                Ok(Criterion::Attr { op, flag })
            }
        }
    }

    fn bump_value(&mut self, op_span: Span) -> Result<(String, Span), CriteriaError> {
        match self.peek().cloned() {
            Some(Token {
                kind: TokenKind::Word(v),
                span,
            })
            | Some(Token {
                kind: TokenKind::Quoted(v),
                span,
            })
            | Some(Token {
                kind: TokenKind::Keyword(v),
                span,
            }) => {
                self.idx += 1;
                Ok((v, span))
            }
            Some(tok) => Err(CriteriaError::syntax("Missing value", tok.span.start)),
            None => Err(CriteriaError::syntax("Missing value", op_span.end)),
        }
    }

    fn bump_op(&mut self) -> Option<(CompareOp, Span)> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Op(op),
                span,
            }) => {
                let out = (*op, *span);
                self.idx += 1;
                Some(out)
            }
            _ => None,
        }
    }

    fn bump_unknown_op(&mut self) -> Option<(String, Span)> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::UnknownOp(op),
                span,
            }) => {
                let out = (op.clone(), *span);
                self.idx += 1;
                Some(out)
            }
            _ => None,
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        let Some(Token {
            kind: TokenKind::Keyword(word),
            ..
        }) = self.peek()
        else {
            return false;
        };
        if word.eq_ignore_ascii_case(keyword) {
            self.idx += 1;
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Copy)]
enum Noun {
    Name,
    Size,
    Time(TimeField),
    Attributes,
}

fn parse_noun(value: &str) -> Option<Noun> {
    if value.eq_ignore_ascii_case("name") {
        Some(Noun::Name)
    } else if value.eq_ignore_ascii_case("size") {
        Some(Noun::Size)
    } else if value.eq_ignore_ascii_case("mtime") {
        Some(Noun::Time(TimeField::Modified))
    } else if value.eq_ignore_ascii_case("ctime") {
        Some(Noun::Time(TimeField::Created))
    } else if value.eq_ignore_ascii_case("atime") {
        Some(Noun::Time(TimeField::Accessed))
    } else if value.eq_ignore_ascii_case("attributes") {
        Some(Noun::Attributes)
    } else {
        None
    }
}

fn require_eq_ne(op: CompareOp, noun: &str, op_span: Span) -> Result<(), CriteriaError> {
    if matches!(op, CompareOp::Eq | CompareOp::Ne) {
        Ok(())
    } else {
        Err(CriteriaError::syntax(
            format!("Operator '{}' not valid for {noun}", op.as_str()),
            op_span.start,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::criteria::ast::{CompareOp, Criterion, TimeField};
    use crate::criteria::error::CriteriaErrorKind;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn parses_noun_clause_with_comparison() {
        let expr = parse("size > 1024").unwrap();
        assert_eq!(
            expr,
            Criterion::Size {
                op: CompareOp::Gt,
                bytes: 1024
            }
        );
        let expr = parse("name != *.tmp").unwrap();
        assert_eq!(
            expr,
            Criterion::Name {
                op: CompareOp::Ne,
                pattern: "*.tmp".into()
            }
        );
    }

    #[test]
    fn connectives_bind_equally_and_fold_left() {
        let expr = parse("name = *.txt AND size > 10 OR name = *.bin").unwrap();
        match expr {
            Criterion::Or(lhs, rhs) => {
                assert!(matches!(*lhs, Criterion::And(_, _)));
                assert!(matches!(*rhs, Criterion::Name { .. }));
            }
            other => panic!("expected OR at the root, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_association() {
        let expr = parse("name = *.txt AND (size > 10 OR name = *.bin)").unwrap();
        match expr {
            Criterion::And(lhs, rhs) => {
                assert!(matches!(*lhs, Criterion::Name { .. }));
                assert!(matches!(*rhs, Criterion::Or(_, _)));
            }
            other => panic!("expected AND at the root, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_clause_equals_bare_clause() {
        assert_eq!(parse("(size > 5)").unwrap(), parse("size > 5").unwrap());
        assert_eq!(
            parse("((name = *.txt))").unwrap(),
            parse("name = *.txt").unwrap()
        );
    }

    #[test]
    fn shorthand_is_name_equality() {
        assert_eq!(parse("*.bin").unwrap(), parse("name = *.bin").unwrap());
        assert_eq!(
            parse("'* *.txt'").unwrap(),
            parse("name = '* *.txt'").unwrap()
        );
    }

    #[test]
    fn quoted_value_keeps_spaces() {
        let expr = parse("name = '* *.txt'").unwrap();
        assert_eq!(
            expr,
            Criterion::Name {
                op: CompareOp::Eq,
                pattern: "* *.txt".into()
            }
        );
    }

    #[test]
    fn connective_word_is_plain_text_in_value_position() {
        let expr = parse("name = and").unwrap();
        assert_eq!(
            expr,
            Criterion::Name {
                op: CompareOp::Eq,
                pattern: "and".into()
            }
        );
    }

    #[test]
    fn date_value_normalizes_to_local_midnight() {
        let expr = parse("mtime <= 2009-02-14").unwrap();
        let midnight = NaiveDate::from_ymd_opt(2009, 2, 14)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(
            expr,
            Criterion::Time {
                field: TimeField::Modified,
                op: CompareOp::Le,
                when: midnight
            }
        );
    }

    #[test]
    fn time_nouns_map_to_their_fields() {
        for (noun, field) in [
            ("mtime", TimeField::Modified),
            ("ctime", TimeField::Created),
            ("atime", TimeField::Accessed),
        ] {
            let expr = parse(&format!("{noun} > 2020-01-01")).unwrap();
            assert!(matches!(expr, Criterion::Time { field: f, .. } if f == field));
        }
    }

    #[test]
    fn nouns_and_connectives_ignore_case() {
        assert_eq!(
            parse("NAME = *.txt and SIZE > 1").unwrap(),
            parse("name = *.txt AND size > 1").unwrap()
        );
    }

    #[test]
    fn rejects_malformed_criteria_as_syntax_errors() {
        let cases = [
            "fame = *.txt",
            "size = ",
            "name = *.txt and",
            "name = *.txt OR (",
            "name == *.txt",
            "name ~= *.txt",
            "name LIKE *.txt",
            "",
            "   ",
            "name > *.txt",
            "attributes < H",
            "(name = *.txt",
            "name = *.txt)",
            "AND name = *.txt",
            "name @= *.txt",
        ];
        for input in cases {
            let err = parse(input).unwrap_err();
            assert_eq!(
                err.kind,
                CriteriaErrorKind::Syntax,
                "input {input:?} gave {err}"
            );
            assert_eq!(err.kind.as_code_str(), "syntax_error");
        }
    }

    #[test]
    fn rejects_unconvertible_literals_as_format_errors() {
        let cases = [
            "size = G",
            "size > 1.5",
            "mtime = 14-02-2009",
            "ctime < yesterday",
            "atime >= 2009-13-40",
            "attributes = X",
            "attributes != RH",
        ];
        for input in cases {
            let err = parse(input).unwrap_err();
            assert_eq!(
                err.kind,
                CriteriaErrorKind::Format,
                "input {input:?} gave {err}"
            );
            assert_eq!(err.kind.as_code_str(), "format_error");
        }
    }
}
