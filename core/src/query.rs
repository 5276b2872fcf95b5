//! Boolean query language.
//!
//! ```text
//! expr    := and ( ("OR" | <implicit when default is Or>) and )*
//! and     := unary ( ("AND" | <implicit when default is And>) unary )*
//! unary   := "NOT" unary | primary
//! primary := "(" expr ")" | word
//! ```
//!
//! Words go through the index tokenizer, so `Running` matches the stemmed term `run`.

use crate::config::DefaultOperator;
use crate::error::QueryError;
use crate::tokenizer::Tokenizer;

/// A parsed and normalized query over index terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Term(String),
    And(Vec<Query>),
    Or(Vec<Query>),
    /// Only valid as a member of `And` next to at least one positive operand.
    Not(Box<Query>),
}

impl Query {
    /// Terms of a flat disjunction (`a`, `a OR b OR c`), the shape score pruning works on.
    pub fn disjunctive_terms(&self) -> Option<Vec<&str>> {
        match self {
            Query::Term(t) => Some(vec![t.as_str()]),
            Query::Or(children) => children
                .iter()
                .map(|c| match c {
                    Query::Term(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// Terms that contribute to a document's score.
    pub fn positive_terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_positive(&mut out);
        out
    }

    fn collect_positive<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Query::Term(t) => {
                if !out.contains(&t.as_str()) {
                    out.push(t);
                }
            }
            Query::And(children) | Query::Or(children) => children.iter().for_each(|c| c.collect_positive(out)),
            Query::Not(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    And,
    Or,
    Not,
    Open,
    Close,
}

fn push_word<'a>(input: &'a str, start: &mut Option<usize>, end: usize, out: &mut Vec<(usize, Token<'a>)>) {
    if let Some(s) = start.take() {
        let tok = match &input[s..end] {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            w => Token::Word(w),
        };
        out.push((s, tok));
    }
}

fn lex(input: &str) -> Vec<(usize, Token<'_>)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in input.char_indices() {
        if c == '(' || c == ')' || c.is_whitespace() {
            push_word(input, &mut start, i, &mut out);
            if c == '(' {
                out.push((i, Token::Open));
            } else if c == ')' {
                out.push((i, Token::Close));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    push_word(input, &mut start, input.len(), &mut out);
    out
}

/// Syntax tree before tokenization of words.
#[derive(Debug)]
enum Raw<'a> {
    Word(usize, &'a str),
    And(Vec<Raw<'a>>),
    Or(Vec<Raw<'a>>),
    Not(usize, Box<Raw<'a>>),
}

struct Parser<'a> {
    tokens: Vec<(usize, Token<'a>)>,
    pos: usize,
    end: usize,
    default_operator: DefaultOperator,
}

fn parse_error(position: usize, message: impl Into<String>) -> QueryError {
    QueryError::Parse { position, message: message.into() }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> { self.tokens.get(self.pos).map(|(_, t)| t) }

    fn offset(&self) -> usize { self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(self.end) }

    fn starts_operand(&self) -> bool { matches!(self.peek(), Some(Token::Word(_) | Token::Open | Token::Not)) }

    fn expr(&mut self) -> Result<Raw<'a>, QueryError> {
        let mut children = vec![self.and()?];
        loop {
            if self.peek() == Some(&Token::Or) {
                self.pos += 1;
            } else if !(self.default_operator == DefaultOperator::Or && self.starts_operand()) {
                break;
            }
            children.push(self.and()?);
        }
        Ok(if children.len() == 1 { children.remove(0) } else { Raw::Or(children) })
    }

    fn and(&mut self) -> Result<Raw<'a>, QueryError> {
        let mut children = vec![self.unary()?];
        loop {
            if self.peek() == Some(&Token::And) {
                self.pos += 1;
            } else if !(self.default_operator == DefaultOperator::And && self.starts_operand()) {
                break;
            }
            children.push(self.unary()?);
        }
        Ok(if children.len() == 1 { children.remove(0) } else { Raw::And(children) })
    }

    fn unary(&mut self) -> Result<Raw<'a>, QueryError> {
        if self.peek() == Some(&Token::Not) {
            let at = self.offset();
            self.pos += 1;
            return Ok(Raw::Not(at, Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Raw<'a>, QueryError> {
        let at = self.offset();
        match self.tokens.get(self.pos).map(|(_, t)| t.clone()) {
            Some(Token::Word(w)) => {
                self.pos += 1;
                Ok(Raw::Word(at, w))
            }
            Some(Token::Open) => {
                self.pos += 1;
                if self.peek() == Some(&Token::Close) {
                    return Err(parse_error(at, "empty parentheses"));
                }
                let inner = self.expr()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(parse_error(at, "unbalanced parenthesis"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(Token::Close) => Err(parse_error(at, "unexpected ')'")),
            Some(op) => Err(parse_error(at, format!("expected a term, found {op:?}"))),
            None => Err(parse_error(at, "expected a term at end of query")),
        }
    }
}

/// Rejects negations that do not sit inside a conjunction with a positive operand.
fn check_negations(raw: &Raw<'_>, inside_and: bool) -> Result<(), QueryError> {
    match raw {
        Raw::Word(..) => Ok(()),
        Raw::Not(at, inner) => {
            if !inside_and {
                return Err(parse_error(*at, "NOT needs a positive term in the same AND group"));
            }
            check_negations(inner, false)
        }
        Raw::And(children) => {
            if children.iter().all(|c| matches!(c, Raw::Not(..))) {
                let at = match &children[0] {
                    Raw::Not(at, _) => *at,
                    _ => 0,
                };
                return Err(parse_error(at, "NOT needs a positive term in the same AND group"));
            }
            children.iter().try_for_each(|c| check_negations(c, true))
        }
        Raw::Or(children) => children.iter().try_for_each(|c| check_negations(c, false)),
    }
}

fn push_unique(children: &mut Vec<Query>, q: Query) {
    if !children.contains(&q) {
        children.push(q);
    }
}

fn normalize(raw: Raw<'_>, tokenizer: &dyn Tokenizer) -> Result<Option<Query>, QueryError> {
    Ok(match raw {
        Raw::Word(at, w) => {
            let terms = tokenizer.tokenize(w).map_err(|e| parse_error(at, e.to_string()))?;
            let mut children = Vec::new();
            for t in terms {
                push_unique(&mut children, Query::Term(t));
            }
            match children.len() {
                0 => None,
                1 => children.pop(),
                _ => Some(Query::And(children)),
            }
        }
        Raw::Not(_, inner) => normalize(*inner, tokenizer)?.map(|q| Query::Not(Box::new(q))),
        Raw::And(children) => {
            let mut out = Vec::new();
            for c in children {
                match normalize(c, tokenizer)? {
                    Some(Query::And(nested)) => nested.into_iter().for_each(|q| push_unique(&mut out, q)),
                    Some(q) => push_unique(&mut out, q),
                    None => {}
                }
            }
            // All positive operands were stop words: nothing can match.
            if !out.iter().any(|q| !matches!(q, Query::Not(_))) {
                return Ok(None);
            }
            if out.len() == 1 { out.pop() } else { Some(Query::And(out)) }
        }
        Raw::Or(children) => {
            let mut out = Vec::new();
            for c in children {
                match normalize(c, tokenizer)? {
                    Some(Query::Or(nested)) => nested.into_iter().for_each(|q| push_unique(&mut out, q)),
                    Some(q) => push_unique(&mut out, q),
                    None => {}
                }
            }
            match out.len() {
                0 => None,
                1 => out.pop(),
                _ => Some(Query::Or(out)),
            }
        }
    })
}

/// Parses `input`. `Ok(None)` means the query holds no searchable term and matches nothing.
pub fn parse(
    input: &str,
    tokenizer: &dyn Tokenizer,
    default_operator: DefaultOperator,
) -> Result<Option<Query>, QueryError> {
    let tokens = lex(input);
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser { tokens, pos: 0, end: input.len(), default_operator };
    let raw = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        let at = parser.offset();
        let found = parser.tokens[parser.pos].1.clone();
        return Err(parse_error(at, format!("unexpected {found:?}")));
    }
    check_negations(&raw, false)?;
    normalize(raw, tokenizer)
}
