//! Route pattern syntax.
//!
//! ```text
//! /hello/:first/:last     ':' + name, captured up to the next '/'
//! /files/*path            '*' + name, captures the rest of the path
//! ```
//!
//! A `:` or `*` in last position is an ordinary character. A glob swallows the
//! remainder of the pattern as its name, so `/f/*a/b:c` names the glob `a/b:c`.

use url::Url;

use crate::routing::error::RouteError;
use crate::routing::route::RouteParams;

const BASE: &str = "http://localhost/";

/// One step of a pattern walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Literal(char),
    Param(&'a str),
    Glob(&'a str),
}

/// Iterator over the tokens of a canonical pattern.
pub(crate) struct Tokens<'a> {
    rest: &'a str,
}

pub(crate) fn tokens(pattern: &str) -> Tokens<'_> {
    Tokens { rest: pattern }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let head = self.rest.chars().next()?;
        let tail = &self.rest[head.len_utf8()..];

        let token = match head {
            ':' if !tail.is_empty() => {
                let (name, rest) = split_segment(tail);
                self.rest = rest;
                Token::Param(name)
            }
            '*' if !tail.is_empty() => {
                self.rest = "";
                Token::Glob(tail)
            }
            _ => {
                self.rest = tail;
                Token::Literal(head)
            }
        };
        Some(token)
    }
}

/// Split at the first '/', which stays with the remainder.
pub(crate) fn split_segment(term: &str) -> (&str, &str) {
    match term.find('/') {
        Some(idx) => term.split_at(idx),
        None => (term, ""),
    }
}

/// Normalise escaping so that patterns and request paths agree.
///
/// The pattern is resolved as a path reference against a fixed origin. Requests
/// are matched on their path alone, so a query or fragment is rejected. An
/// escaped glob marker is turned back into `*`.
pub(crate) fn canonicalize(pattern: &str) -> Result<String, RouteError> {
    let malformed = |reason: String| RouteError::MalformedPattern {
        pattern: pattern.to_string(),
        reason,
    };

    let base = Url::parse(BASE).map_err(|e| malformed(e.to_string()))?;
    let url = base.join(pattern).map_err(|e| malformed(e.to_string()))?;

    if url.origin() != base.origin() {
        return Err(malformed("pattern must be a path, not an absolute URL".to_string()));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(malformed("requests are matched on their path only".to_string()));
    }

    Ok(url.path().replace("%2A", "*").replace("%2a", "*"))
}

/// Rebuild a concrete path from a canonical pattern.
///
/// Tokens without a value in `params` are written back verbatim.
pub(crate) fn reverse(pattern: &str, params: Option<&RouteParams>) -> String {
    let mut path = String::with_capacity(pattern.len());
    for token in tokens(pattern) {
        match token {
            Token::Literal(c) => path.push(c),
            Token::Param(name) => match params.and_then(|p| p.get(name)) {
                Some(value) => path.push_str(value),
                None => {
                    path.push(':');
                    path.push_str(name);
                }
            },
            Token::Glob(name) => match params.and_then(|p| p.get(name)) {
                Some(value) => path.push_str(value),
                None => {
                    path.push('*');
                    path.push_str(name);
                }
            },
        }
    }
    path
}
