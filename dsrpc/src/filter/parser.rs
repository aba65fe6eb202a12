//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Recursive-descent parser for filter strings.
//!
//! ```text
//! filter     ::= '(' filtercomp ')'
//! filtercomp ::= '&' filter+ | '|' filter+ | '!' filter | item
//! item       ::= attr ( '=' | '~=' | '>=' | '<=' ) value
//! ```
//!
//! Whitespace is allowed around filters and around the attribute name. In
//! values, `\` escapes the next character and an unescaped `*` after `=`
//! marks a presence test or a substring wildcard.

use crate::filter::{Filter, FilterError};

pub(super) fn parse(input: &str) -> Result<Filter, FilterError> {
    let mut parser = Parser { input, pos: 0 };
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(parser.error("empty filter"));
    }
    let filter = parser.parse_filter()?;
    parser.skip_whitespace();
    if parser.peek().is_some() {
        return Err(parser.error("unexpected characters after filter"));
    }
    Ok(filter)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

/// A piece of an `=` value: literal text or an unescaped `*`.
enum Segment {
    Text(String),
    Wildcard,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, reason: impl Into<String>) -> FilterError {
        FilterError::new(self.pos, reason)
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterError> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{expected}', found '{ch}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterError> {
        self.skip_whitespace();
        self.expect('(')?;
        self.skip_whitespace();
        let filter = match self.peek() {
            Some('&') => {
                self.bump();
                Filter::And(self.parse_list()?)
            }
            Some('|') => {
                self.bump();
                Filter::Or(self.parse_list()?)
            }
            Some('!') => {
                self.bump();
                Filter::Not(Box::new(self.parse_filter()?))
            }
            _ => self.parse_item()?,
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut filters = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            filters.push(self.parse_filter()?);
        }
        if filters.is_empty() {
            return Err(self.error("expected at least one operand"));
        }
        Ok(filters)
    }

    fn parse_item(&mut self) -> Result<Filter, FilterError> {
        let attribute = self.parse_attribute()?;
        let operator = self.parse_operator()?;
        let segments = self.parse_value(operator == Operator::Equal)?;
        Ok(build_item(attribute, operator, segments))
    }

    fn parse_attribute(&mut self) -> Result<String, FilterError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if matches!(ch, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            self.bump();
        }
        let attribute = self.input[start..self.pos].trim();
        if attribute.is_empty() {
            return Err(FilterError::new(start, "missing attribute name"));
        }
        Ok(attribute.to_string())
    }

    fn parse_operator(&mut self) -> Result<Operator, FilterError> {
        let start = self.pos;
        let operator = match self.bump() {
            Some('=') => return Ok(Operator::Equal),
            Some('~') => Operator::Approx,
            Some('>') => Operator::GreaterEq,
            Some('<') => Operator::LessEq,
            Some(ch) => {
                return Err(FilterError::new(start, format!("expected an operator, found '{ch}'")));
            }
            None => return Err(FilterError::new(start, "expected an operator, found end of input")),
        };
        self.expect('=')?;
        Ok(operator)
    }

    /// Reads up to the closing `)`. Unescaped `*` only splits the value when
    /// `wildcards` is set.
    fn parse_value(&mut self, wildcards: bool) -> Result<Vec<Segment>, FilterError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some(ch) => text.push(ch),
                        None => return Err(self.error("dangling escape")),
                    }
                }
                Some('*') if wildcards => {
                    self.bump();
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Wildcard);
                }
                Some(ch) => {
                    self.bump();
                    text.push(ch);
                }
            }
        }
        if !text.is_empty() || segments.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(segments)
    }
}

fn build_item(attribute: String, operator: Operator, segments: Vec<Segment>) -> Filter {
    let value = || {
        segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.as_str(),
                Segment::Wildcard => "*",
            })
            .collect::<String>()
    };
    match operator {
        Operator::Approx => Filter::Approx { attribute, value: value() },
        Operator::GreaterEq => Filter::GreaterEq { attribute, value: value() },
        Operator::LessEq => Filter::LessEq { attribute, value: value() },
        Operator::Equal => {
            if !segments.iter().any(|s| matches!(s, Segment::Wildcard)) {
                return Filter::Equal { attribute, value: value() };
            }
            substring(attribute, segments)
        }
    }
}

fn substring(attribute: String, segments: Vec<Segment>) -> Filter {
    let starts_open = matches!(segments.first(), Some(Segment::Wildcard));
    let ends_open = matches!(segments.last(), Some(Segment::Wildcard));
    let mut texts: Vec<String> = segments
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Text(text) => Some(text),
            Segment::Wildcard => None,
        })
        .collect();
    if texts.is_empty() {
        return Filter::Present { attribute };
    }
    let last = if ends_open { None } else { texts.pop() };
    let initial = if starts_open || texts.is_empty() {
        None
    } else {
        Some(texts.remove(0))
    };
    Filter::Substring {
        attribute,
        initial,
        any: texts,
        last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(attribute: &str, value: &str) -> Filter {
        Filter::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_simple_items() {
        assert_eq!(parse("(a=b)").unwrap(), eq("a", "b"));
        assert_eq!(parse("  ( a =b c)  ").unwrap(), eq("a", "b c"));
        assert_eq!(parse("(a=*)").unwrap(), Filter::Present { attribute: "a".into() });
        assert_eq!(
            parse("(n>=10)").unwrap(),
            Filter::GreaterEq { attribute: "n".into(), value: "10".into() }
        );
        assert_eq!(
            parse("(n<=10)").unwrap(),
            Filter::LessEq { attribute: "n".into(), value: "10".into() }
        );
        assert_eq!(
            parse("(n~=Ab C)").unwrap(),
            Filter::Approx { attribute: "n".into(), value: "Ab C".into() }
        );
        assert_eq!(parse("(a=)").unwrap(), eq("a", ""));
    }

    #[test]
    fn test_composites() {
        let filter = parse("(&(a=1)(|(b=2)(!(c=3))))").unwrap();
        assert_eq!(
            filter,
            Filter::And(vec![
                eq("a", "1"),
                Filter::Or(vec![eq("b", "2"), Filter::Not(Box::new(eq("c", "3")))]),
            ])
        );
        assert!(parse("(& (a=1) (b=2) )").is_ok());
    }

    #[test]
    fn test_substrings() {
        assert_eq!(
            parse("(a=foo*)").unwrap(),
            Filter::Substring {
                attribute: "a".into(),
                initial: Some("foo".into()),
                any: vec![],
                last: None
            }
        );
        assert_eq!(
            parse("(a=*x*y*)").unwrap(),
            Filter::Substring {
                attribute: "a".into(),
                initial: None,
                any: vec!["x".into(), "y".into()],
                last: None
            }
        );
        assert_eq!(
            parse("(a=s*m*e)").unwrap(),
            Filter::Substring {
                attribute: "a".into(),
                initial: Some("s".into()),
                any: vec!["m".into()],
                last: Some("e".into())
            }
        );
        assert_eq!(parse("(a=**)").unwrap(), Filter::Present { attribute: "a".into() });
    }

    #[test]
    fn test_escapes() {
        assert_eq!(parse(r"(a=\(x\)\*\\)").unwrap(), eq("a", r"(x)*\"));
        assert_eq!(
            parse(r"(a>=\*)").unwrap(),
            Filter::GreaterEq { attribute: "a".into(), value: "*".into() }
        );
    }

    #[test]
    fn test_errors_carry_position() {
        for (input, position) in [
            ("", 0),
            ("a=b", 0),
            ("(a=b", 4),
            ("(=b)", 1),
            ("(a=b))", 5),
            ("(&)", 2),
            ("(a=(b))", 3),
            ("(a!b)", 4),
            ("(a~b)", 3),
            (r"(a=b\", 5),
        ] {
            let error = parse(input).unwrap_err();
            assert_eq!(error.position, position, "input {input:?}: {error}");
        }
    }
}
