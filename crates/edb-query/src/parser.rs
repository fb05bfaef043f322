//! String query parser.
//!
//! Grammar:
//!
//! ```text
//! query := ws* [ term (ws+ "and" ws+ term)* ] ws*
//! term  := key ":" value
//! key   := [A-Za-z0-9_.-]+
//! value := '"' ( [^"\\] | '\' any )* '"' | [^ \t\r\n"]+
//! ```
//!
//! A repeated key keeps its last value.

use edb_types::EntryValue;

use crate::error::{QueryError, QueryResult};
use crate::predicate::Predicates;

/// Parse `key:value (and key:value)*` into predicates.
pub fn parse_query(query: &str) -> QueryResult<Predicates> {
    let mut parser = Parser {
        query,
        chars: query.char_indices().peekable(),
    };
    let mut predicates = Predicates::new();

    parser.skip_whitespace();
    if parser.at_end() {
        return Ok(predicates);
    }

    loop {
        let key = parser.key()?;
        parser.expect(':')?;
        let value = parser.value()?;
        predicates.insert(key, EntryValue::String(value));

        let had_space = parser.skip_whitespace();
        if parser.at_end() {
            return Ok(predicates);
        }
        if !had_space {
            return Err(parser.error("expected whitespace before `and`"));
        }
        parser.keyword("and")?;
        if !parser.skip_whitespace() || parser.at_end() {
            return Err(parser.error("expected a term after `and`"));
        }
    }
}

struct Parser<'a> {
    query: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.query.len(), |(i, _)| *i)
    }

    fn at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn error(&mut self, reason: &str) -> QueryError {
        QueryError::Malformed {
            query: self.query.to_string(),
            position: self.position(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if any whitespace was consumed.
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {
            skipped = true;
        }
        skipped
    }

    fn key(&mut self) -> QueryResult<String> {
        let mut key = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| is_key_char(*c)) {
            key.push(c);
        }
        if key.is_empty() {
            return Err(self.error("expected a key"));
        }
        Ok(key)
    }

    fn expect(&mut self, expected: char) -> QueryResult<()> {
        match self.chars.next_if(|(_, c)| *c == expected) {
            Some(_) => Ok(()),
            None => Err(self.error(&format!("expected `{expected}`"))),
        }
    }

    fn keyword(&mut self, word: &str) -> QueryResult<()> {
        for expected in word.chars() {
            if self.chars.next_if(|(_, c)| *c == expected).is_none() {
                return Err(self.error(&format!("expected `{word}`")));
            }
        }
        Ok(())
    }

    fn value(&mut self) -> QueryResult<String> {
        if self.chars.next_if(|(_, c)| *c == '"').is_some() {
            return self.quoted();
        }
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| !c.is_whitespace() && *c != '"') {
            value.push(c);
        }
        if value.is_empty() {
            return Err(self.error("expected a value"));
        }
        Ok(value)
    }

    fn quoted(&mut self) -> QueryResult<String> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(value),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => value.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some((_, c)) => value.push(c),
                None => return Err(self.error("unterminated quoted value")),
            }
        }
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(p: &Predicates, key: &str) -> Option<String> {
        p.get(key).map(EntryValue::render)
    }

    #[test]
    fn empty_query_has_no_predicates() {
        assert!(parse_query("").unwrap().is_empty());
        assert!(parse_query("   \t").unwrap().is_empty());
    }

    #[test]
    fn quoted_terms() {
        let p = parse_query(r#"name:"foo" and kind:"two words""#).unwrap();
        assert_eq!(value(&p, "name").as_deref(), Some("foo"));
        assert_eq!(value(&p, "kind").as_deref(), Some("two words"));
    }

    #[test]
    fn bare_terms_and_surrounding_whitespace() {
        let p = parse_query("  name:foo   and  size:3 ").unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(value(&p, "size").as_deref(), Some("3"));
    }

    #[test]
    fn escapes_inside_quotes() {
        let p = parse_query(r#"note:"say \"hi\"""#).unwrap();
        assert_eq!(value(&p, "note").as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn keys_allow_dots_dashes_underscores() {
        let p = parse_query("model.type_id-x:1").unwrap();
        assert!(p.get("model.type_id-x").is_some());
    }

    #[test]
    fn last_repeated_key_wins() {
        let p = parse_query("a:1 and a:2").unwrap();
        assert_eq!(value(&p, "a").as_deref(), Some("2"));
    }

    #[test]
    fn malformed_queries_name_the_input() {
        for bad in [
            "name",
            "name:",
            ":foo",
            "name:foo or size:3",
            "name:foo and",
            "name:foo size:3",
            r#"name:"foo"and size:3"#,
            r#"name:"unterminated"#,
        ] {
            match parse_query(bad) {
                Err(QueryError::Malformed { query, .. }) => assert_eq!(query, bad),
                other => panic!("{bad:?} parsed as {other:?}"),
            }
        }
    }
}
