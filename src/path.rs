//! SCIM attribute-path expression parser (RFC 7644 §3.5.2).
//!
//! Parses the path strings carried by PATCH operations into a structured
//! [`AttributePath`]. The supported grammar is the subset real provisioning
//! clients send:
//!
//! - `attributeName`
//! - `attributeName.subAttribute`
//! - `urn:...:schemaUri:subAttribute` (schema-extension paths)
//! - `attributeName[subAttribute eq "literal"]`
//! - `attributeName[subAttribute eq "literal"].targetSubAttribute`
//!
//! Attribute and sub-attribute names compare case-insensitively downstream;
//! the quoted literal is taken verbatim. `eq` is the only filter operator;
//! anything else is rejected as an unsupported filter rather than a syntax
//! error.

use crate::error::{ScimError, ScimResult};

/// A value filter selecting elements of a multi-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueFilter {
    /// Sub-attribute the filter compares (e.g. `value`).
    pub sub_attribute: String,
    /// Literal to match, exactly as written between the quotes.
    pub value: String,
}

/// A parsed SCIM attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    /// Extension schema URN prefix, when the path was URN-qualified.
    pub urn: Option<String>,
    /// Top-level attribute name (or the trailing URN segment).
    pub attribute: String,
    /// Optional filter over a multi-valued attribute.
    pub filter: Option<ValueFilter>,
    /// Optional target sub-attribute after the filter or a dot.
    pub sub_attribute: Option<String>,
}

impl AttributePath {
    /// Parse a path string into its structured form.
    pub fn parse(path: &str) -> ScimResult<Self> {
        Parser::new(path).parse()
    }

    /// Whether this path addresses a schema-extension attribute.
    pub fn is_extension(&self) -> bool {
        self.urn.is_some()
    }

    /// Case-insensitive comparison against a canonical attribute name.
    pub fn attribute_is(&self, name: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(name)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(&mut self) -> ScimResult<AttributePath> {
        if self.input.trim().is_empty() {
            return Err(ScimError::malformed_path(self.input, "empty path"));
        }

        // URN-qualified extension path: everything up to the last colon is
        // the schema URI, the trailing segment is the attribute.
        if self.input.starts_with("urn:") {
            return self.parse_urn_path();
        }

        let attribute = self.parse_name()?;

        let filter = if self.try_consume('[') {
            Some(self.parse_filter()?)
        } else {
            None
        };

        let sub_attribute = if self.try_consume('.') {
            let name = self.parse_name()?;
            Some(name)
        } else {
            None
        };

        if self.pos < self.input.len() {
            return Err(ScimError::malformed_path(
                self.input,
                format!("unexpected characters at position {}", self.pos),
            ));
        }

        Ok(AttributePath {
            urn: None,
            attribute,
            filter,
            sub_attribute,
        })
    }

    fn parse_urn_path(&mut self) -> ScimResult<AttributePath> {
        let (urn, trailing) = match self.input.rsplit_once(':') {
            Some(parts) => parts,
            None => {
                return Err(ScimError::malformed_path(self.input, "incomplete URN path"));
            }
        };

        if trailing.is_empty() {
            return Err(ScimError::malformed_path(
                self.input,
                "URN path has no trailing attribute segment",
            ));
        }

        // The trailing segment may itself carry a dotted sub-attribute.
        let (attribute, sub_attribute) = match trailing.split_once('.') {
            Some((a, s)) if !a.is_empty() && !s.is_empty() => (a.to_string(), Some(s.to_string())),
            Some(_) => {
                return Err(ScimError::malformed_path(
                    self.input,
                    "empty segment around '.' in URN path",
                ));
            }
            None => (trailing.to_string(), None),
        };

        if !is_attribute_name(&attribute) {
            return Err(ScimError::malformed_path(
                self.input,
                format!("invalid attribute name '{}'", attribute),
            ));
        }

        Ok(AttributePath {
            urn: Some(urn.to_string()),
            attribute,
            filter: None,
            sub_attribute,
        })
    }

    /// `subAttribute eq "literal"` followed by a closing bracket.
    fn parse_filter(&mut self) -> ScimResult<ValueFilter> {
        self.skip_whitespace();
        let sub_attribute = self.parse_name()?;
        self.skip_whitespace();

        let op = self.parse_name().map_err(|_| {
            ScimError::malformed_path(self.input, "expected comparison operator in filter")
        })?;
        if !op.eq_ignore_ascii_case("eq") {
            return Err(ScimError::UnsupportedFilter {
                detail: format!(
                    "filter operator '{}' is not supported; 'eq' is the only supported operator",
                    op
                ),
            });
        }

        self.skip_whitespace();
        if !self.try_consume('"') {
            return Err(ScimError::malformed_path(
                self.input,
                "expected quoted literal after 'eq'",
            ));
        }
        let start = self.pos;
        while self.pos < self.input.len() && self.current() != '"' {
            self.pos += self.current().len_utf8();
        }
        if self.pos >= self.input.len() {
            return Err(ScimError::malformed_path(self.input, "unterminated string literal"));
        }
        let value = self.input[start..self.pos].to_string();
        self.pos += 1; // closing quote

        self.skip_whitespace();
        if !self.try_consume(']') {
            return Err(ScimError::malformed_path(self.input, "expected ']' to close filter"));
        }

        Ok(ValueFilter {
            sub_attribute,
            value,
        })
    }

    fn parse_name(&mut self) -> ScimResult<String> {
        let start = self.pos;
        while self.pos < self.input.len() {
            let c = self.current();
            if c.is_alphanumeric() || c == '_' || c == '$' || c == '-' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(ScimError::malformed_path(
                self.input,
                format!("expected attribute name at position {}", self.pos),
            ));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.current().is_whitespace() {
            self.pos += self.current().len_utf8();
        }
    }

    fn current(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn try_consume(&mut self, c: char) -> bool {
        if self.pos < self.input.len() && self.current() == c {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }
}

fn is_attribute_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_attribute() {
        let path = AttributePath::parse("displayName").unwrap();
        assert_eq!(path.attribute, "displayName");
        assert!(path.filter.is_none());
        assert!(path.sub_attribute.is_none());
        assert!(!path.is_extension());
    }

    #[test]
    fn dotted_sub_attribute() {
        let path = AttributePath::parse("name.givenName").unwrap();
        assert_eq!(path.attribute, "name");
        assert_eq!(path.sub_attribute.as_deref(), Some("givenName"));
    }

    #[test]
    fn filtered_multivalue() {
        let path = AttributePath::parse(r#"members[value eq "u1"]"#).unwrap();
        assert_eq!(path.attribute, "members");
        let filter = path.filter.unwrap();
        assert_eq!(filter.sub_attribute, "value");
        assert_eq!(filter.value, "u1");
        assert!(path.sub_attribute.is_none());
    }

    #[test]
    fn filtered_multivalue_with_target() {
        let path = AttributePath::parse(r#"roles[value eq "admin"].display"#).unwrap();
        assert_eq!(path.attribute, "roles");
        assert_eq!(path.filter.unwrap().value, "admin");
        assert_eq!(path.sub_attribute.as_deref(), Some("display"));
    }

    #[test]
    fn literal_is_verbatim_and_case_sensitive() {
        let path = AttributePath::parse(r#"emails[type eq "Work Mail"]"#).unwrap();
        assert_eq!(path.filter.unwrap().value, "Work Mail");
    }

    #[test]
    fn multibyte_literals_parse_intact() {
        let path = AttributePath::parse(r#"members[display eq "José"]"#).unwrap();
        assert_eq!(path.filter.unwrap().value, "José");

        let path = AttributePath::parse(r#"members[display eq "日本語 ✓"].display"#).unwrap();
        assert_eq!(path.filter.unwrap().value, "日本語 ✓");
        assert_eq!(path.sub_attribute.as_deref(), Some("display"));
    }

    #[test]
    fn urn_extension_path() {
        let path = AttributePath::parse(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager",
        )
        .unwrap();
        assert_eq!(
            path.urn.as_deref(),
            Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
        );
        assert_eq!(path.attribute, "manager");
        assert!(path.is_extension());
    }

    #[test]
    fn urn_path_with_dotted_target() {
        let path = AttributePath::parse(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.displayName",
        )
        .unwrap();
        assert_eq!(path.attribute, "manager");
        assert_eq!(path.sub_attribute.as_deref(), Some("displayName"));
    }

    #[test]
    fn non_eq_operator_is_unsupported_not_malformed() {
        let err = AttributePath::parse(r#"members[value co "u1"]"#).unwrap_err();
        assert!(matches!(err, ScimError::UnsupportedFilter { .. }));
    }

    #[test]
    fn malformed_paths() {
        assert!(matches!(
            AttributePath::parse("").unwrap_err(),
            ScimError::MalformedPath { .. }
        ));
        assert!(matches!(
            AttributePath::parse(r#"members[value eq "u1""#).unwrap_err(),
            ScimError::MalformedPath { .. }
        ));
        assert!(matches!(
            AttributePath::parse(r#"members[value eq u1]"#).unwrap_err(),
            ScimError::MalformedPath { .. }
        ));
        assert!(matches!(
            AttributePath::parse("displayName extra").unwrap_err(),
            ScimError::MalformedPath { .. }
        ));
    }

    #[test]
    fn name_matching_is_case_insensitive() {
        let path = AttributePath::parse("DisplayName").unwrap();
        assert!(path.attribute_is("displayName"));
    }
}
