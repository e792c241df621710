//! Endpoint path templates
//!
//! Templates use `:name` placeholders, optionally followed by a regex
//! constraint in parentheses:
//!
//! ```rust
//! use acton_rest::Endpoint;
//!
//! let endpoint = Endpoint::parse("/users/:id(\\d+)/tasks/:unused");
//! assert_eq!(endpoint.attributes(), &["id".to_string()]);
//! assert_eq!(endpoint.route_path(), "/users/{p0}/tasks/{p1}");
//! ```
//!
//! A placeholder whose name starts with `unused` still captures a path
//! segment but is never bound to a model attribute.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::model::Record;

const UNUSED: &str = "unused";

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Placeholder {
        name: String,
        constraint: Option<Regex>,
    },
}

/// A parsed endpoint path template
#[derive(Debug, Clone)]
pub struct Endpoint {
    string: String,
    segments: Vec<Segment>,
    attributes: Vec<String>,
}

impl Endpoint {
    /// Parse a path template
    ///
    /// Malformed templates are not rejected; they simply bind fewer attributes.
    pub fn parse(template: impl Into<String>) -> Self {
        let string = template.into();
        let mut segments = Vec::new();
        let mut attributes = Vec::new();

        for raw in string.split('/').filter(|s| !s.is_empty()) {
            let Some(spec) = raw.strip_prefix(':') else {
                segments.push(Segment::Literal(raw.to_string()));
                continue;
            };

            let (name, constraint) = match spec.find('(') {
                Some(open) => {
                    let close = spec.rfind(')').filter(|&c| c > open).unwrap_or(spec.len());
                    let pattern = &spec[open + 1..close];
                    let constraint = match Regex::new(&format!("^(?:{pattern})$")) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            tracing::warn!(
                                template = %string,
                                pattern = pattern,
                                error = %e,
                                "Ignoring invalid placeholder constraint"
                            );
                            None
                        }
                    };
                    (&spec[..open], constraint)
                }
                None => (spec, None),
            };

            if !name.starts_with(UNUSED) {
                attributes.push(name.to_string());
            }
            segments.push(Segment::Placeholder {
                name: name.to_string(),
                constraint,
            });
        }

        Self {
            string,
            segments,
            attributes,
        }
    }

    /// The template as written
    pub fn as_str(&self) -> &str {
        &self.string
    }

    /// Placeholder names bound to model attributes, in path order
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Whether the template has any placeholder segments
    pub fn has_placeholders(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder { .. }))
    }

    /// The template in router syntax
    ///
    /// Placeholders become positional captures (`{p0}`, `{p1}`, ...) so that
    /// sibling routes naming the same segment differently do not conflict.
    pub fn route_path(&self) -> String {
        let mut position = 0;
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Placeholder { .. } => {
                    path.push_str(&format!("{{p{position}}}"));
                    position += 1;
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Map positional captures back onto placeholder names
    ///
    /// Returns `None` when a captured value violates its placeholder's
    /// constraint, which callers treat as an unmatched route.
    pub fn bind(&self, captures: &[(String, String)]) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let placeholders = self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder { name, constraint } => Some((name, constraint)),
            Segment::Literal(_) => None,
        });

        for (position, (name, constraint)) in placeholders.enumerate() {
            let key = format!("p{position}");
            let Some((_, value)) = captures.iter().find(|(k, _)| *k == key) else {
                continue;
            };
            if let Some(re) = constraint {
                if !re.is_match(value) {
                    return None;
                }
            }
            if !name.starts_with(UNUSED) {
                params.insert(name.clone(), value.clone());
            }
        }
        Some(params)
    }

    /// Fill placeholders from a record, e.g. to build a `Location` header
    pub fn substitute(&self, record: &Record) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Placeholder { name, .. } => path.push_str(&record.display_value(name)),
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Append literal segments to this template
    pub fn join(&self, suffix: &str) -> Self {
        let base = self.string.trim_end_matches('/');
        let suffix = suffix.trim_start_matches('/');
        Self::parse(format!("{base}/{suffix}"))
    }

    /// Mount this template under a literal base path, e.g. `/api`
    pub fn prefixed(&self, base: &str) -> Self {
        let base = base.trim_matches('/');
        if base.is_empty() {
            return self.clone();
        }
        Self::parse(format!("/{base}/{}", self.string.trim_start_matches('/')))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.string == other.string
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn captures(values: &[&str]) -> Vec<(String, String)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("p{i}"), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_plain_template() {
        let endpoint = Endpoint::parse("/users/:user_id/tasks/:id");
        assert_eq!(endpoint.attributes(), &["user_id", "id"]);
        assert_eq!(endpoint.as_str(), "/users/:user_id/tasks/:id");
    }

    #[test]
    fn test_parse_strips_constraint() {
        let endpoint = Endpoint::parse("/users/:id(\\d+)");
        assert_eq!(endpoint.attributes(), &["id"]);
    }

    #[test]
    fn test_parse_skips_unused() {
        let endpoint = Endpoint::parse("/things/:unused/:id");
        assert_eq!(endpoint.attributes(), &["id"]);
        assert_eq!(endpoint.route_path(), "/things/{p0}/{p1}");
    }

    #[test]
    fn test_parse_skips_unused_prefixed_names() {
        let endpoint = Endpoint::parse("/things/:unused_kind(\\w+)/:unused2/:id");
        assert_eq!(endpoint.attributes(), &["id"]);

        let params = endpoint.bind(&captures(&["a", "b", "5"])).unwrap();
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_parse_without_placeholders() {
        let endpoint = Endpoint::parse("/users");
        assert!(endpoint.attributes().is_empty());
        assert!(!endpoint.has_placeholders());
        assert_eq!(endpoint.route_path(), "/users");
    }

    #[test]
    fn test_bind_by_position() {
        let endpoint = Endpoint::parse("/users/:user_id/tasks/:id");
        let params = endpoint.bind(&captures(&["3", "9"])).unwrap();
        assert_eq!(params.get("user_id").map(String::as_str), Some("3"));
        assert_eq!(params.get("id").map(String::as_str), Some("9"));
    }

    #[test]
    fn test_bind_rejects_constraint_violation() {
        let endpoint = Endpoint::parse("/users/:id(\\d+)");
        assert!(endpoint.bind(&captures(&["12"])).is_some());
        assert!(endpoint.bind(&captures(&["abc"])).is_none());
    }

    #[test]
    fn test_bind_drops_unused() {
        let endpoint = Endpoint::parse("/things/:unused/:id");
        let params = endpoint.bind(&captures(&["x", "1"])).unwrap();
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("id"));
    }

    #[test]
    fn test_substitute_record_values() {
        let endpoint = Endpoint::parse("/users/:id(\\d+)");
        let record = Record::from_json(json!({"id": 42, "name": "x"})).unwrap();
        assert_eq!(endpoint.substitute(&record), "/users/42");
    }

    #[test]
    fn test_join() {
        let endpoint = Endpoint::parse("/users/:id").join("tasks");
        assert_eq!(endpoint.as_str(), "/users/:id/tasks");
        assert_eq!(endpoint.attributes(), &["id"]);
    }

    #[test]
    fn test_prefixed() {
        let endpoint = Endpoint::parse("/users/:id(\\d+)").prefixed("/api/");
        assert_eq!(endpoint.as_str(), "/api/users/:id(\\d+)");
        assert_eq!(endpoint.attributes(), &["id"]);
        assert_eq!(endpoint.route_path(), "/api/users/{p0}");

        let record = Record::from_json(json!({"id": 7})).unwrap();
        assert_eq!(endpoint.substitute(&record), "/api/users/7");
        assert_eq!(Endpoint::parse("/users").prefixed("/"), Endpoint::parse("/users"));
    }
}
