//! Where-clause evaluation and ordering over JSON rows

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::model::{Condition, Operator, OrderDirection, OrderTarget, OrderTerm, Record};

static NULL: Value = Value::Null;

/// Values reachable from `row` through a dotted path
///
/// Arrays on the way fan out, so `tasks.name` yields every task name. A plain
/// missing column reads as `null`.
fn lookup<'a>(row: &'a Record, path: &str) -> Vec<&'a Value> {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return Vec::new();
    };
    let Some(root) = row.get(first) else {
        return if path.contains('.') {
            Vec::new()
        } else {
            vec![&NULL]
        };
    };

    let mut current = vec![root];
    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => next.extend(
                    items
                        .iter()
                        .filter_map(|item| item.as_object().and_then(|m| m.get(segment))),
                ),
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality with number/string coercion, the way SQL compares a numeric
/// column with a quoted literal
pub(crate) fn loose_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            matches!((as_number(actual), as_number(expected)), (Some(a), Some(b)) if a == b)
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Bool(a), Value::String(s)) | (Value::String(s), Value::Bool(a)) => {
            s.parse::<bool>().map_or(false, |b| b == *a)
        }
        _ => actual == expected,
    }
}

/// Ordering of two column values; `None` when they cannot be compared
fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, _) | (_, Value::Null) => None,
        _ => as_number(actual)?.partial_cmp(&as_number(expected)?),
    }
}

/// Compile a SQL `LIKE` pattern into an anchored regex
pub(crate) fn like_regex(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    let mut source = String::from("^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if c == '%' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');
    RegexBuilder::new(&source)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
        .ok()
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn matches_pattern(actual: &Value, pattern: &Value, case_insensitive: bool) -> bool {
    let Some(text) = as_text(actual) else {
        return false;
    };
    let Some(pattern) = pattern.as_str() else {
        return false;
    };
    like_regex(pattern, case_insensitive).is_some_and(|re| re.is_match(&text))
}

fn compare_one(actual: &Value, op: Operator, expected: &Value) -> bool {
    match op {
        Operator::Eq | Operator::In => match expected {
            Value::Array(items) => items.iter().any(|item| loose_eq(actual, item)),
            _ => loose_eq(actual, expected),
        },
        Operator::Ne | Operator::NotIn => !compare_one(actual, Operator::Eq, expected),
        Operator::Gt => compare(actual, expected) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            compare(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => compare(actual, expected) == Some(Ordering::Less),
        Operator::Lte => matches!(
            compare(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::Like => matches_pattern(actual, expected, false),
        Operator::NotLike => !matches_pattern(actual, expected, false),
        Operator::ILike => matches_pattern(actual, expected, true),
        Operator::NotILike => !matches_pattern(actual, expected, true),
        Operator::Is => actual == expected,
        Operator::Substring | Operator::StartsWith | Operator::EndsWith => {
            let (Some(text), Some(needle)) = (as_text(actual), as_text(expected)) else {
                return false;
            };
            match op {
                Operator::StartsWith => text.starts_with(&needle),
                Operator::EndsWith => text.ends_with(&needle),
                _ => text.contains(&needle),
            }
        }
    }
}

/// Whether `row` satisfies `condition`
///
/// An empty `Or` matches nothing; an empty `And` matches everything.
pub(crate) fn matches(row: &Record, condition: &Condition) -> bool {
    match condition {
        Condition::Compare { field, op, value } => lookup(row, field)
            .into_iter()
            .any(|actual| compare_one(actual, *op, value)),
        Condition::And(children) => children.iter().all(|c| matches(row, c)),
        Condition::Or(children) => children.iter().any(|c| matches(row, c)),
    }
}

/// Stable sort by the order terms; nulls sort first
pub(crate) fn sort_rows(rows: &mut [Record], order: &[OrderTerm]) {
    if order.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for term in order {
            let path = match &term.target {
                OrderTarget::Column(name) | OrderTarget::Literal(name) => name,
            };
            let left = lookup(a, path).first().copied().unwrap_or(&NULL);
            let right = lookup(b, path).first().copied().unwrap_or(&NULL);
            let ordering = match (left, right) {
                (Value::Null, Value::Null) => Ordering::Equal,
                (Value::Null, _) => Ordering::Less,
                (_, Value::Null) => Ordering::Greater,
                _ => compare(left, right).unwrap_or(Ordering::Equal),
            };
            let ordering = match term.direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Record {
        Record::from_json(value).unwrap()
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!("2.0"), &json!(2)));
        assert!(loose_eq(&json!(true), &json!("true")));
        assert!(!loose_eq(&json!("abc"), &json!(0)));
        assert!(loose_eq(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_like_patterns() {
        let re = like_regex("abc%", false).unwrap();
        assert!(re.is_match("abcdef"));
        assert!(!re.is_match("xabc"));

        let re = like_regex("%a.c%", true).unwrap();
        assert!(re.is_match("xA.Cy"));
        assert!(!re.is_match("abc"));

        assert!(like_regex("a_c", false).unwrap().is_match("abc"));
    }

    #[test]
    fn test_conditions() {
        let r = row(json!({"id": 1, "name": "arthur", "email": null}));
        assert!(matches(&r, &Condition::eq("id", "1")));
        assert!(matches(&r, &Condition::eq("id", json!([3, 1]))));
        assert!(matches(&r, &Condition::eq("email", Value::Null)));
        assert!(matches(&r, &Condition::eq("missing", Value::Null)));
        assert!(matches(&r, &Condition::compare("name", Operator::Like, "%rth%")));
        assert!(!matches(&r, &Condition::compare("name", Operator::Like, "%RTH%")));
        assert!(matches(&r, &Condition::compare("name", Operator::ILike, "%RTH%")));
        assert!(matches(&r, &Condition::compare("id", Operator::Gte, 1)));
        assert!(!matches(&r, &Condition::Or(Vec::new())));
        assert!(matches(&r, &Condition::And(Vec::new())));
    }

    #[test]
    fn test_text_operators() {
        let r = row(json!({"name": "testEntry", "code": 1234}));
        assert!(matches(&r, &Condition::compare("name", Operator::Substring, "ntr")));
        assert!(!matches(&r, &Condition::compare("name", Operator::Substring, "NTR")));
        assert!(matches(&r, &Condition::compare("name", Operator::StartsWith, "test")));
        assert!(!matches(&r, &Condition::compare("name", Operator::StartsWith, "Entry")));
        assert!(matches(&r, &Condition::compare("name", Operator::EndsWith, "Entry")));
        assert!(matches(&r, &Condition::compare("code", Operator::Substring, "23")));
        assert!(!matches(&r, &Condition::compare("missing", Operator::Substring, "x")));
    }

    #[test]
    fn test_dotted_paths_fan_out() {
        let r = row(json!({"tasks": [{"name": "eat"}, {"name": "sleep"}]}));
        assert!(matches(&r, &Condition::eq("tasks.name", "sleep")));
        assert!(!matches(&r, &Condition::eq("tasks.name", "run")));
        assert!(!matches(&r, &Condition::eq("app.name", "x")));
    }

    #[test]
    fn test_sort_directions_and_nulls() {
        let mut rows = vec![
            row(json!({"id": 1, "name": "b"})),
            row(json!({"id": 2, "name": null})),
            row(json!({"id": 3, "name": "a"})),
        ];
        sort_rows(
            &mut rows,
            &[OrderTerm {
                target: OrderTarget::Column("name".into()),
                direction: OrderDirection::Asc,
            }],
        );
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(3), json!(1)]);

        sort_rows(
            &mut rows,
            &[OrderTerm {
                target: OrderTarget::Column("id".into()),
                direction: OrderDirection::Desc,
            }],
        );
        assert_eq!(rows[0]["id"], json!(3));
    }
}
