//! Built-in template functions.
//!
//! Every function is total: inputs outside the expected shape are coerced
//! (lists render as comma-joined text, non-numeric indices are out of range)
//! instead of failing.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::parse::Function;

/// A template value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Str(String),
    List(Vec<String>),
    Int(i64),
    Bool(bool),
}

impl Value {
    /// Empty strings and empty lists; integers and booleans never are.
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::Str(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Int(_) | Self::Bool(_) => false,
        }
    }

    fn text(&self) -> String {
        self.to_string()
    }

    fn list(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            other if other.is_empty() => Vec::new(),
            other => vec![other.text()],
        }
    }

    fn int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Str(text) => text.trim().parse().ok(),
            Self::List(_) | Self::Bool(_) => None,
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Self::Bool(flag) => *flag,
            Self::Int(value) => *value != 0,
            Self::Str(text) => !text.is_empty() && text != "false",
            Self::List(items) => !items.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(text) => f.write_str(text),
            Self::List(items) => f.write_str(&items.join(",")),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

/// Applies `function` to already-evaluated arguments.
///
/// Argument counts were checked when the template was compiled.
pub(crate) fn call(function: Function, args: Vec<Value>) -> Value {
    let arg = |index: usize| args.get(index).cloned().unwrap_or(Value::Str(String::new()));
    let text = |index: usize| arg(index).text();

    match function {
        Function::PathSegment => {
            let path = text(0);
            Value::Str(
                arg(1)
                    .int()
                    .and_then(|index| path_segment(&path, index))
                    .unwrap_or_default(),
            )
        }
        Function::PathResource => Value::Str(path_resource(&text(0))),
        Function::PathLast => Value::Str(path_last(&text(0))),
        Function::PathClean => Value::Str(path_clean(&text(0))),
        Function::FirstTag => Value::Str(arg(0).list().into_iter().next().unwrap_or_default()),
        Function::JoinTags => Value::Str(arg(0).list().join(&text(1))),
        Function::HasTag => {
            let wanted = text(1);
            Value::Bool(arg(0).list().iter().any(|tag| *tag == wanted))
        }
        Function::PascalCase => Value::Str(pascal_case(&text(0))),
        Function::CamelCase => Value::Str(camel_case(&text(0))),
        Function::SnakeCase => Value::Str(join_words(&text(0), "_")),
        Function::KebabCase => Value::Str(join_words(&text(0), "-")),
        Function::Default => {
            let value = arg(0);
            if value.is_empty() { arg(1) } else { value }
        }
        Function::Coalesce => args
            .iter()
            .find(|value| !value.is_empty())
            .cloned()
            .unwrap_or(Value::Str(String::new())),
        Function::Upper => Value::Str(text(0).to_uppercase()),
        Function::Lower => Value::Str(text(0).to_lowercase()),
        Function::TrimPrefix => {
            let value = text(0);
            let prefix = text(1);
            Value::Str(value.strip_prefix(prefix.as_str()).unwrap_or(&value).to_string())
        }
        Function::TrimSuffix => {
            let value = text(0);
            let suffix = text(1);
            Value::Str(value.strip_suffix(suffix.as_str()).unwrap_or(&value).to_string())
        }
        Function::Replace => {
            let from = text(1);
            if from.is_empty() {
                Value::Str(text(0))
            } else {
                Value::Str(text(0).replace(&from, &text(2)))
            }
        }
        Function::Cond => {
            if arg(0).truthy() {
                arg(1)
            } else {
                arg(2)
            }
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn is_placeholder(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

/// Segment `index` of `path`; negative indices count from the end.
pub(crate) fn path_segment(path: &str, index: i64) -> Option<String> {
    let segments = segments(path);
    let len = i64::try_from(segments.len()).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 || resolved >= len {
        return None;
    }
    let resolved = usize::try_from(resolved).ok()?;
    segments.get(resolved).map(|segment| segment.to_string())
}

/// First segment that is not a `{param}` placeholder.
pub(crate) fn path_resource(path: &str) -> String {
    segments(path)
        .into_iter()
        .find(|segment| !is_placeholder(segment))
        .unwrap_or_default()
        .to_string()
}

/// Last segment that is not a `{param}` placeholder.
pub(crate) fn path_last(path: &str) -> String {
    segments(path)
        .into_iter()
        .rev()
        .find(|segment| !is_placeholder(segment))
        .unwrap_or_default()
        .to_string()
}

/// Name-safe token for a path: `/users/{id}/orders` → `users_id_orders`.
pub(crate) fn path_clean(path: &str) -> String {
    static NON_ALNUM: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("static regex must compile"));
    NON_ALNUM
        .replace_all(path, "_")
        .trim_matches('_')
        .to_string()
}

/// Splits text into words at separators, lower-to-upper transitions, the end
/// of an acronym (`HTTPServer` → `HTTP`, `Server`) and digit-to-upper
/// transitions.
fn words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|next| next.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub(crate) fn pascal_case(text: &str) -> String {
    words(text).iter().map(|word| capitalize(word)).collect()
}

pub(crate) fn camel_case(text: &str) -> String {
    words(text)
        .iter()
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_lowercase() } else { capitalize(word) })
        .collect()
}

fn join_words(text: &str, separator: &str) -> String {
    words(text)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|item| item.to_string()).collect())
    }

    #[test]
    fn test_path_segment_supports_negative_indices() {
        let path = "/users/{id}/orders";
        assert_eq!(path_segment(path, 0).as_deref(), Some("users"));
        assert_eq!(path_segment(path, 1).as_deref(), Some("{id}"));
        assert_eq!(path_segment(path, -1).as_deref(), Some("orders"));
        assert_eq!(path_segment(path, -3).as_deref(), Some("users"));
        assert_eq!(path_segment(path, 3), None);
        assert_eq!(path_segment(path, -4), None);
        assert_eq!(path_segment("", 0), None);
    }

    #[test]
    fn test_resource_and_last_skip_placeholders() {
        assert_eq!(path_resource("/{tenant}/users/{id}"), "users");
        assert_eq!(path_last("/users/{id}"), "users");
        assert_eq!(path_last("/users/{id}/orders/{orderId}"), "orders");
        assert_eq!(path_resource("/{id}"), "");
    }

    #[test]
    fn test_path_clean_keeps_placeholder_names() {
        assert_eq!(path_clean("/users/{id}/orders"), "users_id_orders");
        assert_eq!(path_clean("/v1/pet-store.items"), "v1_pet_store_items");
        assert_eq!(path_clean("/"), "");
    }

    #[test]
    fn test_case_conversion_detects_word_boundaries_uniformly() {
        for input in ["user_profile", "user-profile", "userProfile", "UserProfile", "user profile"] {
            assert_eq!(pascal_case(input), "UserProfile", "input {input}");
            assert_eq!(camel_case(input), "userProfile", "input {input}");
            assert_eq!(join_words(input, "_"), "user_profile", "input {input}");
            assert_eq!(join_words(input, "-"), "user-profile", "input {input}");
        }
        assert_eq!(pascal_case("HTTPServer"), "HttpServer");
        assert_eq!(join_words("getHTTPResponse2Code", "_"), "get_http_response2_code");
    }

    #[test]
    fn test_tag_helpers() {
        let tags = list(&["billing", "admin"]);
        assert_eq!(call(Function::FirstTag, vec![tags.clone()]), s("billing"));
        assert_eq!(call(Function::FirstTag, vec![list(&[])]), s(""));
        assert_eq!(call(Function::JoinTags, vec![tags.clone(), s("+")]), s("billing+admin"));
        assert_eq!(call(Function::HasTag, vec![tags.clone(), s("admin")]), Value::Bool(true));
        assert_eq!(call(Function::HasTag, vec![tags, s("ops")]), Value::Bool(false));
    }

    #[test]
    fn test_default_and_coalesce_skip_empty_values() {
        assert_eq!(call(Function::Default, vec![s(""), s("fallback")]), s("fallback"));
        assert_eq!(call(Function::Default, vec![s("x"), s("fallback")]), s("x"));
        assert_eq!(
            call(Function::Coalesce, vec![s(""), list(&[]), s("third")]),
            s("third")
        );
        assert_eq!(call(Function::Coalesce, vec![s(""), s("")]), s(""));
    }

    #[test]
    fn test_non_numeric_index_is_out_of_range() {
        assert_eq!(
            call(Function::PathSegment, vec![s("/a/b"), s("one")]),
            s("")
        );
        assert_eq!(call(Function::PathSegment, vec![s("/a/b"), s("1")]), s("b"));
    }

    #[test]
    fn test_string_helpers_and_cond() {
        assert_eq!(call(Function::TrimPrefix, vec![s("ApiUser"), s("Api")]), s("User"));
        assert_eq!(call(Function::TrimSuffix, vec![s("UserDto"), s("Dto")]), s("User"));
        assert_eq!(call(Function::Replace, vec![s("a.b.c"), s("."), s("_")]), s("a_b_c"));
        assert_eq!(call(Function::Replace, vec![s("abc"), s(""), s("_")]), s("abc"));
        assert_eq!(call(Function::Upper, vec![s("get")]), s("GET"));
        assert_eq!(
            call(Function::Cond, vec![Value::Bool(true), s("shared"), s("own")]),
            s("shared")
        );
        assert_eq!(
            call(Function::Cond, vec![Value::Int(0), s("shared"), s("own")]),
            s("own")
        );
    }

    #[test]
    fn test_lists_render_comma_joined() {
        assert_eq!(list(&["a", "b"]).to_string(), "a,b");
        assert_eq!(Value::Int(3).to_string(), "3");
        assert!(!Value::Int(0).is_empty());
    }
}
