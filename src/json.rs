//! Lenient accessors over upstream JSON.
//!
//! Upstream payloads change shape between seasons and modes, so nothing
//! here fails: a missing or mistyped field reads as `None`.

use serde_json::Value;

/// Follow a dotted path (`"victim.character.location"`) through objects.
pub fn at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |cur, key| cur.as_object()?.get(key))
        .filter(|v| !v.is_null())
}

/// First path that resolves to a non-null value.
pub fn first_at<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|p| at(value, p))
}

/// Numeric field, accepting numbers encoded as strings.
pub fn num(value: &Value, path: &str) -> Option<f64> {
    let n: Option<f64> = match at(value, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Strictly numeric field (strings are not coerced).
pub fn strict_num(value: &Value, path: &str) -> Option<f64> {
    at(value, path)?.as_f64().filter(|n| n.is_finite())
}

/// First numeric value among `paths`.
pub fn first_num(value: &Value, paths: &[&str]) -> Option<f64> {
    paths.iter().find_map(|p| num(value, p))
}

/// Non-empty (after trimming) string field.
pub fn text<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    at(value, path)?.as_str().filter(|s| !s.trim().is_empty())
}

/// First non-empty string among `paths`.
pub fn first_text<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a str> {
    paths.iter().find_map(|p| text(value, p))
}

/// JS-style truthiness for flag fields.
pub fn truthy(value: &Value, path: &str) -> bool {
    match at(value, path) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        _ => false,
    }
}

/// Elements of an array field; empty when absent.
pub fn items<'a>(value: &'a Value, path: &str) -> &'a [Value] {
    at(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_at_nested_and_null() {
        let v = json!({"a": {"b": {"c": 1}, "n": null}});
        assert_eq!(at(&v, "a.b.c"), Some(&json!(1)));
        assert_eq!(at(&v, "a.n"), None);
        assert_eq!(at(&v, "a.b.missing"), None);
        assert_eq!(at(&v, "a.b.c.d"), None);
    }

    #[test]
    fn test_num_coerces_strings() {
        let v = json!({"x": "12.5", "y": 3, "z": "abc"});
        assert_eq!(num(&v, "x"), Some(12.5));
        assert_eq!(num(&v, "y"), Some(3.0));
        assert_eq!(num(&v, "z"), None);
        assert_eq!(strict_num(&v, "x"), None);
    }

    #[test]
    fn test_text_skips_blank() {
        let v = json!({"a": "  ", "b": "Item_Weapon_AKM_C"});
        assert_eq!(first_text(&v, &["a", "b"]), Some("Item_Weapon_AKM_C"));
    }

    #[test]
    fn test_truthy() {
        let v = json!({"t": true, "f": false, "one": 1, "zero": 0});
        assert!(truthy(&v, "t"));
        assert!(!truthy(&v, "f"));
        assert!(truthy(&v, "one"));
        assert!(!truthy(&v, "zero"));
        assert!(!truthy(&v, "missing"));
    }

    #[test]
    fn test_items_defaults_empty() {
        let v = json!({"data": [1, 2]});
        assert_eq!(items(&v, "data").len(), 2);
        assert!(items(&v, "included").is_empty());
    }
}
