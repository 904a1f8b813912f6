//! Post-hoc value remapping for the `$translate;<mapping>` modifier

use crate::domain::DescriptorError;
use serde_json::{Map, Value};

/// Marker that introduces the translate modifier
pub(crate) const TRANSLATE_MARKER: &str = "$translate;";

/// Mapping from computed cell text to a replacement value
///
/// Applied strictly after the base value has been computed. Keys are compared
/// against the rendered text of the computed value, so a numeric `1` and a
/// string `"1"` both hit the key `"1"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    mapping: Map<String, Value>,
}

impl Translation {
    pub fn new(mapping: Map<String, Value>) -> Self {
        Self { mapping }
    }

    /// Parses the payload after `translate;`
    ///
    /// The payload is a JSON object literal; single-quoted literals as written
    /// by hand in job definitions (`{'1':'Yes'}`) are accepted too.
    pub fn parse(expression: &str, payload: &str) -> Result<Self, DescriptorError> {
        let invalid = |reason: String| DescriptorError::InvalidTranslate {
            expression: expression.to_string(),
            reason,
        };

        let parsed = serde_json::from_str::<Value>(payload)
            .or_else(|_| serde_json::from_str::<Value>(&payload.replace('\'', "\"")))
            .map_err(|e| invalid(e.to_string()))?;

        match parsed {
            Value::Object(mapping) => Ok(Self::new(mapping)),
            other => Err(invalid(format!("expected an object, got {other}"))),
        }
    }

    /// Replaces `value` if its rendered text is a key of the mapping
    pub fn apply(&self, value: Option<Value>) -> Option<Value> {
        match value {
            Some(v) => match self.mapping.get(&render_value(&v)) {
                Some(replacement) => Some(replacement.clone()),
                None => Some(v),
            },
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Splits `expression` into its base expression and translate payload
///
/// The split happens at the last `$translate;` whose payload opens with `{`,
/// so a payload containing `$` of its own is left intact and a label that
/// merely starts with "translate" stays part of the base. A marker followed by
/// anything else is still taken as the modifier and fails payload parsing.
pub(crate) fn split_translate(expression: &str) -> (&str, Option<&str>) {
    let markers: Vec<usize> = expression
        .rmatch_indices(TRANSLATE_MARKER)
        .map(|(pos, _)| pos)
        .collect();
    let object = markers
        .iter()
        .copied()
        .find(|&pos| expression[pos + TRANSLATE_MARKER.len()..].trim_start().starts_with('{'));

    match object.or_else(|| markers.first().copied()) {
        Some(pos) => (
            &expression[..pos],
            Some(&expression[pos + TRANSLATE_MARKER.len()..]),
        ),
        None => (expression, None),
    }
}

/// Renders a cell value as output text
///
/// Strings are written verbatim, null is the empty cell, everything else uses
/// its JSON text.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_without_translate() {
        assert_eq!(split_translate("age"), ("age", None));
    }

    #[test]
    fn test_split_keeps_dollar_in_payload() {
        let (base, payload) =
            split_translate("code$a,b$A,B$translate;{\"A\":\"x$y\"}");
        assert_eq!(base, "code$a,b$A,B");
        assert_eq!(payload, Some("{\"A\":\"x$y\"}"));
    }

    #[test]
    fn test_split_needs_full_marker() {
        assert_eq!(split_translate("age$translate{}"), ("age$translate{}", None));
        assert_eq!(
            split_translate("code$tr_1,tr_2$translated,original"),
            ("code$tr_1,tr_2$translated,original", None)
        );
    }

    #[test]
    fn test_split_takes_last_object_marker() {
        let (base, payload) = split_translate("code$a$translate;x$translate;{\"A\":\"B\"}");
        assert_eq!(base, "code$a$translate;x");
        assert_eq!(payload, Some("{\"A\":\"B\"}"));

        let (base, payload) = split_translate("age$translate;[1]");
        assert_eq!(base, "age");
        assert_eq!(payload, Some("[1]"));
    }

    #[test]
    fn test_parse_single_quoted_payload() {
        let tr = Translation::parse("e", "{'1':'Yes','2':'No'}").unwrap();
        assert_eq!(tr.len(), 2);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(Translation::parse("e", "[1,2]").is_err());
        assert!(Translation::parse("e", "{not json").is_err());
    }

    #[test]
    fn test_apply_hit_and_miss() {
        let tr = Translation::parse("e", r#"{"1":"Yes","2":"No"}"#).unwrap();
        assert_eq!(tr.apply(Some(json!("1"))), Some(json!("Yes")));
        assert_eq!(tr.apply(Some(json!(2))), Some(json!("No")));
        assert_eq!(tr.apply(Some(json!("3"))), Some(json!("3")));
        assert_eq!(tr.apply(None), None);
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("Female")), "Female");
        assert_eq!(render_value(&json!(15)), "15");
        assert_eq!(render_value(&json!(2.5)), "2.5");
        assert_eq!(render_value(&Value::Null), "");
        assert_eq!(render_value(&json!(true)), "true");
    }
}
