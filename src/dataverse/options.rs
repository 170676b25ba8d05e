//! Dropdown option extraction from Dataverse payloads.

use serde::Serialize;
use serde_json::Value as JsonValue;

pub const NO_RECORDS_TEXT: &str = "--No records found--";
pub const NO_LABEL_TEXT: &str = "No Label";

/// Label path inside a global option set's `Options` entries.
pub const OPTION_SET_LABEL_PATH: &str = "Label.UserLocalizedLabel.Label";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: JsonValue,
    pub text: JsonValue,
}

/// Follows a dot-separated `path` through nested objects.
pub fn nested_property_value<'a>(data: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(data, |current, segment| current.get(segment))
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Builds `{value, text}` pairs from `items`. Items without a usable value are
/// skipped; missing labels read "No Label". An absent or empty input yields a
/// single placeholder option.
pub fn process_options(
    items: Option<&[JsonValue]>,
    value_path: &str,
    label_path: &str,
) -> Vec<SelectOption> {
    let Some(items) = items.filter(|items| !items.is_empty()) else {
        return vec![SelectOption {
            value: JsonValue::String(String::new()),
            text: JsonValue::String(NO_RECORDS_TEXT.to_string()),
        }];
    };

    items
        .iter()
        .filter_map(|item| {
            let value = nested_property_value(item, value_path).filter(|v| is_truthy(v))?;
            let text = nested_property_value(item, label_path)
                .filter(|label| !label.is_null())
                .cloned()
                .unwrap_or_else(|| JsonValue::String(NO_LABEL_TEXT.to_string()));
            Some(SelectOption {
                value: value.clone(),
                text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_lookup() {
        let data = json!({ "a": { "b": { "c": 42 } } });
        assert_eq!(nested_property_value(&data, "a.b.c"), Some(&json!(42)));
        assert_eq!(nested_property_value(&data, "a.b.d"), None);
        assert_eq!(nested_property_value(&data, "a.b.c.d"), None);
    }

    #[test]
    fn option_set_entries() {
        let items = vec![
            json!({ "Value": 930750000, "Label": { "UserLocalizedLabel": { "Label": "Company" } } }),
            json!({ "Value": 930750001, "Label": { "UserLocalizedLabel": null } }),
            json!({ "Value": 0, "Label": { "UserLocalizedLabel": { "Label": "Zero" } } }),
        ];

        let options = process_options(Some(&items), "Value", OPTION_SET_LABEL_PATH);
        assert_eq!(
            options,
            vec![
                SelectOption {
                    value: json!(930750000),
                    text: json!("Company")
                },
                SelectOption {
                    value: json!(930750001),
                    text: json!(NO_LABEL_TEXT)
                },
            ]
        );
    }

    #[test]
    fn no_data_yields_placeholder() {
        for items in [None, Some(&[][..])] {
            let options = process_options(items, "nm_countryid", "nm_name");
            assert_eq!(options.len(), 1);
            assert_eq!(options[0].value, json!(""));
            assert_eq!(options[0].text, json!(NO_RECORDS_TEXT));
        }
    }
}
