use serde_json::Value;

/// Pulls a JSON document out of a model reply. Replies requested with a JSON
/// mime type are usually bare JSON, but some models still wrap the body in a
/// markdown code fence.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim()).ok()
}

pub fn validate(value: &Value, schema: &Value) -> Result<(), String> {
    let compiled = jsonschema::JSONSchema::compile(schema)
        .map_err(|error| format!("failed to compile schema: {}", error))?;
    if let Err(errors) = compiled.validate(value) {
        let details: Vec<String> = errors
            .map(|error| {
                let path = error.instance_path.to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{}: {}", path, error)
                }
            })
            .collect();
        return Err(details.join("; "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{extract_json, validate};

    #[test]
    fn extracts_bare_json() {
        assert_eq!(
            extract_json("{\"a\": 1}"),
            Some(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn extracts_fenced_json() {
        let raw = "```json\n{\"insight\": \"x\"}\n```";
        assert_eq!(
            extract_json(raw),
            Some(serde_json::json!({"insight": "x"}))
        );
    }

    #[test]
    fn rejects_non_json() {
        assert!(extract_json("sorry, I cannot help with that").is_none());
        assert!(extract_json("").is_none());
    }

    #[test]
    fn validate_reports_schema_violations() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "ok": { "type": "boolean" } },
            "required": ["ok"]
        });
        assert!(validate(&serde_json::json!({"ok": true}), &schema).is_ok());
        let error = validate(&serde_json::json!({"ok": "nope"}), &schema).expect_err("invalid");
        assert!(!error.is_empty());
    }
}
