use serde_json::Value;

/// Pull the human-readable message out of an error body. The API nests
/// payloads under `detail` (object or bare string) on some routes and puts
/// `message` at the top level on others.
pub(crate) fn error_message(body: &Value, fallback: &str) -> String {
    body["detail"]["message"]
        .as_str()
        .or_else(|| body["detail"].as_str())
        .or_else(|| body["message"].as_str())
        .unwrap_or(fallback)
        .to_string()
}

/// Numeric extras (`attempts_remaining`, `retry_after`) travel next to the
/// message, nested or not.
pub(crate) fn error_u64(body: &Value, key: &str) -> Option<u64> {
    body["detail"][key].as_u64().or_else(|| body[key].as_u64())
}

/// Flatten validation failures into one line per offending field.
pub(crate) fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            match &error.message {
                Some(message) => parts.push(format!("{}: {}", field, message)),
                None => parts.push(format!("{}: invalid value", field)),
            }
        }
    }
    if parts.is_empty() {
        "invalid request".to_string()
    } else {
        parts.join("; ")
    }
}
