use once_cell::sync::OnceCell;
use serde_json::{json, Value};

static SCENE_RESPONSE_SCHEMA: OnceCell<Value> = OnceCell::new();

fn bilingual_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "en": { "type": "STRING", "description": "English prompt text" },
            "ko": { "type": "STRING", "description": "Korean prompt text" }
        },
        "required": ["en", "ko"]
    })
}

/// Response schema handed to the service so scene output keeps one shape.
pub fn scene_response_schema() -> &'static Value {
    SCENE_RESPONSE_SCHEMA.get_or_init(|| {
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "sceneNumber": { "type": "INTEGER" },
                    "story": { "type": "STRING" },
                    "imagePrompts": {
                        "type": "ARRAY",
                        "items": bilingual_schema(),
                        "minItems": 2,
                        "maxItems": 2
                    },
                    "videoPrompts": {
                        "type": "ARRAY",
                        "items": bilingual_schema(),
                        "minItems": 2,
                        "maxItems": 2
                    }
                },
                "required": ["sceneNumber", "story", "imagePrompts", "videoPrompts"]
            }
        })
    })
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_two_variants() {
        let schema = scene_response_schema();
        let props = &schema["items"]["properties"];
        assert_eq!(props["imagePrompts"]["minItems"], 2);
        assert_eq!(props["videoPrompts"]["maxItems"], 2);
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fence("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("```\n[]\n```\n"), "[]");
    }
}
