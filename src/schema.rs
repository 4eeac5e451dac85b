//! Data contracts exchanged with the models.
//!
//! The same shapes serve two purposes: the JSON schema returned by
//! [`fridge_contents_json_schema`] is sent to the vision model as its output
//! contract, and the validators below check what actually comes back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::model::{split_data_uri, FridgeContents, FridgeItem, MealPreferences};

/// A single schema violation with the JSON path where it was found
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct Violation {
    pub path: String,
    pub message: String,
}

/// Every violation found while validating one value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_violations(.violations))]
pub struct SchemaError {
    pub violations: Vec<Violation>,
}

impl SchemaError {
    fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError {
            violations: vec![Violation {
                path: path.into(),
                message: message.into(),
            }],
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    let parts: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
    parts.join("; ")
}

/// JSON schema for the fridge contents, in the OpenAPI subset accepted by the
/// Gemini `responseSchema` field and by OpenAI structured outputs.
pub fn fridge_contents_json_schema() -> Value {
    json!({
        "type": "array",
        "description": "The items of food that can be seen in the fridge.",
        "items": fridge_item_json_schema()
    })
}

/// JSON schema for a single fridge item
pub fn fridge_item_json_schema() -> Value {
    json!({
        "type": "object",
        "description": "An item of food that can be seen in the fridge.",
        "properties": {
            "title": {
                "type": "string",
                "description": "The title of the item."
            },
            "quantity": {
                "type": "integer",
                "description": "How many of this item can be seen"
            }
        },
        "required": ["title", "quantity"]
    })
}

/// Validate one item object found at `path`
pub fn validate_item(value: &Value, path: &str) -> Result<FridgeItem, SchemaError> {
    let object = value
        .as_object()
        .ok_or_else(|| SchemaError::single(path, "expected an object"))?;

    let mut violations = Vec::new();

    let title = match object.get("title") {
        None | Some(Value::Null) => {
            violations.push(violation(path, "title", "is required"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            violations.push(violation(path, "title", "must not be empty"));
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            violations.push(violation(path, "title", "must be a string"));
            None
        }
    };

    let quantity = match object.get("quantity") {
        None | Some(Value::Null) => {
            violations.push(violation(path, "quantity", "is required"));
            None
        }
        Some(v) => match parse_quantity(v) {
            Ok(q) => Some(q),
            Err(message) => {
                violations.push(violation(path, "quantity", message));
                None
            }
        },
    };

    match (title, quantity) {
        (Some(title), Some(quantity)) if violations.is_empty() => {
            Ok(FridgeItem { title, quantity })
        }
        _ => Err(SchemaError { violations }),
    }
}

fn violation(path: &str, field: &str, message: &str) -> Violation {
    Violation {
        path: format!("{}.{}", path, field),
        message: message.to_string(),
    }
}

fn parse_quantity(value: &Value) -> Result<u32, &'static str> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).map_err(|_| "is too large");
    }
    if value.as_i64().is_some() {
        return Err("must not be negative");
    }
    let n = value.as_f64().ok_or("must be a number")?;
    if n < 0.0 {
        return Err("must not be negative");
    }
    if n.fract() != 0.0 {
        return Err("must be a whole number");
    }
    if n > f64::from(u32::MAX) {
        return Err("is too large");
    }
    Ok(n as u32)
}

/// Validate the whole fridge contents array.
///
/// A single invalid element rejects the whole value. An object wrapping the
/// array in an `items` field is accepted as well.
pub fn validate_contents(value: &Value) -> Result<FridgeContents, SchemaError> {
    let array = match value {
        Value::Array(array) => array,
        Value::Object(object) => match object.get("items") {
            Some(Value::Array(array)) if object.len() == 1 => array,
            _ => return Err(SchemaError::single("$", "expected an array of items")),
        },
        _ => return Err(SchemaError::single("$", "expected an array of items")),
    };

    let mut items = Vec::with_capacity(array.len());
    let mut violations = Vec::new();

    for (index, element) in array.iter().enumerate() {
        match validate_item(element, &format!("$[{}]", index)) {
            Ok(item) => items.push(item),
            Err(e) => violations.extend(e.violations),
        }
    }

    if violations.is_empty() {
        Ok(FridgeContents::new(items))
    } else {
        Err(SchemaError { violations })
    }
}

/// Parse raw model text into fridge contents
pub fn parse_fridge_contents(text: &str) -> Result<FridgeContents, SchemaError> {
    let json = strip_code_fences(text);
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SchemaError::single("$", format!("not valid JSON: {}", e)))?;
    validate_contents(&value)
}

/// Remove a surrounding markdown code fence (```json ... ```), if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Input envelope of the extraction stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    /// Inline `data:` URI; the fetcher has already resolved remote references
    pub image_url: String,
}

impl ExtractionRequest {
    pub fn new(image_url: impl Into<String>) -> Result<Self, SchemaError> {
        let request = ExtractionRequest {
            image_url: image_url.into(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let url = self.image_url.as_str();
        if url.trim().is_empty() {
            return Err(SchemaError::single("$.imageUrl", "must not be empty"));
        }
        if !url.starts_with("data:") {
            return Err(SchemaError::single("$.imageUrl", "must be a data URI"));
        }
        match split_data_uri(url) {
            Some((_, payload)) if !payload.is_empty() => Ok(()),
            _ => Err(SchemaError::single(
                "$.imageUrl",
                "must be a base64 data URI with a media type",
            )),
        }
    }
}

/// Input envelope of the recipe stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest {
    pub fridge_contents: FridgeContents,
    pub meal_type: String,
    pub cuisine: String,
}

impl RecipeRequest {
    pub fn new(contents: FridgeContents, prefs: &MealPreferences) -> Result<Self, SchemaError> {
        let request = RecipeRequest {
            fridge_contents: contents,
            meal_type: prefs.meal_type.clone(),
            cuisine: prefs.cuisine.clone(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Check the envelope the same way model output is checked, so contents
    /// built by hand get the same guarantees as extracted ones
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut violations = Vec::new();

        for (index, item) in self.fridge_contents.iter().enumerate() {
            if item.title.trim().is_empty() {
                violations.push(violation(
                    &format!("$.fridgeContents[{}]", index),
                    "title",
                    "must not be empty",
                ));
            }
        }
        if self.meal_type.trim().is_empty() {
            violations.push(violation("$", "mealType", "must not be empty"));
        }
        if self.cuisine.trim().is_empty() {
            violations.push(violation("$", "cuisine", "must not be empty"));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError { violations })
        }
    }
}
