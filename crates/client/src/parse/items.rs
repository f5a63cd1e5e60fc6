//! Live-bidding items API responses.

use serde_json::Value;

use super::ParseError;

/// Fields of one item as reported by the items API.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    /// Normalized to a string whether the API sent a number or a string.
    pub id: String,
    pub name: String,
    pub description: String,
    pub start_amount: Option<f64>,
    pub api_bidding_state: Value,
    pub images: Vec<Value>,
}

/// Parse an items response: either a top-level array or `{ "items": [...] }`.
pub fn parse_items_response(body: &str) -> Result<Vec<ItemFields>, ParseError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ParseError::Unavailable(format!("items JSON: {e}")))?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(ParseError::UnexpectedFormat(
                    "Unexpected response format from items API".to_string(),
                ));
            }
        },
        _ => {
            return Err(ParseError::UnexpectedFormat(
                "Unexpected response format from items API".to_string(),
            ));
        }
    };

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        match item_fields(entry) {
            Some(item) => items.push(item),
            None => tracing::debug!("dropping item without id"),
        }
    }
    Ok(items)
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn item_fields(entry: Value) -> Option<ItemFields> {
    let Value::Object(mut obj) = entry else {
        return None;
    };

    let id = match obj.get("id")? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let start_amount = match obj.get("start_amount") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    };

    let images = match obj.remove("images") {
        Some(Value::Array(images)) => images,
        _ => Vec::new(),
    };

    Some(ItemFields {
        id,
        name: text(obj.get("name")),
        description: text(obj.get("description")),
        start_amount,
        api_bidding_state: obj.remove("api_bidding_state").unwrap_or(Value::Null),
        images,
    })
}
