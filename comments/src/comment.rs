use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_postgres::Row;

use crate::error::HandlerError;

/// A comment as returned to clients. `date` is rendered by the database as
/// `DD Mon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Comment {
    pub(crate) id: i32,
    pub(crate) story_id: i32,
    pub(crate) author: String,
    pub(crate) text: String,
    pub(crate) date: String,
}

impl TryFrom<&Row> for Comment {
    type Error = tokio_postgres::Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: row.try_get("id")?,
            story_id: row.try_get("story_id")?,
            author: row.try_get("author")?,
            text: row.try_get("text")?,
            date: row.try_get("date")?,
        })
    }
}

/// Body of a create request, before validation.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CreateComment {
    #[serde(default)]
    story_id: Value,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// A create request that passed validation: a usable story id and trimmed,
/// non-empty author and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewComment {
    pub(crate) story_id: i32,
    pub(crate) author: String,
    pub(crate) text: String,
}

impl TryFrom<CreateComment> for NewComment {
    type Error = HandlerError;

    fn try_from(payload: CreateComment) -> Result<Self, Self::Error> {
        let author = payload.author.as_deref().unwrap_or_default().trim();
        let text = payload.text.as_deref().unwrap_or_default().trim();

        if !is_truthy(&payload.story_id) || author.is_empty() || text.is_empty() {
            return Err(HandlerError::Validation);
        }

        let story_id = parse_story_id(&payload.story_id)
            .ok_or(HandlerError::MalformedInput("Invalid story_id"))?;

        Ok(NewComment {
            story_id,
            author: author.to_string(),
            text: text.to_string(),
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

// Clients send the id either as a number or as a numeric string. Whole
// floats such as `1.0` are accepted as the database would coerce them.
fn parse_story_id(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(id) => i32::try_from(id).ok(),
            None => n
                .as_f64()
                .filter(|id| id.fract() == 0.0)
                .filter(|id| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(id))
                .map(|id| id as i32),
        },
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
