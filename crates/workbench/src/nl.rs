#![forbid(unsafe_code)]

//! Bridge to an external language model that drafts SQL from a natural
//! language question. The model is asked for a JSON object so the description
//! and the statement arrive separable; the parser still tolerates free-form
//! answers because the contract is advisory only.

use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QualifiedColumn {
    pub table: String,
    pub column: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SqlDraft {
    pub sql: String,
    pub description: String,
}

#[derive(Debug)]
pub(crate) enum NlError {
    MissingApiKey(String),
    Http(String),
    BadStatus(u16),
    EmptyResponse,
}

impl std::fmt::Display for NlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey(var) => write!(f, "api key env var {var} is not set"),
            Self::Http(message) => write!(f, "request failed: {message}"),
            Self::BadStatus(status) => write!(f, "model endpoint answered HTTP {status}"),
            Self::EmptyResponse => write!(f, "model returned no usable text"),
        }
    }
}

impl std::error::Error for NlError {}

/// Seam for tests and alternate providers: the session only ever sees this
/// trait.
pub(crate) trait SqlDrafter {
    fn draft(&self, question: &str, columns: &[QualifiedColumn]) -> Result<SqlDraft, NlError>;
}

#[derive(Clone, Debug)]
pub(crate) struct NlConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f64,
}

impl Default for NlConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.1,
        }
    }
}

const SYSTEM_PROMPT: &str = "You translate questions about tabular data into SQL for an \
embedded SQL engine. You are given the available columns as table.column pairs. Answer with \
a single JSON object, no prose around it: {\"description\": \"<one sentence summary>\", \
\"sql\": \"<the SQL statement>\"}. Reference only the listed tables and columns.";

pub(crate) struct OpenAiDrafter {
    config: NlConfig,
}

impl OpenAiDrafter {
    pub(crate) fn new(config: NlConfig) -> Self {
        Self { config }
    }
}

impl SqlDrafter for OpenAiDrafter {
    fn draft(&self, question: &str, columns: &[QualifiedColumn]) -> Result<SqlDraft, NlError> {
        let api_key = std::env::var(&self.config.api_key_env)
            .map_err(|_| NlError::MissingApiKey(self.config.api_key_env.clone()))?;

        let column_list = columns
            .iter()
            .map(|qc| format!("{}.{}", qc.table, qc.column))
            .collect::<Vec<_>>()
            .join(", ");
        let user_message = format!("Available columns: {column_list}\nQuestion: {question}");

        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_message }
            ]
        });

        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "application/json")
            .send_json(body);
        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(NlError::BadStatus(status)),
            Err(err) => return Err(NlError::Http(err.to_string())),
        };

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|err| NlError::Http(err.to_string()))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(NlError::EmptyResponse);
        }
        Ok(parse_draft(&text))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Splits a model answer into description + SQL. Tried in order: the
/// requested JSON object (bare or inside a fenced block), the legacy leading
/// `--` comment convention, and finally the whole text as SQL with no
/// description.
pub(crate) fn parse_draft(text: &str) -> SqlDraft {
    let trimmed = text.trim();

    if let Some(draft) = parse_json_draft(trimmed) {
        return draft;
    }
    if let Some(inner) = extract_fenced_block(trimmed)
        && let Some(draft) = parse_json_draft(inner.trim())
    {
        return draft;
    }

    let body = extract_fenced_block(trimmed).unwrap_or(trimmed).trim();
    if let Some(rest) = body.strip_prefix("--") {
        let (description, sql) = match rest.split_once('\n') {
            Some((first, remainder)) => (first.trim().to_string(), remainder.trim().to_string()),
            None => (rest.trim().to_string(), String::new()),
        };
        if !sql.is_empty() {
            return SqlDraft { sql, description };
        }
    }

    SqlDraft {
        sql: body.to_string(),
        description: String::new(),
    }
}

fn parse_json_draft(text: &str) -> Option<SqlDraft> {
    #[derive(Deserialize)]
    struct Shape {
        sql: String,
        #[serde(default)]
        description: String,
    }
    let shape: Shape = serde_json::from_str(text).ok()?;
    let sql = shape.sql.trim().to_string();
    if sql.is_empty() {
        return None;
    }
    Some(SqlDraft {
        sql,
        description: shape.description.trim().to_string(),
    })
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip an info string like `json` or `sql` on the opening fence.
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_requested_json_shape() {
        let draft = parse_draft(
            r#"{"description": "total per region", "sql": "SELECT region, SUM(amount) FROM sales GROUP BY region"}"#,
        );
        assert_eq!(draft.description, "total per region");
        assert!(draft.sql.starts_with("SELECT region"));
    }

    #[test]
    fn parses_json_inside_fenced_block() {
        let draft = parse_draft(
            "```json\n{\"description\": \"count\", \"sql\": \"SELECT COUNT(*) FROM t\"}\n```",
        );
        assert_eq!(draft.description, "count");
        assert_eq!(draft.sql, "SELECT COUNT(*) FROM t");
    }

    #[test]
    fn falls_back_to_leading_comment_convention() {
        let draft = parse_draft("-- rows per state\nSELECT state, COUNT(*) FROM t GROUP BY state");
        assert_eq!(draft.description, "rows per state");
        assert_eq!(draft.sql, "SELECT state, COUNT(*) FROM t GROUP BY state");
    }

    #[test]
    fn falls_back_to_whole_text_as_sql() {
        let draft = parse_draft("SELECT 1");
        assert_eq!(draft.description, "");
        assert_eq!(draft.sql, "SELECT 1");
    }

    #[test]
    fn strips_sql_fences_in_comment_fallback() {
        let draft = parse_draft("```sql\n-- top ten\nSELECT * FROM t LIMIT 10\n```");
        assert_eq!(draft.description, "top ten");
        assert_eq!(draft.sql, "SELECT * FROM t LIMIT 10");
    }

    #[test]
    fn json_draft_with_empty_sql_is_not_a_draft() {
        let draft = parse_draft(r#"{"description": "nothing", "sql": ""}"#);
        // Falls through to whole-text-as-SQL; the caller sees the raw text.
        assert!(draft.sql.contains("nothing"));
    }
}
