use serde::Deserialize;
use utoipa::IntoParams;

pub const DEFAULT_QUESTION: &str = "What is the square root of 9?";

#[derive(Deserialize, IntoParams)]
pub struct AskParams {
    /// Question answered from stored notes.
    pub text: Option<String>,
}

impl AskParams {
    pub fn question(&self) -> &str {
        match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => DEFAULT_QUESTION,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct ChatParams {
    /// Message sent to the model as-is.
    #[serde(default)]
    pub query: String,
}
