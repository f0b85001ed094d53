use std::fmt;

use serde_json::Value;
use superpumped::{GenerationRequest, Message};

pub const ASSISTANT_GREETING: &str = "Hello, how can I help?";

pub const RETRIEVAL_INSTRUCTION: &str = "When answering the question or responding, use the \
    context provided, if it is provided and relevant.";

const JSON_ONLY: &str = "Respond with the JSON object only. Do not wrap it in markdown code \
    fences and do not add explanations before or after it.";

pub enum Prompt {
    SecondBrain,
    CallerContext,
    TableUpdate,
    TableChat,
    ChartConfig,
    ChartChat,
    Dashboard,
    FileTransform,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecondBrain => write!(
                f,
                "You are an AI assistant called superpumped that acts as a \"Second Brain\" by \
                answering questions based on provided context. Your goal is to directly address \
                the question concisely and to the point, without excessive elaboration."
            ),
            Self::CallerContext => write!(
                f,
                "You are a helpful assistant. Answer the user's question using the context \
                below when it is relevant, and say so plainly when it does not contain the \
                answer. Keep answers concise."
            ),
            Self::TableUpdate => write!(
                f,
                "You edit data grid configurations. You receive a JSON table configuration \
                with a \"data\" array of row objects and a \"columns\" array of \
                {{\"accessorKey\", \"header\"}} objects, plus a change request. Apply the \
                change and return the complete updated configuration. Every accessorKey in \
                \"columns\" must be a key of every row in \"data\"; when a column is removed, \
                remove its key from every row too. Keep any other top-level settings such as \
                grouping, pagination, or sorting unless asked to change them. {JSON_ONLY}"
            ),
            Self::TableChat => write!(
                f,
                "You answer questions about a data table. You receive the table as JSON and a \
                question. Answer in plain text, citing the relevant values. If the table does \
                not contain the answer, say so."
            ),
            Self::ChartConfig => write!(
                f,
                "You create chart configurations. You receive rows of data as JSON, an \
                optional existing chart configuration, and a request. Return a JSON object \
                with exactly two top-level keys: \"options\" (chart type, title, axes, labels, \
                and display settings) and \"series\". For pie and donut charts \"series\" is a \
                flat array of numbers and the slice names go in options.labels; for every \
                other chart type \"series\" is an array of {{\"name\", \"data\"}} objects. \
                Never put \"series\" inside \"options\". {JSON_ONLY}"
            ),
            Self::ChartChat => write!(
                f,
                "You answer questions about a chart and the data behind it. You receive the \
                rows as JSON, the chart configuration if there is one, and a question. Answer \
                in plain text and point out notable trends or outliers when they matter."
            ),
            Self::Dashboard => write!(
                f,
                "You design analytics dashboards. Return a JSON object with \"title\", \
                \"description\", \"layout\": \"grid\", and \"components\": an array where each \
                component has a \"type\" of chart, table, stat, list, filter, or text, a \
                \"gridSize\" from 1 to 12 giving the columns it spans, and a \"config\". Chart \
                configs have \"options\" and \"series\" as siblings. Table configs have \
                \"data\" and \"columns\" of {{\"accessorKey\", \"header\"}}. Stat configs have \
                \"label\" and \"value\". List configs have \"items\". Filter configs have \
                \"field\" and \"options\". Text configs have \"content\". Use the provided data \
                when there is any. {JSON_ONLY}"
            ),
            Self::FileTransform => write!(
                f,
                "You transform tabular data. You receive rows as a JSON array and an \
                instruction. Apply the instruction and return {{\"data\": [...]}} where the \
                array holds the resulting row objects. {JSON_ONLY}"
            ),
        }
    }
}

impl Prompt {
    pub fn to_messages(&self, user_content: impl Into<String>) -> Vec<Message> {
        match self {
            // The second-brain persona is seeded as a user turn answered by
            // the assistant's greeting.
            Self::SecondBrain => vec![
                Message::user(self.to_string()),
                Message::assistant(ASSISTANT_GREETING),
                Message::user(user_content),
            ],
            _ => vec![Message::system(self.to_string()), Message::user(user_content)],
        }
    }

    pub fn to_generation_request(&self, user_content: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(self.to_messages(user_content))
    }
}

pub fn table_message(table: &Value, prompt: &str) -> String {
    format!("Table:\n{table:#}\n\nRequest: {prompt}")
}

pub fn chart_message(data: &Value, config: Option<&Value>, prompt: &str) -> String {
    match config {
        Some(config) => {
            format!("Data:\n{data:#}\n\nCurrent chart configuration:\n{config:#}\n\nRequest: {prompt}")
        }
        None => format!("Data:\n{data:#}\n\nRequest: {prompt}"),
    }
}

pub fn dashboard_message(data: Option<&Value>, prompt: &str) -> String {
    match data {
        Some(data) => format!("Data:\n{data:#}\n\nRequest: {prompt}"),
        None => format!("Request: {prompt}"),
    }
}

pub fn context_message(context: Option<&str>, query: &str) -> String {
    match context.map(str::trim).filter(|context| !context.is_empty()) {
        Some(context) => format!("Context:\n{context}\n\nQuestion: {query}"),
        None => query.to_string(),
    }
}
