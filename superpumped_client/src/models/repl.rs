use superpumped::{AiChatRequest, NewNoteRequest};

pub enum UserRequest {
    Prompt(String),
    Cancel,
}

/// What a line of user input asks for.
#[derive(Debug, PartialEq)]
pub enum Command {
    /// Free-form chat with the recent conversation as context.
    Chat(String),
    /// `/note <text>` stores a note.
    Note(String),
    /// `/ask <question>` answers from stored notes.
    Ask(String),
}

impl Command {
    /// Returns `None` for blank input and commands without an argument.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let argument = |prefix: &str| {
            input
                .strip_prefix(prefix)
                .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
                .map(str::trim)
        };
        if let Some(text) = argument("/note") {
            return (!text.is_empty()).then(|| Self::Note(text.to_string()));
        }
        if let Some(question) = argument("/ask") {
            return (!question.is_empty()).then(|| Self::Ask(question.to_string()));
        }
        Some(Self::Chat(input.to_string()))
    }
}

pub enum ServerRequest {
    Chat(AiChatRequest),
    Note(NewNoteRequest),
    Ask(String),
    Cancel,
}

pub enum ServerResponse {
    Chunk(String),
    Done,
    Cancelled,
    Error(String),
}

/// Turns a byte stream into text without splitting multi-byte characters
/// that straddle chunk boundaries.
#[derive(Default)]
pub struct Utf8Buffer {
    pending: Vec<u8>,
}

impl Utf8Buffer {
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // Invalid bytes in the middle are replaced rather than held.
            Err(err) if err.error_len().is_some() => self.pending.len(),
            Err(err) => err.valid_up_to(),
        };
        let rest = self.pending.split_off(valid_up_to);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_commands() {
        assert_eq!(Command::parse("  "), None);
        assert_eq!(
            Command::parse("hello"),
            Some(Command::Chat("hello".to_string()))
        );
        assert_eq!(
            Command::parse("/note my car takes 0W-20 oil "),
            Some(Command::Note("my car takes 0W-20 oil".to_string()))
        );
        assert_eq!(
            Command::parse("/ask what oil?"),
            Some(Command::Ask("what oil?".to_string()))
        );
        assert_eq!(Command::parse("/note"), None);
        assert_eq!(
            Command::parse("/notebook"),
            Some(Command::Chat("/notebook".to_string()))
        );
    }

    #[test]
    fn split_characters_wait_for_their_remaining_bytes() {
        let mut buffer = Utf8Buffer::default();
        let bytes = "héllo".as_bytes();
        assert_eq!(buffer.push(&bytes[..2]), "h");
        assert_eq!(buffer.push(&bytes[2..]), "éllo");
    }
}
