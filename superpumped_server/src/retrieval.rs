//! Question answering context from stored notes.

use std::sync::Arc;

use superpumped::Message;

use crate::{
    client::Embedder,
    models::prompts::RETRIEVAL_INSTRUCTION,
    stores::{NoteStore, VectorIndex},
};

#[derive(Clone)]
pub struct RetrievalComposer {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorIndex>,
    notes: Arc<dyn NoteStore>,
    top_k: usize,
}

impl RetrievalComposer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorIndex>,
        notes: Arc<dyn NoteStore>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            vectors,
            notes,
            top_k,
        }
    }

    /// Notes nearest to `question`, formatted as a context block.
    ///
    /// Returns `None` when nothing relevant is stored. Failures along the way
    /// are logged and also yield `None` so a question is always answered.
    pub async fn retrieve_context(&self, question: &str) -> Option<String> {
        let embedding = match self.embedder.embed(question).await {
            Ok(embedding) => embedding,
            Err(err) => {
                tracing::warn!(%err, "skipping retrieval, question embedding failed");
                return None;
            }
        };
        let matches = match self.vectors.query(&embedding, self.top_k).await {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(%err, "skipping retrieval, vector query failed");
                return None;
            }
        };

        let mut texts = vec![];
        for m in matches {
            let Ok(note_id) = m.id.parse::<i32>() else {
                tracing::debug!(id = %m.id, "ignoring vector with non-note ID");
                continue;
            };
            match self.notes.get_note(note_id).await {
                Ok(Some(note)) => {
                    tracing::debug!(note_id, score = m.score, "retrieved note");
                    texts.push(note.text);
                }
                Ok(None) => tracing::debug!(note_id, "vector points at a missing note"),
                Err(err) => tracing::warn!(%err, note_id, "failed to fetch note"),
            }
        }
        format_context(&texts)
    }

    pub async fn compose(&self, question: &str) -> Vec<Message> {
        let context = self.retrieve_context(question).await;
        compose_messages(question, context)
    }
}

pub fn format_context(texts: &[String]) -> Option<String> {
    if texts.is_empty() {
        return None;
    }
    let lines: Vec<String> = texts.iter().map(|text| format!("- {text}")).collect();
    Some(format!("Context:\n{}", lines.join("\n")))
}

pub fn compose_messages(question: &str, context: Option<String>) -> Vec<Message> {
    let mut messages = vec![];
    if let Some(context) = context {
        messages.push(Message::system(context));
    }
    messages.push(Message::system(RETRIEVAL_INSTRUCTION));
    messages.push(Message::user(question));
    messages
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use superpumped::MessageRole;

    use super::*;
    use crate::{
        models::{client::ModelClientError, vectors::VectorRecord},
        stores::MemoryStore,
    };

    /// Embeds text as counts of the letters a, e, and s.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelClientError> {
            let count = |c: char| text.chars().filter(|x| *x == c).count() as f32;
            Ok(vec![count('a'), count('e'), count('s')])
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _: &str) -> Result<Vec<f32>, ModelClientError> {
            Err(ModelClientError::EmptyEmbedding {
                url: "http://localhost/embeddings".to_string(),
            })
        }
    }

    fn composer(embedder: Arc<dyn Embedder>, store: &MemoryStore) -> RetrievalComposer {
        let store = Arc::new(store.clone());
        RetrievalComposer::new(embedder, store.clone(), store, 1)
    }

    #[tokio::test]
    async fn empty_index_yields_only_instruction_and_question() {
        let store = MemoryStore::new();
        let messages = composer(Arc::new(LetterEmbedder), &store)
            .compose("what is sqrt of 9")
            .await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, RETRIEVAL_INSTRUCTION);
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[1].content, "what is sqrt of 9");
    }

    #[tokio::test]
    async fn nearest_note_becomes_context() {
        let store = MemoryStore::new();
        let aaa = store.insert_note("aaa").await.unwrap();
        let sss = store.insert_note("sss").await.unwrap();
        let embedder = LetterEmbedder;
        for note in [&aaa, &sss] {
            store
                .upsert(vec![VectorRecord {
                    id: note.id.to_string(),
                    values: embedder.embed(&note.text).await.unwrap(),
                }])
                .await
                .unwrap();
        }

        let context = composer(Arc::new(LetterEmbedder), &store)
            .retrieve_context("ssss?")
            .await;
        assert_eq!(context.as_deref(), Some("Context:\n- sss"));
    }

    #[tokio::test]
    async fn dangling_and_foreign_ids_are_skipped() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                VectorRecord {
                    id: "42".to_string(),
                    values: vec![1.0, 0.0, 0.0],
                },
                VectorRecord {
                    id: "not-a-note".to_string(),
                    values: vec![1.0, 0.0, 0.0],
                },
            ])
            .await
            .unwrap();
        let store = Arc::new(store);
        let composer = RetrievalComposer::new(Arc::new(LetterEmbedder), store.clone(), store, 2);
        assert_eq!(composer.retrieve_context("a").await, None);
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_no_context() {
        let store = MemoryStore::new();
        let messages = composer(Arc::new(BrokenEmbedder), &store)
            .compose("anything")
            .await;
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn context_is_a_leading_system_message() {
        let messages = compose_messages("q", format_context(&["a".to_string(), "b".to_string()]));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "Context:\n- a\n- b");
        assert_eq!(messages[0].role, MessageRole::System);
    }
}
