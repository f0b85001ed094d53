use std::sync::Arc;

use crate::{
    client::{Embedder, ModelClient},
    ingest::NoteIngestor,
    models::config::ServerConfig,
    retrieval::RetrievalComposer,
    stores::{IngestionStore, MemoryStore, NoteStore, PgStore, VectorIndex},
};

#[derive(Clone)]
pub struct SuperpumpedState {
    pub server_config: ServerConfig,
    pub model_client: ModelClient,
    pub notes: Arc<dyn NoteStore>,
    pub vectors: Arc<dyn VectorIndex>,
    pub ingestions: Arc<dyn IngestionStore>,
}

impl SuperpumpedState {
    pub fn with_postgres(
        server_config: ServerConfig,
        model_client: ModelClient,
        store: PgStore,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            server_config,
            model_client,
            notes: store.clone(),
            vectors: store.clone(),
            ingestions: store,
        }
    }

    pub fn with_memory(server_config: ServerConfig, model_client: ModelClient) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            server_config,
            model_client,
            notes: store.clone(),
            vectors: store.clone(),
            ingestions: store,
        }
    }

    pub fn retrieval(&self) -> RetrievalComposer {
        RetrievalComposer::new(
            self.embedder(),
            self.vectors.clone(),
            self.notes.clone(),
            self.server_config.top_k,
        )
    }

    pub fn ingestor(&self) -> NoteIngestor {
        NoteIngestor::new(
            self.embedder(),
            self.notes.clone(),
            self.vectors.clone(),
            self.ingestions.clone(),
        )
    }

    fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::new(self.model_client.clone())
    }
}
