//! Shared fixtures for the integration tests: a deterministic embedder, a
//! scripted generation model, a query-recording index, and two small
//! courses.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use coursemate::assistant::CourseAssistant;
use coursemate::llm::{
    ContentBlock, GenerationModel, GenerationRequest, LlmError, ModelTurn, StopReason,
};
use coursemate::session::SessionStore;
use coursemate::store::CourseStore;
use coursemate::traits::ToolRegistry;
use coursemate_core::document::parse_course_document;
use coursemate_core::embedding::Embedder;
use coursemate_core::index::memory::InMemoryIndex;
use coursemate_core::index::{IndexHit, IndexRecord, MetadataFilter, VectorIndex};
use serde_json::Value;

pub const MCP_TITLE: &str = "Introduction to MCP";
pub const CHROMA_TITLE: &str = "Advanced Retrieval with Chroma";

pub const MCP_COURSE: &str = "Course Title: Introduction to MCP
Course Link: https://example.com/mcp
Course Instructor: Ada Lovelace

Lesson 2: Transport
Lesson Link: https://example.com/mcp/2
The transport layer carries protocol messages between client and server. Stdio transport and streaming transport are both supported.

Lesson 1: Setup
Lesson Link: https://example.com/mcp/1
Install the server package. Configure the client with the server command.
";

pub const CHROMA_COURSE: &str = "Course Title: Advanced Retrieval with Chroma
Course Link: https://example.com/chroma

Lesson 1: Embeddings
Embeddings map documents to vectors. Query expansion improves recall for short questions.
";

// ─── Embedder ───────────────────────────────────────────────────────

const DIMS: usize = 1024;

/// Bag-of-words embedder: every distinct lowercase token gets its own
/// dimension, so texts sharing words are close and disjoint texts sit at
/// distance 1.
#[derive(Default)]
pub struct VocabularyEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
}

impl VocabularyEmbedder {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut v = vec![0.0f32; DIMS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let next = vocabulary.len();
            let dim = *vocabulary.entry(token.to_lowercase()).or_insert(next);
            v[dim % DIMS] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for VocabularyEmbedder {
    fn model_name(&self) -> &str {
        "vocabulary"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

// ─── Index wrapper ──────────────────────────────────────────────────

/// Delegates to an [`InMemoryIndex`] and remembers which collections were
/// queried.
pub struct RecordingIndex {
    inner: InMemoryIndex,
    queried: Mutex<Vec<String>>,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self {
            inner: InMemoryIndex::new(Arc::new(VocabularyEmbedder::default())),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()> {
        self.inner.upsert(collection, records).await
    }

    async fn query(
        &self,
        collection: &str,
        text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>> {
        self.queried.lock().unwrap().push(collection.to_string());
        self.inner.query(collection, text, k, filter).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<IndexRecord>> {
        self.inner.get(collection, id).await
    }

    async fn ids(&self, collection: &str) -> Result<Vec<String>> {
        self.inner.ids(collection).await
    }
}

/// An index whose reads fail, as when the vector service is unreachable.
pub struct DownIndex;

#[async_trait]
impl VectorIndex for DownIndex {
    async fn upsert(&self, _collection: &str, _records: &[IndexRecord]) -> Result<()> {
        Ok(())
    }

    async fn query(
        &self,
        _collection: &str,
        _text: &str,
        _k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>> {
        anyhow::bail!("index unreachable")
    }

    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<IndexRecord>> {
        anyhow::bail!("index unreachable")
    }

    async fn ids(&self, _collection: &str) -> Result<Vec<String>> {
        anyhow::bail!("index unreachable")
    }
}

pub fn down_store() -> Arc<CourseStore> {
    Arc::new(CourseStore::new(Arc::new(DownIndex), 5))
}

// ─── Generation model ───────────────────────────────────────────────

/// Replays queued turns in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedModel {
    turns: Mutex<VecDeque<ModelTurn>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, turn: ModelTurn) {
        self.turns.lock().unwrap().push_back(turn);
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ModelTurn, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::InvalidRequest("script exhausted".to_string()))
    }
}

/// Searches once with the user's text as both query and course name, then
/// answers. Stateless, so concurrent queries can share it.
pub struct SearchThenAnswerModel;

#[async_trait]
impl GenerationModel for SearchThenAnswerModel {
    fn name(&self) -> &str {
        "search-then-answer"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ModelTurn, LlmError> {
        if request.messages.len() > 1 {
            return Ok(ModelTurn::text_only("done"));
        }
        let question = match request.messages[0].content.first() {
            Some(ContentBlock::Text { text }) => text.clone(),
            _ => String::new(),
        };
        Ok(tool_turn(vec![(
            "call_1",
            "search_course_content",
            serde_json::json!({ "query": question, "course_name": question }),
        )]))
    }
}

/// A turn requesting the given `(id, tool, input)` calls.
pub fn tool_turn(calls: Vec<(&str, &str, Value)>) -> ModelTurn {
    ModelTurn {
        content: calls
            .into_iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            })
            .collect(),
        stop_reason: StopReason::ToolUse,
    }
}

// ─── Builders ───────────────────────────────────────────────────────

pub async fn add_fixture(store: &CourseStore, file_name: &str, content: &str) {
    let parsed = parse_course_document(file_name, content, 800, 100);
    store.add_course(&parsed).await.unwrap();
}

/// A store over a [`RecordingIndex`] with both fixture courses loaded.
pub async fn fixture_store(max_results: usize) -> (Arc<CourseStore>, Arc<RecordingIndex>) {
    let index = Arc::new(RecordingIndex::new());
    let store = Arc::new(CourseStore::new(index.clone(), max_results));
    add_fixture(&store, "mcp.txt", MCP_COURSE).await;
    add_fixture(&store, "chroma.txt", CHROMA_COURSE).await;
    (store, index)
}

pub fn assistant_with(
    model: Arc<dyn GenerationModel>,
    store: Arc<CourseStore>,
    max_history: usize,
    max_tool_rounds: usize,
) -> CourseAssistant {
    CourseAssistant::new(
        model,
        store,
        Arc::new(ToolRegistry::with_builtins()),
        Arc::new(SessionStore::new(max_history)),
        max_tool_rounds,
    )
}
