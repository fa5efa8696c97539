//! Per-session conversation state.
//!
//! History lives in memory only. Turns are kept most recent first; the
//! export renders them oldest first.

pub mod export;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::document::UploadedDocument;
use crate::rag::AnswerSource;

pub use export::export_markdown;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_question: String,
    pub bot_answer: String,
    pub source: AnswerSource,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(user_question: impl Into<String>, bot_answer: impl Into<String>, source: AnswerSource) -> Self {
        Self {
            user_question: user_question.into(),
            bot_answer: bot_answer.into(),
            source,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    document: Option<UploadedDocument>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, turn: ChatTurn) {
        self.turns.insert(0, turn);
    }

    /// Most recent first.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn document(&self) -> Option<&UploadedDocument> {
        self.document.as_ref()
    }

    pub fn set_document(&mut self, document: UploadedDocument) {
        self.document = Some(document);
    }

    pub fn take_document(&mut self) -> Option<UploadedDocument> {
        self.document.take()
    }
}

pub type SharedSession = Arc<Mutex<ChatSession>>;

/// Live sessions keyed by id. Each session has its own lock so a question
/// holds only its own session while it is answered.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .lock()
            .await
            .insert(id, Arc::new(Mutex::new(ChatSession::new())));
        tracing::debug!("Created session {}", id);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.lock().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
