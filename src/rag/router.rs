//! Chooses the answering strategy for each question and records the turn.
//!
//! Precedence: summary of the uploaded document, then corpus retrieval
//! (unless open-domain mode is on), then the generator with the raw question.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::retriever::{CorpusAnswer, Retriever};
use crate::core::errors::RagError;
use crate::history::{ChatSession, ChatTurn};
use crate::llm::Generator;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub open_domain_mode: bool,
    #[serde(default)]
    pub summary_mode: bool,
}

impl QuestionRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Summary,
    Corpus,
    OpenDomain,
    Error,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Summary => "summary",
            AnswerSource::Corpus => "corpus",
            AnswerSource::OpenDomain => "open_domain",
            AnswerSource::Error => "error",
        }
    }
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct AnswerRouter {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
}

impl AnswerRouter {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Produces exactly one answer and records it at the front of the
    /// session history. Generation failures become an `Error:` answer.
    pub async fn answer(&self, session: &mut ChatSession, request: &QuestionRequest) -> ChatTurn {
        let (text, source) = match self.route(session, request).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Failed to answer question: {}", e);
                (format!("Error: {}", e), AnswerSource::Error)
            }
        };

        let turn = ChatTurn::new(request.question.clone(), text, source);
        session.record(turn.clone());
        turn
    }

    async fn route(
        &self,
        session: &ChatSession,
        request: &QuestionRequest,
    ) -> Result<(String, AnswerSource), RagError> {
        if request.summary_mode {
            if let Some(document) = session.document() {
                tracing::info!("Summarizing uploaded document '{}'", document.name);
                let summary = self.summarize(&document.text).await?;
                return Ok((summary, AnswerSource::Summary));
            }
        }

        if !request.open_domain_mode {
            match self.retriever.answer_from_corpus(&request.question).await {
                Ok(CorpusAnswer::Answered(text)) => return Ok((text, AnswerSource::Corpus)),
                Ok(CorpusAnswer::NotFound) => {}
                Err(e @ (RagError::IndexUnavailable(_) | RagError::ModelUnavailable(_))) => {
                    tracing::warn!("Corpus retrieval unavailable, answering open-domain: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        let text = self.generator.generate(&request.question).await?;
        Ok((text, AnswerSource::OpenDomain))
    }

    pub async fn summarize(&self, text: &str) -> Result<String, RagError> {
        let max_chars = self.retriever.config().summary_max_chars;
        self.generator.generate(&summary_prompt(text, max_chars)).await
    }
}

pub fn summary_prompt(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    format!(
        "Summarize the following document clearly in bullet points:\n\n{}",
        truncated
    )
}
