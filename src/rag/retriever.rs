//! Corpus-grounded answering: embed the question, fetch the nearest chunks,
//! and ask the generator to answer from that context only.

use std::sync::Arc;

use serde::Serialize;

use super::resources::ResourceCache;
use crate::core::config::RetrievalConfig;
use crate::core::errors::RagError;
use crate::llm::Generator;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub position: usize,
    pub distance: f32,
    pub document_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
    /// Chunk texts in rank order, each followed by a newline.
    pub context: String,
}

/// Outcome of a corpus lookup. `NotFound` means the context was too thin to
/// ground an answer; callers fall back to open-domain answering.
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusAnswer {
    Answered(String),
    NotFound,
}

pub struct Retriever {
    resources: Arc<ResourceCache>,
    generator: Arc<dyn Generator>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        resources: Arc<ResourceCache>,
        generator: Arc<dyn Generator>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            resources,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult, RagError> {
        let corpus = self.resources.corpus().await?;
        let embedder = self.resources.embedder().await?;

        let query = embedder.embed_one(question).await?;
        let neighbors = corpus.index().search(&query, self.config.top_k)?;

        let chunks: Vec<RetrievedChunk> = neighbors
            .into_iter()
            .filter_map(|n| {
                corpus.store().get(n.position).map(|chunk| RetrievedChunk {
                    position: n.position,
                    distance: n.distance,
                    document_id: chunk.document_id.clone(),
                    text: chunk.text.clone(),
                })
            })
            .collect();

        let context = assemble_context(chunks.iter().map(|c| c.text.as_str()));
        tracing::debug!(
            "Retrieved {} chunks ({} context chars)",
            chunks.len(),
            context.chars().count()
        );

        Ok(RetrievalResult { chunks, context })
    }

    pub async fn answer_from_corpus(&self, question: &str) -> Result<CorpusAnswer, RagError> {
        let retrieval = self.retrieve(question).await?;

        if !is_context_sufficient(&retrieval.context, self.config.min_context_chars) {
            tracing::info!("Context below {} chars, no corpus answer", self.config.min_context_chars);
            return Ok(CorpusAnswer::NotFound);
        }

        let prompt = grounding_prompt(&retrieval.context, question);
        let answer = self.generator.generate(&prompt).await?;
        Ok(CorpusAnswer::Answered(answer))
    }
}

pub fn assemble_context<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    let mut context = String::new();
    for text in texts {
        context.push_str(text);
        context.push('\n');
    }
    context
}

pub fn is_context_sufficient(context: &str, min_chars: usize) -> bool {
    context.trim().chars().count() >= min_chars
}

pub fn grounding_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer using ONLY the context below.\n\
         If not found, say: Information not available in documents.\n\n\
         Context:\n{}\n\n\
         Question:\n{}",
        context, question
    )
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedGenerator;
    use super::*;
    use crate::document::SourceDocument;
    use crate::embedding::{Embedder, HashingEmbedder};
    use crate::rag::chunker::Chunker;
    use crate::rag::ingest::Ingestor;

    async fn cache_with(texts: &[&str]) -> (tempfile::TempDir, Arc<ResourceCache>) {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(128).unwrap());
        let documents: Vec<SourceDocument> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| SourceDocument {
                id: format!("doc{}.txt", i),
                text: text.to_string(),
            })
            .collect();
        Ingestor::new(Chunker::default(), embedder.clone())
            .build(&documents)
            .await
            .unwrap()
            .save(&index_dir)
            .unwrap();
        (dir, Arc::new(ResourceCache::with_embedder(embedder, index_dir)))
    }

    #[test]
    fn sufficiency_boundary_is_inclusive() {
        assert!(!is_context_sufficient(&"a".repeat(49), 50));
        assert!(is_context_sufficient(&"a".repeat(50), 50));
        assert!(!is_context_sufficient("", 50));
        assert!(is_context_sufficient(&"x".repeat(60), 50));
        assert!(!is_context_sufficient(&format!("  {}\n\n", "a".repeat(49)), 50));
    }

    #[test]
    fn context_joins_texts_with_trailing_newlines() {
        assert_eq!(assemble_context(["first", "second"]), "first\nsecond\n");
        assert_eq!(assemble_context(Vec::<&str>::new()), "");
    }

    #[test]
    fn grounding_prompt_layout() {
        let prompt = grounding_prompt("ctx\n", "Why?");
        assert_eq!(
            prompt,
            "Answer using ONLY the context below.\nIf not found, say: Information not available in documents.\n\nContext:\nctx\n\n\nQuestion:\nWhy?"
        );
    }

    #[tokio::test]
    async fn library_hours_are_answered_from_context() {
        let (_dir, cache) = cache_with(&[
            "The library opens at 8 AM and closes at 10 PM on weekdays. Weekend hours are shorter.",
            "Parking permits are issued by the campus security office near the north gate.",
        ])
        .await;
        let generator = Arc::new(ScriptedGenerator::new(|prompt| {
            let line = prompt
                .lines()
                .find(|l| l.contains("8 AM"))
                .unwrap_or("Information not available in documents.");
            Ok(format!("According to the documents: {}", line))
        }));
        let retriever = Retriever::new(cache, generator.clone(), RetrievalConfig::default());

        let answer = retriever
            .answer_from_corpus("What time does the library open?")
            .await
            .unwrap();

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("The library opens at 8 AM"));
        assert!(prompts[0].ends_with("Question:\nWhat time does the library open?"));
        match answer {
            CorpusAnswer::Answered(text) => assert!(text.contains("8 AM")),
            CorpusAnswer::NotFound => panic!("expected a corpus answer"),
        }
    }

    #[tokio::test]
    async fn thin_context_is_not_found_without_generation() {
        let (_dir, cache) = cache_with(&["Short note."]).await;
        let generator = Arc::new(ScriptedGenerator::canned("unused"));
        let retriever = Retriever::new(cache, generator.clone(), RetrievalConfig::default());

        let answer = retriever.answer_from_corpus("anything").await.unwrap();
        assert_eq!(answer, CorpusAnswer::NotFound);
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn retrieve_returns_at_most_top_k_in_rank_order() {
        let (_dir, cache) = cache_with(&[
            "Alpha chunk about library hours and opening times for students.",
            "Beta chunk about cafeteria menus and lunch specials on campus.",
            "Gamma chunk about sports facilities and gym membership fees.",
            "Delta chunk about exam schedules and grading policies.",
        ])
        .await;
        let config = RetrievalConfig {
            top_k: 2,
            ..RetrievalConfig::default()
        };
        let retriever = Retriever::new(cache, Arc::new(ScriptedGenerator::canned("")), config);

        let result = retriever.retrieve("library opening hours").await.unwrap();
        assert_eq!(result.chunks.len(), 2);
        assert!(result.chunks[0].distance <= result.chunks[1].distance);
        assert_eq!(
            result.context,
            format!("{}\n{}\n", result.chunks[0].text, result.chunks[1].text)
        );
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let (_dir, cache) = cache_with(&[&"The registrar office handles transcripts. ".repeat(3)]).await;
        let retriever = Retriever::new(
            cache,
            Arc::new(ScriptedGenerator::failing("quota exceeded")),
            RetrievalConfig::default(),
        );

        assert!(matches!(
            retriever.answer_from_corpus("transcripts").await,
            Err(RagError::GenerationFailure(_))
        ));
    }
}
