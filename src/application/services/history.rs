use crate::application::ports::embedding_provider::EmbeddingProvider;
use crate::domain::entities::ConversationTurn;

/// Options for trimming a conversation down to the turns worth keeping for
/// question contextualization.
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    /// Maximum conversation turns to include; a turn is one question plus
    /// one answer.
    pub max_turns: usize,
    pub use_semantic_search: bool,
    /// Weight of recency vs. embedding similarity in semantic mode.
    pub recency_weight: f32,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            max_turns: 3,
            use_semantic_search: false,
            recency_weight: 0.7,
        }
    }
}

/// Reduce a full history to a bounded, relevant subset, preserving the
/// original order. Falls back to plain recency slicing if the semantic
/// path cannot embed.
pub async fn relevant_history(
    embedder: &dyn EmbeddingProvider,
    history: &[ConversationTurn],
    current_query: &str,
    options: &HistoryOptions,
) -> Vec<ConversationTurn> {
    if history.len() <= 2 {
        return history.to_vec();
    }

    if !options.use_semantic_search {
        return recency_slice(history, options.max_turns);
    }

    match semantic_selection(embedder, history, current_query, options).await {
        Ok(selected) => selected,
        Err(err) => {
            tracing::warn!("Semantic history selection failed, using recency: {}", err);
            recency_slice(history, options.max_turns)
        }
    }
}

fn recency_slice(history: &[ConversationTurn], max_turns: usize) -> Vec<ConversationTurn> {
    let max_messages = max_turns * 2;
    let start = history.len().saturating_sub(max_messages);
    history[start..].to_vec()
}

async fn semantic_selection(
    embedder: &dyn EmbeddingProvider,
    history: &[ConversationTurn],
    current_query: &str,
    options: &HistoryOptions,
) -> Result<Vec<ConversationTurn>, String> {
    let query_embedding = embedder
        .embed_query(current_query)
        .await
        .map_err(|e| e.to_string())?;

    // Only user questions are embedded; answers ride along with their
    // question.
    let mut scored: Vec<(usize, f32)> = Vec::new();
    for (index, turn) in history.iter().enumerate() {
        if !turn.is_user() {
            continue;
        }
        let turn_embedding = embedder
            .embed_query(turn.content())
            .await
            .map_err(|e| e.to_string())?;
        let similarity = cosine_similarity(&query_embedding, &turn_embedding)?;
        let recency = index as f32 / history.len() as f32;
        let combined =
            similarity * (1.0 - options.recency_weight) + recency * options.recency_weight;
        scored.push((index, combined));
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut selected_indices = std::collections::BTreeSet::new();
    for (index, _) in scored.iter().take(options.max_turns) {
        selected_indices.insert(*index);
        if index + 1 < history.len() {
            selected_indices.insert(index + 1);
        }
    }

    // The most recent turn is always kept, whatever its score.
    if history.len() >= 2 {
        selected_indices.insert(history.len() - 2);
        selected_indices.insert(history.len() - 1);
    }

    Ok(selected_indices
        .into_iter()
        .map(|index| history[index].clone())
        .collect())
}

/// Cosine similarity of two vectors. Mismatched lengths are a fatal
/// precondition violation, never silently padded.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, String> {
    if a.len() != b.len() {
        return Err(format!(
            "Vectors must have the same dimensions: {} vs {}",
            a.len(),
            b.len()
        ));
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::embedding_provider::EmbeddingProviderError;
    use async_trait::async_trait;

    struct FixedEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
            if self.fail {
                return Err(EmbeddingProviderError::ServiceUnavailable);
            }
            // Deterministic toy embedding: bucket by first byte.
            let first = text.bytes().next().unwrap_or(0) as f32;
            Ok(vec![first, 1.0, 0.0])
        }

        async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
            self.embed_query(text).await
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn turns(count: usize) -> Vec<ConversationTurn> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("question {}", i / 2))
                } else {
                    ConversationTurn::assistant(format!("answer {}", i / 2), None)
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_short_history_returned_unmodified() {
        let embedder = FixedEmbedder { fail: false };
        for len in 0..=2 {
            let history = turns(len);
            let selected =
                relevant_history(&embedder, &history, "q", &HistoryOptions::default()).await;
            assert_eq!(selected, history);
        }
    }

    #[tokio::test]
    async fn test_recency_mode_returns_last_six() {
        let embedder = FixedEmbedder { fail: false };
        let history = turns(10);
        let selected =
            relevant_history(&embedder, &history, "q", &HistoryOptions::default()).await;

        assert_eq!(selected.len(), 6);
        assert_eq!(selected, history[4..].to_vec());
    }

    #[tokio::test]
    async fn test_recency_mode_shorter_history() {
        let embedder = FixedEmbedder { fail: false };
        let history = turns(4);
        let selected =
            relevant_history(&embedder, &history, "q", &HistoryOptions::default()).await;
        assert_eq!(selected, history);
    }

    #[tokio::test]
    async fn test_semantic_mode_keeps_most_recent_turn() {
        let embedder = FixedEmbedder { fail: false };
        let history = turns(12);
        let options = HistoryOptions {
            max_turns: 2,
            use_semantic_search: true,
            recency_weight: 0.7,
        };
        let selected = relevant_history(&embedder, &history, "question 0", &options).await;

        // Order preserved and the last turn always present.
        assert!(selected.windows(2).all(|pair| {
            let a = history.iter().position(|t| t == &pair[0]).unwrap();
            let b = history.iter().position(|t| t == &pair[1]).unwrap();
            a < b
        }));
        assert!(selected.contains(&history[10]));
        assert!(selected.contains(&history[11]));
    }

    #[tokio::test]
    async fn test_semantic_mode_falls_back_on_embedding_failure() {
        let embedder = FixedEmbedder { fail: true };
        let history = turns(10);
        let options = HistoryOptions {
            max_turns: 3,
            use_semantic_search: true,
            recency_weight: 0.7,
        };
        let selected = relevant_history(&embedder, &history, "q", &options).await;
        assert_eq!(selected, history[4..].to_vec());
    }

    #[test]
    fn test_cosine_self_similarity_is_one() {
        let v = vec![0.3, -0.7, 0.2, 1.5];
        let similarity = cosine_similarity(&v, &v).unwrap();
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-2.0, 0.5, 1.0];
        assert_eq!(
            cosine_similarity(&a, &b).unwrap(),
            cosine_similarity(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_cosine_rejects_mismatched_lengths() {
        assert!(cosine_similarity(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }
}
