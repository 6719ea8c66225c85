// Diversity filtering: greedy selection that rejects near-duplicates
use serde::{Deserialize, Serialize};

/// Cosine similarity of two vectors.
///
/// Returns `None` when either vector has zero norm or the dimensions
/// differ; the similarity is undefined in both cases.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    Some((dot / denominator) as f32)
}

/// Whether `candidate` may join `selected` without any pair exceeding `threshold`.
///
/// The first candidate is always accepted. An undefined similarity
/// (zero-norm vector, dimension mismatch) counts as 0, i.e. not similar.
pub fn accept(candidate: &[f32], selected: &[Vec<f32>], threshold: f32) -> bool {
    for vector in selected {
        match cosine_similarity(candidate, vector) {
            Some(similarity) if similarity > threshold => return false,
            Some(_) => {}
            None => {
                if candidate.len() != vector.len() {
                    tracing::warn!(
                        candidate_dim = candidate.len(),
                        selected_dim = vector.len(),
                        "dimension mismatch in diversity filter, treating as dissimilar"
                    );
                } else {
                    tracing::debug!("zero-norm embedding in diversity filter, treating as dissimilar");
                }
            }
        }
    }
    true
}

/// Ordered (embedding, content) pairs accepted by the diversity filter.
///
/// Invariants: no two embeddings have cosine similarity above `threshold`,
/// and the set never holds more than `cap` items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteredResultSet {
    embeddings: Vec<Vec<f32>>,
    contents: Vec<String>,
    threshold: f32,
    cap: usize,
}

impl FilteredResultSet {
    pub fn new(threshold: f32, cap: usize) -> Self {
        Self {
            embeddings: Vec::new(),
            contents: Vec::new(),
            threshold,
            cap,
        }
    }

    /// Try to add a candidate; returns whether it was accepted
    pub fn offer(&mut self, embedding: Vec<f32>, content: String) -> bool {
        if self.is_full() || !accept(&embedding, &self.embeddings, self.threshold) {
            return false;
        }
        self.embeddings.push(embedding);
        self.contents.push(content);
        true
    }

    pub fn is_full(&self) -> bool {
        self.contents.len() >= self.cap
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn contents(&self) -> &[String] {
        &self.contents
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }
}
