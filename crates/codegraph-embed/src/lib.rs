//! Embedding service (C6). Loads a sentence-embedding model lazily on
//! first use and composes a short multi-line text block per node kind
//! before encoding it. Every failure mode — model error, empty input,
//! wrong output shape — collapses to the same zero-vector sentinel so
//! callers have one check to make rather than matching on error kinds.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;
use tokio::sync::OnceCell;

/// Fixed output dimension (§4.6); also the zero-vector sentinel's length.
pub const EMBEDDING_DIM: usize = 384;

pub struct EmbeddingService {
    model: OnceCell<Mutex<TextEmbedding>>,
}

impl EmbeddingService {
    pub fn new() -> Self {
        Self { model: OnceCell::new() }
    }

    async fn model(&self) -> anyhow::Result<&Mutex<TextEmbedding>> {
        self.model
            .get_or_try_init(|| async {
                tracing::info!("loading embedding model");
                let model = TextEmbedding::try_new(
                    InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
                )?;
                Ok::<_, anyhow::Error>(Mutex::new(model))
            })
            .await
    }

    /// Encodes `text`; any failure or malformed output yields the
    /// zero-vector sentinel rather than propagating an error (§4.6).
    pub async fn embed_text(&self, text: &str) -> Vec<f32> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return zero_vector();
        }

        let model = match self.model().await {
            Ok(model) => model,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load embedding model");
                return zero_vector();
            }
        };

        let embedded = {
            let mut model = model.lock().unwrap();
            model.embed(vec![trimmed.to_string()], None)
        };

        match embedded {
            Ok(mut vectors) if !vectors.is_empty() => {
                let vector = vectors.remove(0);
                if is_valid(&vector) {
                    vector
                } else {
                    zero_vector()
                }
            }
            Ok(_) => zero_vector(),
            Err(err) => {
                tracing::warn!(error = %err, "embedding model returned an error");
                zero_vector()
            }
        }
    }

    pub async fn embed_function(&self, name: &str, signature: Option<&str>, docstring: Option<&str>) -> Vec<f32> {
        self.embed_text(&compose_function(name, signature, docstring)).await
    }

    pub async fn embed_class(&self, name: &str, methods: &[String]) -> Vec<f32> {
        self.embed_text(&compose_class(name, methods)).await
    }

    pub async fn embed_struct(&self, name: &str, fields: &[String]) -> Vec<f32> {
        self.embed_text(&compose_struct(name, fields)).await
    }

    pub async fn embed_query(&self, text: &str) -> Vec<f32> {
        self.embed_text(text.trim()).await
    }
}

impl Default for EmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

fn compose_function(name: &str, signature: Option<&str>, docstring: Option<&str>) -> String {
    let mut lines = vec![name.to_string()];
    if let Some(sig) = signature {
        lines.push(sig.to_string());
    }
    if let Some(doc) = docstring {
        lines.push(doc.to_string());
    }
    lines.join("\n")
}

fn compose_class(name: &str, methods: &[String]) -> String {
    let mut lines = vec![name.to_string()];
    if !methods.is_empty() {
        lines.push(format!("Methods: {}", methods.join(", ")));
    }
    lines.join("\n")
}

fn compose_struct(name: &str, fields: &[String]) -> String {
    let mut lines = vec![name.to_string()];
    if !fields.is_empty() {
        lines.push(format!("Fields: {}", fields.join(", ")));
    }
    lines.join("\n")
}

fn is_valid(vector: &[f32]) -> bool {
    vector.len() == EMBEDDING_DIM && vector.iter().all(|f| f.is_finite())
}

fn zero_vector() -> Vec<f32> {
    vec![0.0; EMBEDDING_DIM]
}

/// Callers use this to decide whether to suppress storing the embedding
/// field entirely, per §4.6.
pub fn is_zero_vector(vector: &[f32]) -> bool {
    vector.iter().all(|f| *f == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_function_includes_only_present_fields() {
        let text = compose_function("validate_email", Some("validate_email(address) -> bool"), None);
        assert_eq!(text, "validate_email\nvalidate_email(address) -> bool");
    }

    #[test]
    fn compose_class_omits_methods_line_when_empty() {
        let text = compose_class("Widget", &[]);
        assert_eq!(text, "Widget");
    }

    #[test]
    fn zero_vector_has_the_fixed_dimension_and_is_detected_as_zero() {
        let v = zero_vector();
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!(is_zero_vector(&v));
    }

    #[tokio::test]
    async fn empty_text_short_circuits_to_zero_vector_without_loading_a_model() {
        let service = EmbeddingService::new();
        let v = service.embed_text("   ").await;
        assert!(is_zero_vector(&v));
        assert!(!service.model.initialized());
    }
}
