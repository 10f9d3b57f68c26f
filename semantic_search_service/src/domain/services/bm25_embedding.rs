use crate::{
    domain::{entities::sparse_embedding::SparseEmbedding, services::stopwords::ENGLISH_STOPWORDS},
    ports::sparse_embedder::{SparseEmbedder, SparseEmbedderError},
};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::{collections::HashMap, io::Cursor};
use tracing::debug;

/// Identifier of the sparse model: vectors produced by this service are compatible
/// with the ones produced by the `Qdrant/bm25` model at ingestion time
pub const BM25_MODEL_NAME: &str = "Qdrant/bm25";

const PUNCTUATION: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;

/// Weighting parameters of the BM25 term frequency component
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Parameters {
    /// Term frequency saturation
    pub k: f64,
    /// Document length normalization
    pub b: f64,
    /// Average document length, in tokens
    pub avg_len: f64,
    /// Longer tokens are ignored
    pub token_max_length: usize,
}

impl Default for Bm25Parameters {
    fn default() -> Self {
        Self {
            k: 1.2,
            b: 0.75,
            avg_len: 256.0,
            token_max_length: 40,
        }
    }
}

/// Generates BM25 sparse vectors from texts
///
/// Each distinct stemmed token becomes one entry of the vector:
/// - its index is the absolute value of the (signed) 32 bits murmur3 hash of the token
/// - its value is the BM25 term frequency component for the token in the text
///
/// The inverse document frequency part is left to the vector store, which knows the whole collection.
pub struct Bm25EmbeddingService {
    parameters: Bm25Parameters,
    stemmer: Stemmer,
}

impl Bm25EmbeddingService {
    pub fn new(parameters: Bm25Parameters) -> Self {
        Self {
            parameters,
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Computes the sparse vector of a single text
    ///
    /// A text without any meaningful token (empty, only stop words, ...) leads to an empty vector.
    #[tracing::instrument(name = "Generate BM25 sparse embedding", skip(self, text))]
    pub fn embed_text(&self, text: &str) -> Result<SparseEmbedding, SparseEmbedderError> {
        let stems = self.stem(tokenize(text));
        debug!(?stems, "Stemmed text");

        let Bm25Parameters { k, b, avg_len, .. } = self.parameters;
        let doc_len = stems.len() as f64;

        // Counts occurrences, keeping the order in which the stems first appear
        let mut occurrences: Vec<(&str, usize)> = vec![];
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for stem in &stems {
            match positions.get(stem.as_str()) {
                Some(position) => occurrences[*position].1 += 1,
                None => {
                    positions.insert(stem.as_str(), occurrences.len());
                    occurrences.push((stem.as_str(), 1));
                }
            }
        }

        let mut indices: Vec<u32> = Vec::with_capacity(occurrences.len());
        let mut values: Vec<f32> = Vec::with_capacity(occurrences.len());
        // Two stems hashed to the same index: the last one wins
        let mut index_positions: HashMap<u32, usize> = HashMap::new();

        for (stem, count) in occurrences {
            let index = token_id(stem)?;
            let tf = count as f64;
            let value = (tf * (k + 1.0) / (tf + k * (1.0 - b + b * doc_len / avg_len))) as f32;

            match index_positions.get(&index) {
                Some(position) => values[*position] = value,
                None => {
                    index_positions.insert(index, indices.len());
                    indices.push(index);
                    values.push(value);
                }
            }
        }

        Ok(SparseEmbedding::try_new(indices, values)?)
    }

    /// Removes punctuation, stop words and too long tokens, then stems the remaining tokens
    fn stem(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|token| !is_punctuation(token))
            .filter(|token| !ENGLISH_STOPWORDS.contains(token.as_str()))
            .filter(|token| token.chars().count() <= self.parameters.token_max_length)
            .map(|token| self.stemmer.stem(&token).into_owned())
            .filter(|stem| !stem.is_empty())
            .collect()
    }
}

impl SparseEmbedder for Bm25EmbeddingService {
    fn model_name(&self) -> &str {
        BM25_MODEL_NAME
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<SparseEmbedding>, SparseEmbedderError> {
        texts.iter().map(|text| self.embed_text(text)).collect()
    }
}

/// Lowercases the text, replaces every non-word character by a space and splits on whitespaces
///
/// Word characters are letters, numbers and `_`. Combining marks are separators, as they are
/// for the tokenizer of the ingestion side.
fn tokenize(text: &str) -> Vec<String> {
    static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}_]").unwrap());
    NON_WORD
        .replace_all(&text.to_lowercase(), " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn is_punctuation(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => PUNCTUATION.contains(c),
        _ => false,
    }
}

/// Index of a token in the sparse vector space
pub fn token_id(token: &str) -> Result<u32, SparseEmbedderError> {
    let hash = murmur3::murmur3_32(&mut Cursor::new(token.as_bytes()), 0).map_err(|source| {
        SparseEmbedderError::TokenHashError {
            token: token.to_string(),
            source,
        }
    })?;

    Ok((hash as i32).unsigned_abs())
}
