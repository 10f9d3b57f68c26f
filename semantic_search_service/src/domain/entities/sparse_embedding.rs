use common::helper::error_chain_fmt;
use std::collections::HashSet;

/// Sparse vector: only the non-zero entries are kept, as (index, value) pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseEmbedding {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseEmbedding {
    /// Fails if `indices` and `values` do not have the same length, or if an index is repeated
    pub fn try_new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self, SparseEmbeddingError> {
        if indices.len() != values.len() {
            return Err(SparseEmbeddingError::LengthMismatch {
                indices: indices.len(),
                values: values.len(),
            });
        }

        let mut seen = HashSet::with_capacity(indices.len());
        if let Some(index) = indices.iter().find(|index| !seen.insert(**index)) {
            return Err(SparseEmbeddingError::DuplicatedIndex(*index));
        }

        Ok(Self { indices, values })
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Value stored at `index`, if any
    pub fn get(&self, index: u32) -> Option<f32> {
        self.indices
            .iter()
            .position(|i| *i == index)
            .map(|position| self.values[position])
    }

    /// Dot product between two sparse vectors
    pub fn dot(&self, other: &SparseEmbedding) -> f32 {
        self.indices
            .iter()
            .zip(&self.values)
            .filter_map(|(index, value)| other.get(*index).map(|v| v * value))
            .sum()
    }

    pub fn into_parts(self) -> (Vec<u32>, Vec<f32>) {
        (self.indices, self.values)
    }
}

#[derive(thiserror::Error)]
pub enum SparseEmbeddingError {
    #[error("Sparse vector has {indices} indices but {values} values")]
    LengthMismatch { indices: usize, values: usize },
    #[error("Sparse vector index {0} is repeated")]
    DuplicatedIndex(u32),
}

impl std::fmt::Debug for SparseEmbeddingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
