use common::helper::error_chain_fmt;
use std::collections::BTreeMap;

/// Named vector field holding the dense embeddings of a text
pub const DENSE_VECTOR_NAME: &str = "text-dense";
/// Named vector field holding the sparse (BM25) embeddings of a text
pub const SPARSE_VECTOR_NAME: &str = "text-sparse";

/// Similarity function used to rank dense vectors against a query vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Cosine,
    Euclid,
    Dot,
    Manhattan,
}

impl DistanceMetric {
    /// Parses a distance name, as written in the configuration ("Cosine", "dot", ...)
    pub fn parse(name: &str) -> Result<Self, CollectionSchemaError> {
        match name.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclid" | "euclidean" => Ok(Self::Euclid),
            "dot" => Ok(Self::Dot),
            "manhattan" => Ok(Self::Manhattan),
            other => Err(CollectionSchemaError::UnknownDistance(other.to_string())),
        }
    }
}

/// Configuration of a named vector field
#[derive(Debug, Clone, PartialEq)]
pub enum VectorField {
    /// Fixed length vector, compared with a distance metric
    Dense { size: u64, distance: DistanceMetric },
    /// (index, value) pairs stored in an inverted index
    Sparse { on_disk: bool },
}

/// Vector schema of a collection: its named vector fields
///
/// Fields are kept ordered by name so two schemas built in a different order compare equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSchema {
    fields: BTreeMap<String, VectorField>,
}

impl CollectionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema of the text collections: one dense field and one sparse field
    pub fn text(
        dense_vector_size: u64,
        dense_vector_distance: DistanceMetric,
        sparse_on_disk: bool,
    ) -> Result<Self, CollectionSchemaError> {
        Ok(Self::new()
            .with_dense(DENSE_VECTOR_NAME, dense_vector_size, dense_vector_distance)?
            .with_sparse(SPARSE_VECTOR_NAME, sparse_on_disk))
    }

    pub fn with_dense(
        mut self,
        name: &str,
        size: u64,
        distance: DistanceMetric,
    ) -> Result<Self, CollectionSchemaError> {
        if size == 0 {
            return Err(CollectionSchemaError::InvalidDenseSize(name.to_string()));
        }

        self.fields
            .insert(name.to_string(), VectorField::Dense { size, distance });
        Ok(self)
    }

    pub fn with_sparse(mut self, name: &str, on_disk: bool) -> Self {
        self.fields
            .insert(name.to_string(), VectorField::Sparse { on_disk });
        self
    }

    pub fn field(&self, name: &str) -> Option<&VectorField> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &VectorField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn dense_fields(&self) -> impl Iterator<Item = (&str, u64, DistanceMetric)> {
        self.fields().filter_map(|(name, field)| match field {
            VectorField::Dense { size, distance } => Some((name, *size, *distance)),
            VectorField::Sparse { .. } => None,
        })
    }

    pub fn sparse_fields(&self) -> impl Iterator<Item = (&str, bool)> {
        self.fields().filter_map(|(name, field)| match field {
            VectorField::Sparse { on_disk } => Some((name, *on_disk)),
            VectorField::Dense { .. } => None,
        })
    }
}

#[derive(thiserror::Error)]
pub enum CollectionSchemaError {
    #[error("Unknown distance metric: {0}")]
    UnknownDistance(String),
    #[error("Dense vector field {0} must have a size greater than 0")]
    InvalidDenseSize(String),
}

impl std::fmt::Debug for CollectionSchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
