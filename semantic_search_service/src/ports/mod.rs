pub mod sparse_embedder;
pub mod vector_store;
