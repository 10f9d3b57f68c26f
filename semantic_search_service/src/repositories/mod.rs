pub mod qdrant_vector_store;
