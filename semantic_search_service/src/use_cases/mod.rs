pub mod ensure_collection;
pub mod semantic_search;
