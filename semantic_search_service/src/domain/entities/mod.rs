pub mod collection_schema;
pub mod search_hit;
pub mod search_query;
pub mod sparse_embedding;
