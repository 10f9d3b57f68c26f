pub mod bm25_embedding;
mod stopwords;
