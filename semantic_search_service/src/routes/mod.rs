pub mod health_check;
pub mod query_text;
pub mod root;
pub mod search_error;
pub mod semantic_search;

pub use health_check::*;
pub use query_text::*;
pub use root::*;
pub use search_error::*;
pub use semantic_search::*;
