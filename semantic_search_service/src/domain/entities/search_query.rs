use common::helper::error_chain_fmt;

/// A validated search request coming from a client
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    text: String,
    limit: u64,
}

impl SearchQuery {
    /// Checks the query text is not blank and the limit is between 0 and `max_limit`
    ///
    /// A limit of 0 is valid: it leads to an empty result.
    pub fn parse(text: &str, limit: i64, max_limit: u64) -> Result<SearchQuery, SearchQueryError> {
        let limit = u64::try_from(limit).map_err(|_| SearchQueryError::NegativeLimit(limit))?;
        Self::new(text, limit, max_limit)
    }

    /// Same as `parse`, for a limit that can't be negative
    pub fn new(text: &str, limit: u64, max_limit: u64) -> Result<SearchQuery, SearchQueryError> {
        if text.trim().is_empty() {
            return Err(SearchQueryError::EmptyQuery);
        }

        if limit > max_limit {
            return Err(SearchQueryError::LimitTooLarge { limit, max_limit });
        }

        Ok(Self {
            text: text.to_string(),
            limit,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

#[derive(thiserror::Error)]
pub enum SearchQueryError {
    #[error("The query must not be empty")]
    EmptyQuery,
    #[error("The limit must be positive, got {0}")]
    NegativeLimit(i64),
    #[error("The limit must be at most {max_limit}, got {limit}")]
    LimitTooLarge { limit: u64, max_limit: u64 },
}

impl std::fmt::Debug for SearchQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
