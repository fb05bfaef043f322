/// Errors produced while building queries.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A string query does not follow `key:value (and key:value)*`.
    #[error("malformed query {query:?} at byte {position}: {reason}")]
    Malformed {
        query: String,
        position: usize,
        reason: String,
    },
}

pub type QueryResult<T> = Result<T, QueryError>;
