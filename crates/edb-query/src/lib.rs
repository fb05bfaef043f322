//! Query engine for the Engineering Database.
//!
//! Queries are AND-combined `key -> value` predicates. Object queries match
//! against entries with type-aware coercion; commit queries match against
//! commit metadata, where `timestamp` means "committed at or before".
//! String queries (`name:foo and kind:"two words"`) parse into the same
//! [`Predicates`].

pub mod engine;
pub mod error;
pub mod parser;
pub mod predicate;

pub use engine::{
    last_matching_commit, matching_commits, query, query_by_key_value,
    revisions_of_matching_commits, CommitQuery,
};
pub use error::{QueryError, QueryResult};
pub use parser::parse_query;
pub use predicate::{Predicates, TIMESTAMP_KEY};
