pub mod filter;
pub mod search_query;
pub mod sql;
