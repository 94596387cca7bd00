//! Feed fetching, parsing, and candidate selection.
//!
//! This module turns a catalog [`Source`](crate::models::Source) into zero
//! or more [`CandidateItem`](crate::models::CandidateItem)s in two phases:
//!
//! 1. **Fetching**: download the source's RSS/Atom document with a bounded
//!    timeout ([`resolver::HttpFeedFetcher`])
//! 2. **Selection**: pick one entry by the selection policy, applying the
//!    recency and language gates ([`resolver::select_candidate`])
//!
//! Entries are converted to the crate's own [`FeedEntry`] shape immediately
//! after parsing; nothing downstream touches the XML layer.

pub mod parser;
pub mod resolver;

pub use parser::FeedEntry;
pub use resolver::{FeedDocument, FetchError, FetchFeed, HttpFeedFetcher, SelectionMode};
