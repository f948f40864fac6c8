//! Query and scan: request compilation and paginated iteration.

mod builder;
mod cursor;
mod transport;

pub use builder::{PreparedSearch, SearchBuilder, SearchCount, Selection};
pub use cursor::SearchIterator;
pub use transport::SearchTransport;
