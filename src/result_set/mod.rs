//! Result cursor over the row ids returned by the relational executor

pub mod cursor;
pub mod errors;
pub mod limit;
pub mod row;

pub use cursor::{NodeRefs, ResultCursor, ResultMetadata};
pub use errors::ResultSetError;
pub use limit::{classify, LimitBy, LimitClassification, ResultOptions};
pub use row::ResultRow;
