pub mod node_ref;
pub mod resolver;

pub use node_ref::{NodeRef, NodeRefError, StoreRef};
pub use resolver::{InMemoryNodeResolver, NodeResolver, ResolveError};
