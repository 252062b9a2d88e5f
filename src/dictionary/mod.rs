//! Class/attribute dictionary and the schema-resolution context
//!
//! Lowering never talks to storage directly. Everything it needs to know
//! about the schema goes through a [`SchemaContext`]: the class hierarchy,
//! the QName id directory, the tenant mapper, and optionally a node resolver
//! for queries that name rows by reference.

pub mod config;
pub mod directory;
pub mod errors;
pub mod model;
pub mod qname;
pub mod registry;
pub mod resolver;
pub mod tenant;

use std::fmt;

pub use config::DictionaryConfig;
pub use directory::{InMemoryQNameDirectory, QNameDirectory};
pub use errors::DictionaryError;
pub use model::{ClassDefinition, ClassKind, DataTypeKind, PropertyDefinition};
pub use qname::{NamespaceRegistry, QName};
pub use registry::{Dictionary, DictionaryService};
pub use resolver::{find_class, resolve_class, resolve_property, ResolvedClass};
pub use tenant::{SingleTenant, TenantDomainMapper, TenantMapper};

use crate::node::NodeResolver;

/// Local name of the system type marking deleted nodes
pub const DELETED_TYPE_LOCAL_NAME: &str = "deleted";

#[derive(Clone, Copy)]
pub struct SchemaContext<'a> {
    pub dictionary: &'a dyn DictionaryService,
    pub directory: &'a dyn QNameDirectory,
    pub tenant: &'a dyn TenantMapper,
    pub nodes: Option<&'a dyn NodeResolver>,
}

impl<'a> SchemaContext<'a> {
    pub fn new(
        dictionary: &'a dyn DictionaryService,
        directory: &'a dyn QNameDirectory,
        tenant: &'a dyn TenantMapper,
    ) -> Self {
        Self {
            dictionary,
            directory,
            tenant,
            nodes: None,
        }
    }

    pub fn with_nodes(mut self, nodes: &'a dyn NodeResolver) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn deleted_type_id(&self) -> Option<i64> {
        self.directory.id(&QName::system(DELETED_TYPE_LOCAL_NAME))
    }
}

impl fmt::Debug for SchemaContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaContext")
            .field("classes", &self.dictionary.all_classes().len())
            .field("has_node_resolver", &self.nodes.is_some())
            .finish()
    }
}
