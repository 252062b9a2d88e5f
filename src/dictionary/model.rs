use serde::{Deserialize, Serialize};
use std::fmt;

use super::qname::QName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Type,
    Aspect,
}

/// Declared kind of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataTypeKind {
    Text,
    MlText,
    Content,
    Int,
    Long,
    Float,
    Double,
    Date,
    DateTime,
    Boolean,
    QName,
    NodeRef,
    ChildAssocRef,
    AssocRef,
    Path,
    Category,
    Locale,
    Version,
    Period,
    Any,
}

impl fmt::Display for DataTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataTypeKind::Text => "text",
            DataTypeKind::MlText => "mltext",
            DataTypeKind::Content => "content",
            DataTypeKind::Int => "int",
            DataTypeKind::Long => "long",
            DataTypeKind::Float => "float",
            DataTypeKind::Double => "double",
            DataTypeKind::Date => "date",
            DataTypeKind::DateTime => "datetime",
            DataTypeKind::Boolean => "boolean",
            DataTypeKind::QName => "qname",
            DataTypeKind::NodeRef => "noderef",
            DataTypeKind::ChildAssocRef => "childassocref",
            DataTypeKind::AssocRef => "assocref",
            DataTypeKind::Path => "path",
            DataTypeKind::Category => "category",
            DataTypeKind::Locale => "locale",
            DataTypeKind::Version => "version",
            DataTypeKind::Period => "period",
            DataTypeKind::Any => "any",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: QName,
    pub data_type: DataTypeKind,
    #[serde(default)]
    pub multi_valued: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: QName,
    pub kind: ClassKind,
    pub parent: Option<QName>,
    /// Whether rows of this class are returned when querying a super class
    pub include_in_super_type_query: bool,
    pub properties: Vec<PropertyDefinition>,
}

impl ClassDefinition {
    pub fn is_aspect(&self) -> bool {
        self.kind == ClassKind::Aspect
    }
}
