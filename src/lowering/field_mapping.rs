//! Field Mapping Table
//!
//! Where an attribute physically lives in the EAV schema: which value column
//! and which kind of join reaches it.
//!
//! | declared kind | column | join |
//! |---|---|---|
//! | text-like (text, mltext, date, datetime, locale, period, qname, node/assoc refs, category) | `string_value` | property |
//! | int, long | `long_value` | property |
//! | cm:created / creator / modified / modifier | `audit_*` | none (node row) |
//! | `<content>.size` | `content_size` | content size |
//! | `<content>.mimetype` | `mimetype_str` | content mimetype |
//!
//! Multi-valued attributes use the multi-valued property join. Any other kind
//! cannot be lowered.

use serde::Serialize;

use super::command::JoinCategory;
use super::errors::LoweringError;
use super::join_collector::JoinRequest;
use crate::dictionary::qname::SYSTEM_MODEL_URI;
use crate::dictionary::{resolve_property, DataTypeKind, QName, SchemaContext};

const SIZE_SUFFIX: &str = ".size";
const MIMETYPE_SUFFIX: &str = ".mimetype";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhysicalColumn {
    StringValue,
    LongValue,
    AuditCreated,
    AuditCreator,
    AuditModified,
    AuditModifier,
    ContentSize,
    Mimetype,
    TypeQNameId,
    AspectQNameId,
    NodeId,
    ParentNodeId,
}

impl PhysicalColumn {
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalColumn::StringValue => "string_value",
            PhysicalColumn::LongValue => "long_value",
            PhysicalColumn::AuditCreated => "audit_created",
            PhysicalColumn::AuditCreator => "audit_creator",
            PhysicalColumn::AuditModified => "audit_modified",
            PhysicalColumn::AuditModifier => "audit_modifier",
            PhysicalColumn::ContentSize => "content_size",
            PhysicalColumn::Mimetype => "mimetype_str",
            PhysicalColumn::TypeQNameId => "type_qname_id",
            PhysicalColumn::AspectQNameId => "qname_id",
            PhysicalColumn::NodeId => "id",
            PhysicalColumn::ParentNodeId => "parent_node_id",
        }
    }
}

/// Properties computed by the repository rather than stored as attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticProperty {
    NodeId,
    ObjectTypeId,
    BaseTypeId,
    ParentId,
    Score,
}

impl SyntheticProperty {
    pub fn from_qname(qname: &QName) -> Option<Self> {
        if qname.namespace_uri != SYSTEM_MODEL_URI {
            return None;
        }
        match qname.local_name.as_str() {
            "node-id" => Some(SyntheticProperty::NodeId),
            "object-type-id" => Some(SyntheticProperty::ObjectTypeId),
            "base-type-id" => Some(SyntheticProperty::BaseTypeId),
            "parent-id" => Some(SyntheticProperty::ParentId),
            "score" => Some(SyntheticProperty::Score),
            _ => None,
        }
    }

    pub fn local_name(&self) -> &'static str {
        match self {
            SyntheticProperty::NodeId => "node-id",
            SyntheticProperty::ObjectTypeId => "object-type-id",
            SyntheticProperty::BaseTypeId => "base-type-id",
            SyntheticProperty::ParentId => "parent-id",
            SyntheticProperty::Score => "score",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedField {
    pub property: QName,
    /// Kind used for value conversion
    pub data_type: DataTypeKind,
    pub column: PhysicalColumn,
    pub category: JoinCategory,
    pub qname_id: Option<i64>,
}

impl MappedField {
    pub fn join_request(&self, outer: bool) -> JoinRequest {
        JoinRequest {
            category: self.category,
            key: self.property.to_string(),
            qname_id: self.qname_id,
            outer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyMapping {
    Field(MappedField),
    Synthetic(SyntheticProperty),
    NotFound(String),
}

/// Value column for a declared kind, `None` when the kind cannot be lowered
pub fn column_for_kind(kind: DataTypeKind) -> Option<PhysicalColumn> {
    match kind {
        DataTypeKind::Text
        | DataTypeKind::MlText
        | DataTypeKind::Date
        | DataTypeKind::DateTime
        | DataTypeKind::Locale
        | DataTypeKind::Period
        | DataTypeKind::QName
        | DataTypeKind::NodeRef
        | DataTypeKind::AssocRef
        | DataTypeKind::ChildAssocRef
        | DataTypeKind::Category => Some(PhysicalColumn::StringValue),
        DataTypeKind::Int | DataTypeKind::Long => Some(PhysicalColumn::LongValue),
        DataTypeKind::Content
        | DataTypeKind::Float
        | DataTypeKind::Double
        | DataTypeKind::Boolean
        | DataTypeKind::Path
        | DataTypeKind::Version
        | DataTypeKind::Any => None,
    }
}

fn audit_column(qname: &QName) -> Option<(PhysicalColumn, DataTypeKind)> {
    if qname.namespace_uri != crate::dictionary::qname::CONTENT_MODEL_URI {
        return None;
    }
    match qname.local_name.as_str() {
        "created" => Some((PhysicalColumn::AuditCreated, DataTypeKind::DateTime)),
        "creator" => Some((PhysicalColumn::AuditCreator, DataTypeKind::Text)),
        "modified" => Some((PhysicalColumn::AuditModified, DataTypeKind::DateTime)),
        "modifier" => Some((PhysicalColumn::AuditModifier, DataTypeKind::Text)),
        _ => None,
    }
}

/// Map a property name as written in the query to its physical location
pub fn map_property(ctx: &SchemaContext<'_>, name: &str) -> Result<PropertyMapping, LoweringError> {
    let trimmed = name.trim();

    if let Some(base) = trimmed.strip_suffix(SIZE_SUFFIX) {
        return map_content(ctx, trimmed, base, PhysicalColumn::ContentSize);
    }
    if let Some(base) = trimmed.strip_suffix(MIMETYPE_SUFFIX) {
        return map_content(ctx, trimmed, base, PhysicalColumn::Mimetype);
    }

    if let Ok(qname) = ctx.dictionary.namespaces().resolve(trimmed) {
        if let Some(synthetic) = SyntheticProperty::from_qname(&qname) {
            return Ok(PropertyMapping::Synthetic(synthetic));
        }
        if let Some((column, data_type)) = audit_column(&qname) {
            return Ok(PropertyMapping::Field(MappedField {
                qname_id: ctx.directory.id(&qname),
                property: qname,
                data_type,
                column,
                category: JoinCategory::NodeIntrinsic,
            }));
        }
    }

    let Some(definition) = resolve_property(ctx, trimmed) else {
        log::debug!("Property `{}` not found in dictionary", trimmed);
        return Ok(PropertyMapping::NotFound(trimmed.to_string()));
    };

    let column =
        column_for_kind(definition.data_type).ok_or_else(|| LoweringError::UnsupportedPropertyType {
            property: definition.name.to_string(),
            data_type: definition.data_type,
        })?;

    let Some(qname_id) = ctx.directory.id(&definition.name) else {
        log::debug!(
            "Property {} has no directory id, no row can carry it",
            definition.name
        );
        return Ok(PropertyMapping::NotFound(trimmed.to_string()));
    };

    let category = if definition.multi_valued {
        JoinCategory::MultiValuedProperty
    } else {
        JoinCategory::Property
    };

    Ok(PropertyMapping::Field(MappedField {
        property: definition.name.clone(),
        data_type: definition.data_type,
        column,
        category,
        qname_id: Some(qname_id),
    }))
}

fn map_content(
    ctx: &SchemaContext<'_>,
    written: &str,
    base: &str,
    column: PhysicalColumn,
) -> Result<PropertyMapping, LoweringError> {
    let Some(definition) = resolve_property(ctx, base) else {
        return Ok(PropertyMapping::NotFound(written.to_string()));
    };
    if definition.data_type != DataTypeKind::Content {
        return Err(LoweringError::UnsupportedPropertyType {
            property: written.to_string(),
            data_type: definition.data_type,
        });
    }
    let Some(qname_id) = ctx.directory.id(&definition.name) else {
        return Ok(PropertyMapping::NotFound(written.to_string()));
    };
    let (category, data_type) = match column {
        PhysicalColumn::ContentSize => (JoinCategory::ContentSize, DataTypeKind::Long),
        _ => (JoinCategory::ContentMimetype, DataTypeKind::Text),
    };
    Ok(PropertyMapping::Field(MappedField {
        property: definition.name.clone(),
        data_type,
        column,
        category,
        qname_id: Some(qname_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lowering::tests::fixtures::TestRepository;

    fn field(mapping: PropertyMapping) -> MappedField {
        match mapping {
            PropertyMapping::Field(field) => field,
            other => panic!("expected a field mapping, got {:?}", other),
        }
    }

    #[test]
    fn test_text_and_numeric_columns() {
        let repo = TestRepository::new();
        let ctx = repo.context();
        let name = field(map_property(&ctx, "cm:name").unwrap());
        assert_eq!(name.column, PhysicalColumn::StringValue);
        assert_eq!(name.category, JoinCategory::Property);

        let age = field(map_property(&ctx, "ex:age").unwrap());
        assert_eq!(age.column, PhysicalColumn::LongValue);
        assert!(age.qname_id.is_some());
    }

    #[test]
    fn test_audit_properties_are_intrinsic() {
        let repo = TestRepository::new();
        let ctx = repo.context();
        for (name, column) in [
            ("cm:created", PhysicalColumn::AuditCreated),
            ("cm:creator", PhysicalColumn::AuditCreator),
            ("cm:modified", PhysicalColumn::AuditModified),
            ("cm:modifier", PhysicalColumn::AuditModifier),
        ] {
            let mapped = field(map_property(&ctx, name).unwrap());
            assert_eq!(mapped.column, column);
            assert_eq!(mapped.category, JoinCategory::NodeIntrinsic);
        }
    }

    #[test]
    fn test_content_suffixes() {
        let repo = TestRepository::new();
        let ctx = repo.context();
        let size = field(map_property(&ctx, "cm:content.size").unwrap());
        assert_eq!(size.category, JoinCategory::ContentSize);
        assert_eq!(size.data_type, DataTypeKind::Long);
        let mime = field(map_property(&ctx, "cm:content.mimetype").unwrap());
        assert_eq!(mime.category, JoinCategory::ContentMimetype);
        assert_eq!(mime.column.name(), "mimetype_str");
    }

    #[test]
    fn test_unsupported_kinds() {
        let repo = TestRepository::new();
        let ctx = repo.context();
        assert!(matches!(
            map_property(&ctx, "ex:ratio"),
            Err(LoweringError::UnsupportedPropertyType {
                data_type: DataTypeKind::Double,
                ..
            })
        ));
        // bare content without a suffix has no column
        assert!(map_property(&ctx, "cm:content").is_err());
        // suffix on a non-content property
        assert!(map_property(&ctx, "cm:name.size").is_err());
    }

    #[test]
    fn test_multi_valued_and_missing() {
        let repo = TestRepository::new();
        let ctx = repo.context();
        let tags = field(map_property(&ctx, "ex:tags").unwrap());
        assert_eq!(tags.category, JoinCategory::MultiValuedProperty);
        assert_eq!(
            map_property(&ctx, "ex:unknownProp").unwrap(),
            PropertyMapping::NotFound("ex:unknownProp".to_string())
        );
        assert_eq!(
            map_property(&ctx, "sys:parent-id").unwrap(),
            PropertyMapping::Synthetic(SyntheticProperty::ParentId)
        );
    }

    #[test]
    fn test_declared_but_unpersisted_property_is_not_found() {
        let repo = TestRepository::new();
        let ctx = repo.context();
        assert!(matches!(
            map_property(&ctx, "ex:legacyCode").unwrap(),
            PropertyMapping::NotFound(_)
        ));
    }
}
