//! Property predicate binding
//!
//! Resolves the property side of a predicate through the field mapping
//! table, applies the not-found fallback, and converts literal operands
//! according to the property's declared kind.

use super::command::{
    CommandValue, DbOperator, LeafCommand, PredicateToken, ScalarValue, TextFunction, NODE_ALIAS,
    NO_MATCH_ID,
};
use super::errors::LoweringError;
use super::field_mapping::{map_property, MappedField, PhysicalColumn, PropertyMapping, SyntheticProperty};
use super::join_collector::JoinSet;
use super::selector::TypeTest;
use super::value_conversion::{convert_literal, convert_pattern};
use super::LoweringContext;
use crate::dictionary::{resolve_class, ClassKind, DataTypeKind, DictionaryError, QName};
use crate::node::NodeRef;
use crate::query_model::{Argument, Function, LiteralValue};

/// Property reference as written in a query argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyOperand<'q> {
    pub selector: &'q str,
    pub property: &'q str,
    pub queryable: bool,
    pub orderable: bool,
}

impl<'q> PropertyOperand<'q> {
    pub fn from_argument(argument: &'q Argument) -> Option<Self> {
        match argument {
            Argument::Property {
                selector,
                property,
                queryable,
                orderable,
            } => Some(Self {
                selector,
                property,
                queryable: *queryable,
                orderable: *orderable,
            }),
            _ => None,
        }
    }
}

/// Literal operands of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum OperandValues<'q> {
    None,
    Single(&'q LiteralValue),
    Many(Vec<&'q LiteralValue>),
    Pattern(&'q LiteralValue),
}

/// A predicate leaf with every schema reference resolved
#[derive(Debug, Clone, PartialEq)]
pub enum BoundLeaf {
    /// Attribute value behind a join (or on the node row for intrinsics)
    Field {
        field: MappedField,
        operator: DbOperator,
        value: CommandValue,
        text_function: Option<TextFunction>,
    },
    /// Column of the node row addressed without a dictionary attribute
    Intrinsic {
        operator: DbOperator,
        column: PhysicalColumn,
        value: CommandValue,
    },
    TypeTest(TypeTest),
    Constant(DbOperator),
}

impl BoundLeaf {
    pub fn collect_joins(self, mut joins: JoinSet) -> (LeafCommand, JoinSet) {
        match self {
            BoundLeaf::Field {
                field,
                operator,
                value,
                text_function,
            } => {
                let alias = joins.request(&field.join_request(operator.needs_outer_join()));
                let leaf = LeafCommand {
                    operator,
                    alias: Some(alias),
                    field: Some(field.column.name().to_string()),
                    value,
                    text_function,
                    qname_id: field.qname_id,
                };
                (leaf, joins)
            }
            BoundLeaf::Intrinsic {
                operator,
                column,
                value,
            } => {
                let leaf = LeafCommand {
                    operator,
                    alias: Some(NODE_ALIAS.to_string()),
                    field: Some(column.name().to_string()),
                    value,
                    text_function: None,
                    qname_id: None,
                };
                (leaf, joins)
            }
            BoundLeaf::TypeTest(test) => test.collect_joins(joins),
            BoundLeaf::Constant(operator) => (LeafCommand::constant(operator), joins),
        }
    }
}

pub fn emit_leaf(leaf: &LeafCommand, mut tokens: Vec<PredicateToken>) -> Vec<PredicateToken> {
    tokens.push(PredicateToken::Leaf(leaf.clone()));
    tokens
}

/// Bind `operator` applied to a property and its literal operands
pub fn bind_property_predicate(
    ctx: &LoweringContext<'_>,
    function: Function,
    operator: DbOperator,
    operand: PropertyOperand<'_>,
    values: OperandValues<'_>,
    text_function: Option<TextFunction>,
) -> Result<BoundLeaf, LoweringError> {
    ctx.check_selector(operand.selector)?;

    let field = match map_property(&ctx.schema, operand.property)? {
        PropertyMapping::NotFound(name) => {
            log::debug!(
                "{} on unknown property `{}` lowered to {}",
                function,
                name,
                operator.fallback().symbol()
            );
            return Ok(BoundLeaf::Constant(operator.fallback()));
        }
        PropertyMapping::Synthetic(synthetic) => {
            if text_function.is_some() {
                return Err(LoweringError::unsupported_with_context(
                    format!("text function on sys:{}", synthetic.local_name()),
                    function.name(),
                ));
            }
            return bind_synthetic(ctx, function, operator, synthetic, values);
        }
        PropertyMapping::Field(field) => field,
    };

    if !operand.queryable {
        return Err(LoweringError::NotQueryable(field.property.to_string()));
    }
    if text_function.is_some() && matches!(field.data_type, DataTypeKind::Int | DataTypeKind::Long) {
        return Err(LoweringError::invalid_argument(
            function.name(),
            operand.property,
            "UPPER/LOWER only applies to text properties",
        ));
    }

    let property = field.property.to_string();
    let value = match values {
        OperandValues::None => CommandValue::None,
        OperandValues::Single(literal) => {
            CommandValue::Single(convert_literal(&property, field.data_type, literal)?)
        }
        OperandValues::Pattern(literal) => CommandValue::Single(convert_pattern(literal)),
        OperandValues::Many(literals) => {
            if literals.is_empty() {
                log::debug!("{} with an empty list on {} is constant", function, property);
                return Ok(BoundLeaf::Constant(operator.fallback()));
            }
            let converted = literals
                .into_iter()
                .map(|literal| convert_literal(&property, field.data_type, literal))
                .collect::<Result<Vec<_>, _>>()?;
            CommandValue::Many(converted)
        }
    };

    Ok(BoundLeaf::Field {
        field,
        operator,
        value,
        text_function,
    })
}

fn bind_synthetic(
    ctx: &LoweringContext<'_>,
    function: Function,
    operator: DbOperator,
    synthetic: SyntheticProperty,
    values: OperandValues<'_>,
) -> Result<BoundLeaf, LoweringError> {
    let unsupported = || {
        LoweringError::unsupported_with_context(
            format!("{} on sys:{}", operator.symbol(), synthetic.local_name()),
            function.name(),
        )
    };

    match synthetic {
        SyntheticProperty::Score => Err(LoweringError::UnsupportedFunction(
            "sys:score".to_string(),
        )),
        SyntheticProperty::NodeId | SyntheticProperty::ParentId => {
            let column = if synthetic == SyntheticProperty::NodeId {
                PhysicalColumn::NodeId
            } else {
                PhysicalColumn::ParentNodeId
            };
            let value = match (operator, values) {
                (DbOperator::Exists | DbOperator::NotExists, OperandValues::None) => {
                    CommandValue::None
                }
                (DbOperator::Equals | DbOperator::NotEquals, OperandValues::Single(literal)) => {
                    CommandValue::Single(ScalarValue::Long(
                        ctx.node_id_or_sentinel(function, literal)?,
                    ))
                }
                (DbOperator::In | DbOperator::NotIn, OperandValues::Many(literals)) => {
                    let mut ids = literals
                        .into_iter()
                        .map(|literal| ctx.node_id_or_sentinel(function, literal))
                        .collect::<Result<Vec<_>, _>>()?;
                    if ids.is_empty() {
                        ids.push(NO_MATCH_ID);
                    }
                    CommandValue::ids(ids)
                }
                _ => return Err(unsupported()),
            };
            Ok(BoundLeaf::Intrinsic {
                operator,
                column,
                value,
            })
        }
        SyntheticProperty::ObjectTypeId | SyntheticProperty::BaseTypeId => {
            let exact = synthetic == SyntheticProperty::ObjectTypeId;
            let (names, negated) = match (operator, values) {
                (DbOperator::Equals, OperandValues::Single(literal)) => (vec![literal], false),
                (DbOperator::NotEquals, OperandValues::Single(literal)) => (vec![literal], true),
                (DbOperator::In, OperandValues::Many(literals)) => (literals, false),
                (DbOperator::NotIn, OperandValues::Many(literals)) => (literals, true),
                _ => return Err(unsupported()),
            };
            let mut ids = Vec::new();
            for name in names {
                ids.extend(type_ids(ctx, function, &name.to_string(), exact)?);
            }
            ids.sort_unstable();
            ids.dedup();
            Ok(BoundLeaf::TypeTest(TypeTest::for_type_ids(
                QName::system(synthetic.local_name()),
                ids,
                negated,
            )))
        }
    }
}

/// Ids of a type named in a type-id comparison; unknown types match nothing
fn type_ids(
    ctx: &LoweringContext<'_>,
    function: Function,
    name: &str,
    exact: bool,
) -> Result<Vec<i64>, LoweringError> {
    match resolve_class(&ctx.schema, name, exact) {
        Ok(class) if class.kind == ClassKind::Aspect => Err(LoweringError::invalid_argument(
            function.name(),
            name,
            "type id comparisons take types, not aspects",
        )),
        Ok(class) => Ok(class.ids.into_iter().collect()),
        Err(DictionaryError::UnknownClass(_)) => {
            log::debug!("Unknown type `{}` in type id comparison matches nothing", name);
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

impl LoweringContext<'_> {
    /// Row id of a referenced node. Integer literals are taken as row ids.
    pub fn node_id(
        &self,
        function: Function,
        literal: &LiteralValue,
    ) -> Result<Option<i64>, LoweringError> {
        let reference = match literal {
            LiteralValue::Integer(id) => return Ok(Some(*id)),
            LiteralValue::Text(text) => text.trim().parse::<NodeRef>()?,
            other => {
                return Err(LoweringError::invalid_argument(
                    function.name(),
                    &other.to_string(),
                    "expected a node reference",
                ))
            }
        };
        let nodes = self.schema.nodes.ok_or(LoweringError::MissingNodeResolver)?;
        let reference = self.schema.tenant.base_node_ref(&reference);
        Ok(nodes.node_id(&reference)?)
    }

    fn node_id_or_sentinel(
        &self,
        function: Function,
        literal: &LiteralValue,
    ) -> Result<i64, LoweringError> {
        Ok(self.node_id(function, literal)?.unwrap_or_else(|| {
            log::debug!("Node `{}` does not exist, using sentinel", literal);
            NO_MATCH_ID
        }))
    }
}
