//! Ordering lowering
//!
//! Every ordering key needs an outer join so rows without a value still
//! come back. Orderings by a property the dictionary does not know lower to
//! `NO_ORDER` and are dropped from the order-by list.

use super::command::{CommandValue, DbOperator, JoinCategory, LeafCommand, ScalarValue};
use super::errors::LoweringError;
use super::field_mapping::{map_property, MappedField, PhysicalColumn, PropertyMapping, SyntheticProperty};
use super::join_collector::{JoinRequest, JoinSet};
use super::property::PropertyOperand;
use super::LoweringContext;
use crate::query_model::{args, get_function, Function, Order, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub enum OrderKey {
    Field(MappedField),
    /// Parent row reached through a parent join
    Parent,
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundOrdering {
    pub key: OrderKey,
    pub order: Order,
}

pub fn bind_ordering(
    ctx: &LoweringContext<'_>,
    ordering: &Ordering,
) -> Result<BoundOrdering, LoweringError> {
    let column = &ordering.column;
    let function = get_function(&column.function)
        .ok_or_else(|| LoweringError::UnknownFunction(column.function.clone()))?;
    if function != Function::PropertyAccessor {
        return Err(LoweringError::UnsupportedOrdering(function.name().to_string()));
    }
    let argument = column
        .arguments
        .get(args::PROPERTY)
        .ok_or_else(|| LoweringError::missing_argument(function.name(), args::PROPERTY))?;
    let operand = PropertyOperand::from_argument(argument).ok_or_else(|| {
        LoweringError::invalid_argument(
            function.name(),
            args::PROPERTY,
            format!("expected a property, got {}", argument.kind_name()),
        )
    })?;
    ctx.check_selector(operand.selector)?;

    let key = match map_property(&ctx.schema, operand.property)? {
        PropertyMapping::NotFound(name) => {
            log::debug!("Ordering by unknown property `{}` dropped", name);
            OrderKey::NotFound(name)
        }
        PropertyMapping::Synthetic(SyntheticProperty::ParentId) => OrderKey::Parent,
        PropertyMapping::Synthetic(other) => {
            return Err(LoweringError::UnsupportedOrdering(format!(
                "sys:{}",
                other.local_name()
            )))
        }
        PropertyMapping::Field(field) => {
            if !operand.orderable {
                return Err(LoweringError::NotOrderable(field.property.to_string()));
            }
            OrderKey::Field(field)
        }
    };

    Ok(BoundOrdering {
        key,
        order: ordering.order,
    })
}

impl BoundOrdering {
    pub fn collect_joins(self, mut joins: JoinSet) -> (LeafCommand, JoinSet) {
        let direction = CommandValue::Single(ScalarValue::Text(self.order.keyword().to_string()));
        let leaf = match self.key {
            OrderKey::NotFound(_) => LeafCommand::constant(DbOperator::Order.fallback()),
            OrderKey::Parent => {
                let alias = joins.request(&JoinRequest {
                    category: JoinCategory::Parent,
                    key: "sys:parent-id".to_string(),
                    qname_id: None,
                    outer: true,
                });
                LeafCommand {
                    operator: DbOperator::Order,
                    alias: Some(alias),
                    field: Some(PhysicalColumn::NodeId.name().to_string()),
                    value: direction,
                    text_function: None,
                    qname_id: None,
                }
            }
            OrderKey::Field(field) => {
                let mut request = field.join_request(DbOperator::Order.needs_outer_join());
                // One sort value per row: multi-valued attributes share a single join too
                if request.category == JoinCategory::MultiValuedProperty {
                    request.category = JoinCategory::Property;
                }
                let alias = joins.request(&request);
                LeafCommand {
                    operator: DbOperator::Order,
                    alias: Some(alias),
                    field: Some(field.column.name().to_string()),
                    value: direction,
                    text_function: None,
                    qname_id: field.qname_id,
                }
            }
        };
        (leaf, joins)
    }
}
