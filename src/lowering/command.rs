//! Command model
//!
//! The output of lowering: join descriptors plus a flat, fully parenthesized
//! stream of predicate tokens. Both are plain values; the relational executor
//! turns them into its own SQL.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alias of the node table itself (intrinsic columns need no join)
pub const NODE_ALIAS: &str = "node";

/// Id guaranteed not to match any row. Used instead of an empty `IN` list.
pub const NO_MATCH_ID: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinCategory {
    /// Columns on the node row (audit, type, parent). Never a real join.
    NodeIntrinsic,
    AspectPresence,
    Property,
    MultiValuedProperty,
    ContentMimetype,
    ContentSize,
    Parent,
}

impl JoinCategory {
    pub fn alias_prefix(&self) -> &'static str {
        match self {
            JoinCategory::NodeIntrinsic => "NODE",
            JoinCategory::AspectPresence => "ASPECT",
            JoinCategory::Property => "PROPERTY",
            JoinCategory::MultiValuedProperty => "MULTI_VALUED_PROPERTY",
            JoinCategory::ContentMimetype => "CONTENT_MIMETYPE",
            JoinCategory::ContentSize => "CONTENT_SIZE",
            JoinCategory::Parent => "PARENT",
        }
    }

    /// Singleton joins are shared by every reference to the same qualified
    /// name; multi-valued ones get a fresh alias per reference.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            JoinCategory::Property | JoinCategory::ContentMimetype | JoinCategory::ContentSize
        )
    }

    pub fn is_materialized(&self) -> bool {
        !matches!(self, JoinCategory::NodeIntrinsic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDescriptor {
    pub category: JoinCategory,
    pub alias: String,
    /// Directory id of the attribute the join is restricted to
    pub qname_id: Option<i64>,
    pub outer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    In,
    NotIn,
    Like,
    NotLike,
    Exists,
    NotExists,
    Order,
    /// Constant false: the referenced property does not exist
    Fails,
    /// Constant true: the referenced property does not exist
    Matches,
    /// Ordering by a property that does not exist; dropped
    NoOrder,
}

impl DbOperator {
    /// Operator to use when the referenced property cannot be resolved
    pub fn fallback(&self) -> DbOperator {
        match self {
            DbOperator::Equals
            | DbOperator::Exists
            | DbOperator::GreaterThan
            | DbOperator::GreaterThanOrEquals
            | DbOperator::LessThan
            | DbOperator::LessThanOrEquals
            | DbOperator::In
            | DbOperator::Like => DbOperator::Fails,
            DbOperator::NotEquals
            | DbOperator::NotExists
            | DbOperator::NotIn
            | DbOperator::NotLike => DbOperator::Matches,
            DbOperator::Order => DbOperator::NoOrder,
            DbOperator::Fails | DbOperator::Matches | DbOperator::NoOrder => *self,
        }
    }

    /// Operator to use when the literal is written before the property
    pub fn reversed(&self) -> DbOperator {
        match self {
            DbOperator::GreaterThan => DbOperator::LessThan,
            DbOperator::GreaterThanOrEquals => DbOperator::LessThanOrEquals,
            DbOperator::LessThan => DbOperator::GreaterThan,
            DbOperator::LessThanOrEquals => DbOperator::GreaterThanOrEquals,
            other => *other,
        }
    }

    /// Negated form, used by functions with a `not` flag
    pub fn negated(&self) -> DbOperator {
        match self {
            DbOperator::Equals => DbOperator::NotEquals,
            DbOperator::NotEquals => DbOperator::Equals,
            DbOperator::In => DbOperator::NotIn,
            DbOperator::NotIn => DbOperator::In,
            DbOperator::Like => DbOperator::NotLike,
            DbOperator::NotLike => DbOperator::Like,
            DbOperator::Exists => DbOperator::NotExists,
            DbOperator::NotExists => DbOperator::Exists,
            other => *other,
        }
    }

    /// Whether rows lacking the attribute must survive the join
    pub fn needs_outer_join(&self) -> bool {
        matches!(
            self,
            DbOperator::Exists | DbOperator::NotExists | DbOperator::Order
        )
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            DbOperator::Fails | DbOperator::Matches | DbOperator::NoOrder
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            DbOperator::Equals => "=",
            DbOperator::NotEquals => "<>",
            DbOperator::LessThan => "<",
            DbOperator::LessThanOrEquals => "<=",
            DbOperator::GreaterThan => ">",
            DbOperator::GreaterThanOrEquals => ">=",
            DbOperator::In => "IN",
            DbOperator::NotIn => "NOT IN",
            DbOperator::Like => "LIKE",
            DbOperator::NotLike => "NOT LIKE",
            DbOperator::Exists => "IS NOT NULL",
            DbOperator::NotExists => "IS NULL",
            DbOperator::Order => "ORDER",
            DbOperator::Fails => "FAILS",
            DbOperator::Matches => "MATCHES",
            DbOperator::NoOrder => "NO_ORDER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextFunction {
    Upper,
    Lower,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Long(i64),
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Long(v) => write!(f, "{}", v),
            ScalarValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandValue {
    #[default]
    None,
    Single(ScalarValue),
    Many(Vec<ScalarValue>),
}

impl CommandValue {
    pub fn ids(ids: impl IntoIterator<Item = i64>) -> Self {
        CommandValue::Many(ids.into_iter().map(ScalarValue::Long).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCommand {
    pub operator: DbOperator,
    pub alias: Option<String>,
    pub field: Option<String>,
    #[serde(default)]
    pub value: CommandValue,
    pub text_function: Option<TextFunction>,
    pub qname_id: Option<i64>,
}

impl LeafCommand {
    /// Constant leaf for an unresolvable property
    pub fn constant(operator: DbOperator) -> Self {
        Self {
            operator,
            alias: None,
            field: None,
            value: CommandValue::None,
            text_function: None,
            qname_id: None,
        }
    }
}

impl fmt::Display for LeafCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator.is_constant() {
            return f.write_str(self.operator.symbol());
        }
        let target = match (&self.alias, &self.field) {
            (Some(alias), Some(field)) => format!("{}.{}", alias, field),
            (None, Some(field)) => field.clone(),
            _ => "?".to_string(),
        };
        let target = match self.text_function {
            Some(TextFunction::Upper) => format!("UPPER({})", target),
            Some(TextFunction::Lower) => format!("LOWER({})", target),
            None => target,
        };
        match (&self.operator, &self.value) {
            (DbOperator::Order, CommandValue::Single(ScalarValue::Text(direction))) => {
                write!(f, "{} {}", target, direction)
            }
            (_, CommandValue::None) => write!(f, "{} {}", target, self.operator.symbol()),
            (_, CommandValue::Single(value)) => {
                write!(f, "{} {} {}", target, self.operator.symbol(), value)
            }
            (_, CommandValue::Many(values)) => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(
                    f,
                    "{} {} ({})",
                    target,
                    self.operator.symbol(),
                    rendered.join(", ")
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateToken {
    Open,
    Close,
    And,
    Or,
    Not,
    Leaf(LeafCommand),
}

impl PredicateToken {
    pub fn as_leaf(&self) -> Option<&LeafCommand> {
        match self {
            PredicateToken::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }
}

impl fmt::Display for PredicateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateToken::Open => f.write_str("("),
            PredicateToken::Close => f.write_str(")"),
            PredicateToken::And => f.write_str("AND"),
            PredicateToken::Or => f.write_str("OR"),
            PredicateToken::Not => f.write_str("NOT"),
            PredicateToken::Leaf(leaf) => write!(f, "{}", leaf),
        }
    }
}

/// Human-readable rendering of a token stream, for logs and the CLI
pub fn render_predicate(tokens: &[PredicateToken]) -> String {
    tokens
        .iter()
        .map(|token| token.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
