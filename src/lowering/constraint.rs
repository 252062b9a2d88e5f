//! Constraint tree lowering
//!
//! Three passes over the tree, each an exhaustive match:
//!
//! 1. `bind_constraint` resolves every schema reference and rejects what the
//!    relational backend cannot evaluate. Nothing is emitted if this fails.
//! 2. `collect_joins` threads a [`JoinSet`] through the bound tree and fixes
//!    every leaf's alias.
//! 3. `emit_predicate` appends the fully parenthesized token stream.

use std::collections::BTreeMap;

use super::command::{
    CommandValue, DbOperator, LeafCommand, PredicateToken, ScalarValue, TextFunction,
};
use super::errors::LoweringError;
use super::field_mapping::PhysicalColumn;
use super::join_collector::JoinSet;
use super::property::{bind_property_predicate, emit_leaf, BoundLeaf, OperandValues, PropertyOperand};
use super::LoweringContext;
use crate::query_model::{args, get_function, Argument, Constraint, Function, LiteralValue};

#[derive(Debug, Clone, PartialEq)]
pub enum BoundConstraint {
    Conjunction(Vec<BoundConstraint>),
    Leaf(BoundLeaf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinedConstraint {
    Conjunction(Vec<JoinedConstraint>),
    Leaf(LeafCommand),
}

/// Whether the relational backend can evaluate `constraint`
pub fn is_supported(constraint: &Constraint) -> bool {
    match constraint {
        Constraint::Conjunction(children) => {
            !children.is_empty() && children.iter().all(is_supported)
        }
        Constraint::Disjunction(_) => false,
        Constraint::Functional { function, .. } => {
            get_function(function).is_some_and(|f| f.has_relational_lowering())
        }
    }
}

pub fn contains_disjunction(constraint: &Constraint) -> bool {
    match constraint {
        Constraint::Disjunction(_) => true,
        Constraint::Conjunction(children) => children.iter().any(contains_disjunction),
        Constraint::Functional { .. } => false,
    }
}

pub fn bind_constraint(
    ctx: &LoweringContext<'_>,
    constraint: &Constraint,
) -> Result<BoundConstraint, LoweringError> {
    // Rejected up front so the error does not depend on sibling order
    if contains_disjunction(constraint) {
        return Err(LoweringError::UnsupportedDisjunction);
    }
    bind_node(ctx, constraint)
}

fn bind_node(
    ctx: &LoweringContext<'_>,
    constraint: &Constraint,
) -> Result<BoundConstraint, LoweringError> {
    match constraint {
        Constraint::Conjunction(children) => {
            if children.is_empty() {
                return Err(LoweringError::EmptyConjunction);
            }
            let bound = children
                .iter()
                .map(|child| bind_node(ctx, child))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(BoundConstraint::Conjunction(bound))
        }
        Constraint::Disjunction(_) => Err(LoweringError::UnsupportedDisjunction),
        Constraint::Functional {
            function,
            arguments,
        } => bind_functional(ctx, function, arguments).map(BoundConstraint::Leaf),
    }
}

fn bind_functional(
    ctx: &LoweringContext<'_>,
    name: &str,
    arguments: &BTreeMap<String, Argument>,
) -> Result<BoundLeaf, LoweringError> {
    let function =
        get_function(name).ok_or_else(|| LoweringError::UnknownFunction(name.to_string()))?;

    if !function.has_relational_lowering() {
        return Err(LoweringError::UnsupportedFunction(function.name().to_string()));
    }
    for argument in arguments.keys() {
        if !function.argument_names().contains(&argument.as_str()) {
            return Err(LoweringError::invalid_argument(
                function.name(),
                argument,
                "unexpected argument",
            ));
        }
    }

    match function {
        Function::Equals
        | Function::NotEquals
        | Function::LessThan
        | Function::LessThanOrEquals
        | Function::GreaterThan
        | Function::GreaterThanOrEquals => bind_comparison(ctx, function, arguments),
        Function::In => {
            let operand = property_argument(function, arguments)?;
            let items = match required(function, arguments, args::LIST)? {
                Argument::List { items } => items
                    .iter()
                    .map(|item| literal(function, args::LIST, item))
                    .collect::<Result<Vec<_>, _>>()?,
                Argument::Literal { value } => vec![value],
                other => {
                    return Err(LoweringError::invalid_argument(
                        function.name(),
                        args::LIST,
                        format!("expected a list, got {}", other.kind_name()),
                    ))
                }
            };
            let operator = negate_if(DbOperator::In, flag(function, arguments, args::NOT)?);
            bind_property_predicate(ctx, function, operator, operand, OperandValues::Many(items), None)
        }
        Function::Like => {
            let operand = property_argument(function, arguments)?;
            let pattern = literal(function, args::EXP, required(function, arguments, args::EXP)?)?;
            let operator = negate_if(DbOperator::Like, flag(function, arguments, args::NOT)?);
            bind_property_predicate(
                ctx,
                function,
                operator,
                operand,
                OperandValues::Pattern(pattern),
                None,
            )
        }
        Function::Exists => {
            let operand = property_argument(function, arguments)?;
            let operator = negate_if(DbOperator::Exists, flag(function, arguments, args::NOT)?);
            bind_property_predicate(ctx, function, operator, operand, OperandValues::None, None)
        }
        Function::Child => bind_child(ctx, function, arguments),
        Function::Descendant
        | Function::Contains
        | Function::Score
        | Function::PropertyAccessor
        | Function::Upper
        | Function::Lower
        | Function::FtsTerm
        | Function::FtsExactTerm
        | Function::FtsPhrase
        | Function::FtsProximity
        | Function::FtsRange
        | Function::FtsFuzzyTerm
        | Function::FtsPrefixTerm
        | Function::FtsWildTerm => Err(LoweringError::UnsupportedFunction(function.name().to_string())),
    }
}

fn comparison_operator(function: Function) -> Option<DbOperator> {
    match function {
        Function::Equals => Some(DbOperator::Equals),
        Function::NotEquals => Some(DbOperator::NotEquals),
        Function::LessThan => Some(DbOperator::LessThan),
        Function::LessThanOrEquals => Some(DbOperator::LessThanOrEquals),
        Function::GreaterThan => Some(DbOperator::GreaterThan),
        Function::GreaterThanOrEquals => Some(DbOperator::GreaterThanOrEquals),
        _ => None,
    }
}

fn bind_comparison(
    ctx: &LoweringContext<'_>,
    function: Function,
    arguments: &BTreeMap<String, Argument>,
) -> Result<BoundLeaf, LoweringError> {
    let operator = comparison_operator(function)
        .ok_or_else(|| LoweringError::UnsupportedFunction(function.name().to_string()))?;
    let lhs = required(function, arguments, args::LHS)?;
    let rhs = required(function, arguments, args::RHS)?;

    let (operand, text_function, value, operator) =
        match (property_side(function, lhs)?, property_side(function, rhs)?) {
            (Some((operand, text_function)), None) => {
                (operand, text_function, literal(function, args::RHS, rhs)?, operator)
            }
            (None, Some((operand, text_function))) => {
                log::debug!("{} written literal-first, reversing operator", function);
                (operand, text_function, literal(function, args::LHS, lhs)?, operator.reversed())
            }
            (Some(_), Some(_)) => {
                return Err(LoweringError::invalid_argument(
                    function.name(),
                    args::RHS,
                    "comparing two properties is not supported",
                ))
            }
            (None, None) => {
                return Err(LoweringError::invalid_argument(
                    function.name(),
                    args::LHS,
                    "comparison needs a property operand",
                ))
            }
        };

    bind_property_predicate(
        ctx,
        function,
        operator,
        operand,
        OperandValues::Single(value),
        text_function,
    )
}

/// Property operand of a comparison, possibly wrapped in `Upper`/`Lower`
fn property_side(
    function: Function,
    argument: &Argument,
) -> Result<Option<(PropertyOperand<'_>, Option<TextFunction>)>, LoweringError> {
    match argument {
        Argument::Property { .. } => Ok(PropertyOperand::from_argument(argument).map(|p| (p, None))),
        Argument::Function {
            function: inner,
            arguments,
        } => {
            let text_function = match get_function(inner) {
                Some(Function::Upper) => TextFunction::Upper,
                Some(Function::Lower) => TextFunction::Lower,
                Some(other) => return Err(LoweringError::UnsupportedFunction(other.name().to_string())),
                None => return Err(LoweringError::UnknownFunction(inner.clone())),
            };
            let wrapped = arguments
                .get(args::ARG)
                .ok_or_else(|| LoweringError::missing_argument(inner, args::ARG))?;
            let operand = PropertyOperand::from_argument(wrapped).ok_or_else(|| {
                LoweringError::invalid_argument(
                    function.name(),
                    args::ARG,
                    format!("{} must wrap a property", inner),
                )
            })?;
            Ok(Some((operand, Some(text_function))))
        }
        _ => Ok(None),
    }
}

fn bind_child(
    ctx: &LoweringContext<'_>,
    function: Function,
    arguments: &BTreeMap<String, Argument>,
) -> Result<BoundLeaf, LoweringError> {
    match arguments.get(args::SELECTOR) {
        None => {}
        Some(Argument::Selector { selector }) => ctx.check_selector(selector)?,
        Some(other) => {
            return Err(LoweringError::invalid_argument(
                function.name(),
                args::SELECTOR,
                format!("expected a selector, got {}", other.kind_name()),
            ))
        }
    }
    let parent = literal(function, args::PARENT, required(function, arguments, args::PARENT)?)?;
    let parent_id = ctx
        .node_id(function, parent)?
        .ok_or_else(|| LoweringError::InvalidObjectId(parent.to_string()))?;
    Ok(BoundLeaf::Intrinsic {
        operator: DbOperator::Equals,
        column: PhysicalColumn::ParentNodeId,
        value: CommandValue::Single(ScalarValue::Long(parent_id)),
    })
}

fn required<'q>(
    function: Function,
    arguments: &'q BTreeMap<String, Argument>,
    name: &str,
) -> Result<&'q Argument, LoweringError> {
    arguments
        .get(name)
        .ok_or_else(|| LoweringError::missing_argument(function.name(), name))
}

fn property_argument(
    function: Function,
    arguments: &BTreeMap<String, Argument>,
) -> Result<PropertyOperand<'_>, LoweringError> {
    let argument = required(function, arguments, args::PROPERTY)?;
    PropertyOperand::from_argument(argument).ok_or_else(|| {
        LoweringError::invalid_argument(
            function.name(),
            args::PROPERTY,
            format!("expected a property, got {}", argument.kind_name()),
        )
    })
}

fn literal<'q>(
    function: Function,
    name: &str,
    argument: &'q Argument,
) -> Result<&'q LiteralValue, LoweringError> {
    match argument {
        Argument::Literal { value } => Ok(value),
        other => Err(LoweringError::invalid_argument(
            function.name(),
            name,
            format!("expected a literal, got {}", other.kind_name()),
        )),
    }
}

/// Optional boolean flag; absent means `false`
fn flag(
    function: Function,
    arguments: &BTreeMap<String, Argument>,
    name: &str,
) -> Result<bool, LoweringError> {
    match arguments.get(name) {
        None => Ok(false),
        Some(Argument::Literal {
            value: LiteralValue::Boolean(b),
        }) => Ok(*b),
        Some(Argument::Literal {
            value: LiteralValue::Text(text),
        }) if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") => {
            Ok(text.eq_ignore_ascii_case("true"))
        }
        Some(_) => Err(LoweringError::invalid_argument(
            function.name(),
            name,
            "expected a boolean",
        )),
    }
}

fn negate_if(operator: DbOperator, negate: bool) -> DbOperator {
    if negate {
        operator.negated()
    } else {
        operator
    }
}

impl BoundConstraint {
    pub fn collect_joins(self, joins: JoinSet) -> (JoinedConstraint, JoinSet) {
        match self {
            BoundConstraint::Conjunction(children) => {
                let mut joins = joins;
                let mut joined = Vec::with_capacity(children.len());
                for child in children {
                    let (child, next) = child.collect_joins(joins);
                    joined.push(child);
                    joins = next;
                }
                (JoinedConstraint::Conjunction(joined), joins)
            }
            BoundConstraint::Leaf(leaf) => {
                let (leaf, joins) = leaf.collect_joins(joins);
                (JoinedConstraint::Leaf(leaf), joins)
            }
        }
    }
}

impl JoinedConstraint {
    pub fn emit_predicate(&self, mut tokens: Vec<PredicateToken>) -> Vec<PredicateToken> {
        match self {
            JoinedConstraint::Leaf(leaf) => emit_leaf(leaf, tokens),
            JoinedConstraint::Conjunction(children) => {
                tokens.push(PredicateToken::Open);
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        tokens.push(PredicateToken::And);
                    }
                    tokens = child.emit_predicate(tokens);
                }
                tokens.push(PredicateToken::Close);
                tokens
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lowering::command::render_predicate;
    use crate::lowering::tests::fixtures::TestRepository;
    use test_case::test_case;

    fn lower(repo: &TestRepository, constraint: &Constraint) -> Result<String, LoweringError> {
        let ctx = repo.lowering_context(&["d"]);
        let bound = bind_constraint(&ctx, constraint)?;
        let (joined, _) = bound.collect_joins(JoinSet::new());
        Ok(render_predicate(&joined.emit_predicate(Vec::new())))
    }

    fn on_unknown_property(function: &str) -> Constraint {
        let property = ("property", Argument::property("d", "ex:unknownProp"));
        let not = |negated: bool| ("not", Argument::literal(negated));
        match function {
            "In" | "NotIn" => Constraint::functional(
                "In",
                [
                    property,
                    ("list", Argument::list(vec![Argument::literal("a")])),
                    not(function == "NotIn"),
                ],
            ),
            "Like" | "NotLike" => Constraint::functional(
                "Like",
                [property, ("exp", Argument::literal("a%")), not(function == "NotLike")],
            ),
            "Exists" | "NotExists" => {
                Constraint::functional("Exists", [property, not(function == "NotExists")])
            }
            comparison => Constraint::comparison(
                comparison,
                Argument::property("d", "ex:unknownProp"),
                Argument::literal("a"),
            ),
        }
    }

    #[test_case("Equals", DbOperator::Fails)]
    #[test_case("NotEquals", DbOperator::Matches)]
    #[test_case("LessThan", DbOperator::Fails)]
    #[test_case("LessThanOrEquals", DbOperator::Fails)]
    #[test_case("GreaterThan", DbOperator::Fails)]
    #[test_case("GreaterThanOrEquals", DbOperator::Fails)]
    #[test_case("In", DbOperator::Fails)]
    #[test_case("NotIn", DbOperator::Matches)]
    #[test_case("Like", DbOperator::Fails)]
    #[test_case("NotLike", DbOperator::Matches)]
    #[test_case("Exists", DbOperator::Fails)]
    #[test_case("NotExists", DbOperator::Matches)]
    fn test_unknown_property_lowers_to_constant_without_join(function: &str, expected: DbOperator) {
        let repo = TestRepository::new();
        let ctx = repo.lowering_context(&["d"]);
        let bound = bind_constraint(&ctx, &on_unknown_property(function)).unwrap();
        let (joined, joins) = bound.collect_joins(JoinSet::new());
        assert!(joins.is_empty(), "{} requested a join", function);
        assert_eq!(joined, JoinedConstraint::Leaf(LeafCommand::constant(expected)));
    }

    #[test]
    fn test_operand_order_reversal_is_equivalent() {
        let repo = TestRepository::new();
        let property_first = Constraint::comparison(
            "GreaterThan",
            Argument::property("d", "ex:age"),
            Argument::literal(30i64),
        );
        let literal_first = Constraint::comparison(
            "LessThan",
            Argument::literal(30i64),
            Argument::property("d", "ex:age"),
        );
        assert_eq!(
            lower(&repo, &property_first).unwrap(),
            lower(&repo, &literal_first).unwrap()
        );
    }

    #[test]
    fn test_in_with_not_flag() {
        let repo = TestRepository::new();
        let constraint = Constraint::functional(
            "In",
            [
                ("property", Argument::property("d", "ex:age")),
                (
                    "list",
                    Argument::list(vec![Argument::literal(1i64), Argument::literal("2")]),
                ),
                ("not", Argument::literal(true)),
            ],
        );
        assert_eq!(lower(&repo, &constraint).unwrap(), "PROPERTY_1.long_value NOT IN (1, 2)");
    }

    #[test]
    fn test_like_pattern_is_text() {
        let repo = TestRepository::new();
        let constraint = Constraint::functional(
            "like",
            [
                ("property", Argument::property("d", "cm:name")),
                ("exp", Argument::literal("rep%")),
            ],
        );
        assert_eq!(lower(&repo, &constraint).unwrap(), "PROPERTY_1.string_value LIKE 'rep%'");
    }

    #[test]
    fn test_upper_wraps_property() {
        let repo = TestRepository::new();
        let constraint = Constraint::comparison(
            "Equals",
            Argument::function("Upper", [("arg", Argument::property("d", "cm:name"))]),
            Argument::literal("REPORT"),
        );
        assert_eq!(
            lower(&repo, &constraint).unwrap(),
            "UPPER(PROPERTY_1.string_value) = 'REPORT'"
        );
    }

    #[test]
    fn test_shared_singleton_join_across_conjunction() {
        let repo = TestRepository::new();
        let constraint = Constraint::and(vec![
            Constraint::comparison(
                "GreaterThan",
                Argument::property("d", "ex:age"),
                Argument::literal(18i64),
            ),
            Constraint::comparison(
                "LessThan",
                Argument::property("d", "ex:age"),
                Argument::literal(65i64),
            ),
        ]);
        assert_eq!(
            lower(&repo, &constraint).unwrap(),
            "( PROPERTY_1.long_value > 18 AND PROPERTY_1.long_value < 65 )"
        );
    }

    #[test]
    fn test_child_uses_parent_row_id() {
        let repo = TestRepository::new();
        let constraint = Constraint::functional(
            "Child",
            [
                ("parent", Argument::literal(repo.folder.to_string())),
                ("selector", Argument::selector("d")),
            ],
        );
        assert_eq!(
            lower(&repo, &constraint).unwrap(),
            format!("node.parent_node_id = {}", TestRepository::FOLDER_ID)
        );

        let missing = Constraint::functional(
            "Child",
            [("parent", Argument::literal("workspace://SpacesStore/gone"))],
        );
        assert!(matches!(
            lower(&repo, &missing),
            Err(LoweringError::InvalidObjectId(_))
        ));
    }

    #[test]
    fn test_disjunction_is_rejected_wherever_it_appears() {
        let repo = TestRepository::new();
        let nested = Constraint::and(vec![
            Constraint::functional("NoSuchFunction", Vec::<(String, Argument)>::new()),
            Constraint::or(vec![Constraint::comparison(
                "Equals",
                Argument::property("d", "cm:name"),
                Argument::literal("a"),
            )]),
        ]);
        assert!(!is_supported(&nested));
        assert_eq!(lower(&repo, &nested), Err(LoweringError::UnsupportedDisjunction));
    }

    #[test]
    fn test_capability_check() {
        let equals = Constraint::comparison(
            "Equals",
            Argument::property("d", "cm:name"),
            Argument::literal("a"),
        );
        assert!(is_supported(&equals));
        assert!(is_supported(&Constraint::and(vec![equals.clone()])));
        assert!(!is_supported(&Constraint::and(vec![])));
        assert!(!is_supported(&Constraint::functional(
            "FTSTerm",
            [("property", Argument::property("d", "cm:name"))]
        )));
    }

    #[test]
    fn test_unsupported_and_malformed_functions() {
        let repo = TestRepository::new();
        assert_eq!(
            lower(&repo, &Constraint::functional("Descendant", [("parent", Argument::literal("x"))])),
            Err(LoweringError::UnsupportedFunction("Descendant".to_string()))
        );
        assert_eq!(
            lower(&repo, &Constraint::functional("Between", Vec::<(String, Argument)>::new())),
            Err(LoweringError::UnknownFunction("Between".to_string()))
        );
        assert!(matches!(
            lower(
                &repo,
                &Constraint::functional("Equals", [("lhs", Argument::property("d", "cm:name"))])
            ),
            Err(LoweringError::MissingArgument { .. })
        ));
        assert!(matches!(
            lower(
                &repo,
                &Constraint::comparison(
                    "Equals",
                    Argument::property("d", "cm:name"),
                    Argument::property("d", "cm:title"),
                )
            ),
            Err(LoweringError::InvalidArgument { .. })
        ));
        assert_eq!(lower(&repo, &Constraint::and(vec![])), Err(LoweringError::EmptyConjunction));
    }

    #[test]
    fn test_unknown_selector() {
        let repo = TestRepository::new();
        let constraint = Constraint::comparison(
            "Equals",
            Argument::property("zz", "cm:name"),
            Argument::literal("a"),
        );
        assert_eq!(
            lower(&repo, &constraint),
            Err(LoweringError::UnknownSelector("zz".to_string()))
        );
    }
}
