//! Query function registry
//!
//! Maps function names as written by the parser to the closed set of
//! functions the lowering layer understands. Lookup tries the exact name
//! first, then falls back to a case-insensitive scan.
use std::collections::HashMap;
use std::fmt;

/// Argument names used by the registered functions
pub mod args {
    pub const LHS: &str = "lhs";
    pub const RHS: &str = "rhs";
    pub const PROPERTY: &str = "property";
    pub const LIST: &str = "list";
    pub const EXP: &str = "exp";
    pub const NOT: &str = "not";
    pub const PARENT: &str = "parent";
    pub const SELECTOR: &str = "selector";
    pub const ARG: &str = "arg";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    In,
    Like,
    Exists,
    Child,
    Descendant,
    Contains,
    Score,
    PropertyAccessor,
    Upper,
    Lower,
    FtsTerm,
    FtsExactTerm,
    FtsPhrase,
    FtsProximity,
    FtsRange,
    FtsFuzzyTerm,
    FtsPrefixTerm,
    FtsWildTerm,
}

/// What a function is used for, which decides where it may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRole {
    /// Boolean test usable as a constraint
    Predicate,
    /// Value-producing function usable inside a comparison or column
    Value,
    /// Full-text operator; executed by the search subsystem, never lowered
    FullText,
}

impl Function {
    pub const ALL: [Function; 24] = [
        Function::Equals,
        Function::NotEquals,
        Function::LessThan,
        Function::LessThanOrEquals,
        Function::GreaterThan,
        Function::GreaterThanOrEquals,
        Function::In,
        Function::Like,
        Function::Exists,
        Function::Child,
        Function::Descendant,
        Function::Contains,
        Function::Score,
        Function::PropertyAccessor,
        Function::Upper,
        Function::Lower,
        Function::FtsTerm,
        Function::FtsExactTerm,
        Function::FtsPhrase,
        Function::FtsProximity,
        Function::FtsRange,
        Function::FtsFuzzyTerm,
        Function::FtsPrefixTerm,
        Function::FtsWildTerm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Function::Equals => "Equals",
            Function::NotEquals => "NotEquals",
            Function::LessThan => "LessThan",
            Function::LessThanOrEquals => "LessThanOrEquals",
            Function::GreaterThan => "GreaterThan",
            Function::GreaterThanOrEquals => "GreaterThanOrEquals",
            Function::In => "In",
            Function::Like => "Like",
            Function::Exists => "Exists",
            Function::Child => "Child",
            Function::Descendant => "Descendant",
            Function::Contains => "Contains",
            Function::Score => "Score",
            Function::PropertyAccessor => "PropertyAccessor",
            Function::Upper => "Upper",
            Function::Lower => "Lower",
            Function::FtsTerm => "FTSTerm",
            Function::FtsExactTerm => "FTSExactTerm",
            Function::FtsPhrase => "FTSPhrase",
            Function::FtsProximity => "FTSProximity",
            Function::FtsRange => "FTSRange",
            Function::FtsFuzzyTerm => "FTSFuzzyTerm",
            Function::FtsPrefixTerm => "FTSPrefixTerm",
            Function::FtsWildTerm => "FTSWildTerm",
        }
    }

    pub fn role(&self) -> FunctionRole {
        match self {
            Function::Equals
            | Function::NotEquals
            | Function::LessThan
            | Function::LessThanOrEquals
            | Function::GreaterThan
            | Function::GreaterThanOrEquals
            | Function::In
            | Function::Like
            | Function::Exists
            | Function::Child
            | Function::Descendant
            | Function::Contains => FunctionRole::Predicate,
            Function::Score | Function::PropertyAccessor | Function::Upper | Function::Lower => {
                FunctionRole::Value
            }
            Function::FtsTerm
            | Function::FtsExactTerm
            | Function::FtsPhrase
            | Function::FtsProximity
            | Function::FtsRange
            | Function::FtsFuzzyTerm
            | Function::FtsPrefixTerm
            | Function::FtsWildTerm => FunctionRole::FullText,
        }
    }

    /// Predicates the relational backend can evaluate
    pub fn has_relational_lowering(&self) -> bool {
        matches!(
            self,
            Function::Equals
                | Function::NotEquals
                | Function::LessThan
                | Function::LessThanOrEquals
                | Function::GreaterThan
                | Function::GreaterThanOrEquals
                | Function::In
                | Function::Like
                | Function::Exists
                | Function::Child
        )
    }

    /// Named arguments accepted by the function
    pub fn argument_names(&self) -> &'static [&'static str] {
        match self {
            Function::Equals
            | Function::NotEquals
            | Function::LessThan
            | Function::LessThanOrEquals
            | Function::GreaterThan
            | Function::GreaterThanOrEquals => &[args::LHS, args::RHS],
            Function::In => &[args::PROPERTY, args::LIST, args::NOT],
            Function::Like => &[args::PROPERTY, args::EXP, args::NOT],
            Function::Exists => &[args::PROPERTY, args::NOT],
            Function::Child | Function::Descendant => &[args::PARENT, args::SELECTOR],
            Function::Contains | Function::Score => &[args::SELECTOR],
            Function::PropertyAccessor => &[args::PROPERTY],
            Function::Upper | Function::Lower => &[args::ARG],
            _ => &[args::PROPERTY, args::ARG],
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

lazy_static::lazy_static! {
    static ref FUNCTIONS: HashMap<&'static str, Function> =
        Function::ALL.iter().map(|function| (function.name(), *function)).collect();
}

/// Look a function up by name: exact match first, then case-insensitive
pub fn get_function(name: &str) -> Option<Function> {
    if let Some(function) = FUNCTIONS.get(name) {
        return Some(*function);
    }
    let found = FUNCTIONS
        .iter()
        .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
        .map(|(_, function)| *function);
    if let Some(function) = found {
        log::debug!("Function `{}` matched `{}` ignoring case", name, function);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_case_insensitive_lookup() {
        assert_eq!(get_function("Equals"), Some(Function::Equals));
        assert_eq!(get_function("equals"), Some(Function::Equals));
        assert_eq!(get_function("FTSPHRASE"), Some(Function::FtsPhrase));
        assert_eq!(get_function("Between"), None);
    }

    #[test]
    fn test_every_function_is_registered_under_its_name() {
        for function in Function::ALL {
            assert_eq!(get_function(function.name()), Some(function));
        }
    }

    #[test]
    fn test_full_text_has_no_relational_lowering() {
        for function in Function::ALL {
            if function.role() == FunctionRole::FullText {
                assert!(!function.has_relational_lowering(), "{}", function);
            }
        }
        assert!(!Function::Descendant.has_relational_lowering());
        assert!(Function::Child.has_relational_lowering());
    }
}
