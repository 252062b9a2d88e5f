use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Boolean constraint tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Conjunction(Vec<Constraint>),
    Disjunction(Vec<Constraint>),
    Functional {
        function: String,
        #[serde(default)]
        arguments: BTreeMap<String, Argument>,
    },
}

impl Constraint {
    pub fn and(children: Vec<Constraint>) -> Self {
        Constraint::Conjunction(children)
    }

    pub fn or(children: Vec<Constraint>) -> Self {
        Constraint::Disjunction(children)
    }

    pub fn functional<I, K>(function: &str, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, Argument)>,
        K: Into<String>,
    {
        Constraint::Functional {
            function: function.to_string(),
            arguments: arguments.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Binary comparison such as `Equals(lhs, rhs)`
    pub fn comparison(function: &str, lhs: Argument, rhs: Argument) -> Self {
        Self::functional(function, [("lhs", lhs), ("rhs", rhs)])
    }
}

fn flag_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Argument {
    Literal {
        value: LiteralValue,
    },
    Property {
        selector: String,
        property: String,
        #[serde(default = "flag_default")]
        queryable: bool,
        #[serde(default = "flag_default")]
        orderable: bool,
    },
    Selector {
        selector: String,
    },
    Function {
        function: String,
        #[serde(default)]
        arguments: BTreeMap<String, Argument>,
    },
    List {
        items: Vec<Argument>,
    },
}

impl Argument {
    pub fn literal(value: impl Into<LiteralValue>) -> Self {
        Argument::Literal {
            value: value.into(),
        }
    }

    pub fn property(selector: &str, property: &str) -> Self {
        Argument::Property {
            selector: selector.to_string(),
            property: property.to_string(),
            queryable: true,
            orderable: true,
        }
    }

    pub fn selector(selector: &str) -> Self {
        Argument::Selector {
            selector: selector.to_string(),
        }
    }

    pub fn function<I, K>(function: &str, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, Argument)>,
        K: Into<String>,
    {
        Argument::Function {
            function: function.to_string(),
            arguments: arguments.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn list(items: Vec<Argument>) -> Self {
        Argument::List { items }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Argument::Literal { .. } => "literal",
            Argument::Property { .. } => "property",
            Argument::Selector { .. } => "selector",
            Argument::Function { .. } => "function",
            Argument::List { .. } => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Boolean(b) => write!(f, "{}", b),
            LiteralValue::Integer(i) => write!(f, "{}", i),
            LiteralValue::Float(x) => write!(f, "{}", x),
            LiteralValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> Self {
        LiteralValue::Text(value.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(value: String) -> Self {
        LiteralValue::Text(value)
    }
}

impl From<i64> for LiteralValue {
    fn from(value: i64) -> Self {
        LiteralValue::Integer(value)
    }
}

impl From<bool> for LiteralValue {
    fn from(value: bool) -> Self {
        LiteralValue::Boolean(value)
    }
}

impl From<f64> for LiteralValue {
    fn from(value: f64) -> Self {
        LiteralValue::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_json_shape() {
        let constraint = Constraint::and(vec![Constraint::comparison(
            "Equals",
            Argument::property("d", "cm:name"),
            Argument::literal("report"),
        )]);
        let json = serde_json::to_value(&constraint).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "conjunction": [{
                    "functional": {
                        "function": "Equals",
                        "arguments": {
                            "lhs": {"kind": "property", "selector": "d", "property": "cm:name",
                                    "queryable": true, "orderable": true},
                            "rhs": {"kind": "literal", "value": "report"}
                        }
                    }
                }]
            })
        );
        let back: Constraint = serde_json::from_value(json).unwrap();
        assert_eq!(back, constraint);
    }

    #[test]
    fn test_literal_untagged_forms() {
        let values: Vec<LiteralValue> = serde_json::from_str(r#"[true, 42, 1.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                LiteralValue::Boolean(true),
                LiteralValue::Integer(42),
                LiteralValue::Float(1.5),
                LiteralValue::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_property_flags_default_to_true() {
        let arg: Argument =
            serde_json::from_str(r#"{"kind":"property","selector":"d","property":"cm:name"}"#)
                .unwrap();
        assert_eq!(arg, Argument::property("d", "cm:name"));
    }
}
