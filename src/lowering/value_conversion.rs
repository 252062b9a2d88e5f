//! Type-directed conversion of query literals into command values

use super::command::ScalarValue;
use super::errors::LoweringError;
use crate::dictionary::DataTypeKind;
use crate::query_model::LiteralValue;

/// Convert a literal compared against a property of kind `data_type`
pub fn convert_literal(
    property: &str,
    data_type: DataTypeKind,
    value: &LiteralValue,
) -> Result<ScalarValue, LoweringError> {
    let conversion_error = || LoweringError::Conversion {
        property: property.to_string(),
        value: value.to_string(),
        target: data_type,
    };

    match data_type {
        DataTypeKind::Int | DataTypeKind::Long => {
            let parsed = match value {
                LiteralValue::Integer(i) => *i,
                LiteralValue::Text(s) => s.trim().parse::<i64>().map_err(|_| conversion_error())?,
                // `as` saturates; i64::MAX as f64 is 2^63, hence the open upper bound
                LiteralValue::Float(x)
                    if x.fract() == 0.0 && *x >= i64::MIN as f64 && *x < i64::MAX as f64 =>
                {
                    *x as i64
                }
                LiteralValue::Float(_) | LiteralValue::Boolean(_) => return Err(conversion_error()),
            };
            if data_type == DataTypeKind::Int && i32::try_from(parsed).is_err() {
                return Err(conversion_error());
            }
            Ok(ScalarValue::Long(parsed))
        }
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
        | DataTypeKind::Category => Ok(ScalarValue::Text(value.to_string())),
        other => Err(LoweringError::UnsupportedPropertyType {
            property: property.to_string(),
            data_type: other,
        }),
    }
}

/// `Like` patterns are matched as text whatever the property kind
pub fn convert_pattern(value: &LiteralValue) -> ScalarValue {
    ScalarValue::Text(value.to_string())
}
