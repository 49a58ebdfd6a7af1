//! Conference query filters: parsing, validation, and plan construction.
//!
//! User-supplied filters arrive as `(field, operator, value)` string
//! triples. Translation validates both enumerations, coerces values for
//! numeric fields, and enforces the single-inequality-field rule that
//! range queries over ordered indexes impose: every operator other than
//! EQ is an inequality, and all inequalities in one query must target
//! the same field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter references unrecognized field `{0}`")]
    UnknownField(String),
    #[error("filter references unrecognized operator `{0}`")]
    UnknownOperator(String),
    #[error("inequality filter is allowed on only one field")]
    MultipleInequalityFields,
    #[error("field `{field}` requires an integer value, got `{value}`")]
    NonNumericValue { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterField {
    City,
    Topic,
    Month,
    MaxAttendees,
}

impl FilterField {
    /// Column the field maps to in the conference table.
    pub fn column(self) -> &'static str {
        match self {
            FilterField::City => "city",
            FilterField::Topic => "topics",
            FilterField::Month => "month",
            FilterField::MaxAttendees => "max_attendees",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CITY" => Some(FilterField::City),
            "TOPIC" => Some(FilterField::Topic),
            "MONTH" => Some(FilterField::Month),
            "MAX_ATTENDEES" => Some(FilterField::MaxAttendees),
            _ => None,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, FilterField::Month | FilterField::MaxAttendees)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Eq,
    Gt,
    Gteq,
    Lt,
    Lteq,
    Ne,
}

impl FilterOperator {
    pub fn sql(self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Gt => ">",
            FilterOperator::Gteq => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lteq => "<=",
            FilterOperator::Ne => "!=",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "EQ" => Some(FilterOperator::Eq),
            "GT" => Some(FilterOperator::Gt),
            "GTEQ" => Some(FilterOperator::Gteq),
            "LT" => Some(FilterOperator::Lt),
            "LTEQ" => Some(FilterOperator::Lteq),
            "NE" => Some(FilterOperator::Ne),
            _ => None,
        }
    }

    pub fn is_inequality(self) -> bool {
        self != FilterOperator::Eq
    }
}

/// Raw filter triple exactly as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFilter {
    pub field: String,
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedFilter {
    pub field: FilterField,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

/// Validated query plan: the filters in submission order plus the one
/// field (if any) that inequality operators are pinned to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPlan {
    pub inequality_field: Option<FilterField>,
    pub filters: Vec<TranslatedFilter>,
}

impl QueryPlan {
    /// Sort keys the executor must apply, in order. A range query has to
    /// be primarily ordered by its inequality column; name is always the
    /// deterministic tie-break.
    pub fn order_columns(&self) -> Vec<&'static str> {
        match self.inequality_field {
            Some(field) => vec![field.column(), "name"],
            None => vec!["name"],
        }
    }
}

/// Translate raw filters into a [`QueryPlan`], preserving input order.
pub fn translate_filters(raw: &[RawFilter]) -> Result<QueryPlan, FilterError> {
    let mut inequality_field: Option<FilterField> = None;
    let mut filters = Vec::with_capacity(raw.len());

    for triple in raw {
        let field = FilterField::parse(&triple.field)
            .ok_or_else(|| FilterError::UnknownField(triple.field.clone()))?;
        let operator = FilterOperator::parse(&triple.operator)
            .ok_or_else(|| FilterError::UnknownOperator(triple.operator.clone()))?;

        if operator.is_inequality() {
            match inequality_field {
                Some(existing) if existing != field => {
                    return Err(FilterError::MultipleInequalityFields);
                }
                _ => inequality_field = Some(field),
            }
        }

        let value = if field.is_numeric() {
            let parsed =
                triple
                    .value
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| FilterError::NonNumericValue {
                        field: field.column(),
                        value: triple.value.clone(),
                    })?;
            FilterValue::Int(parsed)
        } else {
            FilterValue::Text(triple.value.clone())
        };

        filters.push(TranslatedFilter {
            field,
            operator,
            value,
        });
    }

    Ok(QueryPlan {
        inequality_field,
        filters,
    })
}
