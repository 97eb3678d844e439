use thiserror::Error;

/// Rejections raised while turning filter data into SQL
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("table name '{0}' is not a valid identifier")]
    InvalidTableName(String),

    #[error("column name '{0}' is not a valid identifier")]
    InvalidColumn(String),

    #[error("malformed where clause: {0}")]
    InvalidWhereClause(String),

    #[error("operator {0} is not supported")]
    UnsupportedOperator(String),

    #[error("bad operand: {0}")]
    InvalidOperatorData(String),

    #[error("invalid paging: {0}")]
    InvalidPaging(String),
}
