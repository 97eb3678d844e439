use serde_json::Value;

use super::error::FilterError;
use super::types::{is_valid_identifier, FilterOp};

/// Translates a JSON where-document into a parameterized SQL predicate.
///
/// Field keys compare a column (`{ "active": true }` is implicit `$eq`), `$`-prefixed keys
/// combine sub-documents (`$or`). Sibling keys are joined with `AND`.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_offset: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_offset: starting_param_index,
        }
    }

    /// Returns the predicate (empty when there is nothing to filter on) and its bind values.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let clause = filter_where.build_document(where_data)?;
        Ok((clause, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build_document(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(String::new()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut parts = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                parts.push(self.build_logical(key, value)?);
            } else {
                parts.extend(self.build_field(key, value)?);
            }
        }
        Ok(parts.join(" AND "))
    }

    fn build_logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        if op != "$or" {
            return Err(FilterError::UnsupportedOperator(op.to_string()));
        }
        let arr = value
            .as_array()
            .ok_or_else(|| FilterError::InvalidOperatorData("$or requires array".to_string()))?;
        let mut sql_parts = Vec::new();
        for v in arr {
            let sql = self.build_document(v)?;
            if !sql.is_empty() {
                sql_parts.push(format!("({})", sql));
            }
        }
        if sql_parts.is_empty() {
            // Empty disjunction matches nothing
            return Ok("1=0".to_string());
        }
        Ok(format!("({})", sql_parts.join(" OR ")))
    }

    fn build_field(&mut self, field: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        if !is_valid_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }

        match value {
            Value::Object(obj) => {
                let mut out = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    out.push(self.build_condition(field, operator, op_val)?);
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            other => Ok(vec![self.build_condition(field, FilterOp::Eq, other)?]),
        }
    }

    fn build_condition(&mut self, column: &str, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", column);
        match operator {
            FilterOp::Eq if data.is_null() => Ok(format!("{} IS NULL", quoted_column)),
            FilterOp::ILike if !data.is_string() => Err(FilterError::InvalidOperatorData(
                "ILIKE requires a string pattern".to_string(),
            )),
            _ if data.is_array() || data.is_object() => Err(FilterError::InvalidOperatorData(format!(
                "{} requires a scalar value",
                operator.to_sql()
            ))),
            _ => {
                let placeholder = self.param(data.clone());
                Ok(format!("{} {} {}", quoted_column, operator.to_sql(), placeholder))
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        format!("${}", self.param_offset + self.param_values.len())
    }
}
