use super::error::FilterError;
use super::types::{is_valid_identifier, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses `"id asc"` or `"neighborhood, id desc"`; direction defaults to ascending.
    pub fn validate_and_parse(order: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut infos = Vec::new();
        for part in order.split(',') {
            let mut it = part.split_whitespace();
            let Some(column) = it.next() else { continue };
            if !is_valid_identifier(column) {
                return Err(FilterError::InvalidColumn(column.to_string()));
            }
            infos.push(FilterOrderInfo {
                column: column.to_string(),
                sort: Self::parse_direction(it.next().unwrap_or("asc")),
            });
        }
        Ok(infos)
    }

    fn parse_direction(dir: &str) -> SortDirection {
        if dir.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_columns_and_directions() {
        let infos = FilterOrder::validate_and_parse("neighborhood, id DESC").unwrap();
        assert_eq!(
            FilterOrder::generate(&infos),
            "ORDER BY \"neighborhood\" ASC, \"id\" DESC"
        );
    }

    #[test]
    fn rejects_quoted_columns() {
        let err = FilterOrder::validate_and_parse("id\" desc; --").unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }
}
