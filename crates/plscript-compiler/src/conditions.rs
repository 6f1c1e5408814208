//! Exception condition names.
//!
//! EXCEPTION clauses name conditions either by a literal SQLSTATE or by one
//! of the standard condition names below. A few names map to more than one
//! SQLSTATE, so [`parse_condition`] returns every match; the handler fires
//! on any of them. `OTHERS` is special: it matches every error that can be
//! trapped at all.

use plscript_core::{CompileError, SqlState};

type Result<T> = std::result::Result<T, CompileError>;

/// What one parsed condition entry matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionMatch {
    /// Every trappable error.
    Others,
    /// Errors with exactly this SQLSTATE.
    SqlState(SqlState),
}

/// One condition of an exception handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub name: String,
    pub matcher: ConditionMatch,
}

/// The standard condition names. Some names appear more than once; they
/// match under any of their codes.
const CONDITION_NAMES: &[(&str, &str)] = &[
    ("string_data_right_truncation", "01004"),
    ("connection_exception", "08000"),
    ("connection_does_not_exist", "08003"),
    ("connection_failure", "08006"),
    ("triggered_action_exception", "09000"),
    ("feature_not_supported", "0A000"),
    ("cardinality_violation", "21000"),
    ("data_exception", "22000"),
    ("string_data_right_truncation", "22001"),
    ("numeric_value_out_of_range", "22003"),
    ("null_value_not_allowed", "22004"),
    ("invalid_datetime_format", "22007"),
    ("datetime_field_overflow", "22008"),
    ("division_by_zero", "22012"),
    ("string_data_length_mismatch", "22026"),
    ("array_subscript_error", "2202E"),
    ("invalid_text_representation", "22P02"),
    ("integrity_constraint_violation", "23000"),
    ("not_null_violation", "23502"),
    ("foreign_key_violation", "23503"),
    ("unique_violation", "23505"),
    ("check_violation", "23514"),
    ("exclusion_violation", "23P01"),
    ("invalid_cursor_state", "24000"),
    ("invalid_transaction_state", "25000"),
    ("active_sql_transaction", "25001"),
    ("no_active_sql_transaction", "25P01"),
    ("in_failed_sql_transaction", "25P02"),
    ("invalid_sql_statement_name", "26000"),
    ("invalid_authorization_specification", "28000"),
    ("invalid_transaction_termination", "2D000"),
    ("modifying_sql_data_not_permitted", "2F002"),
    ("prohibited_sql_statement_attempted", "2F003"),
    ("reading_sql_data_not_permitted", "2F004"),
    ("invalid_cursor_name", "34000"),
    ("external_routine_invocation_exception", "39000"),
    ("null_value_not_allowed", "39004"),
    ("modifying_sql_data_not_permitted", "38002"),
    ("prohibited_sql_statement_attempted", "38003"),
    ("reading_sql_data_not_permitted", "38004"),
    ("invalid_catalog_name", "3D000"),
    ("invalid_schema_name", "3F000"),
    ("transaction_rollback", "40000"),
    ("serialization_failure", "40001"),
    ("transaction_integrity_constraint_violation", "40002"),
    ("deadlock_detected", "40P01"),
    ("syntax_error_or_access_rule_violation", "42000"),
    ("insufficient_privilege", "42501"),
    ("syntax_error", "42601"),
    ("invalid_name", "42602"),
    ("name_too_long", "42622"),
    ("duplicate_column", "42701"),
    ("ambiguous_column", "42702"),
    ("undefined_column", "42703"),
    ("undefined_object", "42704"),
    ("duplicate_object", "42710"),
    ("duplicate_alias", "42712"),
    ("duplicate_function", "42723"),
    ("ambiguous_function", "42725"),
    ("grouping_error", "42803"),
    ("datatype_mismatch", "42804"),
    ("wrong_object_type", "42809"),
    ("invalid_foreign_key", "42830"),
    ("cannot_coerce", "42846"),
    ("undefined_function", "42883"),
    ("reserved_name", "42939"),
    ("undefined_table", "42P01"),
    ("undefined_parameter", "42P02"),
    ("duplicate_cursor", "42P03"),
    ("duplicate_database", "42P04"),
    ("ambiguous_parameter", "42P08"),
    ("ambiguous_alias", "42P09"),
    ("invalid_column_reference", "42P10"),
    ("invalid_cursor_definition", "42P11"),
    ("invalid_function_definition", "42P13"),
    ("indeterminate_datatype", "42P18"),
    ("invalid_recursion", "42P19"),
    ("windowing_error", "42P20"),
    ("insufficient_resources", "53000"),
    ("disk_full", "53100"),
    ("out_of_memory", "53200"),
    ("too_many_connections", "53300"),
    ("program_limit_exceeded", "54000"),
    ("object_not_in_prerequisite_state", "55000"),
    ("object_in_use", "55006"),
    ("query_canceled", "57014"),
    ("io_error", "58030"),
    ("routine_exception", "P0000"),
    ("raise_exception", "P0001"),
    ("no_data_found", "P0002"),
    ("too_many_rows", "P0003"),
    ("assert_failure", "P0004"),
    ("internal_error", "XX000"),
];

/// Translate a condition name to its SQLSTATE.
///
/// With `allow_sqlstate`, a literal five-character code is accepted as-is.
/// Where the same name has several entries, the first one wins, matching the
/// historical behavior callers depend on.
pub fn recognize_condition(name: &str, allow_sqlstate: bool) -> Result<SqlState> {
    if allow_sqlstate
        && let Some(state) = SqlState::from_code(name)
    {
        return Ok(state);
    }

    for (label, code) in CONDITION_NAMES {
        if *label == name {
            return Ok(SqlState::from_code(code).expect("condition table codes are well-formed"));
        }
    }

    Err(CompileError::definition(format!(
        "unrecognized exception condition \"{name}\""
    )))
}

/// Expand a condition name into every entry it matches.
///
/// `others` yields the catch-all matcher. Anything else yields one entry per
/// table row carrying the name, and duplicate names exist, so the result is
/// a list.
pub fn parse_condition(name: &str) -> Result<Vec<Condition>> {
    if name == "others" {
        return Ok(vec![Condition {
            name: name.to_string(),
            matcher: ConditionMatch::Others,
        }]);
    }

    let matches: Vec<Condition> = CONDITION_NAMES
        .iter()
        .filter(|(label, _)| *label == name)
        .map(|(label, code)| Condition {
            name: (*label).to_string(),
            matcher: ConditionMatch::SqlState(
                SqlState::from_code(code).expect("condition table codes are well-formed"),
            ),
        })
        .collect();

    if matches.is_empty() {
        return Err(CompileError::definition(format!(
            "unrecognized exception condition \"{name}\""
        )));
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_standard_names() {
        let state = recognize_condition("division_by_zero", false).unwrap();
        assert_eq!(state.as_str(), "22012");
    }

    #[test]
    fn sqlstate_literals_gated_by_flag() {
        assert_eq!(
            recognize_condition("P0001", true).unwrap().as_str(),
            "P0001"
        );
        // without the flag, a literal code is just an unknown name
        assert!(recognize_condition("P0001", false).is_err());
    }

    #[test]
    fn duplicate_names_expand_to_all_codes() {
        let conditions = parse_condition("string_data_right_truncation").unwrap();
        let codes: Vec<&str> = conditions
            .iter()
            .map(|c| match &c.matcher {
                ConditionMatch::SqlState(s) => s.as_str(),
                ConditionMatch::Others => "others",
            })
            .collect();
        assert_eq!(codes, vec!["01004", "22001"]);

        // recognize_condition arbitrarily returns the first
        assert_eq!(
            recognize_condition("string_data_right_truncation", false)
                .unwrap()
                .as_str(),
            "01004"
        );
    }

    #[test]
    fn others_is_special() {
        let conditions = parse_condition("others").unwrap();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].matcher, ConditionMatch::Others);
    }

    #[test]
    fn unknown_names_fail() {
        let err = parse_condition("no_such_condition").unwrap_err();
        assert!(matches!(err, CompileError::Definition { .. }));
    }
}
