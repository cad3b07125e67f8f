//! Static description of the three record tables.
//!
//! The column accessor resolves field names against these tables instead of
//! trusting caller input, so every identifier that reaches SQL text comes
//! from here.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Manager,
    Vacancy,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    BigInt,
    Boolean,
    Timestamp,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Identifier and bookkeeping columns are read-only through the accessor.
    pub writable: bool,
}

const fn column(name: &'static str, column_type: ColumnType, nullable: bool) -> ColumnSpec {
    ColumnSpec {
        name,
        column_type,
        nullable,
        writable: true,
    }
}

const fn read_only(name: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec {
        name,
        column_type,
        nullable: false,
        writable: false,
    }
}

// The identifier column is always first.
const MANAGER_COLUMNS: &[ColumnSpec] = &[
    read_only("id", ColumnType::Text),
    column("username", ColumnType::Text, true),
    column("first_name", ColumnType::Text, true),
    column("last_name", ColumnType::Text, true),
    column("first_time_seen", ColumnType::Timestamp, true),
    column("privacy_policy_confirmed", ColumnType::Boolean, false),
    column("privacy_policy_confirmation_time", ColumnType::Timestamp, true),
    column("access_token_received", ColumnType::Boolean, false),
    column("access_token", ColumnType::Text, true),
    column("access_token_expires_at", ColumnType::Timestamp, true),
    column("hh_data", ColumnType::Json, true),
    read_only("created_at", ColumnType::Timestamp),
    read_only("updated_at", ColumnType::Timestamp),
];

const VACANCY_COLUMNS: &[ColumnSpec] = &[
    read_only("id", ColumnType::BigInt),
    read_only("manager_id", ColumnType::Text),
    column("name", ColumnType::Text, true),
    column("vacancy_description_received", ColumnType::Boolean, false),
    column("sourcing_criteria_received", ColumnType::Boolean, false),
    column("description_json", ColumnType::Json, true),
    column("sourcing_criteria_json", ColumnType::Json, true),
    read_only("created_at", ColumnType::Timestamp),
    read_only("updated_at", ColumnType::Timestamp),
];

const RESUME_COLUMNS: &[ColumnSpec] = &[
    read_only("id", ColumnType::Text),
    read_only("vacancy_id", ColumnType::BigInt),
    read_only("manager_id", ColumnType::Text),
    column("first_name", ColumnType::Text, true),
    column("last_name", ColumnType::Text, true),
    column("phone", ColumnType::Text, true),
    column("email", ColumnType::Text, true),
    column("ai_analysis", ColumnType::Json, true),
    column("resume_sorting_status", ColumnType::Text, false),
    column("link_to_tg_bot_sent", ColumnType::Boolean, false),
    column("resume_video_received", ColumnType::Boolean, false),
    column("resume_video_path", ColumnType::Text, true),
    column("resume_recommended", ColumnType::Boolean, false),
    column("resume_accepted", ColumnType::Boolean, true),
    column("interview_invitation_sent", ColumnType::Boolean, false),
    read_only("created_at", ColumnType::Timestamp),
    read_only("updated_at", ColumnType::Timestamp),
];

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Manager, RecordKind::Vacancy, RecordKind::Resume];

    pub fn name(self) -> &'static str {
        match self {
            RecordKind::Manager => "Manager",
            RecordKind::Vacancy => "Vacancy",
            RecordKind::Resume => "Resume",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Manager => "managers",
            RecordKind::Vacancy => "vacancies",
            RecordKind::Resume => "resumes",
        }
    }

    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            RecordKind::Manager => MANAGER_COLUMNS,
            RecordKind::Vacancy => VACANCY_COLUMNS,
            RecordKind::Resume => RESUME_COLUMNS,
        }
    }

    pub fn id_column(self) -> &'static ColumnSpec {
        &self.columns()[0]
    }

    pub fn column(self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns().iter().find(|c| c.name == name)
    }

    pub fn has_textual_id(self) -> bool {
        self.id_column().column_type == ColumnType::Text
    }

    /// Column stamped when a bare record is created from its identifier alone.
    /// `None` for kinds that cannot exist without parent references.
    pub fn creation_timestamp_column(self) -> Option<&'static str> {
        match self {
            RecordKind::Manager => Some("first_time_seen"),
            RecordKind::Vacancy | RecordKind::Resume => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Text(String),
    BigInt(i64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Json(JsonValue),
}

impl ColumnValue {
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Null => None,
            ColumnValue::Text(_) => Some(ColumnType::Text),
            ColumnValue::BigInt(_) => Some(ColumnType::BigInt),
            ColumnValue::Boolean(_) => Some(ColumnType::Boolean),
            ColumnValue::Timestamp(_) => Some(ColumnType::Timestamp),
            ColumnValue::Json(_) => Some(ColumnType::Json),
        }
    }

    /// Whether this value may be stored in `column`.
    pub fn fits(&self, column: &ColumnSpec) -> bool {
        match self.column_type() {
            None => column.nullable,
            Some(column_type) => column_type == column.column_type,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            ColumnValue::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Boolean(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::BigInt(value)
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(value: DateTime<Utc>) -> Self {
        ColumnValue::Timestamp(value)
    }
}

impl From<JsonValue> for ColumnValue {
    fn from(value: JsonValue) -> Self {
        ColumnValue::Json(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ColumnValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifier_column_comes_first_and_is_read_only() {
        for kind in RecordKind::ALL {
            let id = kind.id_column();
            assert_eq!(id.name, "id");
            assert!(!id.writable);
        }
    }

    #[test]
    fn only_vacancies_have_numeric_identifiers() {
        assert!(RecordKind::Manager.has_textual_id());
        assert!(RecordKind::Resume.has_textual_id());
        assert!(!RecordKind::Vacancy.has_textual_id());
    }

    #[test]
    fn unknown_columns_do_not_resolve() {
        assert!(RecordKind::Manager.column("privacy_policy_confirmed").is_some());
        assert!(RecordKind::Manager.column("password").is_none());
        assert!(RecordKind::Resume.column("managers.id").is_none());
    }

    #[test]
    fn values_fit_only_their_declared_type() {
        let flag = RecordKind::Manager.column("privacy_policy_confirmed").unwrap();
        assert!(ColumnValue::Boolean(true).fits(flag));
        assert!(!ColumnValue::from("true").fits(flag));
        assert!(!ColumnValue::Null.fits(flag));

        let token = RecordKind::Manager.column("access_token").unwrap();
        assert!(ColumnValue::Null.fits(token));
        assert!(ColumnValue::from("abc").fits(token));

        let hh_data = RecordKind::Manager.column("hh_data").unwrap();
        assert!(ColumnValue::from(json!({"employer": {"id": "1"}})).fits(hh_data));
    }

    #[test]
    fn option_values_map_none_to_null() {
        assert_eq!(ColumnValue::from(None::<String>), ColumnValue::Null);
        assert_eq!(
            ColumnValue::from(Some("ivan")),
            ColumnValue::Text("ivan".to_string())
        );
    }

    #[test]
    fn only_managers_can_be_created_bare() {
        assert_eq!(
            RecordKind::Manager.creation_timestamp_column(),
            Some("first_time_seen")
        );
        assert!(RecordKind::Vacancy.creation_timestamp_column().is_none());
        assert!(RecordKind::Resume.creation_timestamp_column().is_none());
    }
}
