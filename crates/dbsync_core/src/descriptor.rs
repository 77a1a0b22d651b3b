use serde::{Deserialize, Serialize};

/// One column of a [`TableDescriptor`], in ordinal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Engine-native type string (e.g. `varchar(255)`, `int unsigned`).
    pub type_name: String,
    pub nullable: bool,
    pub default_expr: Option<String>,
    /// Trailing clause beyond type/null/default (`AUTO_INCREMENT`, `GENERATED ...`).
    pub extra: String,
    pub is_primary_key: bool,
}

impl ColumnDescriptor {
    /// The column is a change-witness candidate (§4.2) if its lowercased
    /// name is a recognized timestamp-ish name, or its type mentions
    /// "timestamp".
    pub fn is_witness_candidate(&self) -> bool {
        const WITNESS_NAMES: [&str; 4] =
            ["updated_at", "modified_at", "timestamp", "last_modified"];
        let lower_name = self.name.to_lowercase();
        if WITNESS_NAMES.contains(&lower_name.as_str()) {
            return true;
        }
        self.type_name.to_lowercase().contains("timestamp")
    }
}

/// An index on a [`TableDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub unique: bool,
    /// Column names in index-key order.
    pub columns: Vec<String>,
    /// Engine-reported index type (`BTREE`, `HASH`, ...). Empty if unknown.
    pub index_type: String,
}

/// A table as seen through introspection, with a cached canonical CREATE
/// statement used as the identity of the table for diff purposes (§3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
    pub create_statement: String,
}

impl TableDescriptor {
    pub fn primary_key_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
    }

    /// The first column that qualifies as a change-witness column (§4.2,
    /// GLOSSARY). Columns are scanned in ordinal order; the first match wins.
    pub fn witness_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.is_witness_candidate())
            .map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutineKind {
    Procedure,
    Function,
    Trigger,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Trigger => "TRIGGER",
        }
    }
}

/// A stored procedure, function, or trigger. The CREATE statement is the
/// sole authority for "sameness" between source and target (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineDescriptor {
    pub name: String,
    pub kind: RoutineKind,
    pub create_statement: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, type_name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            type_name: type_name.to_string(),
            nullable: true,
            default_expr: None,
            extra: String::new(),
            is_primary_key: false,
        }
    }

    #[test]
    fn witness_candidate_matches_known_names_case_insensitively() {
        assert!(col("UPDATED_AT", "datetime").is_witness_candidate());
        assert!(col("Timestamp", "int").is_witness_candidate());
        assert!(!col("name", "varchar(20)").is_witness_candidate());
    }

    #[test]
    fn witness_candidate_matches_timestamp_type_substring() {
        assert!(col("last_seen", "TIMESTAMP(6)").is_witness_candidate());
        assert!(col("seen_at", "timestamptz").is_witness_candidate());
    }

    #[test]
    fn table_witness_column_picks_first_match_in_ordinal_order() {
        let table = TableDescriptor {
            name: "orders".into(),
            columns: vec![
                col("id", "int"),
                col("created_at", "timestamp"),
                col("updated_at", "timestamp"),
            ],
            indexes: vec![],
            create_statement: String::new(),
        };
        assert_eq!(table.witness_column(), Some("created_at"));
    }

    #[test]
    fn table_primary_key_column_returns_none_without_pk() {
        let table = TableDescriptor {
            name: "logs".into(),
            columns: vec![col("message", "text")],
            indexes: vec![],
            create_statement: String::new(),
        };
        assert_eq!(table.primary_key_column(), None);
    }
}
