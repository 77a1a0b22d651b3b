use dbsync_core::{
    ColumnDescriptor, ConnectionSpec, EngineKind, IndexDescriptor, PairSpec, Row,
    RoutineDescriptor, RoutineKind, TableDescriptor, Value,
};
use std::collections::HashSet;

pub fn column(name: impl Into<String>, type_name: impl Into<String>, primary_key: bool) -> ColumnDescriptor {
    ColumnDescriptor {
        name: name.into(),
        type_name: type_name.into(),
        nullable: !primary_key,
        default_expr: None,
        extra: String::new(),
        is_primary_key: primary_key,
    }
}

pub fn table(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> TableDescriptor {
    let name = name.into();
    let create_statement = format!(
        "CREATE TABLE \"{}\" ({})",
        name,
        columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.type_name))
            .collect::<Vec<_>>()
            .join(", ")
    );
    TableDescriptor {
        name,
        columns,
        indexes: Vec::new(),
        create_statement,
    }
}

pub fn index(name: impl Into<String>, columns: &[&str], unique: bool) -> IndexDescriptor {
    IndexDescriptor {
        name: name.into(),
        unique,
        columns: columns.iter().map(|c| c.to_string()).collect(),
        index_type: "BTREE".to_string(),
    }
}

pub fn routine(name: impl Into<String>, kind: RoutineKind, create_statement: impl Into<String>) -> RoutineDescriptor {
    RoutineDescriptor {
        name: name.into(),
        kind,
        create_statement: create_statement.into(),
    }
}

pub fn connection(name: impl Into<String>, engine: EngineKind) -> ConnectionSpec {
    ConnectionSpec {
        name: name.into(),
        engine,
        host: "localhost".to_string(),
        port: match engine {
            EngineKind::Mysql => 3306,
            EngineKind::Postgresql => 5432,
        },
        user: "test".to_string(),
        password: "test".to_string(),
        database: "test".to_string(),
    }
}

pub fn pair(name: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> PairSpec {
    PairSpec {
        name: name.into(),
        source_connection: source.into(),
        target_connection: target.into(),
        sync_schema: true,
        sync_data: true,
        sync_procedures: true,
        include_tables: HashSet::new(),
        exclude_tables: HashSet::new(),
        enabled: true,
        last_sync_at: None,
    }
}

pub fn row(values: Vec<Value>) -> Row {
    values
}

pub fn int_cell(value: i64) -> Value {
    Value::Int(value)
}

pub fn text_cell(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}
