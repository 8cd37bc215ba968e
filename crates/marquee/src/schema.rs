//! Explicit schema descriptors.
//!
//! The mapping from entity field names to column names is declared once by
//! the caller and threaded into every builder, instead of being recovered
//! from entity types at runtime. Builders validate table and column names
//! against the descriptor before any SQL is rendered.
//!
//! ```ignore
//! use marquee::{Column, PgType, Schema, Table};
//!
//! let schema = Schema::new().table(
//!     Table::new("genres")
//!         .column(Column::new("GenreId", PgType::Integer).primary_key().auto_generated())
//!         .column(Column::new("Name", PgType::Text)),
//! );
//! ```

/// Postgres column types understood by the row mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Numeric,
    Text,
    Bytea,
}

impl PgType {
    pub fn as_sql(self) -> &'static str {
        match self {
            PgType::Boolean => "BOOLEAN",
            PgType::SmallInt => "SMALLINT",
            PgType::Integer => "INTEGER",
            PgType::BigInt => "BIGINT",
            PgType::Real => "REAL",
            PgType::DoublePrecision => "DOUBLE PRECISION",
            PgType::Numeric => "NUMERIC",
            PgType::Text => "TEXT",
            PgType::Bytea => "BYTEA",
        }
    }
}

/// One column of a table.
#[derive(Debug, Clone)]
pub struct Column {
    /// Entity field name, as callers refer to it.
    pub field: String,
    /// Column name in Postgres.
    pub name: String,
    pub pg_type: PgType,
    pub nullable: bool,
    pub primary_key: bool,
    /// The database assigns the value (SERIAL / identity).
    pub auto_generated: bool,
}

impl Column {
    /// A NOT NULL column whose field name equals its column name.
    pub fn new(name: impl Into<String>, pg_type: PgType) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            pg_type,
            nullable: false,
            primary_key: false,
            auto_generated: false,
        }
    }

    /// Override the entity field name this column maps from.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_generated(mut self) -> Self {
        self.auto_generated = true;
        self
    }
}

/// A foreign key reference.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// One table of the schema.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(
        mut self,
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        });
        self
    }

    /// Look up a column by entity field name or column name.
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.field == name || c.name == name)
    }

    /// The primary key column, if declared.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

/// A set of tables.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}
