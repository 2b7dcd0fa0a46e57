//! Statically declared table models and the registry that resolves them by name.
//! PostgreSQL DDL is generated from the declarations.

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Serial,
    Integer,
    BigInt,
    Double,
    Text,
    Boolean,
    TimestampTz,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Serial => "SERIAL",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::TimestampTz => "TIMESTAMPTZ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            nullable: true,
            unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn ddl(&self) -> String {
        let mut out = format!("{} {}", quote_ident(&self.name), self.ty.sql());
        if self.primary_key {
            out.push_str(" PRIMARY KEY");
        } else {
            if !self.nullable {
                out.push_str(" NOT NULL");
            }
            if self.unique {
                out.push_str(" UNIQUE");
            }
        }
        out
    }
}

/// A table model: where it lives and which columns it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDef {
    pub class_name: String,
    pub table_name: String,
    pub schema_name: String,
    pub columns: Vec<ColumnDef>,
}

impl ModelDef {
    pub fn new(
        class_name: impl Into<String>,
        table_name: impl Into<String>,
        schema_name: impl Into<String>,
        columns: Vec<ColumnDef>,
    ) -> Result<Self, AppError> {
        let model = Self {
            class_name: class_name.into(),
            table_name: table_name.into(),
            schema_name: schema_name.into(),
            columns,
        };
        validate_ident(&model.table_name)?;
        validate_ident(&model.schema_name)?;
        for col in &model.columns {
            validate_ident(&col.name)?;
        }
        Ok(model)
    }

    /// `"schema"."table"`
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.schema_name, &self.table_name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn create_schema_sql(&self) -> String {
        format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema_name))
    }

    pub fn create_table_sql(&self) -> String {
        let cols: Vec<String> = self.columns.iter().map(ColumnDef::ddl).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.qualified_name(),
            cols.join(", ")
        )
    }
}

pub const CREDENTIALS_SCHEMA: &str = "credentials";
pub const LOGIN_TABLE: &str = "login_app";
pub const ANIMALS_SCHEMA: &str = "animals";
pub const ANIMAL_TABLE: &str = "animal";

fn login_app_model() -> ModelDef {
    ModelDef {
        class_name: "LoginApp".to_string(),
        table_name: LOGIN_TABLE.to_string(),
        schema_name: CREDENTIALS_SCHEMA.to_string(),
        columns: vec![
            ColumnDef::new("id", ColumnType::Serial).primary_key(),
            ColumnDef::new("username", ColumnType::Text).not_null().unique(),
            ColumnDef::new("password", ColumnType::Text).not_null(),
        ],
    }
}

fn animal_model() -> ModelDef {
    let taxonomy = [
        "domain",
        "kingdom",
        "phylum",
        "class",
        "order",
        "family",
        "genus",
    ];
    let mut columns = vec![
        ColumnDef::new("id", ColumnType::BigInt).primary_key(),
        ColumnDef::new("animal_class", ColumnType::Text).not_null(),
        ColumnDef::new("name", ColumnType::Text).not_null(),
        ColumnDef::new("age", ColumnType::Double).not_null(),
        ColumnDef::new("sex", ColumnType::Text),
        ColumnDef::new("species", ColumnType::Text).not_null(),
        ColumnDef::new("subspecies", ColumnType::Text).not_null(),
    ];
    columns.extend(
        taxonomy
            .iter()
            .map(|rank| ColumnDef::new(*rank, ColumnType::Text)),
    );
    ModelDef {
        class_name: "Animal".to_string(),
        table_name: ANIMAL_TABLE.to_string(),
        schema_name: ANIMALS_SCHEMA.to_string(),
        columns,
    }
}

/// All models the application knows about, looked up by table name.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    models: Vec<ModelDef>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self {
            models: vec![login_app_model(), animal_model()],
        }
    }
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self { models: Vec::new() }
    }

    /// Add or replace a model, keyed by schema and table.
    pub fn register(&mut self, model: ModelDef) {
        match self
            .models
            .iter_mut()
            .find(|m| m.table_name == model.table_name && m.schema_name == model.schema_name)
        {
            Some(existing) => *existing = model,
            None => self.models.push(model),
        }
    }

    pub fn models(&self) -> &[ModelDef] {
        &self.models
    }

    pub fn get_model_class_with_name(&self, table_name: &str) -> Result<&ModelDef, AppError> {
        self.models
            .iter()
            .find(|m| m.table_name == table_name)
            .ok_or_else(|| AppError::ModelNotFound(table_name.to_string()))
    }
}

/// Accept plain identifiers only: ASCII letters, digits and `_`, not starting with a digit.
pub fn validate_ident(ident: &str) -> Result<(), AppError> {
    let mut chars = ident.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if ok && ident.len() <= 63 {
        Ok(())
    } else {
        Err(AppError::InvalidIdentifier(ident.to_string()))
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}
