//! Table registry
//!
//! Static catalog of the tables the interchange engine knows about. The
//! registry is built once at process start, either from the built-in
//! catalog or from a YAML catalog file, and is immutable afterwards.
//!
//! Sheet names are resolved to tables in two passes:
//! 1. exact, case-insensitive match on the canonical sheet name or an alias
//! 2. normalized match (diacritics folded, punctuation dropped, plurals
//!    folded) on the canonical sheet name, the table id or an alias
//!
//! More than one table matching in the deciding pass is reported as
//! [`SheetResolution::Ambiguous`], never guessed.

mod catalog;

pub use catalog::{builtin_schemas, BUILTIN_TABLE_IDS};

use crate::error::{InterchangeError, InterchangeResult};
use crate::types::TableSchema;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Characters Excel refuses in worksheet names
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Outcome of resolving a sheet name against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetResolution {
    Table(String),
    Ambiguous(Vec<String>),
    NotFound,
}

#[derive(Deserialize)]
struct CatalogFile {
    tables: Vec<TableSchema>,
}

/// Catalog of table schemas
#[derive(Debug, Clone)]
pub struct TableRegistry {
    schemas: Vec<TableSchema>,
    index: HashMap<String, usize>,
}

impl TableRegistry {
    /// Registry with the application's built-in tables
    pub fn builtin() -> Self {
        let schemas = builtin_schemas();
        let index = schemas
            .iter()
            .enumerate()
            .map(|(position, schema)| (schema.id.clone(), position))
            .collect();
        Self { schemas, index }
    }

    /// Build a registry from explicit schemas, validating the catalog
    pub fn from_schemas(schemas: Vec<TableSchema>) -> InterchangeResult<Self> {
        let mut index = HashMap::new();
        let mut sheet_names = HashSet::new();

        for (position, schema) in schemas.iter().enumerate() {
            validate_schema(schema)?;
            if index.insert(schema.id.clone(), position).is_some() {
                return Err(InterchangeError::Registry(format!(
                    "table '{}' is declared twice",
                    schema.id
                )));
            }
            if !sheet_names.insert(schema.sheet_name.to_lowercase()) {
                return Err(InterchangeError::Registry(format!(
                    "sheet name '{}' is used by more than one table",
                    schema.sheet_name
                )));
            }
        }

        Ok(Self { schemas, index })
    }

    /// Parse a YAML catalog (`tables:` list of schemas)
    pub fn from_yaml_str(yaml: &str) -> InterchangeResult<Self> {
        let catalog: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::from_schemas(catalog.tables)
    }

    /// Load a YAML catalog from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> InterchangeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Look up a table schema by id
    pub fn lookup(&self, table_id: &str) -> InterchangeResult<&TableSchema> {
        self.get(table_id)
            .ok_or_else(|| InterchangeError::UnknownTable(table_id.to_string()))
    }

    pub fn get(&self, table_id: &str) -> Option<&TableSchema> {
        self.index.get(table_id).map(|&i| &self.schemas[i])
    }

    pub fn contains(&self, table_id: &str) -> bool {
        self.index.contains_key(table_id)
    }

    /// All table ids, in catalog order
    pub fn all_table_ids(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn schemas(&self) -> &[TableSchema] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Resolve a workbook sheet name to a table id
    pub fn resolve_by_sheet_name(&self, sheet_name: &str) -> SheetResolution {
        let wanted = sheet_name.trim();

        let exact: Vec<&str> = self
            .schemas
            .iter()
            .filter(|schema| {
                std::iter::once(&schema.sheet_name)
                    .chain(schema.aliases.iter())
                    .any(|candidate| same_name(candidate, wanted))
            })
            .map(|schema| schema.id.as_str())
            .collect();
        if !exact.is_empty() {
            return Self::decide(exact);
        }

        let normalized = normalize_sheet_name(wanted);
        if normalized.is_empty() {
            return SheetResolution::NotFound;
        }

        let fuzzy: Vec<&str> = self
            .schemas
            .iter()
            .filter(|schema| {
                std::iter::once(&schema.sheet_name)
                    .chain(std::iter::once(&schema.id))
                    .chain(schema.aliases.iter())
                    .any(|candidate| normalize_sheet_name(candidate) == normalized)
            })
            .map(|schema| schema.id.as_str())
            .collect();
        Self::decide(fuzzy)
    }

    fn decide(matches: Vec<&str>) -> SheetResolution {
        match matches.as_slice() {
            [] => SheetResolution::NotFound,
            [single] => SheetResolution::Table(single.to_string()),
            many => SheetResolution::Ambiguous(many.iter().map(|s| s.to_string()).collect()),
        }
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn validate_schema(schema: &TableSchema) -> InterchangeResult<()> {
    let invalid = |message: String| Err(InterchangeError::Registry(message));

    if schema.id.trim().is_empty() {
        return invalid("table id must not be empty".to_string());
    }
    if schema.columns.is_empty() {
        return invalid(format!("table '{}' has no columns", schema.id));
    }

    let sheet = schema.sheet_name.trim();
    if sheet.is_empty()
        || sheet.chars().count() > MAX_SHEET_NAME_CHARS
        || sheet.contains(&FORBIDDEN_SHEET_CHARS[..])
    {
        return invalid(format!(
            "table '{}' has an invalid sheet name '{}'",
            schema.id, schema.sheet_name
        ));
    }

    let mut seen = HashSet::new();
    for column in &schema.columns {
        if column.name.trim().is_empty() {
            return invalid(format!("table '{}' has an unnamed column", schema.id));
        }
        if !seen.insert(column.name.to_lowercase()) {
            return invalid(format!(
                "table '{}' declares column '{}' twice",
                schema.id, column.name
            ));
        }
    }

    if schema.column(&schema.primary_key).is_none() {
        return invalid(format!(
            "primary key '{}' is not a column of table '{}'",
            schema.primary_key, schema.id
        ));
    }

    Ok(())
}

/// Fold a sheet name for fuzzy matching
///
/// Lowercases, folds Latin diacritics, splits on anything that is not a
/// letter or digit, drops a plural `s` from words longer than three
/// characters and joins the words.
pub fn normalize_sheet_name(name: &str) -> String {
    let folded: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .collect();

    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            if word.chars().count() > 3 && word.ends_with('s') {
                &word[..word.len() - 1]
            } else {
                word
            }
        })
        .collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}
