//! Sheet → table resolution for import

use crate::error::{InterchangeError, InterchangeResult};
use crate::registry::{SheetResolution, TableRegistry};

/// Where one sheet should be imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetTarget {
    Table(String),
    /// Not imported; the sheet name goes to the report's unmatched list
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    Ambiguous(Vec<String>),
}

/// Resolves sheet names to table ids, or sends every sheet to one table
#[derive(Debug, Clone)]
pub struct SheetMatcher<'a> {
    registry: &'a TableRegistry,
    explicit: Option<String>,
}

impl<'a> SheetMatcher<'a> {
    /// Matcher for auto-detect mode (`explicit == None`) or single-table
    /// mode. An explicit table must exist in the registry.
    pub fn new(registry: &'a TableRegistry, explicit: Option<&str>) -> InterchangeResult<Self> {
        if let Some(table_id) = explicit {
            if !registry.contains(table_id) {
                return Err(InterchangeError::UnknownTable(table_id.to_string()));
            }
        }
        Ok(Self {
            registry,
            explicit: explicit.map(str::to_string),
        })
    }

    pub fn resolve(&self, sheet_name: &str) -> SheetTarget {
        if let Some(table_id) = &self.explicit {
            return SheetTarget::Table(table_id.clone());
        }
        match self.registry.resolve_by_sheet_name(sheet_name) {
            SheetResolution::Table(id) => SheetTarget::Table(id),
            SheetResolution::Ambiguous(candidates) => {
                SheetTarget::Skip(SkipReason::Ambiguous(candidates))
            }
            SheetResolution::NotFound => SheetTarget::Skip(SkipReason::NotFound),
        }
    }
}
