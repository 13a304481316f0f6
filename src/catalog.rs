//! Known names: functions, tables and dialect keywords.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{TranslateError, TranslateResult};

const KUSTO_KEYWORDS: &str = include_str!("../data/kusto_keywords.txt");

/// Function and table names known to the source catalog.
///
/// The two lists may overlap; see [`NameUniverse::conflicts`].
#[derive(Debug, Clone, Default)]
pub struct NameUniverse {
    functions: Vec<String>,
    tables: Vec<String>,
    function_set: HashSet<String>,
    table_set: HashSet<String>,
}

impl NameUniverse {
    /// Build from two name lists. Duplicates are dropped, first occurrence kept.
    pub fn new<F, T>(functions: F, tables: T) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let (functions, function_set) = dedup(functions);
        let (tables, table_set) = dedup(tables);
        Self {
            functions,
            tables,
            function_set,
            table_set,
        }
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.function_set.contains(name)
    }

    pub fn is_table(&self, name: &str) -> bool {
        self.table_set.contains(name)
    }

    /// Known as a function or a table.
    pub fn contains(&self, name: &str) -> bool {
        self.is_function(name) || self.is_table(name)
    }

    /// Names registered as both a function and a table, in function-list order.
    pub fn conflicts(&self) -> Vec<&str> {
        self.functions
            .iter()
            .filter(|name| self.table_set.contains(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

fn dedup<I>(names: I) -> (Vec<String>, HashSet<String>)
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut ordered = Vec::new();
    let mut seen = HashSet::new();
    for name in names {
        let name = name.into();
        if seen.insert(name.clone()) {
            ordered.push(name);
        }
    }
    (ordered, seen)
}

/// Dialect keywords, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    words: HashSet<String>,
}

impl KeywordSet {
    /// Parse a newline-delimited keyword list. Blank lines are ignored.
    pub fn parse(text: &str) -> Self {
        let words = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_uppercase)
            .collect();
        Self { words }
    }

    /// Load a newline-delimited keyword list from disk.
    pub fn load(path: impl AsRef<Path>) -> TranslateResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            TranslateError::Catalog(format!("cannot read keywords {}: {}", path.display(), e))
        })?;
        let keywords = Self::parse(&text);
        tracing::debug!(count = keywords.len(), path = %path.display(), "loaded keywords");
        Ok(keywords)
    }

    /// The built-in Kusto keyword list.
    pub fn kusto() -> Self {
        Self::parse(KUSTO_KEYWORDS)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// A user-defined function as exported from the source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "Folder", default)]
    pub folder: String,
}

#[derive(Debug, Deserialize)]
struct TableRecord {
    #[serde(rename = "TableName")]
    table_name: String,
}

/// Load function records from a CSV file with a `Name` column and optional
/// `Body` and `Folder` columns. Bodies may span several lines.
pub fn load_functions(path: impl AsRef<Path>) -> TranslateResult<Vec<FunctionRecord>> {
    let records: Vec<FunctionRecord> = read_csv(path.as_ref())?;
    tracing::debug!(count = records.len(), "loaded function catalog");
    Ok(records)
}

/// Load table names from a CSV file with a `TableName` column.
pub fn load_table_names(path: impl AsRef<Path>) -> TranslateResult<Vec<String>> {
    let records: Vec<TableRecord> = read_csv(path.as_ref())?;
    tracing::debug!(count = records.len(), "loaded table catalog");
    Ok(records.into_iter().map(|r| r.table_name).collect())
}

fn read_csv<T: serde::de::DeserializeOwned>(path: &Path) -> TranslateResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| TranslateError::Catalog(format!("cannot open {}: {}", path.display(), e)))?;

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| TranslateError::Catalog(format!("invalid row in {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_follow_function_order() {
        let names = NameUniverse::new(["b", "a", "c", "a"], ["a", "b", "z"]);
        assert_eq!(names.functions(), &["b", "a", "c"]);
        assert_eq!(names.conflicts(), vec!["b", "a"]);
        assert!(names.contains("z"));
        assert!(!names.is_function("z"));
        assert!(!names.contains("q"));
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let keywords = KeywordSet::parse("where\nWHERE\n\n  Summarize \n");
        assert_eq!(keywords.len(), 2);
        assert!(keywords.contains("Where"));
        assert!(keywords.contains("summarize"));
        assert!(!keywords.contains("extend"));
    }

    #[test]
    fn test_builtin_kusto_keywords() {
        let keywords = KeywordSet::kusto();
        assert!(keywords.contains("project"));
        assert!(keywords.contains("ago"));
        assert!(keywords.contains("TABLE"));
    }
}
