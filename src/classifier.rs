//! Identifier classification for function bodies.
//!
//! A name registered as both a function and a table is resolved per body:
//! it is a table wherever the body wraps it as `table('<name>')`, otherwise a
//! function. The same name may resolve differently in different bodies.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::catalog::{FunctionRecord, NameUniverse};
use crate::cleaner;
use crate::error::TranslateResult;
use crate::lexer::{self, TokenKind};

static TABLE_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"table\((?:'(\w+)'|"(\w+)")\)"#).expect("table wrapper pattern")
});

/// How the conflicting names of one body were resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub functions: BTreeSet<String>,
    pub tables: BTreeSet<String>,
}

/// Resolve every conflicting name for `body`.
pub fn resolve(body: &str, names: &NameUniverse) -> Resolution {
    let mut resolution = Resolution::default();
    for name in names.conflicts() {
        if is_table_wrapped(body, name) {
            resolution.tables.insert(name.to_string());
        } else {
            resolution.functions.insert(name.to_string());
        }
    }
    resolution
}

fn is_table_wrapped(body: &str, name: &str) -> bool {
    body.contains(&format!("table('{name}')")) || body.contains(&format!("table(\"{name}\")"))
}

/// Functions called in `body`: identifiers followed by `(` or whitespace that
/// are known functions and were not resolved as tables.
pub fn used_functions(
    body: &str,
    names: &NameUniverse,
    resolution: &Resolution,
) -> TranslateResult<BTreeSet<String>> {
    let tokens = lexer::tokenize(body)?;
    Ok(tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Identifier)
        .filter(|t| !lexer::preceded_by_hyphen(body, t))
        .filter(|t| lexer::followed_by_call_or_space(body, t))
        .filter(|t| names.is_function(t.text) && !resolution.tables.contains(t.text))
        .map(|t| t.text.to_string())
        .collect())
}

/// Tables referenced in `body`, either through a `table('...')` wrapper or
/// as a bare identifier, excluding names resolved as functions.
pub fn used_tables(
    body: &str,
    names: &NameUniverse,
    resolution: &Resolution,
) -> TranslateResult<BTreeSet<String>> {
    let tokens = lexer::tokenize(body)?;

    let wrapped = TABLE_WRAPPER
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str());
    let bare = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Identifier)
        .filter(|t| !lexer::preceded_by_hyphen(body, t))
        .map(|t| t.text);

    Ok(wrapped
        .chain(bare)
        .filter(|name| names.is_table(name) && !resolution.functions.contains(*name))
        .map(str::to_string)
        .collect())
}

/// A stored function with its dependencies resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub folder: String,
    /// Cleaned body without its outer braces.
    pub body: String,
    pub resolution: Resolution,
    pub used_functions: BTreeSet<String>,
    pub used_tables: BTreeSet<String>,
}

impl FunctionDef {
    pub fn new(
        name: impl Into<String>,
        raw_body: &str,
        folder: impl Into<String>,
        names: &NameUniverse,
    ) -> TranslateResult<Self> {
        let body = clean_body(raw_body);
        let resolution = resolve(&body, names);
        let used_functions = used_functions(&body, names, &resolution)?;
        let used_tables = used_tables(&body, names, &resolution)?;

        Ok(Self {
            name: name.into(),
            folder: folder.into(),
            body,
            resolution,
            used_functions,
            used_tables,
        })
    }

    /// Build definitions for every record of a function catalog.
    ///
    /// A record whose body cannot be tokenized is logged and skipped.
    pub fn from_catalog(records: &[FunctionRecord], names: &NameUniverse) -> Vec<Self> {
        records
            .iter()
            .filter_map(|r| match Self::new(&r.name, &r.body, &r.folder, names) {
                Ok(def) => Some(def),
                Err(e) => {
                    tracing::warn!(
                        function = %r.name,
                        error = %e,
                        "skipping function with malformed body"
                    );
                    None
                }
            })
            .collect()
    }
}

fn clean_body(body: &str) -> String {
    let body = body
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}');
    cleaner::clean(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;

    fn names() -> NameUniverse {
        NameUniverse::new(["Helper", "Shared"], ["Events", "Shared"])
    }

    #[test]
    fn test_unterminated_literal_is_malformed() {
        let body = "Events | where Name == 'abc";
        let resolution = resolve(body, &names());
        assert!(matches!(
            used_functions(body, &names(), &resolution),
            Err(TranslateError::MalformedQuery { position: 23, .. })
        ));
        assert!(matches!(
            used_tables(body, &names(), &resolution),
            Err(TranslateError::MalformedQuery { position: 23, .. })
        ));
    }

    #[test]
    fn test_conflict_resolved_as_table_when_wrapped() {
        let resolution = resolve("table('Shared') | count", &names());
        assert!(resolution.tables.contains("Shared"));
        assert!(resolution.functions.is_empty());
    }

    #[test]
    fn test_conflict_resolved_as_function_when_called() {
        let resolution = resolve("Shared(1) | count", &names());
        assert!(resolution.functions.contains("Shared"));
        assert!(resolution.tables.is_empty());
    }

    #[test]
    fn test_used_sets() {
        let names = names();
        let body = "Events | join (Helper (1)) on Id | union table(\"Shared\")";
        let resolution = resolve(body, &names);
        let functions = used_functions(body, &names, &resolution).unwrap();
        let tables = used_tables(body, &names, &resolution).unwrap();

        assert_eq!(functions, BTreeSet::from(["Helper".to_string()]));
        assert_eq!(
            tables,
            BTreeSet::from(["Events".to_string(), "Shared".to_string()])
        );
    }

    #[test]
    fn test_hyphenated_fragment_is_not_a_call() {
        let names = NameUniverse::new(["away"], ["away"]);
        let body = "T | project-away (x)";
        let resolution = resolve(body, &names);
        assert!(used_functions(body, &names, &resolution).unwrap().is_empty());
        assert!(used_tables(body, &names, &resolution).unwrap().is_empty());
    }

    #[test]
    fn test_function_def_strips_braces() {
        let def = FunctionDef::new("F", "{\n    Events\n    | where x > 1\n}", "Ops", &names())
            .unwrap();
        assert_eq!(def.body, "Events\n| where x > 1");
        assert_eq!(def.used_tables, BTreeSet::from(["Events".to_string()]));
        assert_eq!(def.folder, "Ops");
    }
}
