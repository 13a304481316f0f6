use adx_translate::catalog::{self, NameUniverse};
use adx_translate::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

const FUNCTIONS_CSV: &str = r#"Name,Body,Folder
GetErrors,"{
    Events
    | where Level == ""Error""
}",Ops
Shared,"{ table('Shared') | take 5 }",
Wrapper,"{ GetErrors() | join (Shared(1)) on Id }",Ops
"#;

const MALFORMED_FUNCTIONS_CSV: &str = r#"Name,Body,Folder
A,"{ Events | take 1 }",
B,"{ Events | where p == 'abc }",
C,"{ A() | count }",
"#;

const TABLES_CSV: &str = "TableName,Retention\nEvents,30\nShared,7\n";

#[test]
fn test_load_catalog_and_dependencies() {
    let functions = write_file(FUNCTIONS_CSV);
    let tables = write_file(TABLES_CSV);

    let records = catalog::load_functions(functions.path()).expect("Failed to load functions");
    let table_names = catalog::load_table_names(tables.path()).expect("Failed to load tables");
    assert_eq!(records.len(), 3);
    assert_eq!(table_names, vec!["Events", "Shared"]);

    let names = NameUniverse::new(records.iter().map(|r| r.name.clone()), table_names);
    assert_eq!(names.conflicts(), vec!["Shared"]);

    let defs = FunctionDef::from_catalog(&records, &names);
    assert_eq!(defs.len(), 3);

    let get_errors = &defs[0];
    assert_eq!(get_errors.body, "Events\n| where Level == \"Error\"");
    assert_eq!(get_errors.folder, "Ops");
    assert_eq!(get_errors.used_tables, set(&["Events"]));
    assert!(get_errors.used_functions.is_empty());

    let shared = &defs[1];
    assert_eq!(shared.folder, "");
    assert_eq!(shared.used_tables, set(&["Shared"]));
    assert!(shared.used_functions.is_empty());

    let wrapper = &defs[2];
    assert_eq!(wrapper.used_functions, set(&["GetErrors", "Shared"]));
    assert!(wrapper.used_tables.is_empty());
}

#[test]
fn test_malformed_body_skips_only_that_function() {
    let functions = write_file(MALFORMED_FUNCTIONS_CSV);
    let records = catalog::load_functions(functions.path()).expect("Failed to load functions");
    assert_eq!(records.len(), 3);

    let names = NameUniverse::new(records.iter().map(|r| r.name.clone()), ["Events"]);
    let defs = FunctionDef::from_catalog(&records, &names);

    let kept: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(kept, vec!["A", "C"]);
    assert_eq!(defs[0].used_tables, set(&["Events"]));
    assert_eq!(defs[1].used_functions, set(&["A"]));
}

#[test]
fn test_missing_column_is_catalog_error() {
    let tables = write_file("Name\nEvents\n");
    let err = catalog::load_table_names(tables.path()).unwrap_err();
    assert!(matches!(err, TranslateError::Catalog(_)));
}

#[test]
fn test_missing_file_is_catalog_error() {
    let err = catalog::load_functions("/nonexistent/functions.csv").unwrap_err();
    assert!(matches!(err, TranslateError::Catalog(_)));
}

#[test]
fn test_keyword_file() {
    let file = write_file("where\nProject\n\nwhere\n");
    let keywords = KeywordSet::load(file.path()).unwrap();
    assert_eq!(keywords.len(), 2);
    assert!(keywords.contains("PROJECT"));
}

#[test]
fn test_config_file() {
    let file = write_file("[retrieval]\ntop_k = 5\n\n[llm]\nmax_attempts = 2\n");
    let config = Config::discover(Some(file.path())).unwrap();
    assert_eq!(config.retrieval.top_k, 5);
    assert_eq!(config.llm.max_attempts, 2);
    assert_eq!(config.llm.model, "gpt-4o");
}
