//! Query cleaning.
//!
//! Both dialects are cleaned the same way: outer whitespace is trimmed,
//! indentation after line breaks is dropped, line comments are removed and
//! runs of blank lines collapse into one. Cleaning is idempotent.

use regex::Regex;
use std::sync::LazyLock;

static INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s+").expect("indent pattern"));

static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("newline pattern"));

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(http://|https://)[\w\-]+(\.[\w\-]+)+([/\w\-.]*)*").expect("url pattern")
});

static KUSTO_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//.*").expect("kusto comment pattern"));

static SQL_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--.*").expect("sql comment pattern"));

/// Clean a Kusto query.
///
/// Lines containing a URL keep their `//` text verbatim, since the comment
/// pattern would otherwise cut the URL at `http://`.
///
/// # Example
///
/// ```
/// use adx_translate::cleaner::clean;
///
/// let cleaned = clean("\n  Events // all events\n    | count\n");
/// assert_eq!(cleaned, "Events\n| count");
/// ```
pub fn clean(query: &str) -> String {
    clean_with(query, |line| {
        if URL.is_match(line) {
            line.to_string()
        } else {
            KUSTO_COMMENT.replace(line, "").trim_end().to_string()
        }
    })
}

/// Clean a Spark SQL query (`--` comments).
pub fn clean_sql(query: &str) -> String {
    clean_with(query, |line| SQL_COMMENT.replace(line, "").trim_end().to_string())
}

fn clean_with(query: &str, strip_line: impl Fn(&str) -> String) -> String {
    let query = query.trim();
    let query = INDENT.replace_all(query, "\n");
    let stripped: Vec<String> = query.split('\n').map(strip_line).collect();
    let joined = stripped.join("\n");
    // A comment-only first or last line leaves a dangling newline behind.
    NEWLINES.replace_all(&joined, "\n").trim().to_string()
}
