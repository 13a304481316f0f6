//! Canonical templates.
//!
//! Rewrites a Kusto query into a structurally comparable template by
//! replacing known functions and tables, free variables and string literals
//! with numbered placeholders:
//!
//! ```text
//! Events | where Name == "x" | extend y = Lookup(Name)
//!   ↓
//! FunctionOrTable1 | where Variable1 == String1 | extend Variable2 = FunctionOrTable2(Variable1)
//! ```
//!
//! Numbering is by first occurrence within one call and independent per
//! class. All numbering state lives in a context created for that call, so a
//! [`Canonicalizer`] can be shared between threads.

use indexmap::IndexSet;
use std::fmt;

use crate::catalog::{KeywordSet, NameUniverse};
use crate::cleaner;
use crate::error::TranslateResult;
use crate::lexer::{self, Token, TokenKind};

/// The three placeholder classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    FunctionOrTable,
    Variable,
    String,
}

impl PlaceholderKind {
    /// The literal prefix written before the index.
    pub fn marker(self) -> &'static str {
        match self {
            PlaceholderKind::FunctionOrTable => "FunctionOrTable",
            PlaceholderKind::Variable => "Variable",
            PlaceholderKind::String => "String",
        }
    }
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// A canonical template together with the values each placeholder replaced.
///
/// `FunctionOrTable3` stands for `functions_and_tables[2]`, and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub text: String,
    pub functions_and_tables: Vec<String>,
    pub variables: Vec<String>,
    pub strings: Vec<String>,
}

impl Template {
    /// Placeholder/value pairs in class order.
    pub fn bindings(&self) -> Vec<(String, &str)> {
        let classes = [
            (PlaceholderKind::FunctionOrTable, &self.functions_and_tables),
            (PlaceholderKind::Variable, &self.variables),
            (PlaceholderKind::String, &self.strings),
        ];
        classes
            .into_iter()
            .flat_map(|(kind, values)| {
                values
                    .iter()
                    .enumerate()
                    .map(move |(i, v)| (format!("{}{}", kind, i + 1), v.as_str()))
            })
            .collect()
    }
}

/// Ordered, append-only values of one placeholder class.
#[derive(Debug)]
struct PlaceholderList {
    kind: PlaceholderKind,
    seen: IndexSet<String>,
}

impl PlaceholderList {
    fn new(kind: PlaceholderKind) -> Self {
        Self {
            kind,
            seen: IndexSet::new(),
        }
    }

    /// The placeholder for `value`, reusing its index if already seen.
    fn placeholder(&mut self, value: &str) -> String {
        let index = match self.seen.get_index_of(value) {
            Some(index) => index,
            None => self.seen.insert_full(value.to_string()).0,
        };
        format!("{}{}", self.kind, index + 1)
    }

    fn into_values(self) -> Vec<String> {
        self.seen.into_iter().collect()
    }
}

/// Per-call scratch state.
struct TemplateContext {
    functions_and_tables: PlaceholderList,
    variables: PlaceholderList,
    strings: PlaceholderList,
}

impl TemplateContext {
    fn new() -> Self {
        Self {
            functions_and_tables: PlaceholderList::new(PlaceholderKind::FunctionOrTable),
            variables: PlaceholderList::new(PlaceholderKind::Variable),
            strings: PlaceholderList::new(PlaceholderKind::String),
        }
    }
}

/// Rewrites queries into canonical templates.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    names: NameUniverse,
    keywords: KeywordSet,
}

impl Canonicalizer {
    pub fn new(names: NameUniverse, keywords: KeywordSet) -> Self {
        Self { names, keywords }
    }

    pub fn names(&self) -> &NameUniverse {
        &self.names
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Clean `query` and return its canonical template text.
    pub fn to_template(&self, query: &str) -> TranslateResult<String> {
        self.template(query).map(|t| t.text)
    }

    /// Clean `query` and return its template with the replaced values.
    pub fn template(&self, query: &str) -> TranslateResult<Template> {
        let cleaned = cleaner::clean(query);
        let tokens = lexer::tokenize(&cleaned)?;
        let mut ctx = TemplateContext::new();
        let mut text = String::with_capacity(cleaned.len());

        for token in &tokens {
            match self.classify(&cleaned, token) {
                Some(PlaceholderKind::FunctionOrTable) => {
                    text.push_str(&ctx.functions_and_tables.placeholder(token.text))
                }
                Some(PlaceholderKind::Variable) => {
                    text.push_str(&ctx.variables.placeholder(token.text))
                }
                Some(PlaceholderKind::String) => {
                    text.push_str(&ctx.strings.placeholder(token.text))
                }
                None => text.push_str(token.text),
            }
        }

        tracing::trace!(
            functions_and_tables = ctx.functions_and_tables.seen.len(),
            variables = ctx.variables.seen.len(),
            strings = ctx.strings.seen.len(),
            "templated query"
        );

        Ok(Template {
            text,
            functions_and_tables: ctx.functions_and_tables.into_values(),
            variables: ctx.variables.into_values(),
            strings: ctx.strings.into_values(),
        })
    }

    /// Which placeholder, if any, replaces `token`.
    ///
    /// Function-or-table wins over variable; a hyphen right before an
    /// identifier keeps it verbatim (`project-away` is not `away`).
    fn classify(&self, source: &str, token: &Token<'_>) -> Option<PlaceholderKind> {
        match token.kind {
            TokenKind::String => Some(PlaceholderKind::String),
            TokenKind::Other => None,
            TokenKind::Identifier => {
                if lexer::preceded_by_hyphen(source, token) {
                    return None;
                }
                if lexer::followed_by_call_or_space(source, token)
                    && self.names.contains(token.text)
                {
                    return Some(PlaceholderKind::FunctionOrTable);
                }
                let is_variable = lexer::is_plain_identifier(token.text)
                    && !self.keywords.contains(token.text)
                    && !token.text.contains(PlaceholderKind::FunctionOrTable.marker());
                is_variable.then_some(PlaceholderKind::Variable)
            }
        }
    }
}
