//! # adx-translate
//!
//! Few-shot translation of Kusto queries into Spark SQL.
//!
//! A query is cleaned and rewritten into a canonical template, the most
//! similar templates of already-translated queries are retrieved from a
//! corpus, and those pairs are handed to a generative translator as
//! examples.
//!
//! ## Quick Example
//!
//! ```
//! use adx_translate::prelude::*;
//!
//! let canonicalizer = Canonicalizer::new(
//!     NameUniverse::new(["GetUsers"], ["Events"]),
//!     KeywordSet::kusto(),
//! );
//! let template = canonicalizer
//!     .to_template("Events | where Level == 'Error' | take 10")
//!     .unwrap();
//! assert_eq!(template, "FunctionOrTable1 | where Variable1 == String1 | take 10");
//! ```
//!
//! ## Placeholders
//!
//! | Placeholder          | Replaces                          |
//! |----------------------|-----------------------------------|
//! | `FunctionOrTable<N>` | a known function or table name    |
//! | `Variable<N>`        | any other non-keyword identifier  |
//! | `String<N>`          | a quoted string literal           |

pub mod catalog;
pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod corpus;
pub mod error;
pub mod lexer;
pub mod openai;
pub mod similarity;
mod stop_words;
pub mod template;
pub mod translator;

pub mod prelude {
    pub use crate::catalog::{FunctionRecord, KeywordSet, NameUniverse};
    pub use crate::classifier::{FunctionDef, Resolution};
    pub use crate::cleaner::{clean, clean_sql};
    pub use crate::config::Config;
    pub use crate::corpus::{Corpus, CorpusEntry};
    pub use crate::error::*;
    pub use crate::openai::OpenAiClient;
    pub use crate::similarity::{SimilarityIndex, group_by_threshold, similarity};
    pub use crate::template::{Canonicalizer, PlaceholderKind, Template};
    pub use crate::translator::{
        CompletionClient, CompletionRequest, Translation, Translator, TranslatorOptions,
    };
}

/// Clean `query` and rewrite it into a canonical template.
///
/// # Example
///
/// ```
/// use adx_translate::prelude::*;
///
/// let c = Canonicalizer::default();
/// assert_eq!(
///     adx_translate::to_template(&c, "a = b + a").unwrap(),
///     "Variable1 = Variable2 + Variable1"
/// );
/// ```
pub fn to_template(
    canonicalizer: &template::Canonicalizer,
    query: &str,
) -> error::TranslateResult<String> {
    canonicalizer.to_template(query)
}
