//! Retrieval-augmented translation driver.
//!
//! A query is templated, its nearest corpus examples are retrieved, and the
//! resulting few-shot prompt is sent to a completion service until a response
//! carries a `<sparksql>...</sparksql>` block or the attempt budget runs out.

use regex::Regex;
use std::future::Future;

use crate::cleaner;
use crate::corpus::CorpusEntry;
use crate::error::{TranslateError, TranslateResult};
use crate::similarity::SimilarityIndex;
use crate::template::{Canonicalizer, Template};

/// One chat exchange: an instruction and a user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
}

/// A text-completion backend.
pub trait CompletionClient: Send + Sync {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = TranslateResult<String>> + Send;
}

#[derive(Debug, Clone)]
pub struct TranslatorOptions {
    /// Examples included in the prompt.
    pub top_k: usize,
    /// Completions requested before giving up. Zero is treated as one.
    pub max_attempts: usize,
    /// Tag wrapping the generated query.
    pub output_tag: String,
    pub source_dialect: String,
    pub target_dialect: String,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_attempts: 5,
            output_tag: "sparksql".to_string(),
            source_dialect: "Kusto".to_string(),
            target_dialect: "Spark SQL".to_string(),
        }
    }
}

/// Result of a successful translation.
#[derive(Debug, Clone)]
pub struct Translation {
    pub template: Template,
    pub examples: Vec<CorpusEntry>,
    /// Completions requested, including the successful one.
    pub attempts: usize,
    pub sql: String,
}

pub struct Translator<C> {
    canonicalizer: Canonicalizer,
    index: SimilarityIndex,
    client: C,
    options: TranslatorOptions,
}

impl<C: CompletionClient> Translator<C> {
    pub fn new(canonicalizer: Canonicalizer, index: SimilarityIndex, client: C) -> Self {
        Self {
            canonicalizer,
            index,
            client,
            options: TranslatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TranslatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Translate one source query.
    ///
    /// Examples are retrieved by template; the prompt itself carries the raw
    /// query. Client errors abort immediately, while responses without the
    /// output block are retried up to `max_attempts` times before
    /// [`TranslateError::TranslationFailed`].
    pub async fn translate(&self, query: &str) -> TranslateResult<Translation> {
        let template = self.canonicalizer.template(query)?;
        let examples: Vec<CorpusEntry> = self
            .index
            .top_k(&template.text, self.options.top_k)
            .into_iter()
            .cloned()
            .collect();

        let request = CompletionRequest {
            system: system_guide(&self.options),
            prompt: build_prompt(query, &examples, &self.options),
        };

        let max_attempts = self.options.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let response = self.client.complete(&request).await?;
            match extract_block(&response, &self.options.output_tag) {
                Some(block) => {
                    tracing::info!(attempt, "received translation");
                    let sql = format_sql(&cleaner::clean_sql(&block));
                    return Ok(Translation {
                        template,
                        examples,
                        attempts: attempt,
                        sql,
                    });
                }
                None => {
                    tracing::warn!(attempt, max_attempts, "response has no output block");
                }
            }
        }

        Err(TranslateError::failed(max_attempts))
    }
}

/// The instruction explaining the placeholder and output conventions.
pub fn system_guide(options: &TranslatorOptions) -> String {
    let TranslatorOptions {
        source_dialect: source,
        target_dialect: target,
        output_tag: tag,
        ..
    } = options;
    format!(
        "You are a {source} to {target} translator. I will give you several pairs of \
({source}, {target}) as references from which you need to learn the translation and \
mapping rules.\n\
Then I will give you another {source} query, and you should translate it into {target} \
based on what you have learned.\n\n\
Variable[number], String[number] and FunctionOrTable[number] are placeholders for \
variable, string, function or table in both languages.\n\
For example, Variable2 refers to the second variable declared in the query, String4 \
refers to the fourth string defined in the query and FunctionOrTable9 refers to the \
ninth table or user-defined function called in the query.\n\n\
Your output should follow the format below:\n\
<{tag}>{target} query</{tag}>"
    )
}

/// The user prompt: numbered example pairs followed by the query.
pub fn build_prompt(query: &str, examples: &[CorpusEntry], options: &TranslatorOptions) -> String {
    let source = &options.source_dialect;
    let target = &options.target_dialect;

    let pairs: String = examples
        .iter()
        .enumerate()
        .map(|(i, e)| {
            format!(
                "Pair {}:\n\n{source}:\n\n{}\n\n{target}:\n\n{}\n\n",
                i + 1,
                e.source_query,
                e.target_query
            )
        })
        .collect();

    format!(
        "Given the ({source}, {target}) pairs below:\n\n{pairs}\nTranslate the {source} below into {target}:\n\n{query}"
    )
}

/// Text of the first non-blank `<tag>...</tag>` block.
pub fn extract_block(response: &str, tag: &str) -> Option<String> {
    let tag = regex::escape(tag);
    let pattern = Regex::new(&format!(r"<{tag}>([\s\S]*?)</{tag}>")).ok()?;
    pattern
        .captures_iter(response)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|block| !block.is_empty())
        .map(str::to_string)
}

/// Pretty-print a target query with upper-case keywords.
pub fn format_sql(sql: &str) -> String {
    let options = sqlformat::FormatOptions {
        uppercase: true,
        ..Default::default()
    };
    sqlformat::format(sql, &sqlformat::QueryParams::None, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_block() {
        let response = "Sure!\n<sparksql>\nSELECT 1\n</sparksql>\nDone.";
        assert_eq!(extract_block(response, "sparksql").as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn test_extract_block_skips_empty() {
        let response = "<sparksql>  </sparksql> <sparksql>SELECT 2</sparksql>";
        assert_eq!(extract_block(response, "sparksql").as_deref(), Some("SELECT 2"));
        assert_eq!(extract_block("<sparksql></sparksql>", "sparksql"), None);
        assert_eq!(extract_block("SELECT 3", "sparksql"), None);
    }

    #[test]
    fn test_prompt_lists_pairs() {
        let examples = vec![
            CorpusEntry::new("T | take 1", "SELECT * FROM T LIMIT 1"),
            CorpusEntry::new("T | count", "SELECT COUNT(*) FROM T"),
        ];
        let prompt = build_prompt("Events | count", &examples, &TranslatorOptions::default());
        assert!(prompt.contains("Pair 1:\n\nKusto:\n\nT | take 1"));
        assert!(prompt.contains("Pair 2:"));
        assert!(prompt.ends_with("into Spark SQL:\n\nEvents | count"));
    }

    #[test]
    fn test_guide_mentions_tag() {
        let guide = system_guide(&TranslatorOptions::default());
        assert!(guide.contains("<sparksql>Spark SQL query</sparksql>"));
        assert!(guide.contains("FunctionOrTable9"));
    }

    #[test]
    fn test_format_sql_uppercases() {
        let formatted = format_sql("select a from t where b = 1");
        assert!(formatted.starts_with("SELECT"));
        assert!(formatted.contains("FROM"));
        assert!(formatted.contains("WHERE"));
    }
}
