//! Keyword-based tool visibility.
//!
//! A cheaper alternative to embedding routing: each tool lists a few
//! keywords, a message scores one point per keyword it contains, and only the
//! best-scoring tools stay visible.

use crate::ingestion::ToolDescriptor;
use std::collections::BTreeMap;

/// Number of tools left visible by default.
pub const DEFAULT_VISIBLE: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: BTreeMap<String, Vec<String>>,
}

impl KeywordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keywords for the built-in catalog.
    pub fn with_builtin_keywords() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("add", &["add", "plus", "sum", "+"]),
            ("subtract", &["subtract", "minus", "difference", "take away"]),
            ("multiply", &["multiply", "times", "product"]),
            ("divide", &["divide", "divided", "quotient", "over"]),
            ("factorial", &["factorial", "!"]),
            ("sqrt", &["sqrt", "square root", "root"]),
            ("random_int", &["random", "dice", "roll", "pick a number"]),
            ("current_datetime", &["time", "date", "today", "now"]),
            ("count_characters", &["characters", "letters", "length"]),
            ("to_upper", &["upper", "uppercase", "shout", "capital"]),
            ("to_lower", &["lower", "lowercase", "whisper"]),
            ("reverse_text", &["reverse", "backwards"]),
            ("word_count", &["words", "word count"]),
            ("average", &["average", "mean"]),
            ("get_weather", &["weather", "forecast", "temperature", "rain"]),
        ];

        let mut filter = Self::new();
        for (tool, words) in table {
            filter.insert(*tool, words.iter().copied());
        }
        filter
    }

    /// Set the keywords for `tool`, replacing any previous list. Keywords
    /// match case-insensitively.
    pub fn insert<I, S>(&mut self, tool: impl Into<String>, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        self.keywords.insert(tool.into(), words);
    }

    /// Score of `tool` for an already-lowercased message.
    fn score(words: &[String], message: &str) -> usize {
        words.iter().filter(|w| message.contains(w.as_str())).count()
    }

    /// Up to `top_k` tool names whose keywords appear in `message`, best
    /// score first, ties by name. Tools scoring zero are never visible.
    pub fn choose(&self, message: &str, top_k: usize) -> Vec<String> {
        let message = message.to_lowercase();

        let mut scored: Vec<(usize, &String)> = self
            .keywords
            .iter()
            .map(|(tool, words)| (Self::score(words, &message), tool))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        scored
            .into_iter()
            .take(top_k)
            .map(|(_, tool)| tool.clone())
            .collect()
    }

    /// The subset of `tools` visible for `message`, in catalog order.
    pub fn visible<'a>(
        &self,
        tools: &'a [ToolDescriptor],
        message: &str,
        top_k: usize,
    ) -> Vec<&'a ToolDescriptor> {
        let chosen = self.choose(message, top_k);
        tools.iter().filter(|t| chosen.contains(&t.name)).collect()
    }
}
