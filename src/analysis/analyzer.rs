use std::collections::BTreeMap;
use std::sync::Arc;
use parking_lot::RwLock;
use tantivy::tokenizer::{
    Language, LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer, Stemmer,
    StopWordFilter, TextAnalyzer, TokenStream, TokenizerManager,
};
use crate::core::error::{Error, Result};

pub const STEMMING: &str = "stemming";
pub const STANDARD: &str = "standard";
pub const RAW: &str = "raw";

/// Tokens longer than this never reach the index
const MAX_TOKEN_LEN: usize = 40;

fn english_stop_words() -> Vec<String> {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for",
        "from", "has", "he", "in", "is", "it", "its", "of", "on",
        "that", "the", "to", "was", "will", "with",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Lowercased, stop-word-free, stemmed English tokens
pub fn stemming_english() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(english_stop_words()))
        .filter(Stemmer::new(Language::English))
        .build()
}

/// Same as `stemming_english` without the stemmer
pub fn standard_english() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(english_stop_words()))
        .build()
}

pub fn raw() -> TextAnalyzer {
    TextAnalyzer::builder(RawTokenizer::default()).build()
}

/// Registry of named analyzers, installed on every index this process opens
pub struct AnalyzerRegistry {
    analyzers: Arc<RwLock<BTreeMap<String, TextAnalyzer>>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let registry = AnalyzerRegistry {
            analyzers: Arc::new(RwLock::new(BTreeMap::new())),
        };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&self) {
        self.register(STEMMING, stemming_english());
        self.register(STANDARD, standard_english());
        self.register(RAW, raw());
    }

    pub fn register(&self, name: &str, analyzer: TextAnalyzer) {
        self.analyzers.write().insert(name.to_string(), analyzer);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.analyzers.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.analyzers.read().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<TextAnalyzer> {
        self.analyzers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::config(format!("Analyzer '{}' not found", name)))
    }

    /// Make every registered analyzer resolvable by the index engine
    pub fn install(&self, tokenizers: &TokenizerManager) {
        for (name, analyzer) in self.analyzers.read().iter() {
            tokenizers.register(name, analyzer.clone());
        }
    }

    /// Tokens an analyzer produces, mainly for diagnostics
    pub fn analyze(&self, name: &str, text: &str) -> Result<Vec<String>> {
        let mut analyzer = self.get(name)?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        stream.process(&mut |token| tokens.push(token.text.clone()));
        Ok(tokens)
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        AnalyzerRegistry::new()
    }
}

impl Clone for AnalyzerRegistry {
    fn clone(&self) -> Self {
        AnalyzerRegistry {
            analyzers: self.analyzers.clone(),
        }
    }
}
