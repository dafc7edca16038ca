use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use rust_stemmers::Algorithm;
use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::lowercase::LowercaseFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{KeywordTokenizer, StandardTokenizer, Tokenizer};
use crate::core::error::{Error, ErrorKind, Result};

/// Turns a raw field value into an ordered token sequence.
///
/// Implementations must be deterministic: identical input yields identical tokens.
pub trait TextAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Tokenizer followed by a chain of filters
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: &str, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Case preserving words with English stop words removed.
    pub fn standard() -> Self {
        Analyzer::new("standard", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(StopWordFilter::english()))
    }

    pub fn lowercase() -> Self {
        Analyzer::new("lowercase", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
    }

    pub fn english() -> Self {
        Analyzer::new("english", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
            .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }

    pub fn keyword() -> Self {
        Analyzer::new("keyword", Box::new(KeywordTokenizer))
    }
}

impl TextAnalyzer for Analyzer {
    fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Registry for managing analyzers by name
pub struct AnalyzerRegistry {
    analyzers: RwLock<HashMap<String, Arc<dyn TextAnalyzer>>>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        AnalyzerRegistry::new()
    }
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let registry = AnalyzerRegistry {
            analyzers: RwLock::new(HashMap::new()),
        };

        registry.register("standard", Arc::new(Analyzer::standard()));
        registry.register("lowercase", Arc::new(Analyzer::lowercase()));
        registry.register("english", Arc::new(Analyzer::english()));
        registry.register("keyword", Arc::new(Analyzer::keyword()));
        registry
    }

    pub fn register(&self, name: &str, analyzer: Arc<dyn TextAnalyzer>) {
        self.analyzers.write().insert(name.to_string(), analyzer);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn TextAnalyzer>> {
        self.analyzers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, format!("analyzer '{}' not registered", name)))
    }

    pub fn analyze(&self, analyzer_name: &str, text: &str) -> Result<Vec<Token>> {
        Ok(self.get(analyzer_name)?.analyze(text))
    }
}
