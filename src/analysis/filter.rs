use crate::analysis::token::Token;

/// One stage of an analyser pipeline, run after tokenization.
///
/// Filters may rewrite or drop tokens but never touch `offset` and `length`:
/// the framer slices frame text out of the original value with them.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;

    fn name(&self) -> &str;
}
