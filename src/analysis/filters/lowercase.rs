use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Folds terms to lower case for the `lowercase` and `english` analysers.
/// The `standard` analyser skips it so case-fold suggestions have both
/// spellings to compare.
pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .map(|token| Token { text: token.text.to_lowercase(), ..token })
            .collect()
    }

    fn name(&self) -> &str {
        "lowercase"
    }
}
