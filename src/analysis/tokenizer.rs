use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Unicode word tokenizer; case is preserved unless `lowercase` is set.
#[derive(Clone)]
pub struct StandardTokenizer {
    pub lowercase: bool,
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            lowercase: false,
            max_token_length: 255,
        }
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for (offset, word) in text.unicode_word_indices() {
            if word.len() > self.max_token_length {
                continue;
            }

            let token_text = if self.lowercase {
                word.to_lowercase()
            } else {
                word.to_string()
            };

            tokens.push(Token::new(token_text, position, offset, word.len()));
            position += 1;
        }

        tokens
    }

    fn name(&self) -> &str {
        "standard"
    }
}

/// Emits the whole trimmed value as a single token.
#[derive(Clone, Default)]
pub struct KeywordTokenizer;

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        let offset = text.len() - text.trim_start().len();
        vec![Token::new(trimmed.to_string(), 0, offset, trimmed.len())]
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_point_into_the_source() {
        let text = "Alice  was beginning, to get";
        let tokens = StandardTokenizer::default().tokenize(text);
        let words: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["Alice", "was", "beginning", "to", "get"]);
        for token in &tokens {
            assert_eq!(&text[token.offset..token.end()], token.text);
        }
        assert_eq!(tokens[4].position, 4);
    }

    #[test]
    fn keyword_tokenizer_keeps_the_value_whole() {
        let tokens = KeywordTokenizer.tokenize("  New South Wales ");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "New South Wales");
        assert_eq!(tokens[0].offset, 2);
        assert!(KeywordTokenizer.tokenize("   ").is_empty());
    }
}
