use serde::{Serialize, Deserialize};

/// Token produced by an analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,      // Term as indexed
    pub position: u32,     // Ordinal in the analysed value
    pub offset: usize,     // Byte offset in original text
    pub length: usize,     // Byte length in original text
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize, length: usize) -> Self {
        Token {
            text,
            position,
            offset,
            length,
        }
    }

    /// Byte offset just past the token in the original text.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}
