//! Scene language lexer.
//!
//! Splits source text into words and single-character punctuation:
//! - Punctuation `{ } ( ) [ ] , ; =` is always its own token
//! - Whitespace separates tokens and is dropped
//! - Any other run of characters is one [`Token::Word`], whether it names a
//!   keyword, a parameter or a number. Numbers are checked by the parser.
//!
//! There are no comments, strings or escapes, so tokenizing cannot fail.

use std::fmt;

/// A token in scene source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier, keyword or number text.
    Word(String),
    /// Left brace `{`.
    LBrace,
    /// Right brace `}`.
    RBrace,
    /// Left parenthesis `(`.
    LParen,
    /// Right parenthesis `)`.
    RParen,
    /// Left bracket `[`.
    LBracket,
    /// Right bracket `]`.
    RBracket,
    /// Comma `,`.
    Comma,
    /// Semicolon `;`.
    Semicolon,
    /// Equals `=`.
    Equals,
}

impl Token {
    fn punctuation(ch: char) -> Option<Self> {
        Some(match ch {
            '{' => Self::LBrace,
            '}' => Self::RBrace,
            '(' => Self::LParen,
            ')' => Self::RParen,
            '[' => Self::LBracket,
            ']' => Self::RBracket,
            ',' => Self::Comma,
            ';' => Self::Semicolon,
            '=' => Self::Equals,
            _ => return None,
        })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Word(w) => return f.write_str(w),
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Equals => "=",
        };
        f.write_str(s)
    }
}

/// Position in the source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, in characters).
    pub col: usize,
}

/// A token with the position where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    /// The token.
    pub token: Token,
    /// Start position.
    pub pos: Position,
}

/// Tokenize the entire input. Empty input yields no tokens.
pub fn tokenize(input: &str) -> Vec<SpannedToken> {
    Lexer::new(input).tokenize()
}

/// Lexer for scene source.
pub struct Lexer<'a> {
    chars: std::str::Chars<'a>,
    line: usize,
    col: usize,
    tokens: Vec<SpannedToken>,
    word: String,
    word_start: Position,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars(),
            line: 1,
            col: 1,
            tokens: Vec::new(),
            word: String::new(),
            word_start: Position::default(),
        }
    }

    /// Consume the lexer and return every token.
    pub fn tokenize(mut self) -> Vec<SpannedToken> {
        while let Some(ch) = self.chars.next() {
            let pos = Position {
                line: self.line,
                col: self.col,
            };
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }

            if ch.is_whitespace() {
                self.flush_word();
            } else if let Some(token) = Token::punctuation(ch) {
                self.flush_word();
                self.tokens.push(SpannedToken { token, pos });
            } else {
                if self.word.is_empty() {
                    self.word_start = pos;
                }
                self.word.push(ch);
            }
        }
        self.flush_word();
        self.tokens
    }

    fn flush_word(&mut self) {
        if !self.word.is_empty() {
            let word = std::mem::take(&mut self.word);
            self.tokens.push(SpannedToken {
                token: Token::Word(word),
                pos: self.word_start,
            });
        }
    }
}
