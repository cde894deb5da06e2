//! Tokenizer for Objective-C runtime type encodings.
//!
//! Classification is a single table lookup per byte. Tag names of structures and unions
//! may contain characters that carry meaning elsewhere (`<`, `:`, digits, C++ template
//! syntax), so the lexer has a second state, [`LexerState::Identifier`], which the parser
//! enables right after an opening `{` or `(`.

use crate::{Error, Result};

/// Classification of an encoding token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A single-character primitive type code
    Primitive,
    /// `@`
    Object,
    /// `^`
    Pointer,
    /// `b`
    Bitfield,
    /// One of `r n N o O R V A j`
    Qualifier,
    /// A run of decimal digits, optionally preceded by `-`
    Number,
    /// A structure or union tag name (identifier state only)
    Identifier,
    /// Text between double quotes, quotes excluded
    QuotedString,
    /// `{`
    StructOpen,
    /// `}`
    StructClose,
    /// `(`
    UnionOpen,
    /// `)`
    UnionClose,
    /// `[`
    ArrayOpen,
    /// `]`
    ArrayClose,
    /// `<`
    AngleOpen,
    /// `>`
    AngleClose,
    /// `=`
    Equals,
    /// Any byte without meaning in the grammar
    Unknown,
    /// End of input
    Eos,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Written by hand: strum's Display derive rejects the lone `}` literal
        f.pad(match self {
            TokenKind::Primitive => "primitive",
            TokenKind::Object => "'@'",
            TokenKind::Pointer => "'^'",
            TokenKind::Bitfield => "'b'",
            TokenKind::Qualifier => "qualifier",
            TokenKind::Number => "number",
            TokenKind::Identifier => "identifier",
            TokenKind::QuotedString => "quoted string",
            TokenKind::StructOpen => "'{'",
            TokenKind::StructClose => "'}'",
            TokenKind::UnionOpen => "'('",
            TokenKind::UnionClose => "')'",
            TokenKind::ArrayOpen => "'['",
            TokenKind::ArrayClose => "']'",
            TokenKind::AngleOpen => "'<'",
            TokenKind::AngleClose => "'>'",
            TokenKind::Equals => "'='",
            TokenKind::Unknown => "unknown character",
            TokenKind::Eos => "end of encoding",
        })
    }
}

impl TokenKind {
    /// Returns true if a token of this kind can begin a type
    #[must_use]
    pub fn starts_type(self) -> bool {
        matches!(
            self,
            TokenKind::Primitive
                | TokenKind::Object
                | TokenKind::Pointer
                | TokenKind::Bitfield
                | TokenKind::Qualifier
                | TokenKind::StructOpen
                | TokenKind::UnionOpen
                | TokenKind::ArrayOpen
        )
    }
}

const fn build_table() -> [TokenKind; 128] {
    let mut table = [TokenKind::Unknown; 128];

    let primitives = b"vcsilqtCSILQTfdDB*#:%?";
    let mut i = 0;
    while i < primitives.len() {
        table[primitives[i] as usize] = TokenKind::Primitive;
        i += 1;
    }

    let qualifiers = b"rnNoORVAj";
    let mut i = 0;
    while i < qualifiers.len() {
        table[qualifiers[i] as usize] = TokenKind::Qualifier;
        i += 1;
    }

    let mut digit = b'0';
    while digit <= b'9' {
        table[digit as usize] = TokenKind::Number;
        digit += 1;
    }
    table[b'-' as usize] = TokenKind::Number;

    table[b'@' as usize] = TokenKind::Object;
    table[b'^' as usize] = TokenKind::Pointer;
    table[b'b' as usize] = TokenKind::Bitfield;
    table[b'"' as usize] = TokenKind::QuotedString;
    table[b'{' as usize] = TokenKind::StructOpen;
    table[b'}' as usize] = TokenKind::StructClose;
    table[b'(' as usize] = TokenKind::UnionOpen;
    table[b')' as usize] = TokenKind::UnionClose;
    table[b'[' as usize] = TokenKind::ArrayOpen;
    table[b']' as usize] = TokenKind::ArrayClose;
    table[b'<' as usize] = TokenKind::AngleOpen;
    table[b'>' as usize] = TokenKind::AngleClose;
    table[b'=' as usize] = TokenKind::Equals;
    table
}

static CHAR_CLASS: [TokenKind; 128] = build_table();

/// Classify a single byte of an encoding
#[must_use]
pub fn classify(byte: u8) -> TokenKind {
    CHAR_CLASS
        .get(byte as usize)
        .copied()
        .unwrap_or(TokenKind::Unknown)
}

/// A lexical unit borrowed from the encoding string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Classification
    pub kind: TokenKind,
    /// Token text. Quoted strings exclude their quotes.
    pub text: &'a str,
    /// Byte offset of the first character, including an opening quote
    pub offset: usize,
    /// Byte offset one past the last character, including a closing quote
    pub end: usize,
}

/// Lexer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexerState {
    /// Every byte maps to a token through the classification table
    #[default]
    Normal,
    /// A run up to `=`, `}`, `)` or `"` forms one [`TokenKind::Identifier`]
    Identifier,
}

/// Lazy, restartable tokenizer over an encoding string
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    state: LexerState,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer positioned at the start of `input`
    ///
    /// ## Arguments
    /// * 'input' - The encoding string to tokenize
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            position: 0,
            state: LexerState::Normal,
            finished: false,
        }
    }

    /// The complete input string
    #[must_use]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Current byte offset
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Current lexer mode
    #[must_use]
    pub fn state(&self) -> LexerState {
        self.state
    }

    /// Switch the lexer mode for the following tokens
    pub fn set_state(&mut self, state: LexerState) {
        self.state = state;
    }

    /// Move the lexer to `offset`, clamped to the input length
    pub fn seek(&mut self, offset: usize) {
        self.position = offset.min(self.input.len());
        self.finished = false;
    }

    /// Restart tokenization from the beginning in normal mode
    pub fn reset(&mut self) {
        self.seek(0);
        self.state = LexerState::Normal;
    }

    /// The byte at `offset`, if any
    #[must_use]
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(offset).copied()
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token<'a> {
        Token {
            kind,
            text: self.input.get(start..end).unwrap_or_default(),
            offset: start,
            end,
        }
    }

    /// Produce the next token.
    ///
    /// Once the input is exhausted every call returns a [`TokenKind::Eos`] token.
    ///
    /// # Errors
    /// Returns [`crate::Error::Syntax`] for a quoted string without closing quote.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let bytes = self.input.as_bytes();
        let start = self.position;

        let Some(&first) = bytes.get(start) else {
            return Ok(self.token(TokenKind::Eos, start, start));
        };

        if self.state == LexerState::Identifier {
            let end = bytes[start..]
                .iter()
                .position(|b| matches!(b, b'=' | b'}' | b')' | b'"'))
                .map_or(bytes.len(), |len| start + len);
            if end > start {
                self.position = end;
                return Ok(self.token(TokenKind::Identifier, start, end));
            }
        }

        let kind = classify(first);
        match kind {
            TokenKind::QuotedString => {
                let Some(len) = bytes[start + 1..].iter().position(|&b| b == b'"') else {
                    return Err(Error::syntax(
                        self.input,
                        start,
                        "unterminated quoted string",
                    ));
                };
                let close = start + 1 + len;
                self.position = close + 1;
                Ok(Token {
                    kind,
                    text: self.input.get(start + 1..close).unwrap_or_default(),
                    offset: start,
                    end: close + 1,
                })
            }
            TokenKind::Number => {
                let digits_start = if first == b'-' { start + 1 } else { start };
                let end = bytes[digits_start..]
                    .iter()
                    .position(|b| !b.is_ascii_digit())
                    .map_or(bytes.len(), |len| digits_start + len);
                if end == digits_start {
                    // A lone '-' carries no number
                    self.position = start + 1;
                    return Ok(self.token(TokenKind::Unknown, start, start + 1));
                }
                self.position = end;
                Ok(self.token(kind, start, end))
            }
            _ => {
                // Non-ASCII input is consumed as a whole character
                let width = self
                    .input
                    .get(start..)
                    .and_then(|rest| rest.chars().next())
                    .map_or(1, char::len_utf8);
                self.position = start + width;
                Ok(self.token(kind, start, start + width))
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        match &token {
            Ok(token) if token.kind == TokenKind::Eos => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).map(|t| t.unwrap().kind).collect()
    }

    #[test]
    fn test_classify_table() {
        assert_eq!(classify(b'i'), TokenKind::Primitive);
        assert_eq!(classify(b'?'), TokenKind::Primitive);
        assert_eq!(classify(b'r'), TokenKind::Qualifier);
        assert_eq!(classify(b'j'), TokenKind::Qualifier);
        assert_eq!(classify(b'b'), TokenKind::Bitfield);
        assert_eq!(classify(b'7'), TokenKind::Number);
        assert_eq!(classify(b'x'), TokenKind::Unknown);
        assert_eq!(classify(0xC3), TokenKind::Unknown);
    }

    #[test]
    fn test_lex_method_signature() {
        assert_eq!(
            kinds("v24@0:8i16"),
            vec![
                TokenKind::Primitive,
                TokenKind::Number,
                TokenKind::Object,
                TokenKind::Number,
                TokenKind::Primitive,
                TokenKind::Number,
                TokenKind::Primitive,
                TokenKind::Number,
                TokenKind::Eos,
            ]
        );
    }

    #[test]
    fn test_lex_quoted_string() {
        let mut lexer = Lexer::new("@\"NSString\"i");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Object);
        let quoted = lexer.next_token().unwrap();
        assert_eq!(quoted.kind, TokenKind::QuotedString);
        assert_eq!(quoted.text, "NSString");
        assert_eq!(quoted.offset, 1);
        assert_eq!(quoted.end, 11);
        assert_eq!(lexer.byte_at(quoted.end), Some(b'i'));
    }

    #[test]
    fn test_lex_unterminated_quote() {
        let mut lexer = Lexer::new("@\"NSStr");
        lexer.next_token().unwrap();
        match lexer.next_token() {
            Err(Error::Syntax { offset, .. }) => assert_eq!(offset, 1),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_lex_identifier_state() {
        let mut lexer = Lexer::new("{vector<int, 3>=ii}");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::StructOpen);
        lexer.set_state(LexerState::Identifier);
        let name = lexer.next_token().unwrap();
        assert_eq!(name.kind, TokenKind::Identifier);
        assert_eq!(name.text, "vector<int, 3>");
        lexer.set_state(LexerState::Normal);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Equals);
    }

    #[test]
    fn test_lex_identifier_state_empty_run() {
        let mut lexer = Lexer::new("=i");
        lexer.set_state(LexerState::Identifier);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Equals);
    }

    #[test]
    fn test_lex_negative_number() {
        let mut lexer = Lexer::new("-8");
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Number);
        assert_eq!(token.text, "-8");

        assert_eq!(kinds("-"), vec![TokenKind::Unknown, TokenKind::Eos]);
    }

    #[test]
    fn test_lex_every_byte_is_one_token() {
        let input = "x{?=}ü";
        let tokens: Vec<_> = Lexer::new(input).map(|t| t.unwrap()).collect();
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[6].kind, TokenKind::Eos);
        assert_eq!(tokens[5].text, "ü");
    }

    #[test]
    fn test_lexer_reset() {
        let mut lexer = Lexer::new("ii");
        assert_eq!(lexer.by_ref().count(), 3);
        assert!(lexer.next().is_none());
        lexer.reset();
        assert_eq!(lexer.count(), 3);
    }

    #[test]
    fn test_token_kind_display() {
        assert_eq!(TokenKind::ArrayClose.to_string(), "']'");
        assert_eq!(TokenKind::Number.to_string(), "number");
        assert_eq!(TokenKind::Eos.to_string(), "end of encoding");
    }
}
