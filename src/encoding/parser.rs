use tracing::trace;

use crate::{
    encoding::{
        lexer::{classify, Lexer, LexerState, Token, TokenKind},
        BlockSignature, Composite, Member, MethodSignature, MethodType, ObjectType, Primitive,
        Qualifiers, Type,
    },
    utils::ensure_sufficient_stack,
    Error, Result,
};

/// Recursive descent parser for Objective-C runtime type encodings
///
/// # Example
///
/// ```rust
/// use classdump::encoding::{EncodingParser, Type, Primitive};
/// let mut parser = EncodingParser::new("^i");
/// let ty = parser.parse_type().unwrap();
/// assert_eq!(ty, Type::Pointer(Box::new(Type::Primitive(Primitive::Int))));
/// ```
///
/// ## Notes:
/// - Nesting depth is bounded by the input length only. Deep recursion grows the stack
///   on demand instead of failing.
/// - Make sure to not re-use a parser instance for multiple encodings, use one of the
///   wrapper functions of the encoding module instead.
pub struct EncodingParser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<Token<'a>>,
}

impl<'a> EncodingParser<'a> {
    /// Create a new `EncodingParser` for an encoding string
    ///
    /// ## Arguments
    /// * 'input' - The encoding string to parse
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        EncodingParser {
            lexer: Lexer::new(input),
            lookahead: None,
        }
    }

    fn peek(&mut self) -> Result<Token<'a>> {
        if let Some(token) = self.lookahead {
            return Ok(token);
        }
        let token = self.lexer.next_token()?;
        self.lookahead = Some(token);
        Ok(token)
    }

    fn advance(&mut self) -> Result<Token<'a>> {
        let token = self.peek()?;
        self.lookahead = None;
        Ok(token)
    }

    /// Change the lexer mode; a pending lookahead is re-lexed under the new mode
    fn switch_state(&mut self, state: LexerState) {
        if let Some(token) = self.lookahead.take() {
            self.lexer.seek(token.offset);
        }
        self.lexer.set_state(state);
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> Error {
        Error::syntax(self.lexer.input(), offset, message)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>> {
        let token = self.advance()?;
        if token.kind != kind {
            return Err(self.error(
                token.offset,
                format!("expected {}, found {}", what, token.kind),
            ));
        }
        Ok(token)
    }

    fn expect_end(&mut self) -> Result<()> {
        let token = self.peek()?;
        if token.kind != TokenKind::Eos {
            return Err(self.error(token.offset, "unexpected trailing characters"));
        }
        Ok(())
    }

    /// Parse a complete encoding holding exactly one type
    ///
    /// # Errors
    /// Returns [`crate::Error::Syntax`] if the encoding is malformed, contains a bitfield
    /// outside of a structure, or has trailing characters.
    pub fn parse_type(&mut self) -> Result<Type> {
        let ty = self.parse_any(false)?;
        self.expect_end()?;
        Ok(ty)
    }

    /// Parse an instance variable encoding, which may be a bare bitfield
    ///
    /// # Errors
    /// Returns [`crate::Error::Syntax`] if the encoding is malformed or has trailing characters.
    pub fn parse_ivar_type(&mut self) -> Result<Type> {
        let ty = self.parse_any(true)?;
        self.expect_end()?;
        Ok(ty)
    }

    /// Parse one type from the start of the input and report how many bytes it used
    ///
    /// # Errors
    /// Returns [`crate::Error::Syntax`] if no complete type starts the input.
    pub fn parse_type_prefix(&mut self) -> Result<(Type, usize)> {
        let ty = self.parse_any(false)?;
        let consumed = self
            .lookahead
            .map_or(self.lexer.position(), |token| token.offset);
        Ok((ty, consumed))
    }

    /// Parse a method encoding: return type, then every parameter, each optionally
    /// followed by its stack offset
    ///
    /// # Errors
    /// Returns [`crate::Error::Syntax`] if any of the types is malformed.
    pub fn parse_method_signature(&mut self) -> Result<MethodSignature> {
        let return_type = self.parse_method_type()?;

        let mut parameters = Vec::new();
        while self.peek()?.kind != TokenKind::Eos {
            parameters.push(self.parse_method_type()?);
        }

        Ok(MethodSignature {
            return_type,
            parameters,
        })
    }

    fn parse_method_type(&mut self) -> Result<MethodType> {
        let ty = self.parse_any(false)?;
        let offset = if self.peek()?.kind == TokenKind::Number {
            Some(self.advance()?.text.to_string())
        } else {
            None
        };
        Ok(MethodType { ty, offset })
    }

    fn parse_any(&mut self, in_struct: bool) -> Result<Type> {
        ensure_sufficient_stack(|| self.parse_next(in_struct))
    }

    fn parse_next(&mut self, in_struct: bool) -> Result<Type> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Qualifier => {
                let mut qualifiers = Qualifiers::empty();
                while self.peek()?.kind == TokenKind::Qualifier {
                    let token = self.advance()?;
                    let qualifier = token.text.chars().next().and_then(Qualifiers::from_code);
                    if let Some(qualifier) = qualifier {
                        qualifiers |= qualifier;
                    }
                }
                let inner = self.parse_any(in_struct)?;
                Ok(Type::modified(qualifiers, inner))
            }
            TokenKind::Primitive => {
                self.advance()?;
                token
                    .text
                    .chars()
                    .next()
                    .and_then(Primitive::from_code)
                    .map(Type::Primitive)
                    .ok_or_else(|| self.error(token.offset, "unknown primitive"))
            }
            TokenKind::Pointer => {
                self.advance()?;
                if self.peek_unknown()? {
                    self.advance()?;
                    return Ok(Type::FunctionPointer);
                }
                Ok(Type::Pointer(Box::new(self.parse_any(false)?)))
            }
            TokenKind::Object => {
                self.advance()?;
                self.parse_object(in_struct)
            }
            TokenKind::Bitfield => {
                if !in_struct {
                    return Err(self.error(token.offset, "bitfield outside of a structure"));
                }
                self.advance()?;
                let width = self.expect(TokenKind::Number, "bitfield width")?;
                let width = width
                    .text
                    .parse::<u32>()
                    .map_err(|_| self.error(width.offset, "invalid bitfield width"))?;
                Ok(Type::Bitfield(width))
            }
            TokenKind::ArrayOpen => {
                self.advance()?;
                let count = self.expect(TokenKind::Number, "array length")?;
                let count = count
                    .text
                    .parse::<u64>()
                    .map_err(|_| self.error(count.offset, "invalid array length"))?;
                let element = self.parse_any(false)?;
                self.expect(TokenKind::ArrayClose, "']'")?;
                Ok(Type::Array {
                    element: Box::new(element),
                    count,
                })
            }
            TokenKind::StructOpen => Ok(Type::Struct(self.parse_composite(TokenKind::StructClose)?)),
            TokenKind::UnionOpen => Ok(Type::Union(self.parse_composite(TokenKind::UnionClose)?)),
            TokenKind::Eos => Err(self.error(token.offset, "unexpected end of encoding")),
            _ => Err(self.error(token.offset, "unexpected character")),
        }
    }

    fn peek_unknown(&mut self) -> Result<bool> {
        let token = self.peek()?;
        Ok(token.kind == TokenKind::Primitive && token.text == "?")
    }

    fn parse_object(&mut self, in_struct: bool) -> Result<Type> {
        if self.peek_unknown()? {
            self.advance()?;
            if self.peek()?.kind == TokenKind::AngleOpen {
                return self.parse_block();
            }
            return Ok(Type::Block(None));
        }

        let token = self.peek()?;
        if token.kind == TokenKind::QuotedString && self.is_class_name(&token, in_struct) {
            self.advance()?;
            return Ok(Type::Id(parse_object_name(token.text)));
        }
        Ok(Type::Id(ObjectType::default()))
    }

    /// Decide whether a quoted string after `@` names the object's class.
    ///
    /// Inside structures the same syntax also introduces the next member's name. The
    /// string is taken as a class when it starts uppercase or as a protocol list, or
    /// when no type follows it.
    fn is_class_name(&self, token: &Token<'a>, in_struct: bool) -> bool {
        if !in_struct {
            return true;
        }
        if token
            .text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase() || c == '<')
        {
            return true;
        }
        self.lexer
            .byte_at(token.end)
            .map_or(true, |next| !classify(next).starts_type())
    }

    fn parse_block(&mut self) -> Result<Type> {
        let open = self.advance()?;
        match self.parse_block_signature() {
            Ok(signature) => Ok(Type::Block(Some(signature))),
            Err(err) => {
                trace!("degrading malformed block signature to opaque block: {}", err);
                self.lookahead = None;
                self.lexer.set_state(LexerState::Normal);
                let close = self
                    .matching_angle(open.end)
                    .ok_or_else(|| self.error(open.offset, "unterminated block signature"))?;
                self.lexer.seek(close + 1);
                Ok(Type::Block(None))
            }
        }
    }

    fn parse_block_signature(&mut self) -> Result<BlockSignature> {
        let return_type = self.parse_any(false)?;

        let receiver = self.expect(TokenKind::Object, "block receiver")?;
        if !self.peek_unknown()? {
            return Err(self.error(receiver.offset, "expected block receiver '@?'"));
        }
        self.advance()?;

        let mut parameters = Vec::new();
        loop {
            let token = self.peek()?;
            match token.kind {
                TokenKind::AngleClose => {
                    self.advance()?;
                    break;
                }
                TokenKind::Eos => {
                    return Err(self.error(token.offset, "unterminated block signature"));
                }
                _ => parameters.push(self.parse_any(false)?),
            }
        }

        Ok(BlockSignature {
            return_type: Box::new(return_type),
            parameters,
        })
    }

    /// Byte offset of the `>` closing a block signature whose body starts at `start`
    fn matching_angle(&self, start: usize) -> Option<usize> {
        let mut depth = 1usize;
        let mut quoted = false;
        for (offset, byte) in self.lexer.input().bytes().enumerate().skip(start) {
            match byte {
                b'"' => quoted = !quoted,
                b'<' if !quoted => depth += 1,
                b'>' if !quoted => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(offset);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn parse_composite(&mut self, close: TokenKind) -> Result<Composite> {
        let open = self.advance()?;

        self.switch_state(LexerState::Identifier);
        let token = self.peek()?;
        let name = if token.kind == TokenKind::Identifier {
            self.advance()?;
            tag_name(token.text)
        } else {
            None
        };
        self.switch_state(LexerState::Normal);

        let mut members = Vec::new();
        let token = self.advance()?;
        match token.kind {
            kind if kind == close => {}
            TokenKind::Equals => loop {
                let token = self.peek()?;
                if token.kind == close {
                    self.advance()?;
                    break;
                }
                if token.kind == TokenKind::Eos {
                    return Err(self.error(open.offset, "unterminated structure"));
                }

                let name = if token.kind == TokenKind::QuotedString {
                    self.advance()?;
                    Some(token.text.to_string())
                } else {
                    None
                };
                let ty = self.parse_any(true)?;
                members.push(Member { name, ty });
            },
            TokenKind::Eos => return Err(self.error(open.offset, "unterminated structure")),
            _ => return Err(self.error(token.offset, "expected '=' or end of structure")),
        }

        Ok(Composite { name, members })
    }
}

/// Tag names the compiler emits for anonymous structures
fn tag_name(text: &str) -> Option<String> {
    if text.is_empty() || text == "?" || text.starts_with("$_") {
        None
    } else {
        Some(text.to_string())
    }
}

/// Split `NSView<P1><P2>` into its class and protocol parts
fn parse_object_name(text: &str) -> ObjectType {
    let (class_name, protocols) = match text.find('<') {
        Some(index) => text.split_at(index),
        None => (text, ""),
    };

    ObjectType {
        class_name: (!class_name.is_empty()).then(|| class_name.to_string()),
        protocols: protocols
            .split(['<', '>'])
            .map(str::trim)
            .filter(|protocol| !protocol.is_empty())
            .map(ToString::to_string)
            .collect(),
    }
}
