use super::token::{CSSToken, HashType, NumericType, Token};

/// [§ 4.3 Tokenizer Algorithms](https://www.w3.org/TR/css-syntax-3/#tokenizer-algorithms)
///
/// CSS tokenizer. Tokens are produced lazily by [`next_token`](Self::next_token);
/// a single token can be handed back with [`push_back`](Self::push_back).
///
/// The tokenizer never fails. Malformed input (unterminated strings,
/// comments or `url(`) degrades to the most specific token that can still be
/// identified; deciding whether the token stream is valid is the parser's job.
pub struct CSSTokenizer {
    /// The input string being tokenized
    input: Vec<char>,
    /// Current position in the input
    position: usize,
    /// Current 1-based line
    line: usize,
    /// The most recently returned token, available for `push_back`
    last: Option<Token>,
    /// A token handed back by `push_back`, returned by the next `next_token`
    pushed_back: Option<Token>,
    /// Collected tokens (eager mode)
    tokens: Vec<Token>,
}

impl CSSTokenizer {
    /// Create a new CSS tokenizer with the given input.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into().chars().collect(),
            position: 0,
            line: 1,
            last: None,
            pushed_back: None,
            tokens: Vec::new(),
        }
    }

    /// Return the next token, advancing the cursor. Once the input is
    /// exhausted every call returns an EOF token.
    pub fn next_token(&mut self) -> Token {
        let token = match self.pushed_back.take() {
            Some(token) => token,
            None => self.consume_token(),
        };
        self.last = Some(token.clone());
        token
    }

    /// Un-consume the token most recently returned by `next_token`.
    ///
    /// Only one token of lookahead is kept: calling this twice without an
    /// intervening `next_token` has no further effect.
    pub fn push_back(&mut self) {
        if self.pushed_back.is_none() {
            self.pushed_back = self.last.take();
        }
    }

    /// Tokenize the whole input, collecting every token up to and
    /// including EOF.
    pub fn run(&mut self) {
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            self.tokens.push(token);
            if is_eof {
                break;
            }
        }
    }

    /// Return the collected tokens.
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Return a reference to the collected tokens.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The raw source text a token was scanned from.
    #[must_use]
    pub fn source_text(&self, token: &Token) -> String {
        let end = token.end.min(self.input.len());
        let start = token.start.min(end);
        self.input[start..end].iter().collect()
    }

    /// Current character offset of the cursor.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// [§ 4.3.1 Consume a token](https://www.w3.org/TR/css-syntax-3/#consume-token)
    fn consume_token(&mut self) -> Token {
        let start = self.position;
        let line = self.line;
        let value = self.consume_token_value();
        Token {
            value,
            start,
            end: self.position,
            line,
        }
    }

    fn consume_token_value(&mut self) -> CSSToken {
        // Comments are kept as tokens; the parser skips them.
        if self.peek() == Some('/') && self.peek_at(1) == Some('*') {
            return self.consume_comment();
        }

        // "Consume the next input code point."
        let Some(c) = self.consume() else {
            return CSSToken::EOF;
        };

        match c {
            // "whitespace"
            // "Consume as much whitespace as possible. Return a <whitespace-token>."
            c if is_whitespace(c) => {
                self.consume_whitespace();
                CSSToken::Whitespace
            }

            // "U+0022 QUOTATION MARK (")" / "U+0027 APOSTROPHE (')"
            // "Consume a string token and return it."
            '"' | '\'' => self.consume_string_token(c),

            // "U+0023 NUMBER SIGN (#)"
            '#' => {
                // "If the next input code point is an ident code point or the next
                // two input code points are a valid escape..."
                if self.peek().is_some_and(is_ident_code_point)
                    || is_valid_escape(self.peek(), self.peek_at(1))
                {
                    // "If the next 3 input code points would start an ident sequence,
                    // set the <hash-token>'s type flag to 'id'."
                    let hash_type = if self.would_start_ident_sequence() {
                        HashType::Id
                    } else {
                        HashType::Unrestricted
                    };
                    let value = self.consume_ident_sequence();
                    CSSToken::Hash { value, hash_type }
                } else {
                    CSSToken::Delim('#')
                }
            }

            '(' => CSSToken::LeftParen,
            ')' => CSSToken::RightParen,
            ',' => CSSToken::Comma,
            ':' => CSSToken::Colon,
            ';' => CSSToken::Semicolon,
            '[' => CSSToken::LeftBracket,
            ']' => CSSToken::RightBracket,
            '{' => CSSToken::LeftBrace,
            '}' => CSSToken::RightBrace,

            // "U+002B PLUS SIGN (+)" / "U+002E FULL STOP (.)"
            '+' | '.' => {
                self.reconsume();
                if self.would_start_number() {
                    self.consume_numeric_token()
                } else {
                    let _ = self.consume();
                    CSSToken::Delim(c)
                }
            }

            // "U+002D HYPHEN-MINUS (-)"
            '-' => {
                self.reconsume();
                if self.would_start_number() {
                    self.consume_numeric_token()
                }
                // "Otherwise, if the next 2 input code points are U+002D U+003E (->)..."
                else if self.peek_at(1) == Some('-') && self.peek_at(2) == Some('>') {
                    self.advance(3);
                    CSSToken::CDC
                }
                // "Otherwise, if the input stream starts with an ident sequence..."
                else if self.would_start_ident_sequence() {
                    self.consume_ident_like_token()
                } else {
                    let _ = self.consume();
                    CSSToken::Delim('-')
                }
            }

            // "U+003C LESS-THAN SIGN (<)"
            '<' => {
                // "If the next 3 input code points are U+0021 U+002D U+002D (!--)..."
                if self.peek() == Some('!')
                    && self.peek_at(1) == Some('-')
                    && self.peek_at(2) == Some('-')
                {
                    self.advance(3);
                    CSSToken::CDO
                } else {
                    CSSToken::Delim('<')
                }
            }

            // "U+0040 COMMERCIAL AT (@)"
            '@' => {
                if self.would_start_ident_sequence() {
                    CSSToken::AtKeyword(self.consume_ident_sequence())
                } else {
                    CSSToken::Delim('@')
                }
            }

            // "U+005C REVERSE SOLIDUS (\)"
            '\\' => {
                if is_valid_escape(Some('\\'), self.peek()) {
                    self.reconsume();
                    self.consume_ident_like_token()
                } else {
                    CSSToken::Delim('\\')
                }
            }

            // Match operators are scanned greedily; a lone operator
            // character falls back to a delim.
            '~' | '|' | '^' | '$' | '*' if self.peek() == Some('=') => {
                let _ = self.consume();
                match c {
                    '~' => CSSToken::IncludeMatch,
                    '|' => CSSToken::DashMatch,
                    '^' => CSSToken::PrefixMatch,
                    '$' => CSSToken::SuffixMatch,
                    _ => CSSToken::SubstringMatch,
                }
            }

            // "digit"
            c if c.is_ascii_digit() => {
                self.reconsume();
                self.consume_numeric_token()
            }

            // "ident-start code point"
            c if is_ident_start_code_point(c) => {
                self.reconsume();
                self.consume_ident_like_token()
            }

            // "anything else"
            c => CSSToken::Delim(c),
        }
    }

    /// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
    ///
    /// Consumes one comment. An unterminated comment runs to EOF and its
    /// partial text is returned.
    fn consume_comment(&mut self) -> CSSToken {
        self.advance(2); // /*
        let mut text = String::new();
        loop {
            match self.consume() {
                Some('*') if self.peek() == Some('/') => {
                    let _ = self.consume();
                    break;
                }
                Some(c) => text.push(c),
                None => break,
            }
        }
        CSSToken::Comment(text)
    }

    /// Consume whitespace characters.
    fn consume_whitespace(&mut self) {
        while self.consume_if(is_whitespace).is_some() {}
    }

    /// [§ 4.3.4 Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    fn consume_string_token(&mut self, ending_code_point: char) -> CSSToken {
        let mut value = String::new();

        loop {
            match self.consume() {
                // "ending code point": "Return the <string-token>."
                Some(c) if c == ending_code_point => return CSSToken::String(value),

                // "EOF": "This is a parse error. Return the <string-token>."
                None => return CSSToken::String(value),

                // "newline": "Reconsume the current input code point,
                // create a <bad-string-token>, and return it."
                Some(c) if is_newline(c) => {
                    self.reconsume();
                    return CSSToken::BadString;
                }

                // "U+005C REVERSE SOLIDUS (\)"
                Some('\\') => match self.peek() {
                    // "If the next input code point is EOF, do nothing."
                    None => {}
                    // "Otherwise, if the next input code point is a newline,
                    // consume it."
                    Some(c) if is_newline(c) => {
                        let _ = self.consume();
                        if c == '\r' && self.peek() == Some('\n') {
                            let _ = self.consume();
                        }
                    }
                    // "Otherwise, consume an escaped code point and append the
                    // returned code point to the <string-token>'s value."
                    Some(_) => value.push(self.consume_escaped_code_point()),
                },

                Some(c) => value.push(c),
            }
        }
    }

    /// [§ 4.3.3 Consume a numeric token](https://www.w3.org/TR/css-syntax-3/#consume-numeric-token)
    fn consume_numeric_token(&mut self) -> CSSToken {
        let repr = self.consume_number();
        let value = repr.parse().unwrap_or(0.0);
        let numeric_type = NumericType::of_repr(&repr);

        // "If the next input code point is U+0025 PERCENTAGE SIGN (%)..."
        if self.peek() == Some('%') {
            let _ = self.consume();
            CSSToken::Percentage {
                value,
                repr,
                numeric_type,
            }
        }
        // "If the next 3 input code points would start an ident sequence..."
        else if self.would_start_ident_sequence() {
            let unit = self.consume_ident_sequence();
            CSSToken::Dimension {
                value,
                repr,
                numeric_type,
                unit,
            }
        } else {
            CSSToken::Number {
                value,
                repr,
                numeric_type,
            }
        }
    }

    /// [§ 4.3.4 Consume an ident-like token](https://www.w3.org/TR/css-syntax-3/#consume-ident-like-token)
    fn consume_ident_like_token(&mut self) -> CSSToken {
        let string = self.consume_ident_sequence();

        if string.eq_ignore_ascii_case("url") && self.peek() == Some('(') {
            let _ = self.consume(); // (
            self.consume_url_token()
        } else if self.peek() == Some('(') {
            let _ = self.consume();
            CSSToken::Function(string)
        } else {
            CSSToken::Ident(string)
        }
    }

    /// [§ 4.3.6 Consume a url token](https://www.w3.org/TR/css-syntax-3/#consume-url-token)
    ///
    /// Scans up to the closing parenthesis. Surrounding whitespace and one
    /// pair of optional quotes are trimmed. Reaching EOF returns what was
    /// scanned so far.
    fn consume_url_token(&mut self) -> CSSToken {
        let mut value = String::new();

        self.consume_whitespace();

        if let Some(quote) = self.consume_if(|c| c == '"' || c == '\'') {
            loop {
                match self.consume() {
                    Some(c) if c == quote => break,
                    None => return CSSToken::Url(value),
                    Some('\\') if self.peek().is_some() => {
                        value.push(self.consume_escaped_code_point());
                    }
                    Some(c) => value.push(c),
                }
            }
            // Anything between the closing quote and `)` is dropped.
            loop {
                match self.consume() {
                    Some(')') | None => return CSSToken::Url(value),
                    Some(_) => {}
                }
            }
        }

        loop {
            match self.consume() {
                Some(')') | None => break,
                Some('\\') if is_valid_escape(Some('\\'), self.peek()) => {
                    value.push(self.consume_escaped_code_point());
                }
                Some(c) => value.push(c),
            }
        }
        let trimmed_len = value.trim_end_matches(is_whitespace).len();
        value.truncate(trimmed_len);
        CSSToken::Url(value)
    }

    /// [§ 4.3.11 Consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    fn consume_ident_sequence(&mut self) -> String {
        let mut result = String::new();

        loop {
            match self.consume() {
                Some(c) if is_ident_code_point(c) => result.push(c),

                // "the stream starts with a valid escape"
                Some('\\') if is_valid_escape(Some('\\'), self.peek()) => {
                    result.push(self.consume_escaped_code_point());
                }

                // "anything else": "Reconsume the current input code point. Return result."
                Some(_) => {
                    self.reconsume();
                    return result;
                }

                None => return result,
            }
        }
    }

    /// [§ 4.3.12 Consume a number](https://www.w3.org/TR/css-syntax-3/#consume-number)
    ///
    /// Optional sign, digits, optional fraction. There is no exponent part:
    /// `1e3` scans as a dimension with unit `e3`.
    fn consume_number(&mut self) -> String {
        let mut repr = String::new();

        if let Some(sign) = self.consume_if(|c| c == '+' || c == '-') {
            repr.push(sign);
        }

        while let Some(digit) = self.consume_if(|c| c.is_ascii_digit()) {
            repr.push(digit);
        }

        // "If the next 2 input code points are U+002E FULL STOP (.) followed by a digit..."
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            let _ = self.consume();
            repr.push('.');
            while let Some(digit) = self.consume_if(|c| c.is_ascii_digit()) {
                repr.push(digit);
            }
        }

        repr
    }

    /// [§ 4.3.7 Consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point)
    ///
    /// Assumes the `\` has already been consumed.
    fn consume_escaped_code_point(&mut self) -> char {
        match self.consume() {
            // "hex digit"
            Some(c) if c.is_ascii_hexdigit() => {
                let mut hex = String::from(c);
                // "Consume as many hex digits as possible, but no more than 5."
                for _ in 0..5 {
                    match self.consume_if(|c| c.is_ascii_hexdigit()) {
                        Some(digit) => hex.push(digit),
                        None => break,
                    }
                }
                // "If the next input code point is whitespace, consume it."
                let _ = self.consume_if(is_whitespace);

                let code_point = u32::from_str_radix(&hex, 16).unwrap_or(0);
                // "If this number is zero, or is for a surrogate, or is greater than the
                // maximum allowed code point, return U+FFFD REPLACEMENT CHARACTER."
                if code_point == 0 {
                    '\u{FFFD}'
                } else {
                    char::from_u32(code_point).unwrap_or('\u{FFFD}')
                }
            }
            // "EOF": "Return U+FFFD REPLACEMENT CHARACTER."
            None => '\u{FFFD}',
            // "anything else": "Return the current input code point."
            Some(c) => c,
        }
    }

    /// [§ 4.3.9 Check if three code points would start an ident sequence](https://www.w3.org/TR/css-syntax-3/#would-start-an-identifier)
    fn would_start_ident_sequence(&self) -> bool {
        match self.peek() {
            Some('-') => {
                let second = self.peek_at(1);
                second.is_some_and(|c| is_ident_start_code_point(c) || c == '-')
                    || is_valid_escape(second, self.peek_at(2))
            }
            Some('\\') => is_valid_escape(Some('\\'), self.peek_at(1)),
            Some(c) => is_ident_start_code_point(c),
            None => false,
        }
    }

    /// [§ 4.3.10 Check if three code points would start a number](https://www.w3.org/TR/css-syntax-3/#starts-with-a-number)
    fn would_start_number(&self) -> bool {
        match self.peek() {
            Some('+' | '-') => match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('.') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            },
            Some('.') => self.peek_at(1).is_some_and(|c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        }
    }

    /// Consume and return the next character.
    fn consume(&mut self) -> Option<char> {
        let c = *self.input.get(self.position)?;
        self.position += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Consume the next character if it satisfies `predicate`.
    fn consume_if(&mut self, predicate: impl Fn(char) -> bool) -> Option<char> {
        if self.peek().is_some_and(&predicate) {
            self.consume()
        } else {
            None
        }
    }

    /// Consume `count` characters.
    fn advance(&mut self, count: usize) {
        for _ in 0..count {
            let _ = self.consume();
        }
    }

    /// Put back the last consumed character.
    fn reconsume(&mut self) {
        if self.position > 0 {
            self.position -= 1;
            if self.input[self.position] == '\n' {
                self.line -= 1;
            }
        }
    }

    /// Peek at the next character without consuming it.
    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    /// Peek at a character at an offset from current position.
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }
}

/// Tokenize `input` eagerly, returning every token including the final EOF.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokenizer = CSSTokenizer::new(input);
    tokenizer.run();
    tokenizer.into_tokens()
}

/// [§ 4.3.8 Check if two code points are a valid escape](https://www.w3.org/TR/css-syntax-3/#starts-with-a-valid-escape)
fn is_valid_escape(first: Option<char>, second: Option<char>) -> bool {
    // "If the first code point is not U+005C REVERSE SOLIDUS (\), return false.
    // Otherwise, if the second code point is a newline, return false."
    first == Some('\\') && !second.is_some_and(is_newline)
}

/// [§ 4.2 Definitions - newline](https://www.w3.org/TR/css-syntax-3/#newline)
const fn is_newline(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\x0C')
}

/// [§ 4.2 Definitions - whitespace](https://www.w3.org/TR/css-syntax-3/#whitespace)
///
/// "A newline, U+0009 CHARACTER TABULATION, or U+0020 SPACE."
const fn is_whitespace(c: char) -> bool {
    matches!(c, '\n' | '\t' | ' ' | '\r' | '\x0C')
}

/// [§ 4.2 Definitions - ident-start code point](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
///
/// "A letter, a non-ASCII code point, or U+005F LOW LINE (_)."
const fn is_ident_start_code_point(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// [§ 4.2 Definitions - ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
///
/// "An ident-start code point, a digit, or U+002D HYPHEN-MINUS (-)."
const fn is_ident_code_point(c: char) -> bool {
    is_ident_start_code_point(c) || c.is_ascii_digit() || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_back_returns_same_token() {
        let mut tokenizer = CSSTokenizer::new("a b");
        let first = tokenizer.next_token();
        tokenizer.push_back();
        assert_eq!(tokenizer.next_token(), first);
        assert_eq!(tokenizer.next_token().value, CSSToken::Whitespace);
    }

    #[test]
    fn test_push_back_is_single_slot() {
        let mut tokenizer = CSSTokenizer::new("a b");
        let _ = tokenizer.next_token();
        tokenizer.push_back();
        tokenizer.push_back();
        assert_eq!(tokenizer.next_token().value, CSSToken::ident("a"));
        assert_eq!(tokenizer.next_token().value, CSSToken::Whitespace);
    }

    #[test]
    fn test_line_tracking() {
        let tokens = tokenize("a\n  b\nc");
        let lines: Vec<usize> = tokens
            .iter()
            .filter(|t| matches!(t.value, CSSToken::Ident(_)))
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_eof_repeats() {
        let mut tokenizer = CSSTokenizer::new("");
        assert!(tokenizer.next_token().is_eof());
        assert!(tokenizer.next_token().is_eof());
    }
}
