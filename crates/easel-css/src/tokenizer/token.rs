//! CSS Token types per [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization).
//!
//! "The output of the tokenization step is a stream of zero or more of the
//! following tokens: `<ident-token>`, `<function-token>`, `<at-keyword-token>`,
//! `<hash-token>`, `<string-token>`, `<bad-string-token>`, `<url-token>`,
//! `<delim-token>`, `<number-token>`, `<percentage-token>`,
//! `<dimension-token>`, `<whitespace-token>`, `<CDO-token>`, `<CDC-token>`,
//! `<colon-token>`, `<semicolon-token>`, `<comma-token>`, `<[-token>`,
//! `<]-token>`, `<(-token>`, `<)-token>`, `<{-token>`, and `<}-token>`."
//!
//! On top of those, the attribute-matching operators (`~=`, `|=`, `^=`,
//! `$=`, `*=`) are distinct tokens as in CSS 2.1, and comments are kept as
//! tokens so tooling can see them.

use core::fmt;

use serde::Serialize;

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#token-diagrams)
///
/// "A `<hash-token>` with the type flag set to 'id'... or 'unrestricted'."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HashType {
    /// "id" - the hash token's value is a valid identifier
    Id,
    /// "unrestricted" - the hash token's value is not a valid identifier
    Unrestricted,
}

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#token-diagrams)
///
/// "A `<number-token>` has a type flag set to either 'integer' or 'number'."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumericType {
    /// "integer" - the number has no fractional part
    Integer,
    /// "number" - the number has a decimal point
    Number,
}

impl NumericType {
    /// Classify a numeric representation.
    #[must_use]
    pub fn of_repr(repr: &str) -> Self {
        if repr.contains('.') {
            Self::Number
        } else {
            Self::Integer
        }
    }
}

/// CSS tokens. Each variant corresponds to a token type in the railroad
/// diagrams of CSS Syntax Level 3, plus the CSS 2.1 match operators and
/// comments.
///
/// Numeric tokens keep their source representation (`repr`) so that
/// `1.50` serializes back as `1.50` and not `1.5`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CSSToken {
    /// "`<ident-token>`"
    Ident(String),

    /// "`<function-token>`": the name, without the opening parenthesis.
    Function(String),

    /// "`<at-keyword-token>`": the name, without the `@`.
    AtKeyword(String),

    /// "`<hash-token>`": the value, without the `#`.
    Hash {
        /// "a value composed of one or more code points"
        value: String,
        /// "a type flag set to either 'id' or 'unrestricted'"
        hash_type: HashType,
    },

    /// "`<string-token>`": the decoded value, without quotes.
    String(String),

    /// "`<bad-string-token>`": a string broken by an unescaped newline.
    BadString,

    /// "`<url-token>`": the value of `url(...)`, with surrounding whitespace
    /// and optional quotes removed.
    Url(String),

    /// "`<delim-token>`"
    Delim(char),

    /// "`<number-token>`"
    Number {
        /// The numeric value.
        value: f64,
        /// The source representation, including any sign.
        repr: String,
        /// Whether the number had a fractional part.
        numeric_type: NumericType,
    },

    /// "`<percentage-token>`"
    Percentage {
        /// The numeric value (50 for `50%`).
        value: f64,
        /// The source representation, without the `%`.
        repr: String,
        /// Whether the number had a fractional part.
        numeric_type: NumericType,
    },

    /// "`<dimension-token>`"
    Dimension {
        /// The numeric value.
        value: f64,
        /// The source representation of the number, without the unit.
        repr: String,
        /// Whether the number had a fractional part.
        numeric_type: NumericType,
        /// The unit, e.g. `px`.
        unit: String,
    },

    /// `~=`
    IncludeMatch,

    /// `|=`
    DashMatch,

    /// `^=`
    PrefixMatch,

    /// `$=`
    SuffixMatch,

    /// `*=`
    SubstringMatch,

    /// `/* ... */`: the comment text, without delimiters.
    Comment(String),

    /// "`<whitespace-token>`"
    Whitespace,

    /// "`<CDO-token>`" (`<!--`)
    CDO,

    /// "`<CDC-token>`" (`-->`)
    CDC,

    /// "`<colon-token>`"
    Colon,

    /// "`<semicolon-token>`"
    Semicolon,

    /// "`<comma-token>`"
    Comma,

    /// `<[-token>`
    LeftBracket,

    /// `<]-token>`
    RightBracket,

    /// `<(-token>`
    LeftParen,

    /// `<)-token>`
    RightParen,

    /// `<{-token>`
    LeftBrace,

    /// `<}-token>`
    RightBrace,

    /// End of file - signals end of input
    EOF,
}

impl CSSToken {
    /// Create a new ident token.
    #[must_use]
    pub fn ident(value: impl Into<String>) -> Self {
        Self::Ident(value.into())
    }

    /// Create a new string token.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Create a number token from its source representation.
    #[must_use]
    pub fn number(repr: impl Into<String>) -> Self {
        let repr = repr.into();
        Self::Number {
            value: repr.parse().unwrap_or(0.0),
            numeric_type: NumericType::of_repr(&repr),
            repr,
        }
    }

    /// Create a dimension token from its source representation and unit.
    #[must_use]
    pub fn dimension(repr: impl Into<String>, unit: impl Into<String>) -> Self {
        let repr = repr.into();
        Self::Dimension {
            value: repr.parse().unwrap_or(0.0),
            numeric_type: NumericType::of_repr(&repr),
            repr,
            unit: unit.into(),
        }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::EOF)
    }

    /// Returns true if this is a whitespace token.
    #[must_use]
    pub const fn is_whitespace(&self) -> bool {
        matches!(self, Self::Whitespace)
    }

    /// Returns true if this is a comment token.
    #[must_use]
    pub const fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_))
    }

    /// Returns true if writing `self` immediately followed by `next` would
    /// tokenize as something else, e.g. `a` then `b` reading back as `ab`.
    ///
    /// [§ 9 Serialization](https://www.w3.org/TR/css-syntax-3/#serialization)
    ///
    /// Covers the pairs of the serialization table that call for an empty
    /// comment, plus the match operators (`~` then `=` reads back as `~=`).
    #[must_use]
    pub const fn needs_separator(&self, next: &Self) -> bool {
        let ident_like = matches!(next, Self::Ident(_) | Self::Function(_) | Self::Url(_));
        let numeric = matches!(
            next,
            Self::Number { .. } | Self::Percentage { .. } | Self::Dimension { .. }
        );
        let minus = matches!(next, Self::Delim('-'));

        match self {
            Self::Ident(_) => {
                ident_like || numeric || minus || matches!(next, Self::CDC | Self::LeftParen)
            }
            Self::AtKeyword(_) | Self::Hash { .. } | Self::Dimension { .. } => {
                ident_like || numeric || minus || matches!(next, Self::CDC)
            }
            Self::Delim('#' | '-') => ident_like || numeric || minus,
            Self::Number { .. } => ident_like || numeric || matches!(next, Self::Delim('%')),
            Self::Delim('@') => ident_like || minus,
            Self::Delim('.' | '+') => numeric,
            Self::Delim('/') => matches!(next, Self::Delim('*')),
            Self::Delim('<') => matches!(next, Self::Delim('!')),
            Self::Delim('~' | '|' | '^' | '$' | '*') => matches!(next, Self::Delim('=')),
            _ => false,
        }
    }
}

/// A token together with the span of source it was scanned from.
///
/// Offsets count characters (not bytes) from the start of the input;
/// `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The token kind and payload.
    pub value: CSSToken,
    /// Offset of the first character of the token.
    pub start: usize,
    /// Offset one past the last character of the token.
    pub end: usize,
    /// Line on which the token starts.
    pub line: usize,
}

impl Token {
    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.value.is_eof()
    }
}

/// [§ 9 Serialization](https://www.w3.org/TR/css-syntax-3/#serialization)
///
/// Writes the token as CSS text. Strings are written double-quoted with
/// `"`, `\` and newlines escaped; identifiers are escaped where needed so
/// that the output re-tokenizes to an equal token.
impl fmt::Display for CSSToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(v) => write_identifier(f, v),
            Self::Function(v) => {
                write_identifier(f, v)?;
                f.write_str("(")
            }
            Self::AtKeyword(v) => {
                f.write_str("@")?;
                write_identifier(f, v)
            }
            Self::Hash { value, .. } => {
                f.write_str("#")?;
                write_name(f, value)
            }
            Self::String(v) => write_string(f, v),
            Self::BadString => f.write_str("\"\n"),
            Self::Url(v) => {
                f.write_str("url(")?;
                write_string(f, v)?;
                f.write_str(")")
            }
            Self::Delim(c) => write!(f, "{c}"),
            Self::Number { repr, .. } => f.write_str(repr),
            Self::Percentage { repr, .. } => write!(f, "{repr}%"),
            Self::Dimension { repr, unit, .. } => {
                f.write_str(repr)?;
                write_name(f, unit)
            }
            Self::IncludeMatch => f.write_str("~="),
            Self::DashMatch => f.write_str("|="),
            Self::PrefixMatch => f.write_str("^="),
            Self::SuffixMatch => f.write_str("$="),
            Self::SubstringMatch => f.write_str("*="),
            Self::Comment(v) => write!(f, "/*{v}*/"),
            Self::Whitespace => f.write_str(" "),
            Self::CDO => f.write_str("<!--"),
            Self::CDC => f.write_str("-->"),
            Self::Colon => f.write_str(":"),
            Self::Semicolon => f.write_str(";"),
            Self::Comma => f.write_str(","),
            Self::LeftBracket => f.write_str("["),
            Self::RightBracket => f.write_str("]"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::LeftBrace => f.write_str("{"),
            Self::RightBrace => f.write_str("}"),
            Self::EOF => Ok(()),
        }
    }
}

/// Writes a token sequence, with an empty comment between neighbours that
/// would otherwise run together (see [`CSSToken::needs_separator`]).
pub fn write_tokens(f: &mut impl fmt::Write, tokens: &[CSSToken]) -> fmt::Result {
    let mut previous: Option<&CSSToken> = None;
    for token in tokens {
        if previous.is_some_and(|p| p.needs_separator(token)) {
            f.write_str("/**/")?;
        }
        write!(f, "{token}")?;
        previous = Some(token);
    }
    Ok(())
}

/// [§ 9.1 Serialize an identifier](https://drafts.csswg.org/cssom/#serialize-an-identifier)
///
/// Writes `value` so that it tokenizes back to an `<ident-token>` with the
/// same value.
pub fn write_identifier(f: &mut impl fmt::Write, value: &str) -> fmt::Result {
    let mut chars = value.chars().peekable();
    match chars.peek() {
        None => return Ok(()),
        Some('-') => {
            let _ = chars.next();
            f.write_char('-')?;
            match chars.peek() {
                // A lone "-" never comes out of the tokenizer as an ident.
                None => return Ok(()),
                Some(&c) if c.is_ascii_digit() => {
                    let _ = chars.next();
                    write!(f, "\\{:x} ", u32::from(c))?;
                }
                _ => {}
            }
        }
        Some(&c) if c.is_ascii_digit() => {
            let _ = chars.next();
            write!(f, "\\{:x} ", u32::from(c))?;
        }
        _ => {}
    }
    for c in chars {
        write_name_char(f, c)?;
    }
    Ok(())
}

/// Writes `value` as a sequence of escaped ident code points (used after `#`
/// and for dimension units, where a leading digit needs no escape).
fn write_name(f: &mut impl fmt::Write, value: &str) -> fmt::Result {
    for c in value.chars() {
        write_name_char(f, c)?;
    }
    Ok(())
}

fn write_name_char(f: &mut impl fmt::Write, c: char) -> fmt::Result {
    if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
        f.write_char(c)
    } else if c.is_ascii_control() {
        write!(f, "\\{:x} ", u32::from(c))
    } else {
        write!(f, "\\{c}")
    }
}

/// [§ 9.1 Serialize a string](https://drafts.csswg.org/cssom/#serialize-a-string)
pub fn write_string(f: &mut impl fmt::Write, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' | '\\' => write!(f, "\\{c}")?,
            '\n' => f.write_str("\\a ")?,
            c if c.is_ascii_control() => write!(f, "\\{:x} ", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
