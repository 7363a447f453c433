//! CSS Parser per [CSS 2.1 § 4.1 Syntax](https://www.w3.org/TR/CSS21/syndata.html#syntax).
//!
//! "The input to the parsing stage is a stream of tokens from the tokenization stage."
//! The parser pulls tokens lazily from a [`CSSTokenizer`], using its single
//! token of push-back for lookahead. One function per grammar rule:
//!
//! ```text
//! stylesheet     : [ CDO | CDC | S | ruleset | at-rule ]* ;
//! ruleset        : selector_group '{' S* declarations '}' ;
//! selector_group : selector [ ',' S* selector ]* ;
//! selector       : compound [ combinator compound ]* ;
//! combinator     : S+ | S* [ '>' | '+' | '~' ] S* ;
//! compound       : [ type | '*' ] [ id | class | pseudo | attrib ]*
//!                | [ id | class | pseudo | attrib ]+ ;
//! attrib         : '[' S* IDENT S* [ [ '=' | '~=' | '|=' | '^=' | '$=' | '*=' ] S*
//!                  [ IDENT | STRING ] S* ]? ']' ;
//! declarations   : [ declaration ]? [ ';' S* [ declaration ]? ]* ;
//! declaration    : IDENT S* ':' S* term+ [ '!' S* "important" ]? ;
//! ```
//!
//! [§ 4.2 Rules for handling parsing errors](https://www.w3.org/TR/CSS21/syndata.html#parsing-errors)
//!
//! Errors never abort the parse. A malformed ruleset is skipped up to and
//! including its matching `}`; a malformed declaration is skipped up to the
//! next `;` or the end of its block. Each skipped construct is reported as
//! exactly one [`ParseError`].

use core::fmt;

use easel_common::warning::warn_once;
use serde::Serialize;
use thiserror::Error;

use crate::selector::{Combinator, Selector, SelectorGroup, SimpleSelector};
use crate::tokenizer::{CSSToken, CSSTokenizer, Token, write_identifier, write_tokens};

/// A recoverable syntax error, reported alongside the best-effort result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("line {line}, offset {offset}: {message}")]
pub struct ParseError {
    /// What was wrong.
    pub message: String,
    /// Character offset of the offending token.
    pub offset: usize,
    /// 1-based line of the offending token.
    pub line: usize,
}

impl ParseError {
    fn at(token: &Token, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: token.start,
            line: token.line,
        }
    }
}

/// A declaration such as `stroke-width: 2px`.
///
/// The value is kept as raw tokens. Interpreting colors, lengths or
/// function calls is left to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    /// The property name.
    pub property: String,
    /// The value tokens. Runs of whitespace are collapsed to a single
    /// [`CSSToken::Whitespace`], comments are dropped and the value is
    /// trimmed. Serializing writes `/**/` where a dropped comment kept two
    /// tokens apart.
    pub terms: Vec<CSSToken>,
    /// Whether the declaration ended with `!important`.
    ///
    /// The flag is recorded but plays no part in the cascade.
    pub important: bool,
}

impl Declaration {
    /// The value as CSS text, e.g. `1px solid`.
    #[must_use]
    pub fn value_text(&self) -> String {
        let mut text = String::new();
        let _ = write_tokens(&mut text, &self.terms);
        text
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_identifier(f, &self.property)?;
        f.write_str(": ")?;
        write_tokens(f, &self.terms)?;
        if self.important {
            f.write_str(" !important")?;
        }
        Ok(())
    }
}

/// A selector group and the declarations that apply to whatever it matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ruleset {
    /// The comma-separated selectors.
    pub selectors: SelectorGroup,
    /// The declarations in source order.
    pub declarations: Vec<Declaration>,
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.selectors)?;
        for declaration in &self.declarations {
            writeln!(f, "  {declaration};")?;
        }
        f.write_str("}")
    }
}

/// A parsed style sheet. Rulesets are kept in document order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Stylesheet {
    /// The rulesets in document order.
    pub rulesets: Vec<Ruleset>,
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ruleset in &self.rulesets {
            writeln!(f, "{ruleset}")?;
        }
        Ok(())
    }
}

/// CSS parser
pub struct CSSParser {
    tokenizer: CSSTokenizer,
    errors: Vec<ParseError>,
}

impl CSSParser {
    /// Create a new parser over the given text.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            tokenizer: CSSTokenizer::new(input),
            errors: Vec::new(),
        }
    }

    /// Errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Consume the parser, returning the recorded errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// [§ 4.1.1 Tokenization](https://www.w3.org/TR/CSS21/syndata.html#tokenization)
    /// `stylesheet : [ CDO | CDC | S | statement ]*;`
    pub fn parse_stylesheet(&mut self) -> Stylesheet {
        let mut rulesets = Vec::new();

        loop {
            let token = self.next();
            match &token.value {
                // SGML comment delimiters are allowed, and ignored, at top level.
                CSSToken::Whitespace | CSSToken::CDO | CSSToken::CDC => {}

                CSSToken::EOF => return Stylesheet { rulesets },

                // [§ 4.1.5 At-rules](https://www.w3.org/TR/CSS21/syndata.html#at-rules)
                CSSToken::AtKeyword(name) => {
                    warn_once("CSS", &format!("skipping unsupported at-rule '@{name}'"));
                    self.skip_at_rule();
                }

                _ => {
                    self.push_back();
                    match self.parse_ruleset() {
                        Ok(ruleset) => rulesets.push(ruleset),
                        Err(error) => {
                            self.errors.push(error);
                            self.skip_ruleset();
                        }
                    }
                }
            }
        }
    }

    /// Parse the whole input as a declaration list, the content of a
    /// `style` attribute such as `fill: red; stroke: blue`.
    pub fn parse_declaration_list(&mut self) -> Vec<Declaration> {
        self.parse_declarations(false)
    }

    /// Parse the whole input as a selector group.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error; unlike the other entry points there is
    /// no partial result.
    pub fn parse_selector_group(&mut self) -> Result<SelectorGroup, ParseError> {
        let group = self.selector_group()?;
        let _ = self.skip_whitespace();
        let token = self.next();
        if token.is_eof() {
            Ok(group)
        } else {
            Err(ParseError::at(&token, "unexpected token after selector"))
        }
    }

    /// `ruleset : selector_group '{' S* declarations '}' ;`
    fn parse_ruleset(&mut self) -> Result<Ruleset, ParseError> {
        let selectors = self.selector_group()?;

        let token = self.next();
        if !matches!(token.value, CSSToken::LeftBrace) {
            self.push_back();
            return Err(ParseError::at(&token, "expected '{' after selector"));
        }

        let declarations = self.parse_declarations(true);
        Ok(Ruleset {
            selectors,
            declarations,
        })
    }

    /// `selector_group : selector [ ',' S* selector ]* ;`
    ///
    /// Stops before the token that follows the last selector.
    fn selector_group(&mut self) -> Result<SelectorGroup, ParseError> {
        let mut selectors = vec![self.selector()?];
        loop {
            let token = self.next();
            if matches!(token.value, CSSToken::Comma) {
                selectors.push(self.selector()?);
            } else {
                self.push_back();
                return Ok(SelectorGroup(selectors));
            }
        }
    }

    /// `selector : compound [ combinator compound ]* ;`
    ///
    /// Builds a left-associative chain: `a > b c` is `(a > b) c`.
    fn selector(&mut self) -> Result<Selector, ParseError> {
        let _ = self.skip_whitespace();
        let mut selector = self.compound()?;

        loop {
            let saw_whitespace = self.skip_whitespace();
            let token = self.next();
            let combinator = match token.value {
                CSSToken::Delim('>') => Combinator::Child,
                CSSToken::Delim('+') => Combinator::AdjacentSibling,
                CSSToken::Delim('~') => Combinator::GeneralSibling,
                CSSToken::Comma | CSSToken::LeftBrace | CSSToken::EOF => {
                    self.push_back();
                    return Ok(selector);
                }
                _ if saw_whitespace => {
                    self.push_back();
                    Combinator::Descendant
                }
                _ => {
                    self.push_back();
                    return Err(ParseError::at(&token, "unexpected token in selector"));
                }
            };
            if combinator != Combinator::Descendant {
                let _ = self.skip_whitespace();
            }
            let right = self.compound()?;
            selector = Selector::combine(combinator, selector, right);
        }
    }

    /// One compound selector: simple selectors with nothing between them,
    /// joined with [`Combinator::And`].
    fn compound(&mut self) -> Result<Selector, ParseError> {
        let mut compound: Option<Selector> = None;

        loop {
            let token = self.next();
            let simple = match token.value {
                // Type and universal selectors may only start a compound.
                CSSToken::Ident(ref name) if compound.is_none() => {
                    SimpleSelector::Type(name.clone())
                }
                CSSToken::Delim('*') if compound.is_none() => SimpleSelector::Universal,
                CSSToken::Hash { ref value, .. } => SimpleSelector::Id(value.clone()),
                CSSToken::Delim('.') => SimpleSelector::StyleClass(self.expect_ident("class name")?),
                CSSToken::Colon => self.pseudo_class()?,
                CSSToken::LeftBracket => self.attribute_selector()?,
                _ => {
                    self.push_back();
                    return compound.ok_or_else(|| ParseError::at(&token, "expected selector"));
                }
            };
            compound = Some(match compound {
                None => Selector::Simple(simple),
                Some(left) => Selector::combine(Combinator::And, left, Selector::Simple(simple)),
            });
        }
    }

    /// `pseudo : ':' IDENT ;` (the colon is already consumed)
    fn pseudo_class(&mut self) -> Result<SimpleSelector, ParseError> {
        let token = self.next();
        match token.value {
            CSSToken::Ident(name) => Ok(SimpleSelector::PseudoClass(name)),
            CSSToken::Colon => {
                warn_once("CSS", "pseudo-elements are not supported");
                self.push_back();
                Err(ParseError::at(&token, "pseudo-elements are not supported"))
            }
            CSSToken::Function(ref name) => {
                warn_once("CSS", &format!("unsupported functional pseudo-class ':{name}()'"));
                self.push_back();
                Err(ParseError::at(
                    &token,
                    format!("functional pseudo-class ':{name}()' is not supported"),
                ))
            }
            _ => {
                self.push_back();
                Err(ParseError::at(&token, "expected pseudo-class name"))
            }
        }
    }

    /// `attrib : '[' S* IDENT S* [ op S* [ IDENT | STRING ] S* ]? ']' ;`
    /// (the bracket is already consumed)
    fn attribute_selector(&mut self) -> Result<SimpleSelector, ParseError> {
        let _ = self.skip_whitespace();
        let name = self.expect_ident("attribute name")?;
        let _ = self.skip_whitespace();

        let token = self.next();
        let operator = match token.value {
            CSSToken::RightBracket => return Ok(SimpleSelector::AttributeExists(name)),
            CSSToken::Delim('=')
            | CSSToken::IncludeMatch
            | CSSToken::DashMatch
            | CSSToken::PrefixMatch
            | CSSToken::SuffixMatch
            | CSSToken::SubstringMatch => token.value,
            _ => {
                self.push_back();
                return Err(ParseError::at(&token, "expected attribute operator or ']'"));
            }
        };

        let _ = self.skip_whitespace();
        let token = self.next();
        let value = match token.value {
            CSSToken::Ident(value) | CSSToken::String(value) => value,
            _ => {
                self.push_back();
                return Err(ParseError::at(&token, "expected attribute value"));
            }
        };

        let _ = self.skip_whitespace();
        let token = self.next();
        if !matches!(token.value, CSSToken::RightBracket) {
            self.push_back();
            return Err(ParseError::at(&token, "expected ']'"));
        }

        Ok(match operator {
            CSSToken::IncludeMatch => SimpleSelector::AttributeWordListItem(name, value),
            CSSToken::DashMatch => SimpleSelector::AttributeStartsWith(name, value),
            CSSToken::PrefixMatch => SimpleSelector::AttributePrefix(name, value),
            CSSToken::SuffixMatch => SimpleSelector::AttributeSuffix(name, value),
            CSSToken::SubstringMatch => SimpleSelector::AttributeValueContainsWord(name, value),
            _ => SimpleSelector::AttributeEquals(name, value),
        })
    }

    /// `declarations : [ declaration ]? [ ';' S* [ declaration ]? ]* ;`
    ///
    /// With `in_block` set the list ends at `}` (consumed); otherwise it runs
    /// to the end of the input.
    fn parse_declarations(&mut self, in_block: bool) -> Vec<Declaration> {
        let mut declarations = Vec::new();

        loop {
            let token = self.next();
            match token.value {
                CSSToken::Whitespace | CSSToken::Semicolon => {}
                CSSToken::RightBrace if in_block => return declarations,
                CSSToken::EOF => {
                    // The ruleset is kept; only the missing '}' is reported.
                    if in_block {
                        self.errors
                            .push(ParseError::at(&token, "unexpected end of input in block"));
                    }
                    self.push_back();
                    return declarations;
                }
                _ => {
                    self.push_back();
                    match self.declaration() {
                        Ok(Some(declaration)) => declarations.push(declaration),
                        Ok(None) => {}
                        Err(error) => {
                            self.errors.push(error);
                            self.skip_declaration(in_block);
                        }
                    }
                }
            }
        }
    }

    /// `declaration : IDENT S* ':' S* term+ prio? ;`
    ///
    /// An `Err` leaves the parser inside the declaration and the caller
    /// resynchronizes. A declaration whose value turns out to be empty or
    /// holds a bad string is reported here and dropped with `Ok(None)`,
    /// since its terminator has already been consumed.
    fn declaration(&mut self) -> Result<Option<Declaration>, ParseError> {
        let start = self.next();
        let property = match start.value {
            CSSToken::Ident(ref name) => name.clone(),
            _ => {
                self.push_back();
                return Err(ParseError::at(&start, "expected property name"));
            }
        };

        let _ = self.skip_whitespace();
        let token = self.next();
        if !matches!(token.value, CSSToken::Colon) {
            self.push_back();
            return Err(ParseError::at(&token, "expected ':' after property name"));
        }

        let mut terms: Vec<CSSToken> = Vec::new();
        let mut blocks = OpenBlocks::default();
        let mut bad_string = None;
        loop {
            let token = self.next();
            match token.value {
                CSSToken::Semicolon if blocks.is_empty() => break,
                CSSToken::RightBrace if blocks.is_empty() => {
                    self.push_back();
                    break;
                }
                CSSToken::EOF => {
                    self.push_back();
                    break;
                }
                // Keep scanning so the declaration ends where its blocks allow.
                CSSToken::BadString => {
                    if bad_string.is_none() {
                        bad_string =
                            Some(ParseError::at(&token, "unterminated string in value"));
                    }
                    continue;
                }
                CSSToken::Whitespace
                    if terms.last().is_none_or(CSSToken::is_whitespace) =>
                {
                    continue;
                }
                ref value => blocks.track(value),
            }
            terms.push(token.value);
        }

        if let Some(error) = bad_string {
            self.errors.push(error);
            return Ok(None);
        }

        while terms.last().is_some_and(CSSToken::is_whitespace) {
            let _ = terms.pop();
        }
        let important = strip_important(&mut terms);

        if terms.is_empty() {
            self.errors.push(ParseError::at(
                &start,
                format!("missing value for property '{property}'"),
            ));
            return Ok(None);
        }

        Ok(Some(Declaration {
            property,
            terms,
            important,
        }))
    }

    /// Skip a malformed ruleset: everything up to and including the `}`
    /// that closes its block. A stray `}` is consumed on its own.
    fn skip_ruleset(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.next().value {
                CSSToken::LeftBrace => depth += 1,
                CSSToken::RightBrace => {
                    if depth <= 1 {
                        return;
                    }
                    depth -= 1;
                }
                CSSToken::EOF => {
                    self.push_back();
                    return;
                }
                _ => {}
            }
        }
    }

    /// Skip a malformed declaration: up to and including the next `;`, or up
    /// to (not including) the `}` that closes the enclosing block.
    fn skip_declaration(&mut self, in_block: bool) {
        let mut blocks = OpenBlocks::default();
        loop {
            match self.next().value {
                CSSToken::Semicolon if blocks.is_empty() => return,
                CSSToken::RightBrace if blocks.is_empty() && in_block => {
                    self.push_back();
                    return;
                }
                CSSToken::EOF => {
                    self.push_back();
                    return;
                }
                ref value => blocks.track(value),
            }
        }
    }

    /// [§ 4.1.5 At-rules](https://www.w3.org/TR/CSS21/syndata.html#at-rules)
    ///
    /// "An at-rule consists of everything up to and including the next
    /// semicolon (;) or the next block, whichever comes first."
    fn skip_at_rule(&mut self) {
        loop {
            match self.next().value {
                CSSToken::Semicolon => return,
                CSSToken::LeftBrace => {
                    self.push_back();
                    self.skip_ruleset();
                    return;
                }
                CSSToken::EOF => {
                    self.push_back();
                    return;
                }
                _ => {}
            }
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        let token = self.next();
        if let CSSToken::Ident(name) = token.value {
            Ok(name)
        } else {
            self.push_back();
            Err(ParseError::at(&token, format!("expected {what}")))
        }
    }

    /// Consume whitespace, returning true if there was any.
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        loop {
            let token = self.next();
            if token.value.is_whitespace() {
                skipped = true;
            } else {
                self.push_back();
                return skipped;
            }
        }
    }

    /// Next non-comment token.
    fn next(&mut self) -> Token {
        loop {
            let token = self.tokenizer.next_token();
            if !token.value.is_comment() {
                return token;
            }
        }
    }

    fn push_back(&mut self) {
        self.tokenizer.push_back();
    }
}

/// The `()`, `[]` and `{}` blocks open inside a declaration value.
///
/// [§ 5.4.8 Consume a simple block](https://www.w3.org/TR/css-syntax-3/#consume-simple-block)
///
/// Only the closer that matches the innermost block ends it; any other
/// closer is an ordinary token, so `f(]` is still inside the function.
#[derive(Default)]
struct OpenBlocks(Vec<CSSToken>);

impl OpenBlocks {
    const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn track(&mut self, token: &CSSToken) {
        if self.0.last() == Some(token) {
            let _ = self.0.pop();
            return;
        }
        let closer = match token {
            CSSToken::Function(_) | CSSToken::LeftParen => CSSToken::RightParen,
            CSSToken::LeftBracket => CSSToken::RightBracket,
            CSSToken::LeftBrace => CSSToken::RightBrace,
            _ => return,
        };
        self.0.push(closer);
    }
}

/// Parse a style sheet, collecting syntax errors instead of stopping at them.
#[must_use]
pub fn parse_stylesheet(text: &str) -> (Stylesheet, Vec<ParseError>) {
    let mut parser = CSSParser::new(text);
    let stylesheet = parser.parse_stylesheet();
    (stylesheet, parser.into_errors())
}

/// Parse a declaration list such as the value of a `style` attribute.
#[must_use]
pub fn parse_declaration_list(text: &str) -> (Vec<Declaration>, Vec<ParseError>) {
    let mut parser = CSSParser::new(text);
    let declarations = parser.parse_declaration_list();
    (declarations, parser.into_errors())
}

/// Parse a selector group such as `rect.warning, line:selected`.
///
/// # Errors
///
/// Returns the first syntax error in `text`.
pub fn parse_selector_group(text: &str) -> Result<SelectorGroup, ParseError> {
    CSSParser::new(text).parse_selector_group()
}

/// Check for and remove a trailing `!important`.
///
/// [CSS 2.1 § 6.4.2 !important rules](https://www.w3.org/TR/CSS21/cascade.html#important-rules)
///
/// STEP 1: Check for ident "important" (trailing whitespace is already gone).
/// STEP 2: Skip whitespace between "!" and "important".
/// STEP 3: Check for delim "!".
/// STEP 4: Remove the annotation and any whitespace before it.
fn strip_important(terms: &mut Vec<CSSToken>) -> bool {
    // STEP 1
    let Some(CSSToken::Ident(last)) = terms.last() else {
        return false;
    };
    if !last.eq_ignore_ascii_case("important") {
        return false;
    }

    // STEP 2
    let mut bang = terms.len() - 1;
    while bang > 0 && terms[bang - 1].is_whitespace() {
        bang -= 1;
    }

    // STEP 3
    if bang == 0 || !matches!(terms[bang - 1], CSSToken::Delim('!')) {
        return false;
    }

    // STEP 4
    terms.truncate(bang - 1);
    while terms.last().is_some_and(CSSToken::is_whitespace) {
        let _ = terms.pop();
    }
    true
}
