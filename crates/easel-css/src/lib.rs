//! Style engine for the Easel drawing editor: CSS tokenizer, parser,
//! selector matching and a cascade over stylesheet origins.
//!
//! # Scope
//!
//! This crate implements:
//! - **CSS Tokenizer** ([§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization))
//!   - Lazy token stream with one token of push-back
//!   - Comments and CDO/CDC kept as tokens
//!   - Attribute match operators `~=`, `|=`, `^=`, `$=`, `*=`
//!
//! - **CSS Parser** ([CSS 2.1 § 4.1](https://www.w3.org/TR/CSS21/syndata.html#syntax))
//!   - Rulesets, selector groups and declarations
//!   - Error recovery per [§ 4.2](https://www.w3.org/TR/CSS21/syndata.html#parsing-errors)
//!   - Declaration values kept as raw tokens
//!
//! - **Selectors** ([CSS 2.1 § 5](https://www.w3.org/TR/CSS21/selector.html))
//!   - Type, universal, id, class and pseudo-class selectors
//!   - Attribute selectors
//!   - Descendant, child, adjacent and general sibling combinators
//!   - Matching through [`easel_dom::SelectorModel`]
//!
//! - **Cascade** ([`cascade::StyleManager`])
//!   - User agent, author and inline origins
//!   - Asynchronous stylesheet compilation on an owned worker pool
//!
//! # Not Implemented
//!
//! - Specificity: later rules win regardless of selector weight
//! - `!important` precedence (the flag is parsed and kept)
//! - At-rules (skipped with a warning)
//! - Pseudo-elements and functional pseudo-classes
//! - Property value interpretation

/// Stylesheet cache and cascade.
pub mod cascade;
/// CSS parser per [CSS 2.1 § 4.1](https://www.w3.org/TR/CSS21/syndata.html#syntax).
pub mod parser;
/// CSS selector AST and matching per [CSS 2.1 § 5](https://www.w3.org/TR/CSS21/selector.html).
pub mod selector;
/// CSS tokenizer per [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization).
pub mod tokenizer;

pub use cascade::{
    AppliedStyles, CompileError, StyleError, StyleManager, StyleManagerConfig, StyleOrigin,
    StyleSink, StylesheetSource,
};
pub use parser::{Declaration, ParseError, Ruleset, Stylesheet, parse_stylesheet};
pub use selector::{Combinator, Selector, SelectorGroup, SimpleSelector};
