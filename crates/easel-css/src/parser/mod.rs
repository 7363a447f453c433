//! CSS parser module.

/// Recursive-descent parser per [CSS 2.1 § 4.1](https://www.w3.org/TR/CSS21/syndata.html#syntax).
pub mod css_parser;

pub use css_parser::{
    CSSParser, Declaration, ParseError, Ruleset, Stylesheet, parse_declaration_list,
    parse_selector_group, parse_stylesheet,
};
