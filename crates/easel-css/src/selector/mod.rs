//! CSS selector AST and matching
//!
//! This module implements the selector subset of
//! [CSS 2.1 § 5](https://www.w3.org/TR/CSS21/selector.html) used by style
//! sheets, plus the substring attribute operators of
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/#attribute-substrings).
//!
//! A [`Selector`] is a binary tree. Leaves are [`SimpleSelector`]s; inner
//! nodes join a left and a right selector with a [`Combinator`]. Chains are
//! left-associative, so the right operand of every inner node is the part
//! nearest the subject:
//!
//! ```text
//! drawing > layer rect.warning
//!
//! Descendant
//! ├── Child
//! │   ├── drawing
//! │   └── layer
//! └── And
//!     ├── rect
//!     └── .warning
//! ```
//!
//! Matching never looks at a concrete element type. All element queries go
//! through [`SelectorModel`].

use core::fmt;

use easel_dom::SelectorModel;
use serde::Serialize;

use crate::tokenizer::{write_identifier, write_string};

/// [§ 5.3 Universal selector](https://www.w3.org/TR/CSS21/selector.html#universal-selector)
/// [§ 5.8 Attribute selectors](https://www.w3.org/TR/CSS21/selector.html#attribute-selectors)
///
/// A simple selector is a single condition on one element.
///
/// Every comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SimpleSelector {
    /// `*`: "matches the name of any element type."
    Universal,

    /// [§ 5.4 Type selectors](https://www.w3.org/TR/CSS21/selector.html#type-selectors)
    /// "A type selector matches the name of a document language element type."
    ///
    /// Example: `rect`
    Type(String),

    /// [§ 5.9 ID selectors](https://www.w3.org/TR/CSS21/selector.html#id-selectors)
    ///
    /// Example: `#outline`
    Id(String),

    /// [§ 5.8.3 Class selectors](https://www.w3.org/TR/CSS21/selector.html#class-html)
    ///
    /// Example: `.warning`
    StyleClass(String),

    /// [§ 5.11 Pseudo-classes](https://www.w3.org/TR/CSS21/selector.html#pseudo-class-selectors)
    ///
    /// Pseudo-classes are opaque names; the host decides what `:selected`
    /// means for its elements.
    PseudoClass(String),

    /// `[att]`: "Match when the element sets the 'att' attribute, whatever
    /// the value of the attribute."
    AttributeExists(String),

    /// `[att=val]`: "Match when the element's 'att' attribute value is
    /// exactly 'val'."
    AttributeEquals(String, String),

    /// `[att~=val]`: "Represents an element with the att attribute whose
    /// value is a white space-separated list of words, one of which is
    /// exactly 'val'."
    AttributeWordListItem(String, String),

    /// `[att*=val]`: the host decides whether the attribute value contains
    /// `val`, through
    /// [`SelectorModel::attribute_value_contains_word`].
    AttributeValueContainsWord(String, String),

    /// `[att|=val]`: "Represents an element with the att attribute, its
    /// value either being exactly 'val' or beginning with 'val' immediately
    /// followed by '-'."
    AttributeStartsWith(String, String),

    /// `[att^=val]`: "Represents an element with the att attribute whose
    /// value begins with the prefix 'val'. If 'val' is the empty string then
    /// the selector does not represent anything."
    AttributePrefix(String, String),

    /// `[att$=val]`: "Represents an element with the att attribute whose
    /// value ends with the suffix 'val'. If 'val' is the empty string then
    /// the selector does not represent anything."
    AttributeSuffix(String, String),
}

impl SimpleSelector {
    /// Check if this simple selector matches the given element.
    pub fn matches<M: SelectorModel>(&self, model: &M, element: &M::Element) -> bool {
        match self {
            Self::Universal => true,
            Self::Type(name) => model.has_type(element, name),
            Self::Id(id) => model.has_id(element, id),
            Self::StyleClass(class_name) => model.has_style_class(element, class_name),
            Self::PseudoClass(name) => model.has_pseudo_class(element, name),
            Self::AttributeExists(name) => model.get_attribute(element, name).is_some(),
            Self::AttributeEquals(name, value) => model
                .get_attribute(element, name)
                .is_some_and(|v| v == *value),
            // Split on Unicode whitespace; no other trimming or folding.
            Self::AttributeWordListItem(name, value) => model
                .get_attribute(element, name)
                .is_some_and(|v| v.split_whitespace().any(|word| word == value)),
            Self::AttributeValueContainsWord(name, value) => {
                model.attribute_value_contains_word(element, name, value)
            }
            Self::AttributeStartsWith(name, value) => {
                model.get_attribute(element, name).is_some_and(|v| {
                    v.strip_prefix(value.as_str())
                        .is_some_and(|rest| rest.is_empty() || rest.starts_with('-'))
                })
            }
            Self::AttributePrefix(name, value) => {
                !value.is_empty()
                    && model
                        .get_attribute(element, name)
                        .is_some_and(|v| v.starts_with(value.as_str()))
            }
            Self::AttributeSuffix(name, value) => {
                !value.is_empty()
                    && model
                        .get_attribute(element, name)
                        .is_some_and(|v| v.ends_with(value.as_str()))
            }
        }
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Universal => f.write_str("*"),
            Self::Type(name) => write_identifier(f, name),
            Self::Id(id) => {
                f.write_str("#")?;
                write_identifier(f, id)
            }
            Self::StyleClass(class_name) => {
                f.write_str(".")?;
                write_identifier(f, class_name)
            }
            Self::PseudoClass(name) => {
                f.write_str(":")?;
                write_identifier(f, name)
            }
            Self::AttributeExists(name) => {
                f.write_str("[")?;
                write_identifier(f, name)?;
                f.write_str("]")
            }
            Self::AttributeEquals(name, value) => write_attribute(f, name, "=", value),
            Self::AttributeWordListItem(name, value) => write_attribute(f, name, "~=", value),
            Self::AttributeValueContainsWord(name, value) => {
                write_attribute(f, name, "*=", value)
            }
            Self::AttributeStartsWith(name, value) => write_attribute(f, name, "|=", value),
            Self::AttributePrefix(name, value) => write_attribute(f, name, "^=", value),
            Self::AttributeSuffix(name, value) => write_attribute(f, name, "$=", value),
        }
    }
}

fn write_attribute(f: &mut fmt::Formatter<'_>, name: &str, operator: &str, value: &str) -> fmt::Result {
    f.write_str("[")?;
    write_identifier(f, name)?;
    f.write_str(operator)?;
    write_string(f, value)?;
    f.write_str("]")
}

/// [§ 5.2 Selector syntax](https://www.w3.org/TR/CSS21/selector.html#selector-syntax)
///
/// "A combinator is one of: white space, '>', and '+'." Selectors Level 3
/// adds `~`. `And` is the implicit combinator between the simple selectors
/// of one compound, as in `.a.b:selected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Combinator {
    /// Both sides must match the same element.
    And,

    /// [§ 5.5 Descendant selectors](https://www.w3.org/TR/CSS21/selector.html#descendant-selectors)
    /// "A descendant selector is made up of two or more selectors separated
    /// by white space."
    Descendant,

    /// [§ 5.6 Child selectors](https://www.w3.org/TR/CSS21/selector.html#child-selectors)
    /// "A child selector matches when an element is the child of some element."
    Child,

    /// [§ 5.7 Adjacent sibling selectors](https://www.w3.org/TR/CSS21/selector.html#adjacent-selectors)
    /// "E1 + E2", where E2 is the subject: "E1 and E2 share the same parent
    /// in the document tree and E1 immediately precedes E2."
    AdjacentSibling,

    /// [Selectors Level 3 § 8.3.2](https://www.w3.org/TR/selectors-3/#general-sibling-combinators)
    /// "E1 ~ E2": E1 precedes E2, not necessarily immediately.
    GeneralSibling,
}

impl Combinator {
    /// The text written between the two operands when serializing.
    #[must_use]
    pub const fn separator(self) -> &'static str {
        match self {
            Self::And => "",
            Self::Descendant => " ",
            Self::Child => " > ",
            Self::AdjacentSibling => " + ",
            Self::GeneralSibling => " ~ ",
        }
    }
}

/// A selector: a simple selector, or two selectors joined by a combinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Selector {
    /// A leaf condition.
    Simple(SimpleSelector),

    /// `left <combinator> right`. `right` is the operand nearer the
    /// subject; for `And` both operands test the same element.
    Combined {
        /// How `left` relates to the element matched by `right`.
        combinator: Combinator,
        /// The operand further from the subject.
        left: Box<Selector>,
        /// The operand nearer the subject.
        right: Box<Selector>,
    },
}

impl Selector {
    /// Join two selectors with a combinator.
    #[must_use]
    pub fn combine(combinator: Combinator, left: Self, right: Self) -> Self {
        Self::Combined {
            combinator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Match this selector against `element`.
    ///
    /// Returns the element itself when the selector matches, or `None`.
    /// A selector never matches partially: whatever combinator walks happen
    /// internally, the result is always either the tested element or no
    /// match.
    pub fn matches<M: SelectorModel>(&self, model: &M, element: &M::Element) -> Option<M::Element> {
        match self {
            Self::Simple(simple) => simple.matches(model, element).then(|| element.clone()),
            Self::Combined {
                combinator,
                left,
                right,
            } => {
                // STEP 1: The right operand must match the element itself.
                let subject = right.matches(model, element)?;

                // STEP 2: The left operand must match an element in the
                // relationship named by the combinator.
                let related = match combinator {
                    Combinator::And => left.matches(model, &subject).is_some(),

                    // Walk up until some ancestor matches, or the root is passed.
                    Combinator::Descendant => {
                        let mut current = model.get_parent(&subject);
                        loop {
                            match current {
                                Some(ancestor) if left.matches(model, &ancestor).is_some() => {
                                    break true;
                                }
                                Some(ancestor) => current = model.get_parent(&ancestor),
                                None => break false,
                            }
                        }
                    }

                    // Only the immediate parent is considered.
                    Combinator::Child => model
                        .get_parent(&subject)
                        .is_some_and(|parent| left.matches(model, &parent).is_some()),

                    Combinator::AdjacentSibling => model
                        .get_previous_sibling(&subject)
                        .is_some_and(|sibling| left.matches(model, &sibling).is_some()),

                    Combinator::GeneralSibling => {
                        let mut current = model.get_previous_sibling(&subject);
                        loop {
                            match current {
                                Some(sibling) if left.matches(model, &sibling).is_some() => {
                                    break true;
                                }
                                Some(sibling) => current = model.get_previous_sibling(&sibling),
                                None => break false,
                            }
                        }
                    }
                };

                related.then_some(subject)
            }
        }
    }
}

impl From<SimpleSelector> for Selector {
    fn from(simple: SimpleSelector) -> Self {
        Self::Simple(simple)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(simple) => write!(f, "{simple}"),
            Self::Combined {
                combinator,
                left,
                right,
            } => write!(f, "{left}{}{right}", combinator.separator()),
        }
    }
}

/// [§ 5.2.1 Grouping](https://www.w3.org/TR/CSS21/selector.html#grouping)
///
/// Comma-separated selectors sharing one declaration block. The group
/// matches an element if any member does.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SelectorGroup(pub Vec<Selector>);

impl SelectorGroup {
    /// Match the group against `element`, returning the element if any
    /// member selector matches.
    pub fn matches<M: SelectorModel>(&self, model: &M, element: &M::Element) -> Option<M::Element> {
        self.0
            .iter()
            .find_map(|selector| selector.matches(model, element))
    }

    /// The member selectors in source order.
    #[must_use]
    pub fn selectors(&self) -> &[Selector] {
        &self.0
    }

    /// Returns true if the group has no selectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SelectorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}
