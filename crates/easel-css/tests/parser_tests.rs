//! Integration tests for the CSS parser.

use easel_css::parser::{parse_declaration_list, parse_selector_group, parse_stylesheet};
use easel_css::selector::{Combinator, Selector, SimpleSelector};
use easel_css::tokenizer::CSSToken;

fn type_selector(name: &str) -> Selector {
    Selector::Simple(SimpleSelector::Type(name.to_string()))
}

/// Parse a group that must contain exactly one selector.
fn single_selector(text: &str) -> Selector {
    let group = parse_selector_group(text).expect("selector should parse");
    assert_eq!(group.selectors().len(), 1);
    group.selectors()[0].clone()
}

// ========== rulesets ==========

#[test]
fn test_simple_ruleset() {
    let (sheet, errors) = parse_stylesheet("rect { fill: red; stroke-width: 2px }");
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(sheet.rulesets.len(), 1);

    let ruleset = &sheet.rulesets[0];
    assert_eq!(ruleset.selectors.selectors(), &[type_selector("rect")]);
    assert_eq!(ruleset.declarations.len(), 2);
    assert_eq!(ruleset.declarations[0].property, "fill");
    assert_eq!(ruleset.declarations[0].terms, vec![CSSToken::ident("red")]);
    assert_eq!(ruleset.declarations[1].property, "stroke-width");
    assert_eq!(
        ruleset.declarations[1].terms,
        vec![CSSToken::dimension("2", "px")]
    );
}

#[test]
fn test_rulesets_keep_document_order() {
    let (sheet, _) = parse_stylesheet("a { x: 1 } b { x: 2 } c { x: 3 }");
    let names: Vec<String> = sheet
        .rulesets
        .iter()
        .map(|r| r.selectors.to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_selector_group() {
    let (sheet, errors) = parse_stylesheet("rect, line , ellipse { fill: none }");
    assert!(errors.is_empty());
    assert_eq!(
        sheet.rulesets[0].selectors.selectors(),
        &[
            type_selector("rect"),
            type_selector("line"),
            type_selector("ellipse")
        ]
    );
}

#[test]
fn test_empty_block() {
    let (sheet, errors) = parse_stylesheet("rect {}");
    assert!(errors.is_empty());
    assert!(sheet.rulesets[0].declarations.is_empty());
}

// ========== selectors ==========

#[test]
fn test_compound_selector_is_and_chain() {
    let selector = single_selector("rect.a#b");
    let expected = Selector::combine(
        Combinator::And,
        Selector::combine(
            Combinator::And,
            type_selector("rect"),
            Selector::Simple(SimpleSelector::StyleClass("a".to_string())),
        ),
        Selector::Simple(SimpleSelector::Id("b".to_string())),
    );
    assert_eq!(selector, expected);
}

#[test]
fn test_combinators_are_left_associative() {
    let selector = single_selector("a > b c");
    let expected = Selector::combine(
        Combinator::Descendant,
        Selector::combine(Combinator::Child, type_selector("a"), type_selector("b")),
        type_selector("c"),
    );
    assert_eq!(selector, expected);
}

#[test]
fn test_sibling_combinators() {
    let selector = single_selector("a+b ~ c");
    let expected = Selector::combine(
        Combinator::GeneralSibling,
        Selector::combine(
            Combinator::AdjacentSibling,
            type_selector("a"),
            type_selector("b"),
        ),
        type_selector("c"),
    );
    assert_eq!(selector, expected);
}

#[test]
fn test_universal_and_pseudo_class() {
    let selector = single_selector("*:selected");
    let expected = Selector::combine(
        Combinator::And,
        Selector::Simple(SimpleSelector::Universal),
        Selector::Simple(SimpleSelector::PseudoClass("selected".to_string())),
    );
    assert_eq!(selector, expected);
}

#[test]
fn test_attribute_selectors() {
    let cases = [
        ("[a]", SimpleSelector::AttributeExists("a".into())),
        ("[a=x]", SimpleSelector::AttributeEquals("a".into(), "x".into())),
        (
            "[a ~= \"x y\"]",
            SimpleSelector::AttributeWordListItem("a".into(), "x y".into()),
        ),
        ("[a|=x]", SimpleSelector::AttributeStartsWith("a".into(), "x".into())),
        ("[a^=x]", SimpleSelector::AttributePrefix("a".into(), "x".into())),
        ("[a$=x]", SimpleSelector::AttributeSuffix("a".into(), "x".into())),
        (
            "[a*='x']",
            SimpleSelector::AttributeValueContainsWord("a".into(), "x".into()),
        ),
    ];
    for (text, expected) in cases {
        assert_eq!(single_selector(text), Selector::Simple(expected), "{text}");
    }
}

#[test]
fn test_selector_group_errors() {
    assert!(parse_selector_group("a >").is_err());
    assert!(parse_selector_group("").is_err());
    assert!(parse_selector_group("a::before").is_err());
    assert!(parse_selector_group("a:not(b)").is_err());
    assert!(parse_selector_group("[a=]").is_err());
}

// ========== declarations ==========

#[test]
fn test_terms_joined_by_single_space() {
    let (declarations, errors) = parse_declaration_list("k1:k1v1 k1v2");
    assert!(errors.is_empty());
    assert_eq!(declarations.len(), 1);
    assert_eq!(
        declarations[0].terms,
        vec![
            CSSToken::ident("k1v1"),
            CSSToken::Whitespace,
            CSSToken::ident("k1v2")
        ]
    );
    assert_eq!(declarations[0].to_string(), "k1: k1v1 k1v2");
}

#[test]
fn test_whitespace_and_comments_in_value() {
    let (sheet, errors) = parse_stylesheet("a { font:  12px   /* c */  serif  }");
    assert!(errors.is_empty());
    assert_eq!(
        sheet.rulesets[0].declarations[0].terms,
        vec![
            CSSToken::dimension("12", "px"),
            CSSToken::Whitespace,
            CSSToken::ident("serif")
        ]
    );
}

#[test]
fn test_important_is_stripped() {
    let (sheet, _) = parse_stylesheet("a { fill: red ! important; stroke: blue }");
    let declarations = &sheet.rulesets[0].declarations;
    assert!(declarations[0].important);
    assert_eq!(declarations[0].terms, vec![CSSToken::ident("red")]);
    assert!(!declarations[1].important);
}

#[test]
fn test_function_value_keeps_semicolon_scope() {
    let (sheet, errors) = parse_stylesheet("a { fill: rgb(1, 2, 3); stroke: blue }");
    assert!(errors.is_empty());
    let declarations = &sheet.rulesets[0].declarations;
    assert_eq!(declarations.len(), 2);
    assert_eq!(declarations[0].terms[0], CSSToken::Function("rgb".to_string()));
    assert_eq!(declarations[0].value_text(), "rgb(1, 2, 3)");
    assert_eq!(declarations[1].property, "stroke");
}

#[test]
fn test_mismatched_closer_stays_inside_function() {
    let (sheet, errors) = parse_stylesheet("a { x: f(]; y) ; z: w }");
    assert!(errors.is_empty(), "{errors:?}");
    let declarations = &sheet.rulesets[0].declarations;
    assert_eq!(declarations.len(), 2);
    assert_eq!(declarations[0].value_text(), "f(]; y)");
    assert_eq!(declarations[1].property, "z");
}

#[test]
fn test_comment_between_terms_is_written_back() {
    let (sheet, errors) = parse_stylesheet("a { x: a/**/b; y: 1/* px */px }");
    assert!(errors.is_empty(), "{errors:?}");
    let declarations = &sheet.rulesets[0].declarations;
    assert_eq!(
        declarations[0].terms,
        vec![CSSToken::ident("a"), CSSToken::ident("b")]
    );
    assert_eq!(
        declarations[1].terms,
        vec![CSSToken::number("1"), CSSToken::ident("px")]
    );
    assert_eq!(declarations[0].to_string(), "x: a/**/b");
    assert_eq!(declarations[1].value_text(), "1/**/px");
}

#[test]
fn test_declaration_list_for_style_attribute() {
    let (declarations, errors) = parse_declaration_list(" fill: red ; stroke:blue;");
    assert!(errors.is_empty());
    let properties: Vec<&str> = declarations.iter().map(|d| d.property.as_str()).collect();
    assert_eq!(properties, vec!["fill", "stroke"]);
}

// ========== error recovery ==========

#[test]
fn test_bad_declaration_is_skipped() {
    let (sheet, errors) = parse_stylesheet("a { fill red; stroke: blue }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].offset, 9);
    assert_eq!(errors[0].line, 1);
    let declarations = &sheet.rulesets[0].declarations;
    assert_eq!(declarations.len(), 1);
    assert_eq!(declarations[0].property, "stroke");
}

#[test]
fn test_skipped_declaration_respects_blocks() {
    let (sheet, errors) = parse_stylesheet("a { 1: f(]; x); b: c }");
    assert_eq!(errors.len(), 1);
    let declarations = &sheet.rulesets[0].declarations;
    assert_eq!(declarations.len(), 1);
    assert_eq!(declarations[0].property, "b");
}

#[test]
fn test_bad_string_drops_declaration() {
    let (sheet, errors) = parse_stylesheet("a { x: \"open\n; y: z }\nb { w: 1 }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].offset, 7);
    assert_eq!(sheet.rulesets.len(), 2);
    let declarations = &sheet.rulesets[0].declarations;
    assert_eq!(declarations.len(), 1);
    assert_eq!(declarations[0].property, "y");
}

#[test]
fn test_missing_value_is_an_error() {
    let (sheet, errors) = parse_stylesheet("a { fill: ; stroke: blue }");
    assert_eq!(errors.len(), 1);
    assert_eq!(sheet.rulesets[0].declarations.len(), 1);
}

#[test]
fn test_bad_ruleset_is_skipped() {
    let css = "a { x: 1 }\nb c > { y: 2 }\nd { z: 3 }\ne { w: 4 }";
    let (sheet, errors) = parse_stylesheet(css);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, 2);
    let names: Vec<String> = sheet
        .rulesets
        .iter()
        .map(|r| r.selectors.to_string())
        .collect();
    assert_eq!(names, vec!["a", "d", "e"]);
}

#[test]
fn test_nested_braces_in_bad_ruleset() {
    let (sheet, errors) = parse_stylesheet("a! { x: { y } z } b { w: 1 }");
    assert_eq!(errors.len(), 1);
    assert_eq!(sheet.rulesets.len(), 1);
    assert_eq!(sheet.rulesets[0].selectors.to_string(), "b");
}

#[test]
fn test_pseudo_element_is_an_error() {
    let (sheet, errors) = parse_stylesheet("a::before { x: y } b { z: w }");
    assert_eq!(errors.len(), 1);
    assert_eq!(sheet.rulesets.len(), 1);
}

#[test]
fn test_stray_closing_brace() {
    let (sheet, errors) = parse_stylesheet("} a { b: c }");
    assert_eq!(errors.len(), 1);
    assert_eq!(sheet.rulesets.len(), 1);
}

#[test]
fn test_unclosed_block_keeps_ruleset() {
    let (sheet, errors) = parse_stylesheet("a { b: c");
    assert_eq!(errors.len(), 1);
    assert_eq!(sheet.rulesets.len(), 1);
    assert_eq!(sheet.rulesets[0].declarations[0].property, "b");
}

#[test]
fn test_at_rules_and_cdo_cdc_are_skipped() {
    let css = "<!-- @import \"x.css\"; @media print { a { b: c } } d { e: f } -->";
    let (sheet, errors) = parse_stylesheet(css);
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(sheet.rulesets.len(), 1);
    assert_eq!(sheet.rulesets[0].selectors.to_string(), "d");
}

// ========== serialization ==========

#[test]
fn test_serialized_stylesheet_parses_to_same_ast() {
    let css = r#"
        rect.warning, line:selected { stroke: #f00; stroke-width: 2px !important }
        drawing > layer rect[kind~="bold"] + text ~ ellipse { font: 12px 'Sans Serif'; fill: url( pat.png ) }
        * { opacity: 50%; transform: rotate(45deg) }
        [lang|=en] #outline { x: -1.5 }
        line { x: a/**/b; y: 1/**/px; z: #a/**/-/**/2 }
    "#;
    let (sheet, errors) = parse_stylesheet(css);
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(sheet.rulesets.len(), 5);

    let serialized = sheet.to_string();
    let (reparsed, errors) = parse_stylesheet(&serialized);
    assert!(errors.is_empty(), "{errors:?}\n{serialized}");
    assert_eq!(reparsed, sheet);
}

#[test]
fn test_stylesheet_serializes_to_json() {
    let (sheet, _) = parse_stylesheet("rect { fill: red }");
    let json = serde_json::to_value(&sheet).unwrap();
    assert_eq!(json["rulesets"][0]["declarations"][0]["property"], "fill");
    assert_eq!(json["rulesets"][0]["declarations"][0]["important"], false);
}
