//! Tests for the style manager: origins, stylesheet loading and the cascade.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use easel_css::cascade::{PseudoClassOverrides, StyleManagerConfig, StyleOrigin, StylesheetSource};
use easel_css::{CompileError, Declaration, StyleManager};
use easel_dom::{DomTree, ElementData, NodeId};

fn manager() -> StyleManager {
    StyleManager::new(StyleManagerConfig {
        worker_threads: Some(2),
        ..StyleManagerConfig::default()
    })
    .unwrap()
}

fn no_overrides() -> PseudoClassOverrides<NodeId> {
    HashMap::new()
}

/// `<layer><rect id="r1" class="warning"/></layer>`
fn drawing() -> (DomTree, NodeId, NodeId) {
    let mut tree = DomTree::new();
    let layer = tree.append_element(NodeId::ROOT, ElementData::new("layer"));
    let rect = tree.append_element(
        layer,
        ElementData::new("rect")
            .with_id("r1")
            .with_classes(&["warning"]),
    );
    (tree, layer, rect)
}

/// A fresh directory under the system temp dir.
fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("easel-css-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

// ========== cascade order ==========

#[test]
fn test_later_rule_wins_without_specificity() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(
        StyleOrigin::Author,
        "#r1.warning { fill: red } rect { fill: blue; stroke: black }",
    );

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("blue"));
    assert_eq!(applied.value_text("stroke").as_deref(), Some("black"));
    assert_eq!(applied.len(), 2);
}

#[test]
fn test_later_stylesheet_wins_within_origin() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect { fill: red }");
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect { fill: green }");

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("green"));
}

#[test]
fn test_origin_beats_insertion_order() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(StyleOrigin::Inline, "rect { fill: green }");
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect { fill: blue; stroke: blue }");
    let _ = styles.add_stylesheet_literal(
        StyleOrigin::UserAgent,
        "* { fill: red; stroke: red; opacity: 1 }",
    );

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("green"));
    assert_eq!(applied.origin_of("fill"), Some(StyleOrigin::Inline));
    assert_eq!(applied.value_text("stroke").as_deref(), Some("blue"));
    assert_eq!(applied.origin_of("stroke"), Some(StyleOrigin::Author));
    assert_eq!(applied.origin_of("opacity"), Some(StyleOrigin::UserAgent));
}

#[test]
fn test_important_does_not_affect_cascade() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(
        StyleOrigin::Author,
        "rect { fill: red !important } rect { fill: blue }",
    );

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("blue"));
}

#[test]
fn test_unmatched_element_gets_nothing() {
    let (tree, layer, _) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect { fill: red }");

    assert!(styles.apply_styles_to(&tree, &layer, &no_overrides()).is_empty());
}

// ========== inline style attribute ==========

#[test]
fn test_style_attribute_applies_last() {
    let mut tree = DomTree::new();
    let rect = tree.append_element(
        NodeId::ROOT,
        ElementData::new("rect").with_attr("style", "fill: green; stroke:"),
    );
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(StyleOrigin::Inline, "rect { fill: red }");

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("green"));
    assert_eq!(applied.origin_of("fill"), Some(StyleOrigin::Inline));
    assert!(applied.get("stroke").is_none());
}

#[test]
fn test_style_attribute_can_be_disabled() {
    let mut tree = DomTree::new();
    let rect = tree.append_element(
        NodeId::ROOT,
        ElementData::new("rect").with_attr("style", "fill: green"),
    );
    let mut styles = StyleManager::new(StyleManagerConfig {
        worker_threads: Some(1),
        style_attribute: None,
    })
    .unwrap();
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect { fill: red }");

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("red"));
}

// ========== pseudo-classes ==========

#[test]
fn test_pseudo_class_overrides_apply_for_one_pass() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(
        StyleOrigin::UserAgent,
        "rect { stroke: black } rect:selected { stroke: orange }",
    );

    let mut overrides = no_overrides();
    let _ = overrides.insert(rect, HashSet::from(["selected".to_string()]));

    let selected = styles.apply_styles_to(&tree, &rect, &overrides);
    assert_eq!(selected.value_text("stroke").as_deref(), Some("orange"));

    let plain = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(plain.value_text("stroke").as_deref(), Some("black"));
}

#[test]
fn test_model_pseudo_classes_still_match() {
    let mut tree = DomTree::new();
    let rect = tree.append_element(
        NodeId::ROOT,
        ElementData::new("rect").with_pseudo_class("hover"),
    );
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect:hover { fill: red }");

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("red"));
}

// ========== loading ==========

#[test]
fn test_stylesheet_loaded_relative_to_document() {
    let dir = temp_dir("relative");
    fs::write(dir.join("theme.css"), "rect { fill: teal }").unwrap();
    let doc_home = dir.join("drawing.svg").to_string_lossy().into_owned();

    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let handle = styles.add_stylesheet(StyleOrigin::Author, Some(&doc_home), "theme.css");
    assert!(handle.wait().is_ok());
    assert!(!handle.is_pending());

    let expected = StylesheetSource::Uri(dir.join("theme.css").to_string_lossy().into_owned());
    assert_eq!(styles.sources(StyleOrigin::Author), vec![expected]);

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("teal"));
}

#[test]
fn test_missing_file_is_reported_and_skipped() {
    let dir = temp_dir("missing");
    let missing = dir.join("nope.css").to_string_lossy().into_owned();

    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet(StyleOrigin::Author, None, &missing);
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect { fill: red }");

    let failures = styles.compile_failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].error, CompileError::Io { .. }));
    assert_eq!(failures[0].source, StylesheetSource::Uri(missing));

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("red"));
}

#[test]
#[cfg(unix)]
fn test_file_uri_with_escaped_space() {
    let dir = temp_dir("with space");
    fs::write(dir.join("theme.css"), "rect { fill: navy }").unwrap();
    let file_uri = |name: &str| format!("file://{}", dir.join(name).display()).replace(' ', "%20");

    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let direct = styles.add_stylesheet(StyleOrigin::Author, None, &file_uri("theme.css"));
    assert!(direct.wait().is_ok());
    assert!(styles.compile_failures().is_empty());
    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("navy"));

    let mut styles = manager();
    let doc_home = file_uri("drawing.svg");
    let relative = styles.add_stylesheet(StyleOrigin::Author, Some(&doc_home), "theme.css");
    assert!(relative.wait().is_ok());
    assert_eq!(
        styles.sources(StyleOrigin::Author),
        vec![StylesheetSource::Uri(file_uri("theme.css"))]
    );
}

#[test]
fn test_unsupported_scheme_fails() {
    let mut styles = manager();
    let handle = styles.add_stylesheet(StyleOrigin::Author, None, "http://example.com/a.css");
    assert!(matches!(
        handle.wait(),
        Err(CompileError::UnsupportedScheme { .. })
    ));
}

#[test]
fn test_parse_errors_are_collected_per_stylesheet() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(
        StyleOrigin::Author,
        "a { x: 1 } b c > { y: 2 } rect { fill: red } e { w: 4 }",
    );
    let _ = styles.add_stylesheet_literal(StyleOrigin::UserAgent, "rect { stroke: black }");

    let errors = styles.parse_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].origin, StyleOrigin::Author);
    assert_eq!(errors[0].errors.len(), 1);

    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("red"));
    assert_eq!(applied.value_text("stroke").as_deref(), Some("black"));
}

// ========== bucket management ==========

#[test]
fn test_re_adding_keeps_position() {
    let (tree, _, rect) = drawing();
    let dir = temp_dir("readd");
    let first = dir.join("first.css");
    let second = dir.join("second.css");
    fs::write(&first, "rect { fill: red }").unwrap();
    fs::write(&second, "rect { fill: blue }").unwrap();
    let first = first.to_string_lossy().into_owned();
    let second = second.to_string_lossy().into_owned();

    let mut styles = manager();
    let _ = styles.add_stylesheet(StyleOrigin::Author, None, &first);
    let _ = styles.add_stylesheet(StyleOrigin::Author, None, &second);
    fs::write(&first, "rect { fill: green }").unwrap();
    let handle = styles.add_stylesheet(StyleOrigin::Author, None, &first);
    assert!(handle.wait().is_ok());

    assert_eq!(
        styles.sources(StyleOrigin::Author),
        vec![
            StylesheetSource::Uri(first),
            StylesheetSource::Uri(second)
        ]
    );
    // The second stylesheet still comes last.
    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert_eq!(applied.value_text("fill").as_deref(), Some("blue"));
}

#[test]
fn test_set_stylesheets_reuses_literals_and_reloads_files() {
    let dir = temp_dir("set");
    let path = dir.join("a.css");
    fs::write(&path, "rect { fill: red }").unwrap();
    let uri = path.to_string_lossy().into_owned();

    let literal = StylesheetSource::Literal("rect { stroke: black }".to_string());
    let file = StylesheetSource::Uri(uri.clone());

    let mut styles = manager();
    styles.set_stylesheets(StyleOrigin::Author, None, [literal.clone(), file.clone()]);
    let literal_before = styles.compiled(StyleOrigin::Author, &literal).unwrap().unwrap();
    let file_before = styles.compiled(StyleOrigin::Author, &file).unwrap().unwrap();

    fs::write(&path, "rect { fill: blue }").unwrap();
    styles.set_stylesheets(
        StyleOrigin::Author,
        None,
        [file.clone(), literal.clone(), literal.clone()],
    );
    let literal_after = styles.compiled(StyleOrigin::Author, &literal).unwrap().unwrap();
    let file_after = styles.compiled(StyleOrigin::Author, &file).unwrap().unwrap();

    assert!(Arc::ptr_eq(&literal_before, &literal_after));
    assert!(!Arc::ptr_eq(&file_before, &file_after));
    assert_eq!(
        file_after.stylesheet.rulesets[0].declarations[0].value_text(),
        "blue"
    );
    // Duplicates are dropped and the new order is kept.
    assert_eq!(styles.sources(StyleOrigin::Author), vec![file, literal]);
}

#[test]
fn test_clear_stylesheets() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(StyleOrigin::UserAgent, "rect { fill: red }");
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect { stroke: red }");

    styles.clear_stylesheets(Some(StyleOrigin::Author));
    assert!(styles.sources(StyleOrigin::Author).is_empty());
    assert_eq!(styles.sources(StyleOrigin::UserAgent).len(), 1);
    let applied = styles.apply_styles_to(&tree, &rect, &no_overrides());
    assert!(applied.get("stroke").is_none());

    styles.clear_stylesheets(None);
    assert!(styles.apply_styles_to(&tree, &rect, &no_overrides()).is_empty());
}

// ========== tooling ==========

#[test]
fn test_apply_into_sink() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(
        StyleOrigin::Author,
        "rect { stroke: black; fill: red } .warning { fill: orange }",
    );

    let mut seen: Vec<(StyleOrigin, String)> = Vec::new();
    let mut sink = |origin: StyleOrigin, declaration: &Declaration| {
        seen.push((origin, declaration.to_string()));
    };
    styles.apply_styles_into(&tree, &rect, &no_overrides(), &mut sink);

    assert_eq!(
        seen,
        vec![
            (StyleOrigin::Author, "fill: orange".to_string()),
            (StyleOrigin::Author, "stroke: black".to_string()),
        ]
    );
}

#[test]
fn test_matching_rulesets_in_cascade_order() {
    let (tree, _, rect) = drawing();
    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "line { a: b } layer > rect { c: d }");
    let _ = styles.add_stylesheet_literal(StyleOrigin::UserAgent, "* { e: f }");

    let matched = styles.matching_rulesets(&tree, &rect, &no_overrides());
    let summary: Vec<(StyleOrigin, String)> = matched
        .iter()
        .map(|m| (m.origin, m.ruleset.selectors.to_string()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (StyleOrigin::UserAgent, "*".to_string()),
            (StyleOrigin::Author, "layer > rect".to_string()),
        ]
    );
}

#[test]
fn test_concurrent_apply_passes() {
    let mut tree = DomTree::new();
    let layer = tree.append_element(NodeId::ROOT, ElementData::new("layer"));
    let elements: Vec<NodeId> = (0..32)
        .map(|i| {
            let kind = if i % 2 == 0 { "rect" } else { "line" };
            tree.append_element(layer, ElementData::new(kind))
        })
        .collect();

    let mut styles = manager();
    let _ = styles.add_stylesheet_literal(StyleOrigin::Author, "rect { fill: red } line { fill: blue }");

    let tree = &tree;
    let styles = &styles;
    std::thread::scope(|scope| {
        for chunk in elements.chunks(8) {
            let _ = scope.spawn(move || {
                for element in chunk {
                    let expected = if tree.as_element(*element).unwrap().type_name == "rect" {
                        "red"
                    } else {
                        "blue"
                    };
                    let applied = styles.apply_styles_to(tree, element, &HashMap::new());
                    assert_eq!(applied.value_text("fill").as_deref(), Some(expected));
                }
            });
        }
    });
}
