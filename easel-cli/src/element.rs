//! Building a throwaway element tree from a selector-like path.
//!
//! `layer > rect.warning#r1[kind=note]:selected` describes a `rect` that is
//! the child of a `layer`. Only child combinators are accepted between
//! elements, and only simple selectors that name something concrete (type,
//! id, class, `[attr]`, `[attr=value]`, pseudo-class) within one.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use easel_css::cascade::PseudoClassOverrides;
use easel_css::parser::parse_selector_group;
use easel_css::{Combinator, Selector, SimpleSelector};
use easel_dom::{DomTree, ElementData, NodeId};

/// Parse `path` and build the elements it describes.
///
/// Returns the tree, the innermost element, and the pseudo-classes to turn
/// on for the apply pass.
pub fn build(path: &str) -> Result<(DomTree, NodeId, PseudoClassOverrides<NodeId>)> {
    let group = parse_selector_group(path)?;
    let [selector] = group.selectors() else {
        bail!(
            "expected a single element path, found {} selectors",
            group.selectors().len()
        );
    };

    let mut steps = Vec::new();
    collect_steps(selector, &mut steps)?;

    let mut tree = DomTree::new();
    let mut overrides: PseudoClassOverrides<NodeId> = HashMap::new();
    let mut parent = NodeId::ROOT;
    for step in steps {
        let mut simples = Vec::new();
        collect_compound(step, &mut simples);
        let (data, pseudo_classes) = element_data(&simples)?;
        parent = tree.append_element(parent, data);
        if !pseudo_classes.is_empty() {
            let _ = overrides.insert(parent, pseudo_classes);
        }
    }
    Ok((tree, parent, overrides))
}

/// Split a child chain into its compounds, outermost first.
fn collect_steps<'a>(selector: &'a Selector, steps: &mut Vec<&'a Selector>) -> Result<()> {
    match selector {
        Selector::Combined {
            combinator: Combinator::Child,
            left,
            right,
        } => {
            collect_steps(left, steps)?;
            steps.push(right);
        }
        Selector::Simple(_)
        | Selector::Combined {
            combinator: Combinator::And,
            ..
        } => steps.push(selector),
        Selector::Combined { combinator, .. } => {
            bail!("elements must be separated by '>', found {combinator:?}")
        }
    }
    Ok(())
}

fn collect_compound<'a>(selector: &'a Selector, out: &mut Vec<&'a SimpleSelector>) {
    match selector {
        Selector::Simple(simple) => out.push(simple),
        Selector::Combined { left, right, .. } => {
            collect_compound(left, out);
            collect_compound(right, out);
        }
    }
}

fn element_data(simples: &[&SimpleSelector]) -> Result<(ElementData, HashSet<String>)> {
    let Some((first, rest)) = simples.split_first() else {
        bail!("empty element");
    };
    let SimpleSelector::Type(type_name) = first else {
        bail!("each element must start with a type name, found '{first}'");
    };

    let mut data = ElementData::new(type_name.clone());
    let mut classes: Vec<&str> = Vec::new();
    let mut pseudo_classes = HashSet::new();
    for simple in rest {
        match simple {
            SimpleSelector::Id(id) => data = data.with_id(id.clone()),
            SimpleSelector::StyleClass(class_name) => classes.push(class_name),
            SimpleSelector::AttributeExists(name) => data = data.with_attr(name.clone(), ""),
            SimpleSelector::AttributeEquals(name, value) => {
                data = data.with_attr(name.clone(), value.clone());
            }
            SimpleSelector::PseudoClass(name) => {
                let _ = pseudo_classes.insert(name.clone());
            }
            other => bail!("'{other}' does not describe a concrete element"),
        }
    }
    if !classes.is_empty() {
        data = data.with_classes(&classes);
    }
    Ok((data, pseudo_classes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_dom::SelectorModel;

    #[test]
    fn test_build_child_chain() {
        let (tree, rect, overrides) =
            build("layer > rect.warning.big#r1[kind=note]:selected").unwrap();

        assert!(tree.has_type(&rect, "rect"));
        assert!(tree.has_id(&rect, "r1"));
        assert!(tree.has_style_class(&rect, "warning"));
        assert!(tree.has_style_class(&rect, "big"));
        assert_eq!(tree.get_attribute(&rect, "kind").as_deref(), Some("note"));
        assert!(overrides[&rect].contains("selected"));

        let layer = tree.get_parent(&rect).unwrap();
        assert!(tree.has_type(&layer, "layer"));
        assert!(tree.get_parent(&layer).is_none());
    }

    #[test]
    fn test_rejects_descendant_combinator() {
        assert!(build("layer rect").is_err());
    }

    #[test]
    fn test_rejects_missing_type() {
        assert!(build(".warning").is_err());
        assert!(build("rect[kind^=n]").is_err());
    }
}
