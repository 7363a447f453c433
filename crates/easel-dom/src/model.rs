use std::hash::Hash;

/// The capability interface the selector matcher requires from host elements.
///
/// Every query is read-only: the engine never mutates the host's elements.
/// Comparisons are exact and case-sensitive; a host that wants
/// case-insensitive type names or attribute values must normalize them
/// itself.
///
/// `Element` is a cheap handle to a host element (an index, an `Rc`, a
/// figure id). It must be hashable so that per-pass overlays such as extra
/// pseudo-class membership can be keyed by element.
pub trait SelectorModel {
    /// Handle to a host element.
    type Element: Clone + Eq + Hash;

    /// Returns true if the element's id equals `id`.
    fn has_id(&self, element: &Self::Element, id: &str) -> bool;

    /// Returns true if the element's type name equals `type_name`.
    fn has_type(&self, element: &Self::Element, type_name: &str) -> bool;

    /// Returns true if the element carries the style class `class_name`.
    fn has_style_class(&self, element: &Self::Element, class_name: &str) -> bool;

    /// Returns true if the element is currently in pseudo-class `pseudo_class`.
    fn has_pseudo_class(&self, element: &Self::Element, pseudo_class: &str) -> bool;

    /// Returns the string value of attribute `name`, or `None` if the element
    /// does not have it.
    fn get_attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Returns true if the value of attribute `name` contains `word`.
    ///
    /// The default implementation is plain substring containment on
    /// [`get_attribute`](Self::get_attribute). Hosts whose attributes are
    /// natively word lists may override it with a word-aware test.
    fn attribute_value_contains_word(
        &self,
        element: &Self::Element,
        name: &str,
        word: &str,
    ) -> bool {
        self.get_attribute(element, name)
            .is_some_and(|value| value.contains(word))
    }

    /// Names of the attributes the element exposes to selectors.
    ///
    /// Used by tooling only. Hosts with shorthand attributes report the
    /// shorthand names; there is no separate decomposed view.
    fn attribute_names(&self, element: &Self::Element) -> Vec<String> {
        let _ = element;
        Vec::new()
    }

    /// Returns the parent element, or `None` at the root.
    fn get_parent(&self, element: &Self::Element) -> Option<Self::Element>;

    /// Returns the element immediately preceding this one among its
    /// siblings, or `None` for the first child.
    fn get_previous_sibling(&self, element: &Self::Element) -> Option<Self::Element>;
}
