//! Stylesheet cache and cascade
//!
//! [`StyleManager`] keeps one ordered bucket of stylesheets per
//! [`StyleOrigin`]. Stylesheets are compiled on an owned worker pool: adding
//! one only submits a job, and the first apply pass that needs the result
//! waits for it.
//!
//! The cascade is a subset of
//! [CSS Cascading Level 4 § 6](https://www.w3.org/TR/css-cascade-4/#cascading).
//! Declarations are ordered by origin, then by stylesheet insertion order,
//! then by document order. Specificity is never computed and `!important`
//! does not change precedence.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use easel_common::url::{resolve_uri, scheme_of, uri_to_path};
use easel_common::warning::clear_warnings;
use easel_dom::SelectorModel;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::parser::{
    Declaration, ParseError, Ruleset, Stylesheet, parse_declaration_list, parse_stylesheet,
};

/// [§ 6.2 Cascading Origins](https://www.w3.org/TR/css-cascade-4/#cascading-origins)
///
/// Where a stylesheet comes from. Later origins win over earlier ones,
/// whatever the selectors involved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StyleOrigin {
    /// Defaults supplied by the application.
    UserAgent,
    /// Stylesheets supplied with the drawing.
    Author,
    /// Styles attached to individual elements.
    Inline,
}

impl StyleOrigin {
    /// All origins, lowest precedence first.
    pub const ALL: [Self; 3] = [Self::UserAgent, Self::Author, Self::Inline];

    /// Lower-case name, as used in configuration and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserAgent => "user-agent",
            Self::Author => "author",
            Self::Inline => "inline",
        }
    }
}

impl fmt::Display for StyleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stylesheet to load: a URI or the stylesheet text itself.
///
/// Inside the manager URIs are stored already resolved against the
/// document home, so the same type doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum StylesheetSource {
    /// A stylesheet location (`file:` URI or plain path).
    Uri(String),
    /// Stylesheet text.
    Literal(String),
}

/// A [`StylesheetSource`] after URI resolution, identifying one entry in an
/// origin bucket.
pub type SourceKey = StylesheetSource;

impl fmt::Display for StylesheetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(uri) => f.write_str(uri),
            Self::Literal(text) => {
                let first_line = text.lines().next().unwrap_or_default();
                if first_line.len() < text.len() {
                    write!(f, "<literal: {first_line}...>")
                } else {
                    write!(f, "<literal: {first_line}>")
                }
            }
        }
    }
}

/// Why a stylesheet could not be compiled.
///
/// A failed entry contributes nothing to the cascade; other entries are
/// unaffected.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// The stylesheet could not be read.
    #[error("failed to read stylesheet {uri}: {source}")]
    Io {
        /// The resolved URI.
        uri: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The URI uses a scheme other than `file`.
    #[error("unsupported scheme '{scheme}' in stylesheet URI {uri}")]
    UnsupportedScheme {
        /// The resolved URI.
        uri: String,
        /// The scheme that was found.
        scheme: String,
    },

    /// The compile job was dropped before it ran.
    #[error("compilation of {source_key} was abandoned")]
    Cancelled {
        /// The entry whose job was dropped.
        source_key: String,
    },
}

/// Errors raised by the style manager itself.
#[derive(Debug, Error)]
pub enum StyleError {
    /// The compile worker pool could not be started.
    #[error("failed to start stylesheet compile pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

/// The result of compiling one stylesheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledStylesheet {
    /// The parsed stylesheet (possibly partial).
    pub stylesheet: Stylesheet,
    /// Syntax errors recovered from while parsing.
    pub errors: Vec<ParseError>,
}

impl CompiledStylesheet {
    /// Parse stylesheet text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (stylesheet, errors) = parse_stylesheet(text);
        Self { stylesheet, errors }
    }
}

enum CompileState {
    Pending,
    Ready(Arc<CompiledStylesheet>),
    Failed(CompileError),
}

struct CompileSlot {
    state: Mutex<CompileState>,
    done: Condvar,
}

/// Shared view of one compile job.
///
/// The state moves from pending to either ready or failed exactly once.
/// Clones observe the same job.
#[derive(Clone)]
pub struct CompileHandle {
    slot: Arc<CompileSlot>,
}

impl CompileHandle {
    fn pending() -> Self {
        Self {
            slot: Arc::new(CompileSlot {
                state: Mutex::new(CompileState::Pending),
                done: Condvar::new(),
            }),
        }
    }

    /// Record the job's outcome. Only the first call has any effect.
    fn complete(&self, result: Result<CompiledStylesheet, CompileError>) {
        let mut state = self.slot.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, CompileState::Pending) {
            *state = match result {
                Ok(compiled) => CompileState::Ready(Arc::new(compiled)),
                Err(error) => CompileState::Failed(error),
            };
            self.slot.done.notify_all();
        }
    }

    /// Block until the job has finished and return its outcome.
    ///
    /// There is no timeout: a job that never finishes blocks every caller.
    ///
    /// # Errors
    ///
    /// Returns the [`CompileError`] the job failed with.
    pub fn wait(&self) -> Result<Arc<CompiledStylesheet>, CompileError> {
        let mut state = self.slot.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match &*state {
                CompileState::Ready(compiled) => return Ok(Arc::clone(compiled)),
                CompileState::Failed(error) => return Err(error.clone()),
                CompileState::Pending => {}
            }
            state = self
                .slot
                .done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns true while the job has not finished.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(
            *self.slot.state.lock().unwrap_or_else(PoisonError::into_inner),
            CompileState::Pending
        )
    }
}

impl fmt::Debug for CompileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.slot.state.lock().unwrap_or_else(PoisonError::into_inner) {
            CompileState::Pending => "pending",
            CompileState::Ready(_) => "ready",
            CompileState::Failed(_) => "failed",
        };
        f.debug_struct("CompileHandle").field("state", &state).finish()
    }
}

/// Completes its handle with [`CompileError::Cancelled`] if dropped before
/// the job ran.
struct CompileJob {
    handle: CompileHandle,
    source: SourceKey,
}

impl CompileJob {
    fn run(self) {
        let result = compile(&self.source);
        match &result {
            Ok(compiled) => debug!(
                source = %self.source,
                rulesets = compiled.stylesheet.rulesets.len(),
                errors = compiled.errors.len(),
                "compiled stylesheet"
            ),
            Err(error) => warn!(source = %self.source, "{error}"),
        }
        self.handle.complete(result);
    }
}

impl Drop for CompileJob {
    fn drop(&mut self) {
        self.handle.complete(Err(CompileError::Cancelled {
            source_key: self.source.to_string(),
        }));
    }
}

/// Load and parse one stylesheet.
fn compile(source: &SourceKey) -> Result<CompiledStylesheet, CompileError> {
    let text = match source {
        StylesheetSource::Literal(text) => Cow::Borrowed(text.as_str()),
        StylesheetSource::Uri(uri) => Cow::Owned(read_uri(uri)?),
    };
    Ok(CompiledStylesheet::parse(&text))
}

fn read_uri(uri: &str) -> Result<String, CompileError> {
    let Some(path) = uri_to_path(uri) else {
        return Err(CompileError::UnsupportedScheme {
            uri: uri.to_string(),
            scheme: scheme_of(uri).unwrap_or_default().to_string(),
        });
    };
    std::fs::read_to_string(&path).map_err(|source| CompileError::Io {
        uri: uri.to_string(),
        source: Arc::new(source),
    })
}

/// Style manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleManagerConfig {
    /// Number of compile worker threads. `None` lets rayon choose.
    pub worker_threads: Option<usize>,
    /// Attribute holding an element's inline declarations. `None` disables
    /// inline styles.
    pub style_attribute: Option<String>,
}

impl Default for StyleManagerConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            style_attribute: Some("style".to_string()),
        }
    }
}

/// Extra pseudo-classes per element, for a single apply pass.
pub type PseudoClassOverrides<E> = HashMap<E, HashSet<String>>;

/// A [`SelectorModel`] that reports extra pseudo-class membership for some
/// elements on top of what the wrapped model says.
pub struct PseudoClassOverlay<'a, M: SelectorModel> {
    model: &'a M,
    overrides: &'a PseudoClassOverrides<M::Element>,
}

impl<'a, M: SelectorModel> PseudoClassOverlay<'a, M> {
    /// Wrap `model` with `overrides`.
    #[must_use]
    pub const fn new(model: &'a M, overrides: &'a PseudoClassOverrides<M::Element>) -> Self {
        Self { model, overrides }
    }
}

impl<M: SelectorModel> SelectorModel for PseudoClassOverlay<'_, M> {
    type Element = M::Element;

    fn has_id(&self, element: &Self::Element, id: &str) -> bool {
        self.model.has_id(element, id)
    }

    fn has_type(&self, element: &Self::Element, type_name: &str) -> bool {
        self.model.has_type(element, type_name)
    }

    fn has_style_class(&self, element: &Self::Element, class_name: &str) -> bool {
        self.model.has_style_class(element, class_name)
    }

    fn has_pseudo_class(&self, element: &Self::Element, pseudo_class: &str) -> bool {
        self.overrides
            .get(element)
            .is_some_and(|extra| extra.contains(pseudo_class))
            || self.model.has_pseudo_class(element, pseudo_class)
    }

    fn get_attribute(&self, element: &Self::Element, name: &str) -> Option<String> {
        self.model.get_attribute(element, name)
    }

    fn attribute_value_contains_word(&self, element: &Self::Element, name: &str, word: &str) -> bool {
        self.model.attribute_value_contains_word(element, name, word)
    }

    fn attribute_names(&self, element: &Self::Element) -> Vec<String> {
        self.model.attribute_names(element)
    }

    fn get_parent(&self, element: &Self::Element) -> Option<Self::Element> {
        self.model.get_parent(element)
    }

    fn get_previous_sibling(&self, element: &Self::Element) -> Option<Self::Element> {
        self.model.get_previous_sibling(element)
    }
}

/// A declaration that won the cascade, with the origin it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedDeclaration {
    /// The origin of the winning stylesheet.
    pub origin: StyleOrigin,
    /// The winning declaration.
    pub declaration: Declaration,
}

/// The winning declaration for each property of one element.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppliedStyles {
    declarations: BTreeMap<String, AppliedDeclaration>,
}

impl AppliedStyles {
    /// The winning declaration for `property`.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&Declaration> {
        self.declarations.get(property).map(|applied| &applied.declaration)
    }

    /// The origin of the winning declaration for `property`.
    #[must_use]
    pub fn origin_of(&self, property: &str) -> Option<StyleOrigin> {
        self.declarations.get(property).map(|applied| applied.origin)
    }

    /// The winning value of `property` as CSS text.
    #[must_use]
    pub fn value_text(&self, property: &str) -> Option<String> {
        self.get(property).map(Declaration::value_text)
    }

    /// Iterate over properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AppliedDeclaration)> {
        self.declarations
            .iter()
            .map(|(property, applied)| (property.as_str(), applied))
    }

    /// Number of properties set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns true if no property was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// A later declaration for the same property replaces the earlier one.
    fn set(&mut self, origin: StyleOrigin, declaration: &Declaration) {
        let _ = self.declarations.insert(
            declaration.property.clone(),
            AppliedDeclaration {
                origin,
                declaration: declaration.clone(),
            },
        );
    }
}

/// Receives the winning declarations of an apply pass. The host interprets
/// the raw terms and applies them to its own objects.
pub trait StyleSink {
    /// Apply one winning declaration.
    fn apply_declaration(&mut self, origin: StyleOrigin, declaration: &Declaration);
}

impl<F: FnMut(StyleOrigin, &Declaration)> StyleSink for F {
    fn apply_declaration(&mut self, origin: StyleOrigin, declaration: &Declaration) {
        self(origin, declaration);
    }
}

/// A ruleset that matched an element, for tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRuleset {
    /// Origin of the stylesheet.
    pub origin: StyleOrigin,
    /// The stylesheet the ruleset came from.
    pub source: SourceKey,
    /// The ruleset itself.
    pub ruleset: Ruleset,
}

/// A stylesheet that failed to compile.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    /// Origin bucket of the entry.
    pub origin: StyleOrigin,
    /// The entry.
    pub source: SourceKey,
    /// What went wrong.
    pub error: CompileError,
}

/// Syntax errors recovered from in one stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetErrors {
    /// Origin bucket of the entry.
    pub origin: StyleOrigin,
    /// The entry.
    pub source: SourceKey,
    /// The recorded errors, in source order.
    pub errors: Vec<ParseError>,
}

struct StyleEntry {
    key: SourceKey,
    handle: CompileHandle,
}

/// Owns the stylesheets of every origin and applies them to elements.
///
/// Configuration calls take `&mut self`; apply passes take `&self` and may
/// run concurrently.
pub struct StyleManager {
    config: StyleManagerConfig,
    pool: ThreadPool,
    buckets: BTreeMap<StyleOrigin, Vec<StyleEntry>>,
}

impl StyleManager {
    /// Create a manager with its own compile worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::ThreadPool`] if the worker threads cannot be
    /// started.
    pub fn new(config: StyleManagerConfig) -> Result<Self, StyleError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("easel-css-{i}"));
        if let Some(threads) = config.worker_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        debug!(threads = pool.current_num_threads(), "started stylesheet compile pool");

        Ok(Self {
            config,
            pool,
            buckets: BTreeMap::new(),
        })
    }

    /// The configuration the manager was created with.
    #[must_use]
    pub const fn config(&self) -> &StyleManagerConfig {
        &self.config
    }

    /// Add a stylesheet by URI.
    ///
    /// `uri` is resolved against `doc_home` when it is relative. An entry
    /// with the same resolved URI is replaced in place; otherwise the entry
    /// goes to the end of the origin's bucket. Returns immediately; the
    /// stylesheet is read and parsed on the worker pool.
    pub fn add_stylesheet(
        &mut self,
        origin: StyleOrigin,
        doc_home: Option<&str>,
        uri: &str,
    ) -> CompileHandle {
        let key = StylesheetSource::Uri(resolve_uri(uri, doc_home));
        self.insert(origin, key)
    }

    /// Add a stylesheet given as text. Keyed by the text itself.
    pub fn add_stylesheet_literal(
        &mut self,
        origin: StyleOrigin,
        text: impl Into<String>,
    ) -> CompileHandle {
        self.insert(origin, StylesheetSource::Literal(text.into()))
    }

    /// Replace every stylesheet of `origin`.
    ///
    /// URI sources are always recompiled, since the file may have changed.
    /// A literal source whose text equals an existing entry of the bucket
    /// reuses that entry's compiled result.
    pub fn set_stylesheets(
        &mut self,
        origin: StyleOrigin,
        doc_home: Option<&str>,
        sources: impl IntoIterator<Item = StylesheetSource>,
    ) {
        let previous = self.buckets.remove(&origin).unwrap_or_default();
        let mut entries: Vec<StyleEntry> = Vec::new();

        for source in sources {
            let key = match source {
                StylesheetSource::Uri(uri) => StylesheetSource::Uri(resolve_uri(&uri, doc_home)),
                literal @ StylesheetSource::Literal(_) => literal,
            };
            if entries.iter().any(|entry| entry.key == key) {
                continue;
            }
            let reused = match key {
                StylesheetSource::Literal(_) => previous
                    .iter()
                    .find(|entry| entry.key == key)
                    .map(|entry| entry.handle.clone()),
                StylesheetSource::Uri(_) => None,
            };
            let handle = match reused {
                Some(handle) => handle,
                None => self.submit(key.clone()),
            };
            entries.push(StyleEntry { key, handle });
        }

        let _ = self.buckets.insert(origin, entries);
    }

    /// Drop the stylesheets of one origin, or of every origin. Clearing
    /// every origin also resets the deduplicated warnings.
    ///
    /// Jobs still compiling for dropped entries run to completion and their
    /// results are discarded.
    pub fn clear_stylesheets(&mut self, origin: Option<StyleOrigin>) {
        match origin {
            Some(origin) => {
                let _ = self.buckets.remove(&origin);
            }
            None => {
                self.buckets.clear();
                clear_warnings();
            }
        }
    }

    /// The stylesheet keys of `origin`, in insertion order.
    #[must_use]
    pub fn sources(&self, origin: StyleOrigin) -> Vec<SourceKey> {
        self.entries(origin).map(|entry| entry.key.clone()).collect()
    }

    /// The compiled form of one entry, waiting for its job if needed.
    /// `None` if `origin` has no entry with that key.
    #[must_use]
    pub fn compiled(
        &self,
        origin: StyleOrigin,
        key: &SourceKey,
    ) -> Option<Result<Arc<CompiledStylesheet>, CompileError>> {
        self.entries(origin)
            .find(|entry| entry.key == *key)
            .map(|entry| entry.handle.wait())
    }

    /// Compute the winning declaration for every property of `element`.
    ///
    /// Origins are visited lowest precedence first, stylesheets in insertion
    /// order and rulesets in document order; a later declaration replaces an
    /// earlier one for the same property. The element's inline style
    /// attribute, if configured and present, is applied last.
    ///
    /// `overrides` adds pseudo-classes to some elements for this pass only.
    ///
    /// Blocks until every stylesheet involved has been compiled. Stylesheets
    /// that failed to compile are skipped.
    #[must_use]
    pub fn apply_styles_to<M: SelectorModel>(
        &self,
        model: &M,
        element: &M::Element,
        overrides: &PseudoClassOverrides<M::Element>,
    ) -> AppliedStyles {
        let mut styles = AppliedStyles::default();
        self.cascade(model, element, overrides, |origin, declaration| {
            styles.set(origin, declaration);
        });
        styles
    }

    /// Like [`apply_styles_to`](Self::apply_styles_to), handing the winning
    /// declarations to `sink` in property-name order.
    pub fn apply_styles_into<M: SelectorModel>(
        &self,
        model: &M,
        element: &M::Element,
        overrides: &PseudoClassOverrides<M::Element>,
        sink: &mut impl StyleSink,
    ) {
        for (_, applied) in self.apply_styles_to(model, element, overrides).iter() {
            sink.apply_declaration(applied.origin, &applied.declaration);
        }
    }

    /// Every ruleset matching `element`, in cascade order.
    #[must_use]
    pub fn matching_rulesets<M: SelectorModel>(
        &self,
        model: &M,
        element: &M::Element,
        overrides: &PseudoClassOverrides<M::Element>,
    ) -> Vec<MatchedRuleset> {
        let overlay = PseudoClassOverlay::new(model, overrides);
        let mut matched = Vec::new();
        for origin in StyleOrigin::ALL {
            for entry in self.entries(origin) {
                let Ok(compiled) = entry.handle.wait() else {
                    continue;
                };
                matched.extend(
                    compiled
                        .stylesheet
                        .rulesets
                        .iter()
                        .filter(|ruleset| ruleset.selectors.matches(&overlay, element).is_some())
                        .map(|ruleset| MatchedRuleset {
                            origin,
                            source: entry.key.clone(),
                            ruleset: ruleset.clone(),
                        }),
                );
            }
        }
        matched
    }

    /// Stylesheets that failed to compile. Waits for pending jobs.
    #[must_use]
    pub fn compile_failures(&self) -> Vec<CompileFailure> {
        self.all_entries()
            .filter_map(|(origin, entry)| {
                entry.handle.wait().err().map(|error| CompileFailure {
                    origin,
                    source: entry.key.clone(),
                    error,
                })
            })
            .collect()
    }

    /// Syntax errors of every compiled stylesheet that had any. Waits for
    /// pending jobs.
    #[must_use]
    pub fn parse_errors(&self) -> Vec<StylesheetErrors> {
        self.all_entries()
            .filter_map(|(origin, entry)| {
                let compiled = entry.handle.wait().ok()?;
                (!compiled.errors.is_empty()).then(|| StylesheetErrors {
                    origin,
                    source: entry.key.clone(),
                    errors: compiled.errors.clone(),
                })
            })
            .collect()
    }

    fn cascade<M: SelectorModel>(
        &self,
        model: &M,
        element: &M::Element,
        overrides: &PseudoClassOverrides<M::Element>,
        mut apply: impl FnMut(StyleOrigin, &Declaration),
    ) {
        let overlay = PseudoClassOverlay::new(model, overrides);

        for origin in StyleOrigin::ALL {
            for entry in self.entries(origin) {
                // Failures were logged when the job finished.
                let Ok(compiled) = entry.handle.wait() else {
                    continue;
                };
                for ruleset in &compiled.stylesheet.rulesets {
                    if ruleset.selectors.matches(&overlay, element).is_some() {
                        for declaration in &ruleset.declarations {
                            apply(origin, declaration);
                        }
                    }
                }
            }
        }

        // The element's own style attribute comes after every stylesheet.
        let inline = self
            .config
            .style_attribute
            .as_deref()
            .and_then(|attribute| model.get_attribute(element, attribute));
        if let Some(text) = inline {
            let (declarations, errors) = parse_declaration_list(&text);
            if !errors.is_empty() {
                debug!(errors = errors.len(), "errors in inline style");
            }
            for declaration in &declarations {
                apply(StyleOrigin::Inline, declaration);
            }
        }
    }

    fn insert(&mut self, origin: StyleOrigin, key: SourceKey) -> CompileHandle {
        let handle = self.submit(key.clone());
        let bucket = self.buckets.entry(origin).or_default();
        if let Some(existing) = bucket.iter_mut().find(|entry| entry.key == key) {
            existing.handle = handle.clone();
        } else {
            bucket.push(StyleEntry {
                key,
                handle: handle.clone(),
            });
        }
        handle
    }

    fn submit(&self, source: SourceKey) -> CompileHandle {
        let handle = CompileHandle::pending();
        debug!(source = %source, "submitting stylesheet compile job");
        let job = CompileJob {
            handle: handle.clone(),
            source,
        };
        self.pool.spawn(move || job.run());
        handle
    }

    fn entries(&self, origin: StyleOrigin) -> impl Iterator<Item = &StyleEntry> {
        self.buckets.get(&origin).into_iter().flatten()
    }

    fn all_entries(&self) -> impl Iterator<Item = (StyleOrigin, &StyleEntry)> {
        StyleOrigin::ALL
            .into_iter()
            .flat_map(move |origin| self.entries(origin).map(move |entry| (origin, entry)))
    }
}

impl fmt::Debug for StyleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (origin, entries) in &self.buckets {
            let _ = map.entry(origin, &entries.iter().map(|e| &e.key).collect::<Vec<_>>());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_order() {
        assert!(StyleOrigin::UserAgent < StyleOrigin::Author);
        assert!(StyleOrigin::Author < StyleOrigin::Inline);
        assert_eq!(StyleOrigin::ALL[2], StyleOrigin::Inline);
    }

    #[test]
    fn test_handle_completes_once() {
        let handle = CompileHandle::pending();
        assert!(handle.is_pending());
        handle.complete(Ok(CompiledStylesheet::parse("a { b: c }")));
        handle.complete(Err(CompileError::Cancelled {
            source_key: "ignored".to_string(),
        }));
        let compiled = handle.wait().expect("first outcome wins");
        assert_eq!(compiled.stylesheet.rulesets.len(), 1);
    }

    #[test]
    fn test_dropped_job_is_cancelled() {
        let handle = CompileHandle::pending();
        drop(CompileJob {
            handle: handle.clone(),
            source: StylesheetSource::Literal("a {}".to_string()),
        });
        assert!(matches!(handle.wait(), Err(CompileError::Cancelled { .. })));
    }

    #[test]
    fn test_unsupported_scheme() {
        let error = read_uri("http://example.com/a.css").unwrap_err();
        assert!(matches!(
            error,
            CompileError::UnsupportedScheme { ref scheme, .. } if scheme == "http"
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: StyleManagerConfig =
            serde_json::from_str(r#"{ "worker_threads": 2 }"#).unwrap();
        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.style_attribute.as_deref(), Some("style"));
    }
}
