//! Document abstraction and the skin-name lookup rules.
//!
//! The monitor never talks to a concrete DOM.  Anything that can answer
//! "which elements match this selector, what is their text, and are they
//! rendered?" implements [`Document`].  The lookup itself is the pure function
//! [`read_current_skin`], shared by every sampling trigger.
//!
//! # Lookup rules
//!
//! Selectors are tried in order:
//!
//! | Selector           | UI layout               |
//! |--------------------|-------------------------|
//! | `.skin-name-text`  | classic champion select |
//! | `.skin-name`       | swiftplay lobby         |
//!
//! For the first selector that matches anything, every matching element is
//! scanned and elements with blank text are skipped.  The first element that
//! is visible (or whose visibility cannot be determined) wins; when none of
//! the non-blank elements is visible, the first non-blank element is used.
//! A selector whose matches are all blank is exhausted and the next selector
//! is tried.

/// Skin-name selectors in priority order.
pub const SKIN_SELECTORS: [&str; 2] = [".skin-name-text", ".skin-name"];

/// What the lookup needs to know about one matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    /// The element's full text content, untrimmed.
    pub text: String,
    /// `Some(true)` if the element is rendered, `Some(false)` if it is not
    /// (it or an ancestor is hidden), `None` if the document cannot tell.
    pub visible: Option<bool>,
}

impl ElementSnapshot {
    pub fn new(text: impl Into<String>, visible: Option<bool>) -> Self {
        Self {
            text: text.into(),
            visible,
        }
    }

    /// Elements of unknown visibility count as visible.
    pub fn counts_as_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }
}

/// A read-only view of the rendered document.
pub trait Document {
    /// All elements matching a CSS selector, in document order.
    ///
    /// An unsupported or invalid selector yields no elements.
    fn query_all(&self, selector: &str) -> Vec<ElementSnapshot>;
}

/// Reads the active skin name from `document` using `selectors` in order.
///
/// Returns `None` when no selector produces a non-blank candidate.
pub fn read_current_skin<S: AsRef<str>>(document: &dyn Document, selectors: &[S]) -> Option<String> {
    selectors
        .iter()
        .find_map(|selector| pick_candidate(&document.query_all(selector.as_ref())))
}

fn pick_candidate(elements: &[ElementSnapshot]) -> Option<String> {
    let mut fallback: Option<&str> = None;

    for element in elements {
        let name = element.text.trim();
        if name.is_empty() {
            continue;
        }
        if element.counts_as_visible() {
            return Some(name.to_owned());
        }
        fallback.get_or_insert(name);
    }

    fallback.map(str::to_owned)
}
