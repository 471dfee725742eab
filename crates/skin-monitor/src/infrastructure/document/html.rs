//! [`Document`] over a parsed HTML snapshot.
//!
//! Visibility follows the layout rule of a rendered page: an element is not
//! rendered when it or any ancestor carries the `hidden` attribute or an
//! inline `display: none`.  Stylesheets are not evaluated, so everything else
//! counts as visible.

use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};

use skin_monitor_core::{Document, ElementSnapshot};

/// A parsed HTML document.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parses a full document.  Malformed markup is recovered, never rejected.
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }
}

impl Document for HtmlDocument {
    fn query_all(&self, selector: &str) -> Vec<ElementSnapshot> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };

        self.html
            .select(&selector)
            .map(|element| {
                let text = element.text().collect::<String>();
                ElementSnapshot::new(text, Some(!is_hidden(element)))
            })
            .collect()
    }
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| hides(el.value()))
}

fn hides(element: &Element) -> bool {
    element.attr("hidden").is_some() || element.attr("style").is_some_and(style_hides)
}

/// `true` if an inline style declares `display: none`.
fn style_hides(style: &str) -> bool {
    style.split(';').any(|declaration| {
        let Some((property, value)) = declaration.split_once(':') else {
            return false;
        };
        property.trim().eq_ignore_ascii_case("display")
            && value
                .trim()
                .trim_end_matches("!important")
                .trim()
                .eq_ignore_ascii_case("none")
    })
}
