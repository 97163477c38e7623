//! Embedded-resource references in fetched documents

use scraper::{Html, Selector};
use tracing::warn;

/// Finds references to embedded resources, in document order
pub trait ReferenceExtractor {
    fn extract(&self, document: &str) -> Vec<String>;
}

impl<F> ReferenceExtractor for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn extract(&self, document: &str) -> Vec<String> {
        self(document)
    }
}

/// Yields, for every `<img>` element, its `src` and then its `lowsrc`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImgExtractor;

impl ReferenceExtractor for ImgExtractor {
    fn extract(&self, document: &str) -> Vec<String> {
        let selector = match Selector::parse("img") {
            Ok(selector) => selector,
            Err(e) => {
                warn!(error = %e, "img selector rejected");
                return Vec::new();
            }
        };

        let document = Html::parse_document(document);
        let mut references = Vec::new();

        for element in document.select(&selector) {
            let img = element.value();
            references.extend(
                [img.attr("src"), img.attr("lowsrc")]
                    .into_iter()
                    .flatten()
                    .filter(|r| !r.trim().is_empty())
                    .map(str::to_string),
            );
        }

        references
    }
}
