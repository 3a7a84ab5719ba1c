use crate::document::Document;
use graft_core::GraftResult;
use serde::{Deserialize, Serialize};
use url::Url;

/// A host page as the injectors see it: the current location plus the live
/// element tree. The tree is the sole source of truth for injection state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub location: Url,
    pub document: Document,
}

impl Page {
    pub fn new(location: Url, document: Document) -> Self {
        Self { location, document }
    }

    pub fn parse(href: &str, document: Document) -> GraftResult<Self> {
        Ok(Self {
            location: Url::parse(href)?,
            document,
        })
    }

    /// Full current href, the context the target URL embeds.
    pub fn href(&self) -> &str {
        self.location.as_str()
    }

    pub fn path(&self) -> &str {
        self.location.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_reflects_location() {
        let page = Page::parse(
            "https://codehost.example/org/repo/pull/1",
            Document::new("html"),
        )
        .expect("page parses");
        assert_eq!(page.path(), "/org/repo/pull/1");
        assert_eq!(page.href(), "https://codehost.example/org/repo/pull/1");
    }

    #[test]
    fn invalid_location_is_an_error() {
        assert!(Page::parse("not a url", Document::new("html")).is_err());
    }
}
