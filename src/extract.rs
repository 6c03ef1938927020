use tracing::debug;
use wd_session::{BrowserSession, ElementQuery};

use crate::errors::{RenderError, RenderResult};
use crate::wait::PollReport;

/// Root element whose markup is captured.
pub const ROOT_TAG: &str = "html";
/// DOM property holding the captured markup.
pub const MARKUP_PROPERTY: &str = "innerHTML";

/// Inner markup of the document root after rendering settled. The `<html>`
/// tag itself and any doctype are not part of it.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderedDocument {
    markup: String,
}

impl RenderedDocument {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.markup
    }

    pub fn len(&self) -> usize {
        self.markup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty()
    }

    pub fn into_string(self) -> String {
        self.markup
    }
}

/// Read the root element's inner markup. Requires the report of a finished
/// wait, so extraction cannot run ahead of readiness.
pub async fn extract_document<S>(session: &S, ready: &PollReport) -> RenderResult<RenderedDocument>
where
    S: BrowserSession + ?Sized,
{
    let root = session
        .query(&ElementQuery::tag(ROOT_TAG))
        .await
        .map_err(|err| RenderError::extraction("root element lookup failed", Some(err)))?
        .ok_or_else(|| RenderError::extraction("document has no <html> element", None))?;

    let markup = session
        .property(root, MARKUP_PROPERTY)
        .await
        .map_err(|err| RenderError::extraction("reading innerHTML failed", Some(err)))?
        .ok_or_else(|| RenderError::extraction("<html> has no innerHTML property", None))?;

    debug!(
        bytes = markup.len(),
        polls = ready.attempts(),
        "captured rendered markup"
    );
    Ok(RenderedDocument::new(markup))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_exposes_markup() {
        let doc = RenderedDocument::new("<head></head><body>hi</body>");
        assert_eq!(doc.len(), 28);
        assert!(!doc.is_empty());
        assert_eq!(doc.as_str(), "<head></head><body>hi</body>");
        assert_eq!(doc.into_string(), "<head></head><body>hi</body>");
        assert!(RenderedDocument::new("").is_empty());
    }
}
