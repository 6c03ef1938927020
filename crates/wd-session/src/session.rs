//! Capability surface the render-wait coordinator drives.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SessionError;
use crate::ids::ElementId;

/// How an element is located in the current document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ElementQuery {
    Css(String),
    TagName(String),
}

impl ElementQuery {
    pub fn css(selector: impl Into<String>) -> Self {
        ElementQuery::Css(selector.into())
    }

    pub fn tag(name: impl Into<String>) -> Self {
        ElementQuery::TagName(name.into())
    }

    /// CSS form of the query; tag names are valid type selectors.
    pub fn as_css(&self) -> &str {
        match self {
            ElementQuery::Css(selector) => selector,
            ElementQuery::TagName(name) => name,
        }
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementQuery::Css(selector) => write!(f, "css {selector:?}"),
            ElementQuery::TagName(name) => write!(f, "tag {name:?}"),
        }
    }
}

/// A controllable browser page.
///
/// `query` distinguishes three answers: `Ok(Some(_))` when an element
/// matched, `Ok(None)` when the document holds no match, and
/// `Err(SessionError::NoSuchElement(_))` when the driver itself reported the
/// lookup as missing.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    async fn query(&self, query: &ElementQuery) -> Result<Option<ElementId>, SessionError>;

    /// Number of elements matching `query`, without issuing handles. Shares
    /// the error semantics of [`BrowserSession::query`].
    async fn count_matches(&self, query: &ElementQuery) -> Result<usize, SessionError> {
        self.query(query).await.map(|found| usize::from(found.is_some()))
    }

    async fn property(
        &self,
        element: ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    async fn close(&self) -> Result<(), SessionError>;
}

#[async_trait]
impl<T: BrowserSession + ?Sized> BrowserSession for Arc<T> {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        (**self).navigate(url).await
    }

    async fn query(&self, query: &ElementQuery) -> Result<Option<ElementId>, SessionError> {
        (**self).query(query).await
    }

    async fn count_matches(&self, query: &ElementQuery) -> Result<usize, SessionError> {
        (**self).count_matches(query).await
    }

    async fn property(
        &self,
        element: ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        (**self).property(element, name).await
    }

    async fn close(&self) -> Result<(), SessionError> {
        (**self).close().await
    }
}

/// Opens a session once the content origin is known to be servable.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    type Session: BrowserSession;

    async fn connect(&self) -> Result<Self::Session, SessionError>;
}
