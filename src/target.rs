use url::Url;

use crate::errors::{RenderError, RenderResult};

/// What to render: the page under `http://localhost:<port>/` and the selector
/// of its loading marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    origin: Url,
    page: String,
    selector: String,
    navigation_url: Url,
}

impl RenderTarget {
    pub fn new(port: u16, page: &str, selector: &str) -> RenderResult<Self> {
        if port == 0 {
            return Err(RenderError::invalid_config("listen port must be non-zero"));
        }
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(RenderError::invalid_config("a readiness selector is required"));
        }

        let origin = Url::parse(&format!("http://localhost:{port}/"))
            .map_err(|err| RenderError::invalid_config(format!("origin url: {err}")))?;
        // the page path is appended to the origin verbatim
        let page = page.trim_start_matches('/').to_string();
        let navigation_url = Url::parse(&format!("{origin}{page}")).map_err(|err| {
            RenderError::invalid_config(format!("page {page:?} does not form a url: {err}"))
        })?;

        Ok(Self {
            origin,
            page,
            selector: selector.to_string(),
            navigation_url,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn port(&self) -> u16 {
        self.origin.port().unwrap_or(80)
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn navigation_url(&self) -> &Url {
        &self.navigation_url
    }
}
