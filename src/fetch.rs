//! Browser transport for the two data resources.
//!
//! The store never talks to `window.fetch` directly; it goes through the
//! [`Fetch`] trait so the load/refresh logic can be driven by scripted
//! in-memory fetchers in tests.

use crate::{resources, urlstate, FetchError};
use futures::future::LocalBoxFuture;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlBaseElement, Request, RequestCache, RequestInit, Response};

/// How a request interacts with intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Whatever the browser cache would normally do.
    Default,
    /// Bypass intermediate caches and go back to the server. Used by
    /// forced refreshes.
    Bypass,
}

/// Transport seam for the data resources.
pub trait Fetch {
    /// GET one resource and return its raw body text.
    fn fetch_json(
        &self,
        resource: &str,
        mode: CacheMode,
    ) -> LocalBoxFuture<'static, Result<String, FetchError>>;
}

/// `window.fetch`-backed implementation used on the real page.
#[derive(Debug, Clone)]
pub struct WebFetch {
    data_path: String,
}

impl WebFetch {
    /// Fetch resources below an explicit `_data/` directory.
    pub fn new(data_path: impl Into<String>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    /// Derive the `_data/` location from the current page: a `<base>`
    /// tag wins, otherwise the site-root prefix of the current pathname.
    pub fn from_current_page(site_root: &str) -> Self {
        Self::new(format!("{}{}", page_base_path(site_root), resources::DATA_DIR))
    }

    /// Where the resources are fetched from, ending in `_data/`.
    pub fn data_path(&self) -> &str {
        &self.data_path
    }
}

/// Base path of the current page, also used to resolve card links.
pub fn page_base_path(site_root: &str) -> String {
    let base_href = gloo_utils::document()
        .query_selector("base")
        .ok()
        .flatten()
        .and_then(|el| el.dyn_into::<HtmlBaseElement>().ok())
        .map(|base| base.href());
    let pathname = gloo_utils::window()
        .location()
        .pathname()
        .unwrap_or_default();
    urlstate::detect_base_path(base_href.as_deref(), &pathname, site_root)
}

fn network_error(resource: &str, err: JsValue) -> FetchError {
    FetchError::Network {
        resource: resource.to_string(),
        message: err.as_string().unwrap_or_else(|| format!("{:?}", err)),
    }
}

impl Fetch for WebFetch {
    fn fetch_json(
        &self,
        resource: &str,
        mode: CacheMode,
    ) -> LocalBoxFuture<'static, Result<String, FetchError>> {
        let url = format!("{}{}", self.data_path, resource);
        let resource = resource.to_string();
        Box::pin(async move {
            let init = RequestInit::new();
            init.set_method("GET");
            if mode == CacheMode::Bypass {
                init.set_cache(RequestCache::Reload);
            }
            let request = Request::new_with_str_and_init(&url, &init)
                .map_err(|e| network_error(&resource, e))?;

            let response = JsFuture::from(gloo_utils::window().fetch_with_request(&request))
                .await
                .map_err(|e| network_error(&resource, e))?;
            let response: Response = response
                .dyn_into()
                .map_err(|e| network_error(&resource, e))?;

            if !response.ok() {
                return Err(FetchError::Http {
                    resource,
                    status: response.status(),
                    status_text: response.status_text(),
                });
            }

            let body = JsFuture::from(response.text().map_err(|e| network_error(&resource, e))?)
                .await
                .map_err(|e| network_error(&resource, e))?;
            body.as_string().ok_or_else(|| FetchError::Decode {
                resource,
                message: "response body is not a string".to_string(),
            })
        })
    }
}
