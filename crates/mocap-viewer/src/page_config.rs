//! Configuration fields read from the hosting page
//!
//! The server renders each field as `<meta id="current-url" content="...">`.
//! A URL query parameter of the same name is used when the element is
//! missing, which makes the viewer usable from a plain static page.

use std::collections::HashMap;

use mocap_core::config::ConfigFields;
#[cfg(target_arch = "wasm32")]
use mocap_core::config::ALL_FIELDS;

/// Snapshot of the page's configuration fields
#[derive(Debug, Clone, Default)]
pub struct PageFields {
    meta: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl PageFields {
    /// Read every known field from the current document and URL
    #[allow(unused_mut)]
    pub fn from_document() -> Self {
        let mut fields = Self::default();
        #[cfg(target_arch = "wasm32")]
        {
            fields.read_meta_elements();
            fields.read_query_params();
        }
        fields
    }

    #[cfg(target_arch = "wasm32")]
    fn read_meta_elements(&mut self) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::warn!("No document, page fields unavailable");
            return;
        };
        for name in ALL_FIELDS {
            if let Some(content) = document
                .get_element_by_id(name)
                .and_then(|element| element.get_attribute("content"))
            {
                self.meta.insert(name.to_string(), content);
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn read_query_params(&mut self) {
        let Some(href) = web_sys::window().and_then(|w| w.location().href().ok()) else {
            return;
        };
        let Ok(url) = web_sys::Url::new(&href) else {
            return;
        };
        let params = url.search_params();
        for name in ALL_FIELDS {
            if let Some(value) = params.get(name) {
                self.query.insert(name.to_string(), value);
            }
        }
    }
}

impl ConfigFields for PageFields {
    fn field(&self, name: &str) -> Option<String> {
        self.meta
            .get(name)
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.query.get(name))
            .cloned()
    }
}
