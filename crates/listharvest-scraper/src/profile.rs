//! Endpoint profiles: the fixed request shape of each vendor-listing API.
//!
//! A profile is an immutable value injected into the client. The two built-in
//! endpoints share the harvesting contract but differ in base URL, client
//! identifiers, page size, and whether page numbering starts at 0 or 1.

use listharvest_core::Coordinate;
use reqwest::Url;

use crate::error::ScraperError;

const DESKTOP_CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointProfile {
    pub name: String,
    pub base_url: String,
    /// Index of the first page. Artifacts are numbered with the same index.
    pub start_page: u32,
    pub lat_param: String,
    pub lng_param: String,
    pub page_param: String,
    /// Query parameters sent unchanged with every request, in order.
    pub fixed_params: Vec<(String, String)>,
    /// Headers sent with every request, excluding `User-Agent`.
    pub headers: Vec<(String, String)>,
    pub user_agent: String,
    /// JSON object keys leading to the results list.
    pub results_path: Vec<String>,
}

/// One fetch attempt's target: a coordinate and a page index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub coordinate: Coordinate,
    pub page: u32,
}

impl EndpointProfile {
    /// Restaurant vendor listing. Pages are numbered from 1.
    #[must_use]
    pub fn snappfood() -> Self {
        Self {
            name: "snappfood".to_owned(),
            base_url: "https://snappfood.ir/search/api/v1/desktop/vendors-list".to_owned(),
            start_page: 1,
            lat_param: "lat".to_owned(),
            lng_param: "long".to_owned(),
            page_param: "page".to_owned(),
            fixed_params: pairs(&[
                ("optionalClient", "WEBSITE"),
                ("client", "WEBSITE"),
                ("deviceType", "WEBSITE"),
                ("appVersion", "8.1.1"),
                ("UDID", "c47cb3c1-c45a-413f-bd8f-f08af89dbc4b"),
                ("page_size", "20"),
                ("filters", "{}"),
                ("query", ""),
                ("sp_alias", "restaurant"),
                ("superType", "[1]"),
                ("vendor_title", ""),
                ("extra-filter", ""),
                ("locale", "fa"),
            ]),
            headers: pairs(&[
                ("Accept", "application/json, text/plain, */*"),
                ("Referer", "https://snappfood.ir/"),
                ("Accept-Language", "en-US,en;q=0.9,fa;q=0.8"),
            ]),
            user_agent: DESKTOP_CHROME_UA.to_owned(),
            results_path: vec!["data".to_owned(), "finalResult".to_owned()],
        }
    }

    /// Grocery/express vendor listing. Pages are numbered from 0.
    #[must_use]
    pub fn snapp_express() -> Self {
        Self {
            name: "snapp-express".to_owned(),
            base_url: "https://api.snapp.express/express-vendor/general/vendors-list".to_owned(),
            start_page: 0,
            lat_param: "lat".to_owned(),
            lng_param: "long".to_owned(),
            page_param: "page".to_owned(),
            fixed_params: pairs(&[
                ("page_size", "18"),
                ("appVersion", "1.346.8"),
                ("UDID", "535df17f-d686-497d-98d2-b5ae67829fe7"),
                ("deviceType", "PWA"),
                ("client", "PWA"),
                ("service", "all"),
                ("extra-filter[vendor_collection]", "-1"),
                ("page_type", "vendor_list"),
                ("is_home", "false"),
            ]),
            headers: pairs(&[
                ("Accept", "application/json, text/plain, */*"),
                ("Referer", "https://express.snapp.market/"),
                ("Accept-Language", "fa-IR, fa;q=0.9,en;q=0.8,*;q=0.1"),
            ]),
            user_agent: DESKTOP_CHROME_UA.to_owned(),
            results_path: vec!["data".to_owned(), "finalResult".to_owned()],
        }
    }

    /// All built-in profiles, in display order.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![Self::snappfood(), Self::snapp_express()]
    }

    /// Looks up a built-in profile by name (case-insensitive; `_` and `-` are
    /// interchangeable).
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase().replace('_', "-");
        Self::builtin().into_iter().find(|p| p.name == wanted)
    }

    /// Returns the same profile pointed at a different base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.base_url);
        self
    }

    /// Dotted form of [`Self::results_path`], for messages.
    #[must_use]
    pub fn results_path_display(&self) -> String {
        self.results_path.join(".")
    }

    /// Builds the full request URL for one page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidEndpoint`] if the base URL does not parse.
    pub fn url_for(&self, request: &PageRequest) -> Result<Url, ScraperError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ScraperError::InvalidEndpoint {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair(&self.lat_param, &format_degrees(request.coordinate.lat))
                .append_pair(&self.lng_param, &format_degrees(request.coordinate.lng))
                .append_pair(&self.page_param, &request.page.to_string());
            for (key, value) in &self.fixed_params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

/// Renders a degree value the way coordinates are written in request
/// parameters and artifact names: shortest round-trip form, with whole
/// numbers keeping a trailing `.0`.
#[must_use]
pub fn format_degrees(value: f64) -> String {
    let rendered = value.to_string();
    if !value.is_finite() || rendered.contains('.') {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}
