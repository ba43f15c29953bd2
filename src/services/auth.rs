use reqwest::Url;

/// Wraps a raw URL with session credentials so it can be opened directly
/// (browser navigation, download managers) without an Authorization header.
pub trait AuthUrl: Send + Sync {
    fn authenticate(&self, raw_url: &str) -> String;
}

/// Appends the session token as an `access_token` query parameter.
#[derive(Debug, Clone)]
pub struct QueryTokenAuth {
    token: Option<String>,
}

impl QueryTokenAuth {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl AuthUrl for QueryTokenAuth {
    fn authenticate(&self, raw_url: &str) -> String {
        let Some(token) = &self.token else {
            return raw_url.to_string();
        };

        match Url::parse(raw_url) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("access_token", token);
                url.into()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Download URL is not absolute, leaving it unsigned");
                raw_url.to_string()
            }
        }
    }
}
