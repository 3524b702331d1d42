mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::{debug, info};

use crate::error::FetchError;
use crate::parser::{SourceSchema, parse_records};
use crate::types::RawRecord;

/// WHO validated daily mpox counts, CSV export.
pub const WHO_SOURCE_URL: &str =
    "https://frontdoor-l4uikgap6gz3m.azurefd.net/MPX/V_MPX_VALIDATED_DAILY?&$format=csv";

pub const WHO_REGIONS: [&str; 6] = ["EURO", "AMRO", "WPRO", "EMRO", "AFRO", "SEARO"];

/// Upstream endpoint plus the per-region partitioning used to query it.
#[derive(Debug, Clone)]
pub struct Source {
    pub base_url: String,
    pub regions: Vec<String>,
    pub schema: SourceSchema,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            base_url: WHO_SOURCE_URL.to_string(),
            regions: WHO_REGIONS.iter().map(|r| r.to_string()).collect(),
            schema: SourceSchema::who(),
        }
    }
}

impl Source {
    /// URLs to request, one per region, or the base URL alone when no
    /// regions are configured.
    pub fn urls(&self) -> Vec<String> {
        if self.regions.is_empty() {
            return vec![self.base_url.clone()];
        }
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        self.regions
            .iter()
            .map(|region| {
                format!(
                    "{}{sep}$filter=WHO_REGION%20eq%20%27{region}%27",
                    self.base_url
                )
            })
            .collect()
    }
}

/// Performs a single GET and returns the response body.
///
/// # Errors
///
/// Fails on an unparsable URL, a transport error or a non-2xx status.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Vec<u8>, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let request_error = |source| FetchError::Request {
        url: url.to_string(),
        source,
    };

    let resp = client.execute(req).await.map_err(request_error)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = resp.bytes().await.map_err(request_error)?;
    debug!(url, bytes = bytes.len(), "Response received");
    Ok(bytes.to_vec())
}

/// Fetches every region of `source` in turn and concatenates the parsed
/// records. Any failing request or body fails the whole fetch.
#[tracing::instrument(skip_all, fields(base_url = %source.base_url, regions = source.regions.len()))]
pub async fn fetch_source<C: HttpClient + ?Sized>(
    client: &C,
    source: &Source,
) -> Result<Vec<RawRecord>, FetchError> {
    let mut records = Vec::new();

    for url in source.urls() {
        let bytes = fetch_bytes(client, &url).await?;
        let parsed = parse_records(&bytes, &source.schema)?;
        debug!(url = %url, records = parsed.len(), "Region parsed");
        records.extend(parsed);
    }

    info!(records = records.len(), "Source snapshot fetched");
    Ok(records)
}
