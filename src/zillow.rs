use std::{path::Path, time::Duration};

use clap::ValueEnum;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{CollectorError, Result};
use crate::helpers::value_text;
use crate::report::{Event, Reporter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum StatusType {
    #[value(name = "ForSale")]
    ForSale,
    #[value(name = "RecentlySold")]
    RecentlySold,
}

impl StatusType {
    pub fn as_query(&self) -> &'static str {
        match self {
            StatusType::ForSale => "ForSale",
            StatusType::RecentlySold => "RecentlySold",
        }
    }

    /// Snapshot filename prefix, `forsale_240115.csv` / `sold_240115.csv`
    pub fn file_prefix(&self) -> &'static str {
        match self {
            StatusType::ForSale => "forsale",
            StatusType::RecentlySold => "sold",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CollectionMode {
    /// Search results only
    Basic,
    /// Search results plus one detail call per listing
    Advanced,
}

/// One city's search, paged by the caller.
#[derive(Debug, Clone)]
pub struct SearchQuery<'a> {
    pub city: &'a str,
    pub state: &'a str,
    pub status: StatusType,
    /// Only used for RecentlySold
    pub sold_in_last: u32,
}

impl SearchQuery<'_> {
    pub fn params(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("location", format!("{}, {}", self.city, self.state)),
            ("home_type", "Houses".to_string()),
            ("bedsMin", "3".to_string()),
            ("sort", "Price_High_Low".to_string()),
            ("status_type", self.status.as_query().to_string()),
            ("page", page.to_string()),
        ];
        if self.status == StatusType::RecentlySold {
            params.push(("soldInLast", self.sold_in_last.to_string()));
        }
        params
    }
}

/// `{props: [...], totalPages: N}`
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub props: Vec<Value>,
    pub total_pages: u32,
}

impl SearchPage {
    /// A body without `props` is what the API returns for a bad key or a lapsed
    /// subscription, so the error says so.
    pub fn from_json(json: &Value, context: &str) -> Result<Self> {
        let props = json
            .get("props")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| {
                let message = json
                    .get("message")
                    .map(value_text)
                    .unwrap_or_else(|| "no message".to_string());
                CollectorError::missing_key(
                    format!(
                        "{}; check X_RAPIDAPI_KEY and the API subscription ({})",
                        context, message
                    ),
                    "props",
                )
            })?;
        let total_pages = json
            .get("totalPages")
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;
        Ok(SearchPage { props, total_pages })
    }
}

/// Paginated listing search.
#[allow(async_fn_in_trait)]
pub trait ListingSearch {
    async fn search_page(&self, query: &SearchQuery<'_>, page: u32) -> Result<SearchPage>;
}

/// Property detail lookup by zpid.
#[allow(async_fn_in_trait)]
pub trait DetailSource {
    async fn fetch_detail(&self, zpid: &str) -> Result<Value>;
}

/// Listing pictures, used when marking houses.
#[allow(async_fn_in_trait)]
pub trait ImageSource {
    async fn image_urls(&self, zpid: &str) -> Result<Vec<String>>;
    async fn download(&self, url: &str, destination: &Path) -> Result<()>;
}

/// RapidAPI-backed Zillow client. Sleeps a fixed delay before every API call.
pub struct ZillowClient {
    api: Client,
    downloads: Client,
    base_url: String,
    delay: Duration,
}

impl ZillowClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let key = settings.api_key()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-rapidapi-key",
            HeaderValue::from_str(key).map_err(|e| {
                CollectorError::Configuration(format!(
                    "X_RAPIDAPI_KEY is not a valid header: {}",
                    e
                ))
            })?,
        );
        headers.insert(
            "x-rapidapi-host",
            HeaderValue::from_str(&settings.api_host).map_err(|e| {
                CollectorError::Configuration(format!("api_host is not a valid header: {}", e))
            })?,
        );

        let api = Client::builder().default_headers(headers).build()?;
        // Picture CDN doesn't get the API key
        let downloads = Client::builder().build()?;

        Ok(ZillowClient {
            api,
            downloads,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            delay: settings.request_delay(),
        })
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        sleep(self.delay).await;

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, params);

        // Send Request
        let response = self.api.get(&url).query(params).send().await?;
        debug!("Response Code: {}", response.status());

        let json = response.json::<Value>().await?;
        Ok(json)
    }
}

impl ListingSearch for ZillowClient {
    async fn search_page(&self, query: &SearchQuery<'_>, page: u32) -> Result<SearchPage> {
        let json = self
            .request("propertyExtendedSearch", &query.params(page))
            .await?;
        SearchPage::from_json(&json, &format!("search for {} page {}", query.city, page))
    }
}

impl DetailSource for ZillowClient {
    async fn fetch_detail(&self, zpid: &str) -> Result<Value> {
        self.request("property", &[("zpid", zpid.to_string())]).await
    }
}

impl ImageSource for ZillowClient {
    async fn image_urls(&self, zpid: &str) -> Result<Vec<String>> {
        let json = self.request("images", &[("zpid", zpid.to_string())]).await?;
        let images = json.get("images").and_then(Value::as_array).ok_or_else(|| {
            CollectorError::missing_key(format!("images for zpid {}", zpid), "images")
        })?;
        Ok(images.iter().map(value_text).collect())
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let bytes = self
            .downloads
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(destination, &bytes).await?;
        debug!("Downloaded {} to {:?}", url, destination);
        Ok(())
    }
}

/// Walks every result page of one search: fetch page -> read `totalPages` ->
/// advance or stop. Returns the raw search results in page order.
pub async fn collect_listings<S, R>(
    search: &S,
    query: &SearchQuery<'_>,
    reporter: &R,
) -> Result<Vec<Value>>
where
    S: ListingSearch,
    R: Reporter,
{
    let mut listings = vec![];
    let mut page = 1;
    let mut total_pages = 1;

    while page <= total_pages {
        let result = search.search_page(query, page).await?;
        total_pages = result.total_pages;

        reporter.report(Event::PageFetched {
            city: query.city.to_string(),
            page,
            total_pages,
            listings: result.props.len(),
        });
        listings.extend(result.props);
        page += 1;
    }

    info!("Number of listings found for {}: {}", query.city, listings.len());
    Ok(listings)
}

/// zpid of every search result, in discovery order
pub fn listing_zpids(listings: &[Value]) -> Result<Vec<String>> {
    listings
        .iter()
        .map(|prop| {
            prop.get("zpid")
                .map(value_text)
                .ok_or_else(|| CollectorError::missing_key("search result", "zpid"))
        })
        .collect()
}
