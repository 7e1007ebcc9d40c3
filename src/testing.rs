// In-memory stand-ins for the RapidAPI and storage collaborators
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde_json::{json, Value};

use crate::error::{CollectorError, Result};
use crate::storage::ObjectStore;
use crate::zillow::{DetailSource, ImageSource, ListingSearch, SearchPage, SearchQuery};

/// Detail response with every key the detail layout reads.
pub(crate) fn detail_json(zpid: &str, zipcode: &str, price: u64, living_area: u64) -> Value {
    json!({
        "zpid": zpid.parse::<u64>().unwrap_or(0),
        "address": {
            "streetAddress": format!("{} Test Ave", zpid),
            "city": "San Francisco",
            "zipcode": zipcode,
        },
        "bedrooms": 3,
        "datePosted": "2024-01-01",
        "dateSold": null,
        "livingArea": living_area,
        "resoFacts": { "lotSize": "5,000 sqft", "stories": 2 },
        "rentZestimate": 4200,
        "propertyTaxRate": 1.18,
        "yearBuilt": 1962,
        "zestimate": price + 5000,
        "homeStatus": "FOR_SALE",
        "price": price,
        "priceHistory": [
            { "date": "2024-01-20", "event": "Price change", "price": 300000 },
            { "date": "2024-01-01", "event": "Listed for sale", "price": 310000 }
        ],
        "schools": [
            { "name": "Test Elementary", "level": "Elementary", "rating": 9 },
            { "name": "Test Middle", "level": "Middle", "rating": 7 }
        ],
        "url": format!("/homedetails/{}_zpid/", zpid),
    })
}

/// Fake Zillow API. Search pages and detail bodies are canned, calls are recorded.
#[derive(Default)]
pub(crate) struct FakeZillow {
    pages: Vec<Vec<Value>>,
    search_body: Option<Value>,
    details: HashMap<String, Value>,
    images: HashMap<String, Vec<String>>,
    searches: Mutex<Vec<(String, u32)>>,
    detail_calls: Mutex<Vec<String>>,
    downloads: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeZillow {
    /// One inner vec per result page, each entry a zpid
    pub(crate) fn with_pages(pages: Vec<Vec<&str>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .map(|zpid| {
                        json!({
                            "zpid": zpid,
                            "address": format!("{} Test Ave, San Francisco, CA 94103", zpid),
                            "price": 500000,
                            "bedrooms": 3,
                            "detailUrl": format!("/homedetails/{}_zpid/", zpid),
                        })
                    })
                    .collect()
            })
            .collect();
        FakeZillow {
            pages,
            ..Default::default()
        }
    }

    /// Every search page answers with this raw body instead of the canned pages
    pub(crate) fn with_search_body(mut self, body: Value) -> Self {
        self.search_body = Some(body);
        self
    }

    pub(crate) fn with_detail(mut self, zpid: &str, detail: Value) -> Self {
        self.details.insert(zpid.to_string(), detail);
        self
    }

    pub(crate) fn with_images(mut self, zpid: &str, urls: &[&str]) -> Self {
        self.images
            .insert(zpid.to_string(), urls.iter().map(|u| u.to_string()).collect());
        self
    }

    pub(crate) fn searched_pages(&self) -> Vec<u32> {
        self.searches.lock().unwrap().iter().map(|(_, page)| *page).collect()
    }

    pub(crate) fn searched_cities(&self) -> Vec<String> {
        self.searches.lock().unwrap().iter().map(|(city, _)| city.clone()).collect()
    }

    pub(crate) fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }

    pub(crate) fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }
}

impl ListingSearch for FakeZillow {
    async fn search_page(&self, query: &SearchQuery<'_>, page: u32) -> Result<SearchPage> {
        self.searches
            .lock()
            .unwrap()
            .push((query.city.to_string(), page));
        if let Some(body) = &self.search_body {
            return SearchPage::from_json(body, &format!("search for {}", query.city));
        }
        let props = self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();
        Ok(SearchPage {
            props,
            total_pages: self.pages.len() as u32,
        })
    }
}

impl DetailSource for FakeZillow {
    async fn fetch_detail(&self, zpid: &str) -> Result<Value> {
        self.detail_calls.lock().unwrap().push(zpid.to_string());
        Ok(self
            .details
            .get(zpid)
            .cloned()
            .unwrap_or_else(|| detail_json(zpid, "94103", 500000, 2000)))
    }
}

impl ImageSource for FakeZillow {
    async fn image_urls(&self, zpid: &str) -> Result<Vec<String>> {
        Ok(self.images.get(zpid).cloned().unwrap_or_default())
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        self.downloads
            .lock()
            .unwrap()
            .push((url.to_string(), destination.to_path_buf()));
        std::fs::write(destination, url.as_bytes())?;
        Ok(())
    }
}

/// Object store that keeps uploads in memory, or fails every call.
#[derive(Default)]
pub(crate) struct FakeStore {
    fail: bool,
    uploads: Mutex<Vec<(PathBuf, String)>>,
}

impl FakeStore {
    pub(crate) fn failing() -> Self {
        FakeStore {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

impl ObjectStore for FakeStore {
    async fn upload(&self, local: &Path, destination: &str) -> Result<String> {
        if self.fail {
            return Err(CollectorError::Upload("bucket unavailable".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((local.to_path_buf(), destination.to_string()));
        Ok(format!("gs://test-bucket/{}", destination))
    }
}
