use csv::StringRecord;
use serde_json::{json, Map, Value};

use crate::error::{CollectorError, Result};
use crate::helpers::{value_text, zipcode_from_address};

/// Column layout of an advanced (detail) snapshot, in write order.
pub const DETAIL_FIELDS: [&str; 22] = [
    "zpid",
    "address",
    "city",
    "zipcode",
    "homeStatus",
    "price",
    "pricePerFt",
    "listingPrice",
    "livingArea",
    "lotSize",
    "zestimate",
    "bedrooms",
    "datePosted",
    "dateSold",
    "stories",
    "rentZestimate",
    "propertyTaxRate",
    "yearBuilt",
    "elementarySchoolRating",
    "middleSchoolRating",
    "highSchoolRating",
    "link",
];

/// Column layout of a basic snapshot, built from search results only.
pub const BASIC_FIELDS: [&str; 11] = [
    "zpid",
    "address",
    "zipcode",
    "price",
    "bedrooms",
    "bathrooms",
    "livingArea",
    "lotAreaValue",
    "listingStatus",
    "daysOnZillow",
    "link",
];

/// Written wherever a number can't be derived (no listing event, no school, no area).
pub const MISSING: i64 = -1;

/// One listing row, field name -> value, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    fields: Map<String, Value>,
}

impl PropertyRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        PropertyRecord { fields }
    }

    pub fn zpid(&self) -> Option<String> {
        self.fields.get("zpid").map(value_text)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn push_field(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    /// Row from a previously written snapshot. Cells stay text so the row is
    /// written back exactly as it was read.
    pub fn from_csv_row(headers: &StringRecord, row: &StringRecord) -> Self {
        let fields = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect();
        PropertyRecord { fields }
    }

    /// Flattens a property detail response.
    ///
    /// Every key the layout reads must be present (null is fine); a missing one
    /// is a `Fetch` error naming the zpid and the key.
    pub fn from_detail(zpid: &str, detail: &Value, site_url: &str) -> Result<Self> {
        let context = format!("property detail for zpid {}", zpid);
        let field = |pointer: &str| -> Result<Value> {
            detail
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| CollectorError::missing_key(&context, pointer))
        };

        let price = field("/price")?;
        let living_area = field("/livingArea")?;
        let price_history = field("/priceHistory")?;
        let schools = field("/schools")?;
        let url_path = field("/url")?;

        let per_unit = price_per_unit_value(price.as_f64(), living_area.as_f64());

        let mut fields = Map::new();
        fields.insert("zpid".into(), json!(zpid));
        fields.insert("address".into(), field("/address/streetAddress")?);
        fields.insert("city".into(), field("/address/city")?);
        fields.insert("zipcode".into(), field("/address/zipcode")?);
        fields.insert("homeStatus".into(), field("/homeStatus")?);
        fields.insert("price".into(), price);
        fields.insert("pricePerFt".into(), per_unit);
        fields.insert("listingPrice".into(), listing_price(&price_history));
        fields.insert("livingArea".into(), living_area);
        fields.insert("lotSize".into(), field("/resoFacts/lotSize")?);
        fields.insert("zestimate".into(), field("/zestimate")?);
        fields.insert("bedrooms".into(), field("/bedrooms")?);
        fields.insert("datePosted".into(), field("/datePosted")?);
        fields.insert("dateSold".into(), field("/dateSold")?);
        fields.insert("stories".into(), field("/resoFacts/stories")?);
        fields.insert("rentZestimate".into(), field("/rentZestimate")?);
        fields.insert("propertyTaxRate".into(), field("/propertyTaxRate")?);
        fields.insert("yearBuilt".into(), field("/yearBuilt")?);
        fields.insert("elementarySchoolRating".into(), school_rating(&schools, "elementary"));
        fields.insert("middleSchoolRating".into(), school_rating(&schools, "middle"));
        fields.insert("highSchoolRating".into(), school_rating(&schools, "high"));
        fields.insert("link".into(), json!(listing_link(site_url, &value_text(&url_path))));

        Ok(PropertyRecord { fields })
    }

    /// Reduced record from one search result (basic mode, no detail call).
    pub fn from_search_result(prop: &Value, site_url: &str) -> Result<Self> {
        let zpid = prop
            .get("zpid")
            .map(value_text)
            .ok_or_else(|| CollectorError::missing_key("search result", "zpid"))?;
        let address = prop.get("address").cloned().ok_or_else(|| {
            CollectorError::missing_key(format!("search result {}", zpid), "address")
        })?;
        let optional = |key: &str| prop.get(key).cloned().unwrap_or(Value::Null);

        let zipcode = zipcode_from_address(&value_text(&address)).unwrap_or_default();
        let link = match prop.get("detailUrl").map(value_text) {
            Some(path) if !path.is_empty() => json!(listing_link(site_url, &path)),
            _ => Value::Null,
        };

        let mut fields = Map::new();
        fields.insert("zpid".into(), json!(zpid));
        fields.insert("address".into(), address);
        fields.insert("zipcode".into(), json!(zipcode));
        for key in &BASIC_FIELDS[3..10] {
            fields.insert(key.to_string(), optional(key));
        }
        fields.insert("link".into(), link);

        Ok(PropertyRecord { fields })
    }

    /// Cells in header order. Fails if the record has a field the header lacks.
    pub(crate) fn cells(&self, header: &[String], row: usize) -> Result<Vec<String>> {
        if let Some(extra) = self.field_names().find(|name| !header.iter().any(|h| h == name)) {
            return Err(CollectorError::NonUniform {
                row,
                field: extra.to_string(),
            });
        }
        Ok(header
            .iter()
            .map(|name| self.fields.get(name).map(value_text).unwrap_or_default())
            .collect())
    }
}

/// Price per square foot to two decimals (ties to even), -1 when either side is
/// unknown or the area is zero.
pub fn price_per_unit(price: Option<f64>, living_area: Option<f64>) -> f64 {
    match (price, living_area) {
        (Some(price), Some(area)) if area != 0.0 => {
            (price / area * 100.0).round_ties_even() / 100.0
        },
        _ => MISSING as f64,
    }
}

fn price_per_unit_value(price: Option<f64>, living_area: Option<f64>) -> Value {
    let per_unit = price_per_unit(price, living_area);
    if per_unit == MISSING as f64 {
        json!(MISSING)
    } else {
        json!(per_unit)
    }
}

/// Price of the first "Listed for sale" event in the history
fn listing_price(history: &Value) -> Value {
    history
        .as_array()
        .into_iter()
        .flatten()
        .find(|entry| entry.get("event").and_then(Value::as_str) == Some("Listed for sale"))
        .and_then(|entry| entry.get("price").cloned())
        .unwrap_or(json!(MISSING))
}

/// Rating of the first school whose level matches, e.g. "Elementary"
fn school_rating(schools: &Value, level: &str) -> Value {
    schools
        .as_array()
        .into_iter()
        .flatten()
        .find(|school| {
            school
                .get("level")
                .and_then(Value::as_str)
                .map(|l| l.to_lowercase().contains(level))
                .unwrap_or(false)
        })
        .and_then(|school| school.get("rating").cloned())
        .filter(|rating| !rating.is_null())
        .unwrap_or(json!(MISSING))
}

/// "{date} {event} {price}" of the newest price-history entry
pub fn latest_event(detail: &Value) -> Value {
    let Some(entry) = detail
        .get("priceHistory")
        .and_then(Value::as_array)
        .and_then(|history| history.first())
    else {
        return json!("");
    };
    let part = |key: &str| entry.get(key).map(value_text).unwrap_or_default();
    json!(format!("{} {} {}", part("date"), part("event"), part("price")))
}

pub(crate) fn listing_link(site_url: &str, path: &str) -> String {
    if path.starts_with("http") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        site_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
