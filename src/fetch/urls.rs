use std::fmt;

use super::months::Month;
use crate::error::{ConfigError, MonthError};

/// NYC TLC yellow-taxi monthly trip files.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_{month}.parquet";

const PLACEHOLDER: &str = "{month}";

/// A locator template with a `{month}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        if !template.contains(PLACEHOLDER) {
            return Err(ConfigError::Template(template));
        }
        Ok(Self(template))
    }

    pub fn render(&self, month: Month) -> String {
        self.0.replace(PLACEHOLDER, &month.to_string())
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self(DEFAULT_URL_TEMPLATE.to_string())
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One locator per calendar month, `count` months starting at `start`
/// (a `YYYY-MM` label), in ascending order.
pub fn monthly_urls(
    template: &UrlTemplate,
    start: &str,
    count: usize,
) -> Result<Vec<String>, MonthError> {
    let start = Month::parse(start)?;
    Ok(start
        .iter()
        .take(count)
        .map(|month| template.render(month))
        .collect())
}
