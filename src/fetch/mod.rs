pub mod download;
pub mod months;
pub mod urls;

pub use download::{file_name, Fetch, HttpFetcher, Payload};
pub use months::Month;
pub use urls::{monthly_urls, UrlTemplate, DEFAULT_URL_TEMPLATE};
