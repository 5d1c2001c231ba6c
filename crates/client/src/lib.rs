pub mod download;
pub mod driver;
pub mod errors;
pub mod http;

pub use download::{document_filename, download_url};
pub use driver::{CatalogUpdate, DriverUpdate, Services, SessionDriver, SessionEvent};
pub use errors::ClientError;
pub use http::HttpBackend;
