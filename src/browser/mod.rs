pub mod capability;
pub mod connection;
pub mod headless;
pub mod http;
pub mod scripts;
pub mod session;

pub use capability::Capability;
pub use http::HttpFetcher;
pub use session::PortalSession;
