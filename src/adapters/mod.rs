// Adapters layer: concrete implementations of the domain ports (http, page state).

pub mod http;
pub mod page_state;

pub use http::HttpTransport;
pub use page_state::{FilePageState, StaticPageState};
