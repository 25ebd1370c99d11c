// tapkit-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::fetch_formula_source;
pub use validation::{compute_sha256, validate_url, verify_checksum};
