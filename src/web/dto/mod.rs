//! Data Transfer Objects for Web API.

pub mod json;
pub mod request;
pub mod response;

pub use json::{parse_json, JsonBody, MAX_BODY_BYTES};
pub use request::*;
pub use response::*;
