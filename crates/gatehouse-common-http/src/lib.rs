//! HTTP client utilities for Gatehouse.

pub mod client;
pub mod request;
pub mod response;

pub use client::{HttpClient, HttpConfig, HttpError};
pub use request::{headers, RequestBuilder};
pub use response::{parse_json, ResponseError};
