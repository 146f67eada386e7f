pub mod admin;
pub mod device;
pub mod latest;
pub mod predict;

use serde::Serialize;

/// `{"status": "..."}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn new(status: &'static str) -> Self {
        Self { status }
    }
}
