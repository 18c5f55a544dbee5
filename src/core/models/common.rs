use std::fmt::{self, Display};

/// Correlation handle supplied by the caller of a service. Only ever written
/// into log records.
#[derive(Debug, Clone)]
pub struct Ctx {
    request_id: String,
}

impl Ctx {
    pub fn new(request_id: impl Display) -> Self {
        Self {
            request_id: request_id.to_string(),
        }
    }
}

impl Display for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.request_id)
    }
}
