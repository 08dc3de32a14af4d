use serde::de::DeserializeOwned;
use std::io::{self, Read};

use portfolio_allocator_core::AllocatorError;

/// Deserialise a request piped on stdin. `None` when stdin is a TTY or the
/// pipe carried only whitespace.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: T = serde_json::from_str(trimmed).map_err(|e| AllocatorError::InvalidInput {
        field: "stdin".into(),
        reason: e.to_string(),
    })?;
    Ok(Some(value))
}
