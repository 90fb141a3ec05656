//! Input checks shared by the lease manager and the catalog

use crate::PoolError;
use profilepool_domain::EntryId;

/// Reject a missing or blank required parameter
pub fn require_param<'a>(field: &str, value: &'a str) -> Result<&'a str, PoolError> {
    if value.trim().is_empty() {
        return Err(PoolError::Validation(format!(
            "Missing required path parameter: {}",
            field
        )));
    }
    Ok(value)
}

/// Parse an entry id, rejecting blank or malformed input
pub fn parse_entry_id(value: &str) -> Result<EntryId, PoolError> {
    require_param("id", value)?
        .parse()
        .map_err(|e: profilepool_domain::ParseEntryIdError| PoolError::Validation(e.to_string()))
}
