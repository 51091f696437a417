//! Ownership rule for mutations.
//!
//! Kept apart from [`Collection`](crate::Collection): the request layer asks
//! before it mutates, the collection never knows about principals beyond
//! stamping `createdBy`.

use crate::{error::Result, Error, Record};

/// Whether `principal` may update or delete `record`.
///
/// With auth disabled everything is allowed. With auth enabled a record may
/// only be changed by the principal that created it; records without a
/// creator (seeds, records written before auth was turned on) are open to any
/// authenticated principal.
pub fn can_modify(auth_enabled: bool, principal: Option<&str>, record: &Record) -> bool {
    if !auth_enabled {
        return true;
    }
    match (principal, record.created_by.as_deref()) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(principal), Some(owner)) => principal == owner,
    }
}

/// [`can_modify`] as a `Forbidden` error.
pub fn ensure_can_modify(
    auth_enabled: bool,
    principal: Option<&str>,
    resource: &str,
    record: &Record,
) -> Result<()> {
    if can_modify(auth_enabled, principal, record) {
        Ok(())
    } else {
        Err(Error::Forbidden {
            resource: resource.to_string(),
            id: record.id,
        })
    }
}
