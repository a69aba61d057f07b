//! Seam to the byte-level reader of the monitored process

use procmirror_domain::{Address, FetchError};

/// Turns a foreign address into a typed snapshot of the fields stored there.
///
/// Implementations are black boxes to the cache layer. They may fail at any
/// time because the address was freed or reused, and the cache treats every
/// failure as isolated to that one address.
pub trait FieldReader: Send + Sync + 'static {
    /// Snapshot produced for one address.
    type Fields: Send + Sync + 'static;

    /// Read the current fields at `address`.
    ///
    /// # Errors
    /// [`FetchError`] when the address cannot be read or decoded.
    fn read_fields(&self, address: Address) -> Result<Self::Fields, FetchError>;
}
