//! Test fixtures

use std::sync::Arc;

use procmirror_domain::Address;

use super::reader::ScriptedReader;

/// Minimal snapshot of a mirrored game-world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntitySnapshot {
    pub id: u64,
    pub health: i32,
}

impl EntitySnapshot {
    #[must_use]
    pub const fn new(id: u64, health: i32) -> Self {
        Self { id, health }
    }
}

/// Reader that maps each raw address to an entity whose id is the address.
///
/// # Examples
///
/// ```
/// use procmirror_common::cache::FieldReader;
/// use procmirror_common::testing::fixtures::entity_reader;
/// use procmirror_domain::Address;
///
/// let reader = entity_reader([0x40], 75);
/// let snapshot = reader.read_fields(Address::new(0x40)).unwrap();
/// assert_eq!((snapshot.id, snapshot.health), (0x40, 75));
/// ```
pub fn entity_reader(
    addresses: impl IntoIterator<Item = u64>,
    health: i32,
) -> Arc<ScriptedReader<EntitySnapshot>> {
    Arc::new(ScriptedReader::with_values(
        addresses.into_iter().map(|raw| (Address::new(raw), EntitySnapshot::new(raw, health))),
    ))
}
