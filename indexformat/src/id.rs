use crate::Result;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::v1::{Context, Timestamp};
use uuid::Uuid;

/// Hands out unique ids for rows, columns and indexes.
///
/// Ids are version 1 uuids: a timestamp, a clock sequence shared by every
/// id from this generator, and the node id.
pub struct IdGenerator {
    node_id: [u8; 6],
    context: Context,
}

impl IdGenerator {
    pub fn new(node_id: [u8; 6]) -> Self {
        IdGenerator {
            node_id,
            context: Context::new(0),
        }
    }

    fn next(&self) -> Result<Uuid> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let timestamp = Timestamp::from_unix(
            &self.context,
            since_epoch.as_secs(),
            since_epoch.subsec_nanos(),
        );
        Ok(Uuid::new_v1(timestamp, &self.node_id)?)
    }

    /// A fresh id as raw bytes, for row identifiers.
    pub fn generate(&self) -> Result<Vec<u8>> {
        Ok(self.next()?.as_bytes().to_vec())
    }

    /// A fresh id in its hyphenated text form, for schema ids.
    pub fn generate_string(&self) -> Result<String> {
        Ok(self.next()?.to_hyphenated().to_string())
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        IdGenerator::new(*b"babydb")
    }
}
