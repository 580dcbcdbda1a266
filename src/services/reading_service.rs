use tracing::{debug, instrument};

use crate::db::{DbError, NewReading, Reading, SharedStore};

#[derive(Clone)]
pub struct ReadingService {
    store: SharedStore,
}

impl ReadingService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Persist a validated reading with a server-assigned timestamp
    #[instrument(skip(self))]
    pub async fn record_reading(&self, reading: NewReading) -> Result<Reading, DbError> {
        debug!("Recording new reading");
        self.store.insert(&reading).await
    }

    /// Get the most recent reading, if any
    pub async fn get_latest_reading(&self) -> Result<Option<Reading>, DbError> {
        self.store.find_latest().await
    }

    pub async fn total_records(&self) -> Result<i64, DbError> {
        self.store.count().await
    }
}
