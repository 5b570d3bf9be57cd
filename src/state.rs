use std::time::Instant;

use crate::db::Db;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    db: Db,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        Self {
            started_at: Instant::now(),
            db,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
