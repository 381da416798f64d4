use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One write lane per patient. Holding the guard serializes read-check-write sequences for that
/// patient; different patients never wait on each other.
#[derive(Default)]
pub struct PatientLocks {
    lanes: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PatientLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, patient_id: &str) -> OwnedMutexGuard<()> {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop lanes nobody holds or waits on so the map tracks active patients only.
            lanes.retain(|id, lane| id == patient_id || Arc::strong_count(lane) > 1);
            Arc::clone(lanes.entry(patient_id.to_string()).or_default())
        };

        lane.lock_owned().await
    }

    pub fn active_lanes(&self) -> usize {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
