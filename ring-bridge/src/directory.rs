//! Snapshot of the remote topology the bridge operates on
//!
//! Captured once per session generation, after session-ready. Handles are
//! stable across token rotation, so the snapshot outlives rotations; a
//! forced re-provisioning rebuilds it.

use std::collections::HashMap;
use std::sync::Arc;

use ring_client::{CameraHandle, CameraId, LocationHandle, LocationId, RingClient};

/// Location and camera handles indexed by id
pub struct SourceDirectory {
    locations: HashMap<LocationId, Arc<dyn LocationHandle>>,
    cameras: HashMap<CameraId, Arc<dyn CameraHandle>>,
    location_order: Vec<LocationId>,
}

impl SourceDirectory {
    /// Fetch the current topology from the client
    pub async fn snapshot(client: &dyn RingClient) -> ring_client::Result<Self> {
        let locations = client.locations().await?;
        let cameras = client.cameras().await?;

        let location_order: Vec<LocationId> =
            locations.iter().map(|l| l.location_id().clone()).collect();

        Ok(Self {
            locations: locations
                .into_iter()
                .map(|l| (l.location_id().clone(), l))
                .collect(),
            cameras: cameras
                .into_iter()
                .map(|c| (c.camera_id().clone(), c))
                .collect(),
            location_order,
        })
    }

    pub fn location(&self, id: &LocationId) -> Option<Arc<dyn LocationHandle>> {
        self.locations.get(id).cloned()
    }

    pub fn camera(&self, id: &CameraId) -> Option<Arc<dyn CameraHandle>> {
        self.cameras.get(id).cloned()
    }

    /// All locations, in the order the remote listed them
    pub fn locations(&self) -> Vec<Arc<dyn LocationHandle>> {
        self.location_order
            .iter()
            .filter_map(|id| self.locations.get(id).cloned())
            .collect()
    }

    pub fn cameras(&self) -> Vec<Arc<dyn CameraHandle>> {
        self.cameras.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.cameras.is_empty()
    }

    /// `id (name)` pairs for every known location, for the
    /// "location not found" log line
    pub fn location_choices(&self) -> String {
        self.locations()
            .iter()
            .map(|l| format!("{} ({})", l.location_id(), l.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
