use std::sync::Arc;

use domain::{DomainError, EntityKind, EntityRegistry, Hal, InputSnapshot, StateTable, Transport};
use tracing::{debug, error};

use crate::messaging::publish_state;

/// 1-based inputs whose state differs between two snapshots
///
/// Without a previous snapshot every input is reported, so the first scan
/// establishes the retained state of all sixteen.
pub fn diff(previous: Option<InputSnapshot>, current: InputSnapshot) -> Vec<u8> {
    match previous {
        Some(previous) => current.changed_since(&previous),
        None => current.iter().map(|(index, _)| index).collect(),
    }
}

/// Outcome of one scan pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Inputs whose new state was published and recorded
    pub changed: Vec<u8>,
    /// Inputs whose publish failed; reported again by the next scan
    pub failed: Vec<u8>,
}

/// Polls the input expanders and publishes edges
pub struct InputScanner {
    registry: Arc<EntityRegistry>,
}

impl InputScanner {
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self { registry }
    }

    /// One scan pass
    ///
    /// A failed read keeps the previous snapshot and publishes nothing. An
    /// input is only recorded once its state went out, so a failed publish
    /// is retried on the next pass. Inputs behind an unreadable expander keep
    /// their previous state.
    pub async fn scan(
        &self,
        hal: &mut dyn Hal,
        transport: &dyn Transport,
        table: &mut StateTable,
    ) -> Result<ScanReport, DomainError> {
        let current = hal.read_inputs().await.map_err(|e| {
            error!(error = %e, "Input scan failed");
            e
        })?;

        let previous = table.inputs();
        let mut recorded = previous.unwrap_or_default();
        let mut report = ScanReport::default();

        for index in diff(previous, current) {
            let Some(state) = current.input(index) else {
                continue;
            };
            let Ok(entity) = self.registry.resolve(EntityKind::Input, index) else {
                continue;
            };
            debug!(entity = %entity, active = state.active, "Input changed");
            match publish_state(transport, &entity.state_topic, state.to_payload().as_bytes()).await {
                Ok(()) => {
                    recorded = recorded.with_input(index, state);
                    report.changed.push(index);
                }
                Err(_) => report.failed.push(index),
            }
        }

        table.set_inputs(recorded);
        Ok(report)
    }
}
