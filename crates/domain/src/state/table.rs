use super::{Availability, DimmerState, InputSnapshot, InputState, RelayState};
use crate::entity::EntityKind;
use crate::error::{DomainError, Result};
use crate::{DIMMER_COUNT, RELAY_COUNT};

/// Single owned aggregate of every entity state
///
/// Owned by the sync loop and lent to components per call. Dimmers and
/// relays start off; inputs are unknown until the first successful scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateTable {
    dimmers: [DimmerState; DIMMER_COUNT as usize],
    relays: [RelayState; RELAY_COUNT as usize],
    inputs: Option<InputSnapshot>,
    availability: Availability,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimmer(&self, index: u8) -> Result<DimmerState> {
        self.dimmers
            .get(usize::from(index))
            .copied()
            .ok_or(DomainError::EntityNotFound {
                kind: EntityKind::Dimmer,
                index,
            })
    }

    pub fn set_dimmer(&mut self, index: u8, state: DimmerState) -> Result<()> {
        let slot = self
            .dimmers
            .get_mut(usize::from(index))
            .ok_or(DomainError::EntityNotFound {
                kind: EntityKind::Dimmer,
                index,
            })?;
        *slot = state;
        Ok(())
    }

    pub fn relay(&self, index: u8) -> Result<RelayState> {
        Self::relay_slot(index)
            .and_then(|slot| self.relays.get(slot).copied())
            .ok_or(DomainError::EntityNotFound {
                kind: EntityKind::Relay,
                index,
            })
    }

    pub fn set_relay(&mut self, index: u8, state: RelayState) -> Result<()> {
        let slot = Self::relay_slot(index)
            .and_then(|slot| self.relays.get_mut(slot))
            .ok_or(DomainError::EntityNotFound {
                kind: EntityKind::Relay,
                index,
            })?;
        *slot = state;
        Ok(())
    }

    /// Relays are numbered from 1
    fn relay_slot(index: u8) -> Option<usize> {
        usize::from(index).checked_sub(1)
    }

    /// Last successfully scanned input snapshot
    pub fn inputs(&self) -> Option<InputSnapshot> {
        self.inputs
    }

    pub fn input(&self, index: u8) -> Option<InputState> {
        self.inputs.and_then(|snapshot| snapshot.input(index))
    }

    pub fn set_inputs(&mut self, snapshot: InputSnapshot) {
        self.inputs = Some(snapshot);
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn set_availability(&mut self, availability: Availability) {
        self.availability = availability;
    }

    pub fn dimmers(&self) -> impl Iterator<Item = (u8, DimmerState)> + '_ {
        (0u8..).zip(self.dimmers.iter().copied())
    }

    pub fn relays(&self) -> impl Iterator<Item = (u8, RelayState)> + '_ {
        (1u8..).zip(self.relays.iter().copied())
    }
}
