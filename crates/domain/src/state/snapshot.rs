use super::InputState;
use crate::INPUT_COUNT;

const BANK_1_8: u16 = 0x00FF;
const BANK_9_16: u16 = 0xFF00;

/// Logical state of the 16 inputs; bit `n` holds input `n + 1`
///
/// Inputs behind an expander that could not be read are unknown and carry
/// no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct InputSnapshot {
    bits: u16,
    known: u16,
}

impl InputSnapshot {
    /// Every input known
    pub const fn from_bits(bits: u16) -> Self {
        Self { bits, known: u16::MAX }
    }

    /// No input known yet
    pub const fn unknown() -> Self {
        Self { bits: 0, known: 0 }
    }

    /// Build from the two raw expander ports (active-low wiring)
    pub fn from_active_low_ports(inputs_1_8: u8, inputs_9_16: u8) -> Self {
        Self::from_banks(Some(inputs_1_8), Some(inputs_9_16))
    }

    /// Like [`Self::from_active_low_ports`]; a `None` port leaves its bank unknown
    pub fn from_banks(inputs_1_8: Option<u8>, inputs_9_16: Option<u8>) -> Self {
        let mut snapshot = Self::unknown();
        if let Some(port) = inputs_1_8 {
            snapshot.bits |= u16::from(!port);
            snapshot.known |= BANK_1_8;
        }
        if let Some(port) = inputs_9_16 {
            snapshot.bits |= u16::from(!port) << 8;
            snapshot.known |= BANK_9_16;
        }
        snapshot
    }

    /// Active inputs among the known ones
    pub fn bits(&self) -> u16 {
        self.bits & self.known
    }

    pub fn is_complete(&self) -> bool {
        self.known == u16::MAX
    }

    /// Input state by 1-based index; `None` outside 1..=16 or when unknown
    pub fn input(&self, index: u8) -> Option<InputState> {
        if !(1..=INPUT_COUNT).contains(&index) {
            return None;
        }
        let mask = 1 << (index - 1);
        if self.known & mask == 0 {
            return None;
        }
        Some(InputState {
            active: self.bits & mask != 0,
        })
    }

    /// Copy with one input set and marked known; out of range is a no-op
    pub fn with_input(mut self, index: u8, state: InputState) -> Self {
        if (1..=INPUT_COUNT).contains(&index) {
            let mask = 1 << (index - 1);
            self.known |= mask;
            if state.active {
                self.bits |= mask;
            } else {
                self.bits &= !mask;
            }
        }
        self
    }

    /// 1-based indices known here that are unknown in `other` or differ from it
    pub fn changed_since(&self, other: &InputSnapshot) -> Vec<u8> {
        (1..=INPUT_COUNT)
            .filter(|&index| match (self.input(index), other.input(index)) {
                (Some(now), Some(before)) => now != before,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }

    /// Iterate `(index, state)` over the known inputs
    pub fn iter(&self) -> impl Iterator<Item = (u8, InputState)> + '_ {
        (1..=INPUT_COUNT).filter_map(move |index| self.input(index).map(|s| (index, s)))
    }
}
