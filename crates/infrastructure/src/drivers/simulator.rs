use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use domain::DomainError;
use domain::hal::{I2cBus, RelayOutput};

use crate::config::AddressConfig;

const PCA9685_REGISTERS: usize = 256;
const LED0_ON_L: usize = 0x06;

#[derive(Debug)]
struct Pca9685Model {
    registers: [u8; PCA9685_REGISTERS],
    pointer: u8,
}

impl Default for Pca9685Model {
    fn default() -> Self {
        let mut registers = [0u8; PCA9685_REGISTERS];
        // MODE1 powers up asleep with ALLCALL
        registers[0x00] = 0x11;
        // PRE_SCALE power-on value (200 Hz)
        registers[0xFE] = 0x1E;
        Self {
            registers,
            pointer: 0,
        }
    }
}

#[derive(Debug, Default)]
struct SimulatorState {
    pwm: HashMap<u8, Pca9685Model>,
    /// External pin levels of each PCF8574, high when released
    expanders: HashMap<u8, u8>,
    input_addresses: [u8; 2],
    fail_next: u32,
    transactions: u64,
}

impl SimulatorState {
    fn begin(&mut self, address: u8) -> Result<(), DomainError> {
        self.transactions += 1;
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(DomainError::Bus(format!(
                "simulated fault at 0x{address:02X}"
            )));
        }
        if self.pwm.contains_key(&address) || self.expanders.contains_key(&address) {
            Ok(())
        } else {
            Err(DomainError::Bus(format!("no ack from 0x{address:02X}")))
        }
    }

    fn read_from(&self, address: u8, len: usize) -> Vec<u8> {
        if let Some(port) = self.expanders.get(&address) {
            return vec![*port; len];
        }
        match self.pwm.get(&address) {
            Some(device) => (0..len)
                .map(|offset| device.registers[device.pointer.wrapping_add(offset as u8) as usize])
                .collect(),
            None => vec![0; len],
        }
    }
}

fn lock(state: &Mutex<SimulatorState>) -> MutexGuard<'_, SimulatorState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory I2C bus populated with the board's PCA9685 and two PCF8574s
///
/// Register writes auto-increment like the real PCA9685. Tests keep a
/// [`SimulatorHandle`] to drive inputs, inspect PWM registers and inject
/// faults while the bus itself is owned by the hardware manager.
pub struct SimulatedBus {
    state: Arc<Mutex<SimulatorState>>,
}

impl SimulatedBus {
    pub fn new(addresses: &AddressConfig) -> Self {
        let mut state = SimulatorState {
            input_addresses: [addresses.inputs_1_8, addresses.inputs_9_16],
            ..Default::default()
        };
        state.pwm.insert(addresses.pca9685, Pca9685Model::default());
        state.expanders.insert(addresses.inputs_1_8, 0xFF);
        state.expanders.insert(addresses.inputs_9_16, 0xFF);

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn handle(&self) -> SimulatorHandle {
        SimulatorHandle {
            state: self.state.clone(),
        }
    }
}

#[async_trait]
impl I2cBus for SimulatedBus {
    async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), DomainError> {
        let mut state = lock(&self.state);
        state.begin(address)?;

        // Expander pins are only ever released high; writes carry no state
        if let Some(device) = state.pwm.get_mut(&address) {
            let Some((&register, values)) = data.split_first() else {
                return Ok(());
            };
            device.pointer = register;
            for (offset, value) in values.iter().enumerate() {
                let slot = register.wrapping_add(offset as u8) as usize;
                device.registers[slot] = *value;
            }
        }
        Ok(())
    }

    async fn read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, DomainError> {
        let mut state = lock(&self.state);
        state.begin(address)?;
        Ok(state.read_from(address, len))
    }

    async fn write_read(
        &mut self,
        address: u8,
        data: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, DomainError> {
        let mut state = lock(&self.state);
        state.begin(address)?;
        if let (Some(device), Some(&register)) = (state.pwm.get_mut(&address), data.first()) {
            device.pointer = register;
        }
        Ok(state.read_from(address, len))
    }

    async fn scan(&mut self) -> Result<Vec<u8>, DomainError> {
        let state = lock(&self.state);
        let mut found: Vec<u8> = state
            .pwm
            .keys()
            .chain(state.expanders.keys())
            .copied()
            .collect();
        found.sort_unstable();
        Ok(found)
    }

    fn driver_type(&self) -> &str {
        "simulator"
    }
}

/// Shared view of a [`SimulatedBus`]
#[derive(Clone)]
pub struct SimulatorHandle {
    state: Arc<Mutex<SimulatorState>>,
}

impl SimulatorHandle {
    /// Drive a single board input (1..=16); out-of-range indices are ignored
    pub fn set_input(&self, index: u8, active: bool) {
        if !(1..=16).contains(&index) {
            return;
        }
        let mut state = lock(&self.state);
        let address = state.input_addresses[usize::from((index - 1) / 8)];
        let mask = 1u8 << ((index - 1) % 8);
        if let Some(port) = state.expanders.get_mut(&address) {
            if active {
                *port &= !mask;
            } else {
                *port |= mask;
            }
        }
    }

    /// Remove a device so it stops acknowledging
    pub fn detach(&self, address: u8) {
        let mut state = lock(&self.state);
        state.pwm.remove(&address);
        state.expanders.remove(&address);
    }

    /// Fail the next `count` transactions with a bus error
    pub fn fail_next(&self, count: u32) {
        lock(&self.state).fail_next = count;
    }

    pub fn transactions(&self) -> u64 {
        lock(&self.state).transactions
    }

    pub fn register(&self, address: u8, register: u8) -> Option<u8> {
        lock(&self.state)
            .pwm
            .get(&address)
            .map(|device| device.registers[register as usize])
    }

    /// LEDn_OFF count of a PWM channel, i.e. the programmed duty in 1/4096
    pub fn duty(&self, address: u8, channel: u8) -> Option<u16> {
        let state = lock(&self.state);
        let device = state.pwm.get(&address)?;
        let base = LED0_ON_L + 4 * channel as usize;
        let low = device.registers[base + 2] as u16;
        let high = device.registers[base + 3] as u16;
        Some((high << 8) | low)
    }
}

#[derive(Debug, Default)]
struct RelayPins {
    levels: HashMap<u8, bool>,
    fail_next: u32,
}

/// In-memory output pins for the relay coils
#[derive(Default)]
pub struct SimulatedRelays {
    pins: Arc<Mutex<RelayPins>>,
}

impl SimulatedRelays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            pins: self.pins.clone(),
        }
    }
}

#[async_trait]
impl RelayOutput for SimulatedRelays {
    async fn set_level(&mut self, pin: u8, high: bool) -> Result<(), DomainError> {
        let mut pins = self
            .pins
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pins.fail_next > 0 {
            pins.fail_next -= 1;
            return Err(DomainError::Bus(format!("simulated fault on GPIO {pin}")));
        }
        pins.levels.insert(pin, high);
        Ok(())
    }
}

#[derive(Clone)]
pub struct RelayHandle {
    pins: Arc<Mutex<RelayPins>>,
}

impl RelayHandle {
    /// Last level driven on a pin; `None` if never driven
    pub fn level(&self, pin: u8) -> Option<bool> {
        self.pins
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .levels
            .get(&pin)
            .copied()
    }

    pub fn fail_next(&self, count: u32) {
        self.pins
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .fail_next = count;
    }
}
