use std::time::Duration;

use domain::DomainError;

use super::bus::RetryingBus;

pub const MODE1: u8 = 0x00;
pub const PRESCALE: u8 = 0xFE;
pub const LED0_ON_L: u8 = 0x06;

const MODE1_SLEEP: u8 = 0x10;
/// RESTART | AI | ALLCALL
const MODE1_RESTART_AI: u8 = 0xA1;
const OSCILLATOR_HZ: u32 = 25_000_000;
const CHANNELS: u8 = 16;
const MAX_COUNT: u32 = 4095;

/// Prescaler for a PWM frequency: `round(25 MHz / 4096 / freq) - 1`
pub fn prescale_for(frequency: u16) -> u8 {
    let frequency = u32::from(frequency.max(1));
    let period = 4096 * frequency;
    let rounded = (OSCILLATOR_HZ + period / 2) / period;
    rounded.saturating_sub(1).clamp(3, 255) as u8
}

/// Duty count for a brightness percentage (0..=100)
pub fn duty_for(percent: u8) -> u16 {
    (u32::from(percent.min(100)) * MAX_COUNT / 100) as u16
}

/// 16-channel PWM controller driving the dimmers
#[derive(Debug)]
pub struct Pca9685 {
    address: u8,
    frequency: u16,
    available: bool,
}

impl Pca9685 {
    pub fn new(address: u8, frequency: u16) -> Self {
        Self {
            address,
            frequency,
            available: false,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Reset, program the prescaler and restart with auto-increment
    pub async fn init(&mut self, bus: &mut RetryingBus) -> Result<(), DomainError> {
        self.available = false;
        bus.write(self.address, &[MODE1, 0x00]).await?;

        let prescale = prescale_for(self.frequency);
        let old_mode = bus.write_read(self.address, &[MODE1], 1).await?;
        let old_mode = old_mode.first().copied().unwrap_or(0);

        // The prescaler is only writable while asleep
        bus.write(self.address, &[MODE1, (old_mode & 0x7F) | MODE1_SLEEP])
            .await?;
        bus.write(self.address, &[PRESCALE, prescale]).await?;
        bus.write(self.address, &[MODE1, old_mode]).await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        bus.write(self.address, &[MODE1, old_mode | MODE1_RESTART_AI])
            .await?;

        tracing::debug!(
            address = self.address,
            frequency = self.frequency,
            prescale,
            "PCA9685 initialised"
        );
        self.available = true;
        Ok(())
    }

    /// Program one channel: LEDn_ON = 0, LEDn_OFF = duty, one 5-byte write
    pub async fn set_level(
        &self,
        bus: &mut RetryingBus,
        channel: u8,
        percent: u8,
    ) -> Result<(), DomainError> {
        self.ensure_available()?;
        if channel >= CHANNELS {
            return Err(DomainError::Hardware(format!(
                "PCA9685 channel {channel} out of range"
            )));
        }
        let off = duty_for(percent);
        let register = LED0_ON_L + 4 * channel;
        let [off_low, off_high] = off.to_le_bytes();
        bus.write(self.address, &[register, 0x00, 0x00, off_low, off_high])
            .await
    }

    /// Zero every channel, attempting all of them before reporting
    pub async fn all_off(&self, bus: &mut RetryingBus) -> Result<(), DomainError> {
        self.ensure_available()?;
        let mut first_error = None;
        for channel in 0..CHANNELS {
            if let Err(e) = self.set_level(bus, channel, 0).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn ensure_available(&self) -> Result<(), DomainError> {
        if self.available {
            Ok(())
        } else {
            Err(DomainError::Hardware(format!(
                "PCA9685 at 0x{:02X} not available",
                self.address
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescale() {
        assert_eq!(prescale_for(500), 11);
        assert_eq!(prescale_for(24), 253);
        assert_eq!(prescale_for(1526), 3);
        assert_eq!(prescale_for(200), 30);
    }

    #[test]
    fn test_duty() {
        assert_eq!(duty_for(0), 0);
        assert_eq!(duty_for(50), 2047);
        assert_eq!(duty_for(100), 4095);
        assert_eq!(duty_for(250), 4095);
    }
}
