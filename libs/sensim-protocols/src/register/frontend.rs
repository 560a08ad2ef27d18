//! Register front-end: registry values into the register port, client writes
//! into the priority array

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use sensim_model::{CommandError, Registry, DEFAULT_WRITE_PRIORITY};
use sensim_routing::{RegisterEntry, RegisterMap, RegisterTable};

use super::{decode_f32, encode_f32, RegisterPort, RegisterWriteHandler};
use crate::error::{FrontendError, ModbusException};
use crate::frontend::Frontend;

/// Bit tables read active at or above this value
pub const BIT_THRESHOLD: f64 = 0.5;

pub struct RegisterFrontend {
    registry: Arc<Registry>,
    map: Arc<RegisterMap>,
    port: Arc<dyn RegisterPort>,
    write_priority: u8,
}

impl RegisterFrontend {
    pub fn new(registry: Arc<Registry>, map: Arc<RegisterMap>, port: Arc<dyn RegisterPort>) -> Self {
        Self {
            registry,
            map,
            port,
            write_priority: DEFAULT_WRITE_PRIORITY,
        }
    }

    /// Priority level used for client writes
    pub fn with_write_priority(mut self, level: u8) -> Self {
        self.write_priority = level;
        self
    }

    pub fn write_priority(&self) -> u8 {
        self.write_priority
    }

    /// Mapped, writable entry whose slot starts at `offset`
    fn writable_entry(&self, table: RegisterTable, offset: u32) -> Result<&RegisterEntry, ModbusException> {
        let offset = u16::try_from(offset).map_err(|_| ModbusException::IllegalDataAddress)?;
        let address = table
            .address_at(offset)
            .ok_or(ModbusException::IllegalDataValue)?;
        let entry = self
            .map
            .get(table, address)
            .ok_or(ModbusException::IllegalDataAddress)?;
        if !entry.writable {
            debug!("Write to read-only {}:{} rejected", table, address);
            return Err(ModbusException::IllegalDataAddress);
        }
        Ok(entry)
    }

    /// Check every target point before touching any of them
    fn apply(&self, commands: Vec<(&str, f64)>) -> Result<(), ModbusException> {
        for (point, _) in &commands {
            let writable = self
                .registry
                .get(point)
                .map(|handle| handle.lock().is_writable())
                .ok_or(ModbusException::IllegalDataAddress)?;
            if !writable {
                return Err(ModbusException::IllegalDataAddress);
            }
        }

        for (point, value) in commands {
            self.registry
                .command(point, self.write_priority, Some(value))
                .map_err(|e| {
                    warn!("Register write to '{}' failed: {}", point, e);
                    match e {
                        CommandError::OutOfRange(_) => ModbusException::ServerDeviceFailure,
                        _ => ModbusException::IllegalDataAddress,
                    }
                })?;
            debug!("Register write: {} = {} @{}", point, value, self.write_priority);
        }
        Ok(())
    }
}

#[async_trait]
impl Frontend for RegisterFrontend {
    fn name(&self) -> &'static str {
        "register"
    }

    async fn tick(&self) -> Result<usize, FrontendError> {
        let snapshot = self.registry.snapshot();
        let mut written = 0;

        for (table, address, entry) in self.map.iter() {
            let (Some(value), Some(offset)) = (snapshot.get(&entry.point), table.wire_offset(address))
            else {
                continue;
            };
            if table.is_bit() {
                self.port.write_bits(table, offset, &[*value >= BIT_THRESHOLD])?;
            } else {
                let raw = *value / entry.scale;
                self.port.write_words(table, offset, &encode_f32(raw as f32))?;
            }
            written += 1;
        }
        Ok(written)
    }
}

impl RegisterWriteHandler for RegisterFrontend {
    fn handle_register_write(
        &self,
        table: RegisterTable,
        offset: u16,
        words: &[u16],
    ) -> Result<(), ModbusException> {
        if !table.is_writable() || table.is_bit() {
            return Err(ModbusException::IllegalDataAddress);
        }
        // Floats span two words; partial slots are never applied
        if words.is_empty() || words.len() % 2 != 0 {
            return Err(ModbusException::IllegalDataValue);
        }

        let mut commands = Vec::with_capacity(words.len() / 2);
        for (i, pair) in words.chunks_exact(2).enumerate() {
            let entry = self.writable_entry(table, u32::from(offset) + 2 * i as u32)?;
            let value = f64::from(decode_f32([pair[0], pair[1]])) * entry.scale;
            if !value.is_finite() {
                return Err(ModbusException::IllegalDataValue);
            }
            commands.push((entry.point.as_str(), value));
        }
        self.apply(commands)
    }

    fn handle_coil_write(&self, offset: u16, bits: &[bool]) -> Result<(), ModbusException> {
        let mut commands = Vec::with_capacity(bits.len());
        for (i, bit) in bits.iter().enumerate() {
            let entry = self.writable_entry(RegisterTable::Coils, u32::from(offset) + i as u32)?;
            commands.push((entry.point.as_str(), if *bit { 1.0 } else { 0.0 }));
        }
        self.apply(commands)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::register::RegisterBank;
    use sensim_model::PointDefinition;

    const T0: i64 = 1_700_000_000_000;

    struct Fixture {
        registry: Arc<Registry>,
        bank: Arc<RegisterBank>,
        frontend: RegisterFrontend,
    }

    fn fixture() -> Fixture {
        let defs = vec![
            PointDefinition::analog("temp", "C", 20.0, 0.0, 100.0).with_noise(0.0),
            PointDefinition::analog("setpoint", "C", 21.0, 10.0, 30.0)
                .with_writable(true)
                .with_noise(0.0),
            PointDefinition::analog("fan", "bool", 0.0, 0.0, 1.0)
                .with_writable(true)
                .with_noise(0.0),
            PointDefinition::analog("locked", "C", 5.0, 0.0, 10.0).with_noise(0.0),
        ];
        let registry = Arc::new(Registry::from_definitions(&defs, T0, 1));

        let mut map = RegisterMap::default();
        map.insert(
            RegisterTable::InputRegisters,
            30_001,
            RegisterEntry::new("temp").with_scale(0.1),
        );
        map.insert(
            RegisterTable::HoldingRegisters,
            40_001,
            RegisterEntry::new("setpoint").with_scale(0.5).writable(),
        );
        map.insert(RegisterTable::HoldingRegisters, 40_002, RegisterEntry::new("temp"));
        map.insert(
            RegisterTable::HoldingRegisters,
            40_003,
            RegisterEntry::new("locked").writable(),
        );
        map.insert(RegisterTable::Coils, 1, RegisterEntry::new("fan").writable());
        let map = Arc::new(map);

        let bank = Arc::new(RegisterBank::for_map(&map));
        let frontend = RegisterFrontend::new(registry.clone(), map, bank.clone());
        Fixture {
            registry,
            bank,
            frontend,
        }
    }

    fn words(value: f32) -> Vec<u16> {
        encode_f32(value).to_vec()
    }

    #[tokio::test]
    async fn test_tick_publishes_scaled_floats() {
        let f = fixture();
        assert_eq!(f.frontend.tick().await.unwrap(), 5);
        // raw = value / scale
        assert_eq!(f.bank.read_float(RegisterTable::InputRegisters, 30_001), Some(200.0));
        assert_eq!(f.bank.read_float(RegisterTable::HoldingRegisters, 40_001), Some(42.0));
        assert_eq!(f.bank.read_float(RegisterTable::HoldingRegisters, 40_002), Some(20.0));
        assert_eq!(
            f.bank.read_bits(RegisterTable::Coils, 0, 1).unwrap(),
            vec![false]
        );
    }

    #[test]
    fn test_scaled_write_lands_at_default_priority() {
        let f = fixture();
        f.frontend
            .handle_register_write(RegisterTable::HoldingRegisters, 0, &words(50.0))
            .unwrap();
        let view = f.registry.view("setpoint").unwrap();
        assert_eq!(view.active_priority, Some(16));

        f.registry.update_all(T0 + 1_000);
        assert_eq!(f.registry.snapshot()["setpoint"], 25.0);
    }

    #[test]
    fn test_configured_write_priority() {
        let f = fixture();
        let frontend = f.frontend.with_write_priority(8);
        frontend
            .handle_register_write(RegisterTable::HoldingRegisters, 0, &words(40.0))
            .unwrap();
        assert_eq!(f.registry.view("setpoint").unwrap().active_priority, Some(8));
    }

    #[test]
    fn test_rejected_writes_leave_state_untouched() {
        let f = fixture();
        let hr = RegisterTable::HoldingRegisters;

        // half a slot
        assert_eq!(
            f.frontend.handle_register_write(hr, 0, &[0x4248]),
            Err(ModbusException::IllegalDataValue)
        );
        // second word of a slot
        assert_eq!(
            f.frontend.handle_register_write(hr, 1, &words(1.0)),
            Err(ModbusException::IllegalDataValue)
        );
        // entry not writable
        assert_eq!(
            f.frontend.handle_register_write(hr, 2, &words(1.0)),
            Err(ModbusException::IllegalDataAddress)
        );
        // unmapped
        assert_eq!(
            f.frontend.handle_register_write(hr, 20, &words(1.0)),
            Err(ModbusException::IllegalDataAddress)
        );
        // second slot's point is not writable: nothing applied
        let mut both = words(22.0);
        both.extend(words(3.0));
        let mut three = words(22.0);
        three.extend(words(1.0));
        three.extend(words(3.0));
        assert_eq!(
            f.frontend.handle_register_write(hr, 0, &three),
            Err(ModbusException::IllegalDataAddress)
        );
        assert_eq!(
            f.frontend.handle_register_write(RegisterTable::InputRegisters, 0, &both),
            Err(ModbusException::IllegalDataAddress)
        );

        for view in f.registry.views() {
            assert!(view.priority_array.is_empty(), "{} commanded", view.name);
        }
    }

    #[test]
    fn test_map_writable_but_point_read_only() {
        let f = fixture();
        assert_eq!(
            f.frontend
                .handle_register_write(RegisterTable::HoldingRegisters, 4, &words(7.0)),
            Err(ModbusException::IllegalDataAddress)
        );
        assert!(f.registry.view("locked").unwrap().priority_array.is_empty());
    }

    #[test]
    fn test_coil_write() {
        let f = fixture();
        f.frontend.handle_coil_write(0, &[true]).unwrap();
        f.registry.update_all(T0 + 1_000);
        assert_eq!(f.registry.snapshot()["fan"], 1.0);
        assert_eq!(
            f.frontend.handle_coil_write(1, &[true]),
            Err(ModbusException::IllegalDataAddress)
        );
    }
}
