//! Register protocol port
//!
//! The [`RegisterBank`] is the in-memory image a register server answers
//! from. Register tables hold one big-endian f32 per mapped address, split
//! across two 16-bit words (high word first); bit tables hold one bit per
//! address.

pub mod constants;
pub mod frontend;
pub mod tcp;

use parking_lot::RwLock;

use sensim_routing::{RegisterMap, RegisterTable};

use crate::error::{ModbusException, PortError};

pub use frontend::RegisterFrontend;
pub use tcp::ModbusTcpServer;

/// Outbound side: the front-end pushes encoded values here
pub trait RegisterPort: Send + Sync {
    fn write_words(&self, table: RegisterTable, offset: u16, words: &[u16]) -> Result<(), PortError>;

    fn write_bits(&self, table: RegisterTable, offset: u16, bits: &[bool]) -> Result<(), PortError>;
}

/// Inbound side: client writes are dispatched here
pub trait RegisterWriteHandler: Send + Sync {
    /// Words written to `table` starting at wire `offset`
    fn handle_register_write(
        &self,
        table: RegisterTable,
        offset: u16,
        words: &[u16],
    ) -> Result<(), ModbusException>;

    /// Bits written to the coil table starting at wire `offset`
    fn handle_coil_write(&self, offset: u16, bits: &[bool]) -> Result<(), ModbusException>;
}

/// Split an f32 into (high, low) words
pub fn encode_f32(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
}

pub fn decode_f32(words: [u16; 2]) -> f32 {
    f32::from_bits((u32::from(words[0]) << 16) | u32::from(words[1]))
}

/// In-memory register image sized from a register map
#[derive(Debug, Default)]
pub struct RegisterBank {
    holding_registers: RwLock<Vec<u16>>,
    input_registers: RwLock<Vec<u16>>,
    discrete_inputs: RwLock<Vec<bool>>,
    coils: RwLock<Vec<bool>>,
}

impl RegisterBank {
    pub fn for_map(map: &RegisterMap) -> Self {
        Self {
            holding_registers: RwLock::new(vec![0; map.table_size(RegisterTable::HoldingRegisters)]),
            input_registers: RwLock::new(vec![0; map.table_size(RegisterTable::InputRegisters)]),
            discrete_inputs: RwLock::new(vec![false; map.table_size(RegisterTable::DiscreteInputs)]),
            coils: RwLock::new(vec![false; map.table_size(RegisterTable::Coils)]),
        }
    }

    fn words(&self, table: RegisterTable) -> Option<&RwLock<Vec<u16>>> {
        match table {
            RegisterTable::HoldingRegisters => Some(&self.holding_registers),
            RegisterTable::InputRegisters => Some(&self.input_registers),
            _ => None,
        }
    }

    fn bits(&self, table: RegisterTable) -> Option<&RwLock<Vec<bool>>> {
        match table {
            RegisterTable::DiscreteInputs => Some(&self.discrete_inputs),
            RegisterTable::Coils => Some(&self.coils),
            _ => None,
        }
    }

    /// Wire units available in `table`
    pub fn size(&self, table: RegisterTable) -> usize {
        match (self.words(table), self.bits(table)) {
            (Some(words), _) => words.read().len(),
            (_, Some(bits)) => bits.read().len(),
            _ => 0,
        }
    }

    pub fn read_words(
        &self,
        table: RegisterTable,
        offset: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusException> {
        let words = self
            .words(table)
            .ok_or(ModbusException::IllegalFunction)?
            .read();
        let range = span(offset, count, words.len())?;
        Ok(words[range].to_vec())
    }

    pub fn read_bits(
        &self,
        table: RegisterTable,
        offset: u16,
        count: u16,
    ) -> Result<Vec<bool>, ModbusException> {
        let bits = self
            .bits(table)
            .ok_or(ModbusException::IllegalFunction)?
            .read();
        let range = span(offset, count, bits.len())?;
        Ok(bits[range].to_vec())
    }

    /// Decoded float at `address`, if mapped into the bank
    pub fn read_float(&self, table: RegisterTable, address: u32) -> Option<f32> {
        let offset = table.wire_offset(address)?;
        let words = self.read_words(table, offset, 2).ok()?;
        Some(decode_f32([words[0], words[1]]))
    }
}

fn span(offset: u16, count: u16, len: usize) -> Result<std::ops::Range<usize>, ModbusException> {
    let start = usize::from(offset);
    let end = start + usize::from(count);
    if count == 0 || end > len {
        return Err(ModbusException::IllegalDataAddress);
    }
    Ok(start..end)
}

fn out_of_bounds(table: RegisterTable, offset: u16, len: usize) -> PortError {
    PortError::OutOfBounds {
        table: table.label().to_string(),
        offset,
        len,
    }
}

impl RegisterPort for RegisterBank {
    fn write_words(&self, table: RegisterTable, offset: u16, words: &[u16]) -> Result<(), PortError> {
        let mut bank = self
            .words(table)
            .ok_or_else(|| out_of_bounds(table, offset, words.len()))?
            .write();
        let start = usize::from(offset);
        let target = bank
            .get_mut(start..start + words.len())
            .ok_or_else(|| out_of_bounds(table, offset, words.len()))?;
        target.copy_from_slice(words);
        Ok(())
    }

    fn write_bits(&self, table: RegisterTable, offset: u16, bits: &[bool]) -> Result<(), PortError> {
        let mut bank = self
            .bits(table)
            .ok_or_else(|| out_of_bounds(table, offset, bits.len()))?
            .write();
        let start = usize::from(offset);
        let target = bank
            .get_mut(start..start + bits.len())
            .ok_or_else(|| out_of_bounds(table, offset, bits.len()))?;
        target.copy_from_slice(bits);
        Ok(())
    }
}
