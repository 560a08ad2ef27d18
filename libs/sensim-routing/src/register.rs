//! Register-table projection
//!
//! Addresses follow the 1-based table convention (HR 40001, IR 30001,
//! DI 10001, CO 1). Register tables carry one 32-bit float per address, so
//! address `a` occupies wire offsets `(a - base) * 2` and `+1`. Bit tables
//! carry one bit per address at offset `a - base`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use sensim_model::PointDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterTable {
    Coils,
    DiscreteInputs,
    InputRegisters,
    HoldingRegisters,
}

impl RegisterTable {
    pub const ALL: [RegisterTable; 4] = [
        Self::HoldingRegisters,
        Self::InputRegisters,
        Self::DiscreteInputs,
        Self::Coils,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Coils => "CO",
            Self::DiscreteInputs => "DI",
            Self::InputRegisters => "IR",
            Self::HoldingRegisters => "HR",
        }
    }

    /// First address of the table
    pub fn base(&self) -> u32 {
        match self {
            Self::Coils => 1,
            Self::DiscreteInputs => 10_001,
            Self::InputRegisters => 30_001,
            Self::HoldingRegisters => 40_001,
        }
    }

    pub fn is_bit(&self) -> bool {
        matches!(self, Self::Coils | Self::DiscreteInputs)
    }

    /// Wire units occupied by one address
    pub fn width(&self) -> u16 {
        if self.is_bit() {
            1
        } else {
            2
        }
    }

    /// Accepts inbound writes
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Coils | Self::HoldingRegisters)
    }

    /// Wire offset of `address`, if it belongs to this table and fits a u16
    pub fn wire_offset(&self, address: u32) -> Option<u16> {
        let slot = address.checked_sub(self.base())?;
        let offset = slot.checked_mul(u32::from(self.width()))?;
        u16::try_from(offset + u32::from(self.width()) - 1)
            .ok()
            .map(|_| offset as u16)
    }

    /// Address whose slot starts at `offset`; `None` for the second word of a float
    pub fn address_at(&self, offset: u16) -> Option<u32> {
        let width = self.width();
        if offset % width != 0 {
            return None;
        }
        Some(self.base() + u32::from(offset / width))
    }
}

impl fmt::Display for RegisterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn default_scale() -> f64 {
    1.0
}

fn is_default_scale(scale: &f64) -> bool {
    *scale == 1.0
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One mapped address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterEntry {
    #[serde(rename = "sensor")]
    pub point: String,
    /// Engineering value = raw register value * scale
    #[serde(default = "default_scale", skip_serializing_if = "is_default_scale")]
    pub scale: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub writable: bool,
}

impl RegisterEntry {
    pub fn new(point: impl Into<String>) -> Self {
        Self {
            point: point.into(),
            scale: 1.0,
            writable: false,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }
}

/// `modbus_map.yaml` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterMapFile {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub holding_registers: BTreeMap<u32, RegisterEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_registers: BTreeMap<u32, RegisterEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub discrete_inputs: BTreeMap<u32, RegisterEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub coils: BTreeMap<u32, RegisterEntry>,
}

impl RegisterMapFile {
    pub fn table(&self, table: RegisterTable) -> &BTreeMap<u32, RegisterEntry> {
        match table {
            RegisterTable::HoldingRegisters => &self.holding_registers,
            RegisterTable::InputRegisters => &self.input_registers,
            RegisterTable::DiscreteInputs => &self.discrete_inputs,
            RegisterTable::Coils => &self.coils,
        }
    }

    pub fn table_mut(&mut self, table: RegisterTable) -> &mut BTreeMap<u32, RegisterEntry> {
        match table {
            RegisterTable::HoldingRegisters => &mut self.holding_registers,
            RegisterTable::InputRegisters => &mut self.input_registers,
            RegisterTable::DiscreteInputs => &mut self.discrete_inputs,
            RegisterTable::Coils => &mut self.coils,
        }
    }
}

/// Validated register projection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterMap {
    entries: BTreeMap<(RegisterTable, u32), RegisterEntry>,
}

impl RegisterMap {
    /// Build from a map file, dropping entries for unknown points, bad addresses
    /// or a zero/non-finite scale
    pub fn from_file(file: &RegisterMapFile, known: impl Fn(&str) -> bool) -> Self {
        let mut map = Self::default();
        for table in RegisterTable::ALL {
            for (address, entry) in file.table(table) {
                if !known(&entry.point) {
                    warn!(
                        "Register {}:{} references unknown point '{}', skipped",
                        table, address, entry.point
                    );
                    continue;
                }
                if table.wire_offset(*address).is_none() {
                    warn!("Register {}:{} outside table range, skipped", table, address);
                    continue;
                }
                if entry.scale == 0.0 || !entry.scale.is_finite() {
                    warn!(
                        "Register {}:{} has unusable scale {}, skipped",
                        table, address, entry.scale
                    );
                    continue;
                }
                map.entries.insert((table, *address), entry.clone());
            }
        }
        map
    }

    /// Sequential input-register slots in name order
    pub fn default_for(points: &[PointDefinition]) -> Self {
        let mut names: Vec<&str> = points.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();

        let table = RegisterTable::InputRegisters;
        let entries = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| ((table, table.base() + i as u32), RegisterEntry::new(name)))
            .filter(|((table, address), _)| table.wire_offset(*address).is_some())
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, table: RegisterTable, address: u32, entry: RegisterEntry) {
        self.entries.insert((table, address), entry);
    }

    pub fn get(&self, table: RegisterTable, address: u32) -> Option<&RegisterEntry> {
        self.entries.get(&(table, address))
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegisterTable, u32, &RegisterEntry)> {
        self.entries
            .iter()
            .map(|((table, address), entry)| (*table, *address, entry))
    }

    pub fn table(&self, table: RegisterTable) -> impl Iterator<Item = (u32, &RegisterEntry)> {
        self.iter()
            .filter(move |(t, _, _)| *t == table)
            .map(|(_, address, entry)| (address, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wire units needed to hold every mapped address of `table`
    pub fn table_size(&self, table: RegisterTable) -> usize {
        self.table(table)
            .filter_map(|(address, _)| table.wire_offset(address))
            .map(|offset| usize::from(offset) + usize::from(table.width()))
            .max()
            .unwrap_or(0)
    }

    /// Labels such as `Modbus HR:40001`, grouped by point
    pub fn labels(&self) -> BTreeMap<String, Vec<String>> {
        let mut labels: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for table in RegisterTable::ALL {
            for (address, entry) in self.table(table) {
                labels
                    .entry(entry.point.clone())
                    .or_default()
                    .push(format!("Modbus {}:{}", table.label(), address));
            }
        }
        labels
    }

    pub fn to_file(&self) -> RegisterMapFile {
        let mut file = RegisterMapFile::default();
        for (table, address, entry) in self.iter() {
            file.table_mut(table).insert(address, entry.clone());
        }
        file
    }
}
