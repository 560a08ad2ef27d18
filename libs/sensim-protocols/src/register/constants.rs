//! Modbus TCP framing constants

/// Transaction ID(2) + Protocol ID(2) + Length(2) + Unit ID(1)
pub const MBAP_HEADER_LEN: usize = 7;

/// Maximum PDU size (RS485 ADU 256 - address 1 - CRC 2)
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum MBAP length field: Unit ID + PDU
pub const MAX_MBAP_LENGTH: usize = 1 + MAX_PDU_SIZE;

/// FC03/FC04 response must fit the PDU: 2 + N*2 <= 253
pub const MAX_READ_REGISTERS: u16 = 125;

/// FC16 request: 6 + N*2 <= 253
pub const MAX_WRITE_REGISTERS: u16 = 123;

pub const MAX_READ_BITS: u16 = 2000;

pub const MAX_WRITE_COILS: u16 = 1968;

pub const FC_READ_COILS: u8 = 0x01;
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Error bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

pub const COIL_ON: u16 = 0xFF00;
pub const COIL_OFF: u16 = 0x0000;
