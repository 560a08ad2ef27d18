//! Modbus TCP server over a [`RegisterBank`]
//!
//! Reads are answered from the bank; writes go to the
//! [`RegisterWriteHandler`] and never touch the bank directly, so a written
//! value shows up once the next tick has arbitrated it.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use sensim_routing::RegisterTable;

use super::constants::*;
use super::{RegisterBank, RegisterWriteHandler};
use crate::error::ModbusException;

pub struct ModbusTcpServer {
    bank: Arc<RegisterBank>,
    handler: Arc<dyn RegisterWriteHandler>,
}

fn be_u16(pdu: &[u8], at: usize) -> Result<u16, ModbusException> {
    pdu.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(ModbusException::IllegalDataValue)
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect()
}

/// Build an MBAP frame around `pdu`
pub fn frame(transaction_id: u16, unit_id: u8, pdu: &[u8]) -> Vec<u8> {
    let mut response = Vec::with_capacity(MBAP_HEADER_LEN + pdu.len());
    response.extend_from_slice(&transaction_id.to_be_bytes());
    response.extend_from_slice(&[0x00, 0x00]); // Protocol ID
    response.extend_from_slice(&((pdu.len() + 1) as u16).to_be_bytes());
    response.push(unit_id);
    response.extend_from_slice(pdu);
    response
}

impl ModbusTcpServer {
    pub fn new(bank: Arc<RegisterBank>, handler: Arc<dyn RegisterWriteHandler>) -> Self {
        Self { bank, handler }
    }

    /// Accept connections on `listener` until `token` is cancelled
    pub async fn serve(self: Arc<Self>, listener: TcpListener, token: CancellationToken) {
        match listener.local_addr() {
            Ok(addr) => info!("Modbus TCP server listening on {}", addr),
            Err(e) => error!("Modbus TCP listener has no local address: {}", e),
        }

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("New Modbus connection from {}", peer);
                        let server = self.clone();
                        let token = token.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, peer, token).await {
                                debug!("Modbus connection {} closed: {}", peer, e);
                            }
                        });
                    },
                    Err(e) => {
                        error!("Modbus accept error: {}", e);
                    },
                },
            }
        }

        info!("Modbus TCP server stopped");
    }

    async fn handle_connection(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
        token: CancellationToken,
    ) -> std::io::Result<()> {
        let mut header = [0u8; MBAP_HEADER_LEN];
        let mut pdu = vec![0u8; MAX_PDU_SIZE];

        loop {
            tokio::select! {
                _ = token.cancelled() => return Ok(()),
                read = stream.read_exact(&mut header) => {
                    if let Err(e) = read {
                        if e.kind() == std::io::ErrorKind::UnexpectedEof {
                            debug!("Modbus client {} disconnected", peer);
                            return Ok(());
                        }
                        return Err(e);
                    }
                }
            }

            let transaction_id = u16::from_be_bytes([header[0], header[1]]);
            let protocol_id = u16::from_be_bytes([header[2], header[3]]);
            let length = usize::from(u16::from_be_bytes([header[4], header[5]]));
            let unit_id = header[6];

            if !(2..=MAX_MBAP_LENGTH).contains(&length) {
                debug!("Invalid MBAP length {} from {}, closing", length, peer);
                return Ok(());
            }
            let pdu_len = length - 1;
            stream.read_exact(&mut pdu[..pdu_len]).await?;

            if protocol_id != 0 {
                continue; // Not Modbus protocol
            }

            debug!(
                "Transaction: {}, Unit: {}, Function: 0x{:02X}",
                transaction_id, unit_id, pdu[0]
            );

            let response = self.process_pdu(&pdu[..pdu_len]);
            stream
                .write_all(&frame(transaction_id, unit_id, &response))
                .await?;
        }
    }

    /// Answer one request PDU; always yields a response PDU
    pub fn process_pdu(&self, pdu: &[u8]) -> Vec<u8> {
        let function_code = pdu.first().copied().unwrap_or(0);
        match self.dispatch(function_code, pdu) {
            Ok(response) => response,
            Err(exception) => {
                debug!(
                    "Exception 0x{:02X} for function 0x{:02X}",
                    exception.code(),
                    function_code
                );
                vec![function_code | EXCEPTION_FLAG, exception.code()]
            },
        }
    }

    fn dispatch(&self, function_code: u8, pdu: &[u8]) -> Result<Vec<u8>, ModbusException> {
        match function_code {
            FC_READ_COILS => self.read_bits(RegisterTable::Coils, pdu),
            FC_READ_DISCRETE_INPUTS => self.read_bits(RegisterTable::DiscreteInputs, pdu),
            FC_READ_HOLDING_REGISTERS => self.read_registers(RegisterTable::HoldingRegisters, pdu),
            FC_READ_INPUT_REGISTERS => self.read_registers(RegisterTable::InputRegisters, pdu),
            FC_WRITE_SINGLE_COIL => {
                let offset = be_u16(pdu, 1)?;
                let bit = match be_u16(pdu, 3)? {
                    COIL_ON => true,
                    COIL_OFF => false,
                    _ => return Err(ModbusException::IllegalDataValue),
                };
                self.handler.handle_coil_write(offset, &[bit])?;
                Ok(pdu[..5].to_vec())
            },
            FC_WRITE_SINGLE_REGISTER => {
                let offset = be_u16(pdu, 1)?;
                let value = be_u16(pdu, 3)?;
                self.handler
                    .handle_register_write(RegisterTable::HoldingRegisters, offset, &[value])?;
                Ok(pdu[..5].to_vec())
            },
            FC_WRITE_MULTIPLE_COILS => {
                let offset = be_u16(pdu, 1)?;
                let count = be_u16(pdu, 3)?;
                let byte_count = usize::from(*pdu.get(5).ok_or(ModbusException::IllegalDataValue)?);
                if count == 0
                    || count > MAX_WRITE_COILS
                    || byte_count != usize::from(count).div_ceil(8)
                    || pdu.len() < 6 + byte_count
                {
                    return Err(ModbusException::IllegalDataValue);
                }
                let bits = unpack_bits(&pdu[6..6 + byte_count], usize::from(count));
                self.handler.handle_coil_write(offset, &bits)?;
                Ok(pdu[..5].to_vec())
            },
            FC_WRITE_MULTIPLE_REGISTERS => {
                let offset = be_u16(pdu, 1)?;
                let count = be_u16(pdu, 3)?;
                let byte_count = usize::from(*pdu.get(5).ok_or(ModbusException::IllegalDataValue)?);
                if count == 0
                    || count > MAX_WRITE_REGISTERS
                    || byte_count != usize::from(count) * 2
                    || pdu.len() < 6 + byte_count
                {
                    return Err(ModbusException::IllegalDataValue);
                }
                let words: Vec<u16> = pdu[6..6 + byte_count]
                    .chunks_exact(2)
                    .map(|b| u16::from_be_bytes([b[0], b[1]]))
                    .collect();
                self.handler
                    .handle_register_write(RegisterTable::HoldingRegisters, offset, &words)?;
                Ok(pdu[..5].to_vec())
            },
            _ => Err(ModbusException::IllegalFunction),
        }
    }

    fn read_registers(&self, table: RegisterTable, pdu: &[u8]) -> Result<Vec<u8>, ModbusException> {
        let offset = be_u16(pdu, 1)?;
        let count = be_u16(pdu, 3)?;
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(ModbusException::IllegalDataValue);
        }
        let words = self.bank.read_words(table, offset, count)?;

        let mut response = Vec::with_capacity(2 + words.len() * 2);
        response.push(pdu[0]);
        response.push((words.len() * 2) as u8); // Byte count
        for word in words {
            response.extend_from_slice(&word.to_be_bytes());
        }
        Ok(response)
    }

    fn read_bits(&self, table: RegisterTable, pdu: &[u8]) -> Result<Vec<u8>, ModbusException> {
        let offset = be_u16(pdu, 1)?;
        let count = be_u16(pdu, 3)?;
        if count == 0 || count > MAX_READ_BITS {
            return Err(ModbusException::IllegalDataValue);
        }
        let bits = self.bank.read_bits(table, offset, count)?;
        let packed = pack_bits(&bits);

        let mut response = Vec::with_capacity(2 + packed.len());
        response.push(pdu[0]);
        response.push(packed.len() as u8);
        response.extend_from_slice(&packed);
        Ok(response)
    }
}
