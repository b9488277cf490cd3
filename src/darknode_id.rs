//! Darknode identifier formats
//!
//! A darknode is identified by 20 bytes, written three ways:
//! - hex, as its Ethereum address (`0x...`)
//! - base58 with a `0x1B 0x14` multihash prefix, as shown by the Command Center
//! - unpadded base64url, as RenVM's block state refers to nodes

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::error::{Error, Result};

const MULTIHASH_PREFIX: [u8; 2] = [0x1B, 0x14];
const ID_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DarknodeId([u8; ID_LEN]);

impl DarknodeId {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; ID_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidDarknodeId(format!("expected 20 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    pub fn from_hex(input: &str) -> Result<Self> {
        let bytes = hex::decode(input.trim_start_matches("0x"))
            .map_err(|e| Error::InvalidDarknodeId(format!("{}: {}", input, e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_base58(input: &str) -> Result<Self> {
        let bytes = bs58::decode(input)
            .into_vec()
            .map_err(|e| Error::InvalidDarknodeId(format!("{}: {}", input, e)))?;
        if bytes.len() < MULTIHASH_PREFIX.len() || bytes[..2] != MULTIHASH_PREFIX {
            return Err(Error::InvalidDarknodeId(format!(
                "{}: missing multihash prefix",
                input
            )));
        }
        Self::from_bytes(&bytes[2..])
    }

    pub fn from_renvm_id(input: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(input)
            .map_err(|e| Error::InvalidDarknodeId(format!("{}: {}", input, e)))?;
        Self::from_bytes(&bytes)
    }

    /// Accept any of the three formats
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.starts_with("0x") {
            return Self::from_hex(input);
        }
        Self::from_base58(input).or_else(|_| Self::from_renvm_id(input))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn to_base58(&self) -> String {
        let mut bytes = MULTIHASH_PREFIX.to_vec();
        bytes.extend_from_slice(&self.0);
        bs58::encode(bytes).into_string()
    }

    pub fn to_renvm_id(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

impl std::fmt::Display for DarknodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base58())
    }
}
