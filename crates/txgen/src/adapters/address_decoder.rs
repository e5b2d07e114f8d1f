//! # Bitcoin Address Decoder
//!
//! Resolves output locking scripts to address strings with the `bitcoin`
//! crate. Standard templates (P2PKH, P2SH, segwit) go through
//! `Address::from_script`; bare pay-to-pubkey outputs, common in early
//! blocks, are mapped to the P2PKH address of the embedded key.

use bitcoin::{Address, Network, PublicKey, Script};

use crate::domain::DecodeError;
use crate::ports::AddressDecoder;

const OP_CHECKSIG: u8 = 0xac;

/// `AddressDecoder` for Bitcoin output scripts.
#[derive(Clone, Copy, Debug)]
pub struct BitcoinAddressDecoder {
    network: Network,
}

impl BitcoinAddressDecoder {
    /// Decoder producing addresses for `network`.
    pub fn new(network: Network) -> Self {
        Self { network }
    }
}

impl Default for BitcoinAddressDecoder {
    fn default() -> Self {
        Self::new(Network::Bitcoin)
    }
}

impl AddressDecoder for BitcoinAddressDecoder {
    fn decode(&self, script: &[u8]) -> Result<String, DecodeError> {
        if script.is_empty() {
            return Err(DecodeError::EmptyScript);
        }

        if let Some(key) = p2pk_key(script) {
            let pk = PublicKey::from_slice(key)
                .map_err(|e| DecodeError::InvalidPublicKey(e.to_string()))?;
            return Ok(Address::p2pkh(&pk, self.network).to_string());
        }

        Address::from_script(Script::from_bytes(script), self.network)
            .map(|address| address.to_string())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))
    }
}

/// Embedded key of a `<push 33|65> <key> OP_CHECKSIG` script.
fn p2pk_key(script: &[u8]) -> Option<&[u8]> {
    match (script.len(), script.first(), script.last()) {
        (35, Some(0x21), Some(&OP_CHECKSIG)) | (67, Some(0x41), Some(&OP_CHECKSIG)) => {
            Some(&script[1..script.len() - 1])
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SATOSHI: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    #[test]
    fn test_p2pkh() {
        let script = hex::decode("76a91462e907b15cbf27d5425399ebf6f0fb50ebb88f1888ac").unwrap();
        assert_eq!(BitcoinAddressDecoder::default().decode(&script).unwrap(), SATOSHI);
    }

    #[test]
    fn test_genesis_p2pk() {
        let mut script = vec![0x41];
        script.extend(
            hex::decode(
                "04678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb6\
                 49f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5f",
            )
            .unwrap(),
        );
        script.push(OP_CHECKSIG);
        assert_eq!(BitcoinAddressDecoder::default().decode(&script).unwrap(), SATOSHI);
    }

    #[test]
    fn test_empty_script() {
        assert_eq!(
            BitcoinAddressDecoder::default().decode(&[]),
            Err(DecodeError::EmptyScript)
        );
    }

    #[test]
    fn test_op_return_unsupported() {
        let script = [0x6a, 0x04, 0xde, 0xad, 0xbe, 0xef];
        assert!(matches!(
            BitcoinAddressDecoder::default().decode(&script),
            Err(DecodeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_bad_p2pk_key() {
        let mut script = vec![0x21];
        script.extend([0x07; 33]);
        script.push(OP_CHECKSIG);
        assert!(matches!(
            BitcoinAddressDecoder::default().decode(&script),
            Err(DecodeError::InvalidPublicKey(_))
        ));
    }
}
