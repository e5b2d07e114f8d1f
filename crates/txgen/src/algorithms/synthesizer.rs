//! # Transaction Synthesizer
//!
//! Maps one reference-ledger record onto a harness transaction for a target
//! shard.
//!
//! - Coinbase records get a single sentinel input.
//! - Spend records get one input per referenced outpoint.
//! - Outputs whose script does not decode are dropped; the rest are kept.

use shared_types::{ShardId, Transaction, TxInput, TxOutput};
use tracing::warn;

use crate::domain::{LedgerRecord, TxGenError};
use crate::ports::AddressDecoder;

/// Build the harness transaction for `record`, tagging every input and
/// output with `shard_id`.
pub fn synthesize(
    record: &LedgerRecord,
    shard_id: ShardId,
    decoder: &dyn AddressDecoder,
) -> Result<Transaction, TxGenError> {
    let inputs = if record.is_coinbase() {
        vec![TxInput::coinbase(shard_id)]
    } else {
        if record.inputs.is_empty() {
            return Err(TxGenError::MalformedRecord(
                "spend record without inputs".to_string(),
            ));
        }
        record
            .inputs
            .iter()
            .map(|outpoint| {
                let index = i32::try_from(outpoint.vout).map_err(|_| {
                    TxGenError::MalformedRecord(format!("output index {} out of range", outpoint.vout))
                })?;
                Ok(TxInput::new(outpoint.txid, index, shard_id))
            })
            .collect::<Result<Vec<_>, TxGenError>>()?
    };

    let mut outputs = Vec::with_capacity(record.outputs.len());
    for (position, raw) in record.outputs.iter().enumerate() {
        match decoder.decode(&raw.script) {
            Ok(address) => outputs.push(TxOutput::new(raw.value, address, shard_id)),
            Err(e) => {
                warn!(shard_id, position, error = %e, "Dropping undecodable output");
            }
        }
    }

    Ok(Transaction::new(inputs, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        invariant_has_inputs, invariant_id_matches_content, invariant_outputs_decoded,
        OutPointRef, RawOutput,
    };
    use crate::ports::MockAddressDecoder;
    use shared_types::{COINBASE_OUTPUT_INDEX, COINBASE_PREV_TX_ID};

    fn out(value: u64, script: &[u8]) -> RawOutput {
        RawOutput {
            value,
            script: script.to_vec(),
        }
    }

    #[test]
    fn test_coinbase_gets_sentinel_input() {
        let record = LedgerRecord::coinbase(vec![out(50, &[0xaa])]);
        let tx = synthesize(&record, 3, &MockAddressDecoder).unwrap();

        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].prev_tx_id, COINBASE_PREV_TX_ID);
        assert_eq!(tx.inputs[0].prev_output_index, COINBASE_OUTPUT_INDEX);
        assert_eq!(tx.inputs[0].shard_id, 3);
        assert_eq!(tx.outputs[0].address, "aa");
        assert_eq!(tx.outputs[0].shard_id, 3);
    }

    #[test]
    fn test_spend_maps_every_outpoint() {
        let record = LedgerRecord::spend(
            vec![
                OutPointRef { txid: [1; 32], vout: 0 },
                OutPointRef { txid: [2; 32], vout: 7 },
            ],
            vec![out(10, &[0x01])],
        );
        let tx = synthesize(&record, 1, &MockAddressDecoder).unwrap();

        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.inputs[1].prev_tx_id, [2; 32]);
        assert_eq!(tx.inputs[1].prev_output_index, 7);
        assert!(tx.inputs.iter().all(|i| i.shard_id == 1 && i.unlock.is_empty()));
        assert!(invariant_has_inputs(&tx));
        assert!(invariant_id_matches_content(&tx));
    }

    #[test]
    fn test_undecodable_output_dropped() {
        let record = LedgerRecord::coinbase(vec![out(1, &[0x01]), out(2, &[]), out(3, &[0x03])]);
        let tx = synthesize(&record, 0, &MockAddressDecoder).unwrap();

        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].value, 1);
        assert_eq!(tx.outputs[1].value, 3);
        assert!(invariant_outputs_decoded(&record, &MockAddressDecoder, &tx));
    }

    #[test]
    fn test_spend_without_inputs_is_malformed() {
        let record = LedgerRecord::spend(vec![], vec![out(1, &[0x01])]);
        assert!(matches!(
            synthesize(&record, 0, &MockAddressDecoder),
            Err(TxGenError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_vout_out_of_range_is_malformed() {
        let record = LedgerRecord::spend(
            vec![OutPointRef { txid: [1; 32], vout: u32::MAX }],
            vec![],
        );
        assert!(matches!(
            synthesize(&record, 0, &MockAddressDecoder),
            Err(TxGenError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_same_record_same_id() {
        let record = LedgerRecord::spend(
            vec![OutPointRef { txid: [4; 32], vout: 1 }],
            vec![out(9, &[0x09])],
        );
        let a = synthesize(&record, 0, &MockAddressDecoder).unwrap();
        let b = synthesize(&record, 0, &MockAddressDecoder).unwrap();
        let other_shard = synthesize(&record, 1, &MockAddressDecoder).unwrap();

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, other_shard.id);
    }
}
