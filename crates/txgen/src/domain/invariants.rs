//! # Domain Invariants
//!
//! Rules every synthesized transaction and every batch must satisfy.

use shared_types::Transaction;

use super::entities::{Batch, LedgerRecord};
use crate::ports::AddressDecoder;

/// Invariant: a batch never exceeds the configured maximum.
pub fn invariant_batch_bounded(batch: &Batch, max_num_txs_per_batch: usize) -> bool {
    batch.len() <= max_num_txs_per_batch
}

/// Invariant: every transaction has at least one input.
pub fn invariant_has_inputs(tx: &Transaction) -> bool {
    !tx.inputs.is_empty()
}

/// Invariant: the output count equals the number of decodable output
/// scripts in the source record.
pub fn invariant_outputs_decoded(
    record: &LedgerRecord,
    decoder: &dyn AddressDecoder,
    tx: &Transaction,
) -> bool {
    let decodable = record
        .outputs
        .iter()
        .filter(|o| decoder.decode(&o.script).is_ok())
        .count();
    decodable == tx.outputs.len()
}

/// Invariant: the stored id matches the content hash.
pub fn invariant_id_matches_content(tx: &Transaction) -> bool {
    tx.id == tx.compute_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawOutput;
    use crate::ports::MockAddressDecoder;
    use shared_types::{TxInput, TxOutput};

    #[test]
    fn test_batch_bounded() {
        let tx = Transaction::new(vec![TxInput::coinbase(0)], vec![]);
        let batch = Batch {
            single_shard: vec![tx.clone(), tx],
            cross_shard: vec![],
        };
        assert!(invariant_batch_bounded(&batch, 2));
        assert!(!invariant_batch_bounded(&batch, 1));
    }

    #[test]
    fn test_has_inputs() {
        assert!(invariant_has_inputs(&Transaction::new(vec![TxInput::coinbase(0)], vec![])));
        assert!(!invariant_has_inputs(&Transaction::new(vec![], vec![])));
    }

    #[test]
    fn test_outputs_decoded() {
        let record = LedgerRecord::coinbase(vec![
            RawOutput { value: 1, script: vec![1] },
            RawOutput { value: 2, script: vec![] },
        ]);
        let tx = Transaction::new(vec![TxInput::coinbase(0)], vec![TxOutput::new(1, "01", 0)]);
        assert!(invariant_outputs_decoded(&record, &MockAddressDecoder, &tx));
    }

    #[test]
    fn test_id_matches_content() {
        let mut tx = Transaction::new(vec![TxInput::coinbase(0)], vec![]);
        assert!(invariant_id_matches_content(&tx));
        tx.outputs.push(TxOutput::new(1, "x", 0));
        assert!(!invariant_id_matches_content(&tx));
    }
}
