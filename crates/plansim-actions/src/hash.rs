//! Synthetic transaction hashes for settlements on the virtual ledger.
//!
//! Hash input layout (bytes, in order):
//!   1. run id as its hyphenated UTF-8 form
//!   2. step index as 8-byte little-endian
//!   3. the operation descriptor as UTF-8 bytes
//!
//! Identical input always hashes identically, so a replayed simulation
//! reports the same hashes.

use sha2::{Digest, Sha256};

use plansim_contracts::plan::RunId;

/// `0x` followed by 64 lowercase hex characters.
pub fn simulated_tx_hash(run_id: &RunId, step_index: usize, descriptor: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(run_id.to_string().as_bytes());
    hasher.update((step_index as u64).to_le_bytes());
    hasher.update(descriptor.as_bytes());

    format!("0x{}", hex::encode(hasher.finalize()))
}
