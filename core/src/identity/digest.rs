use ndarray::ArrayView2;
use sha2::{Digest, Sha256};

/// Stable fingerprint of a geometry's defining state.
///
/// Hashes the table shape, every coordinate's little-endian bit pattern in
/// logical order, then the excluded channel indices. Equal
/// (table, exclusion) pairs always produce equal digests, which is what the
/// caching layers elsewhere in the platform rely on.
pub fn fingerprint(pos_total: ArrayView2<f64>, invalid_channels: &[usize]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((pos_total.nrows() as u64).to_le_bytes());
    hasher.update((pos_total.ncols() as u64).to_le_bytes());
    for value in pos_total.iter() {
        hasher.update(value.to_le_bytes());
    }
    for &channel in invalid_channels {
        hasher.update((channel as u64).to_le_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
