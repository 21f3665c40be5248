//! Deterministic variant selection. The same seed always picks the same
//! option, across runs and platforms.

use sha2::{Digest, Sha256};

use crate::notification::tone::cta_pool;
use crate::scoring::catalog::Product;

/// Index in `0..len` derived from the SHA-256 of `seed`. `len` must be non-zero.
pub fn seeded_index(seed: &str, len: usize) -> usize {
    let digest = Sha256::digest(seed.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % len.max(1) as u64) as usize
}

pub fn seeded_choice<'a>(seed: &str, options: &[&'a str]) -> &'a str {
    if options.is_empty() {
        return "";
    }
    options[seeded_index(seed, options.len())]
}

/// The CTA for this client and product.
pub fn choose_cta(product: Product, key: &str) -> &'static str {
    seeded_choice(&format!("{key}|cta|{}", product.id()), cta_pool(product))
}
