//! Entry identifier generation.
//!
//! Two flavours:
//! - [`new_id_from_key`]: FNV-1a 64-bit over a natural key, base-62 encoded.
//!   Identical keys always produce identical IDs, across runs and processes,
//!   which is what makes a repeated import land on the same remote entries.
//! - [`new_random_id`]: 128 random bits (v4 UUID), base-62 encoded, for
//!   records with no natural key.

use uuid::Uuid;

use crate::types::EntryId;

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// 64-bit FNV offset basis.
pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
/// 64-bit FNV prime.
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Encode `value` with the `0-9A-Za-z` alphabet. Zero encodes as `"0"`.
pub fn to_base62(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(22);
    while value != 0 {
        digits.push(BASE62_ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();
    // Alphabet is ASCII.
    digits.into_iter().map(char::from).collect()
}

/// FNV-1a over the UTF-8 bytes of `input`, wrapping at 64 bits.
pub fn fnv1a_64(input: &str) -> u64 {
    input.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Deterministic ID derived from a natural key.
pub fn new_id_from_key(key: &str) -> EntryId {
    EntryId(to_base62(u128::from(fnv1a_64(key))))
}

/// Random ID for records without a natural key.
pub fn new_random_id() -> EntryId {
    EntryId(to_base62(Uuid::new_v4().as_u128()))
}
