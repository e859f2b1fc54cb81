//! Content identifiers for rendered artifacts.
//!
//! An artifact's identity is the sha2-256 digest of its exact encoded
//! bytes, wrapped as a raw-block CID. Version 0 is the legacy base58btc
//! form (`Qm...`, 46 chars); version 1 is the multibase base32 form
//! (`bafkrei...`, 59 chars). Re-encoding the same bytes always yields
//! the same identifier.

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CidVersion {
    #[default]
    V0,
    V1,
}

/// Derive the content identifier for `bytes` under the given version.
pub fn content_id(bytes: &[u8], version: CidVersion) -> String {
    let digest = Sha256::digest(bytes);
    match version {
        CidVersion::V0 => {
            // Bare sha2-256 multihash: code 0x12, length 0x20.
            let mut multihash = Vec::with_capacity(34);
            multihash.push(0x12);
            multihash.push(0x20);
            multihash.extend_from_slice(&digest);
            base58btc(&multihash)
        }
        CidVersion::V1 => {
            // CIDv1, raw codec 0x55, sha2-256 multihash, multibase 'b'.
            let mut block = Vec::with_capacity(36);
            block.extend_from_slice(&[0x01, 0x55, 0x12, 0x20]);
            block.extend_from_slice(&digest);
            let mut out = String::with_capacity(1 + block.len() * 8 / 5 + 1);
            out.push('b');
            out.push_str(&base32_lower(&block));
            out
        }
    }
}

const BASE58_ALPHABET: &[u8; 58] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn base58btc(input: &[u8]) -> String {
    let zeros = input.iter().take_while(|&&b| b == 0).count();
    // Little-endian base-58 digits, grown by long multiplication.
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
    for &byte in &input[zeros..] {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }
    let mut out = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        out.push('1');
    }
    for &digit in digits.iter().rev() {
        out.push(char::from(BASE58_ALPHABET[usize::from(digit)]));
    }
    out
}

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

fn base32_lower(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len().div_ceil(5) * 8);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for &byte in input {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(BASE32_ALPHABET[((acc >> bits) & 0x1F) as usize]));
        }
        acc &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(char::from(
            BASE32_ALPHABET[((acc << (5 - bits)) & 0x1F) as usize],
        ));
    }
    out
}
