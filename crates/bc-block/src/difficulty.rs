//! Compact difficulty bits and hashrate math.
//!
//! The 4-byte `bits` field of a block header compactly encodes a
//! 256-bit proof-of-work target as `(exponent: u8, mantissa: u24)`,
//! `target = mantissa << (8 * (exponent - 3))`.

use crate::BlockError;

/// The genesis (difficulty 1) compact bits.
const GENESIS_BITS_EXPONENT: i32 = 0x1d;
const GENESIS_BITS_MANTISSA: f64 = 65535.0; // 0x00ffff

/// Expand a 4-byte compact bits value (display order, e.g. `[0x1d, 0x00,
/// 0xff, 0xff]`) into the full 32-byte big-endian target.
pub fn expand_target(bits: &[u8; 4]) -> Result<[u8; 32], BlockError> {
    let exponent = bits[0] as i32;
    // Mask the sign bit; a negative target is meaningless for PoW.
    let mantissa = [bits[1] & 0x7f, bits[2], bits[3]];

    let mut target = [0u8; 32];
    for (i, &byte) in mantissa.iter().enumerate() {
        if byte == 0 {
            continue;
        }
        // Byte position counted from the least significant end.
        let position = exponent - 3 + (2 - i as i32);
        if position > 31 {
            return Err(BlockError::InvalidBits(format!(
                "target overflows 256 bits (exponent {})",
                exponent
            )));
        }
        if position < 0 {
            // Shifted below the first byte; compact form drops it.
            continue;
        }
        target[31 - position as usize] = byte;
    }
    Ok(target)
}

/// Expand a compact bits hex string (8 chars) into the 64-char
/// big-endian hex of the target it encodes.
pub fn expand_target_from(bits_hex: &str) -> Result<String, BlockError> {
    let decoded = hex::decode(bits_hex)?;
    if decoded.len() != 4 {
        return Err(BlockError::InvalidBits(format!(
            "compact bits should be 4 bytes, got {}",
            decoded.len()
        )));
    }
    let bits = [decoded[0], decoded[1], decoded[2], decoded[3]];
    Ok(hex::encode(expand_target(&bits)?))
}

/// Compute the difficulty encoded by a 4-byte compact bits value: the
/// ratio of the genesis target (`1d00ffff`) over the encoded target.
pub fn difficulty_from_bits(bits: &[u8]) -> Result<f64, BlockError> {
    if bits.len() != 4 {
        return Err(BlockError::InvalidBits(format!(
            "compact bits should be 4 bytes, got {}",
            bits.len()
        )));
    }
    let exponent = bits[0] as i32;
    let mantissa = u32::from_be_bytes([0, bits[1], bits[2], bits[3]]) as f64;
    if mantissa == 0.0 {
        return Err(BlockError::InvalidBits("zero mantissa".to_string()));
    }
    Ok((GENESIS_BITS_MANTISSA / mantissa) * 256f64.powi(GENESIS_BITS_EXPONENT - exponent))
}

/// Hashes represented by one unit of difficulty on the given network.
/// Bitcoin-family chains solve 2^32 hashes per difficulty on average;
/// unrecognized networks degrade to the neutral factor.
fn network_multiplier(network: &str) -> f64 {
    match network.to_ascii_uppercase().as_str() {
        "BSV" | "BTC" | "BCH" => 4294967296.0,
        _ => 2.0,
    }
}

/// Estimate the network hashrate (hashes per second) sustaining the
/// given difficulty at the observed mean seconds-per-block.
pub fn difficulty_to_hashrate(network: &str, difficulty: f64, block_seconds: f64) -> f64 {
    difficulty * network_multiplier(network) / block_seconds
}

/// Format a hashrate with SI prefixes, e.g. `"13.50 TH/s"`.
pub fn human_hash(rate: f64) -> String {
    const UNITS: [&str; 7] = ["H/s", "kH/s", "MH/s", "GH/s", "TH/s", "PH/s", "EH/s"];
    let mut r = rate;
    let mut unit = 0;
    while r >= 1000.0 && unit < UNITS.len() - 1 {
        r /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", r, UNITS[unit])
}

/// Check whether a compact bits value is a valid target encoding.
///
/// Rejects a zero mantissa, a mantissa with the sign bit set (the
/// target would be negative), encodings that shift mantissa bits away
/// (exponent below 3 with nonzero dropped bytes), and targets that
/// overflow 256 bits.
pub fn valid_bits(bits: u32) -> bool {
    let exponent = bits >> 24;
    let mantissa = bits & 0x00ff_ffff;

    if mantissa == 0 {
        return false;
    }
    if mantissa & 0x0080_0000 != 0 {
        return false;
    }
    if exponent > 34 {
        return false;
    }
    if exponent < 3 {
        let dropped = 8 * (3 - exponent);
        if mantissa & ((1u32 << dropped) - 1) != 0 {
            return false;
        }
    }
    if (mantissa > 0xff && exponent > 33) || (mantissa > 0xffff && exponent > 32) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_target_from_genesis_block() {
        assert_eq!(
            expand_target_from("1d00ffff").unwrap(),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_expand_target_from() {
        assert_eq!(
            expand_target_from("182815ee").unwrap(),
            "00000000000000002815ee000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_expand_target_from_invalid_bits() {
        assert!(expand_target_from("invalidBgolaits").is_err());
        assert!(expand_target_from("ffff").is_err());
    }

    #[test]
    fn test_difficulty_to_hashrate_bsv() {
        let rate = difficulty_to_hashrate("BSV", 22000.0, 7.0);
        assert_eq!(human_hash(rate), "13.50 TH/s");
    }

    #[test]
    fn test_difficulty_to_hashrate_unknown_network() {
        let rate = difficulty_to_hashrate("RSV", 22000.0, 7.0);
        assert_eq!(human_hash(rate), "6.29 kH/s");
    }

    fn assert_difficulty(bits_hex: &str, expected: f64) {
        let bits = hex::decode(bits_hex).unwrap();
        let d = difficulty_from_bits(&bits).unwrap();
        let tolerance = expected.abs() * 1e-12;
        assert!(
            (d - expected).abs() <= tolerance,
            "difficulty of {} was {}, expected {}",
            bits_hex,
            d,
            expected
        );
    }

    #[test]
    fn test_difficulty_from_bits() {
        // The genesis block is difficulty 1.
        assert_eq!(
            difficulty_from_bits(&hex::decode("1d00ffff").unwrap()).unwrap(),
            1.0
        );
        assert_difficulty("1745fb53", 4.022059196164954e+12);
        assert_difficulty("207fffff", 4.6565423739069247e-10);
    }

    #[test]
    fn test_valid_bits() {
        let cases: [(u32, bool); 18] = [
            (0x00000000, false),
            (0x01000000, false),
            (0xffffffff, false),
            (0x00ffffff, false),
            (0xff000000, false),
            (0x01ff0000, false),
            (0x017f0000, true),
            (0x0100ff00, false),
            (0x0200ff00, true),
            (0x020000ff, false),
            (0x030000ff, true),
            (0x207f0000, true),
            (0x217f0000, false),
            (0x217fff00, false),
            (0x2100ff00, true),
            (0x2200ffff, false),
            (0x220000ff, true),
            (0x230000ff, false),
        ];
        for (bits, expected) in cases {
            assert_eq!(valid_bits(bits), expected, "valid_bits({:#010x})", bits);
        }
    }
}
