//! Small decoding helpers shared across the crate

/// Decode swapped (telephony) BCD bytes into a digit string.
///
/// Each byte carries two digits, low nibble first. Nibbles above 9 are
/// padding or parity markers and are skipped.
pub fn decode_bcd(data: &[u8]) -> String {
    let mut digits = String::with_capacity(data.len() * 2);
    for &byte in data {
        for nibble in [byte & 0x0F, byte >> 4] {
            if nibble < 10 {
                digits.push(char::from(b'0' + nibble));
            }
        }
    }
    digits
}

/// Compute the Luhn check digit for a digit string.
///
/// Non-digit characters make the input invalid and yield `None`.
pub fn compute_luhn(digits: &str) -> Option<u8> {
    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let d = c.to_digit(10)?;
        // doubling starts from the rightmost digit of the base number
        let d = if i % 2 == 0 { d * 2 } else { d };
        sum += if d > 9 { d - 9 } else { d };
    }
    Some((10 - (sum % 10) as u8) % 10)
}

/// Whether service `number` (1-based) is enabled in a UICC service table.
///
/// Service n lives in byte (n-1)/8, bit (n-1)%8, least significant first.
pub fn service_enabled(table: &[u8], number: usize) -> bool {
    if number == 0 {
        return false;
    }
    let idx = (number - 1) / 8;
    let bit = (number - 1) % 8;
    table
        .get(idx)
        .is_some_and(|byte| (byte >> bit) & 1 == 1)
}
