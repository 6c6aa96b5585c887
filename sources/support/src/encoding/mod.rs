pub mod utf16;

pub use utf16::{from_utf16, to_utf16};

/// The platform string hash: `s[0]*31^(n-1) + s[1]*31^(n-2) + ... + s[n-1]`
/// over UTF-16 code units, with wrapping 32-bit arithmetic.
pub fn java_hash(units: &[u16]) -> i32 {
    units
        .iter()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(*unit as i32))
}
