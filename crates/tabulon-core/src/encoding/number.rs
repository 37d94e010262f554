use serde_json::Number;

/// 2^63: integral floats strictly inside `(-2^63, 2^63)` are exact `i64`s.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// 2^64: integral floats in `[2^63, 2^64)` are exact `u64`s.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Return the canonical form of a JSON number.
///
/// Integers pass through. A float with no fractional part that fits in `i64`
/// or `u64` collapses to that integer, so `1.0` and `1` encode identically.
/// `-0.0` becomes `0`.
pub fn canonical_number(n: &Number) -> Number {
    if n.is_i64() || n.is_u64() {
        return n.clone();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f > -I64_LIMIT && f < I64_LIMIT => Number::from(f as i64),
        Some(f) if f.fract() == 0.0 && (I64_LIMIT..U64_LIMIT).contains(&f) => {
            Number::from(f as u64)
        }
        _ => n.clone(),
    }
}
