//! Minimal-width type selection
//!
//! Picks the narrowest GBLN type able to hold a host value losslessly, and
//! range-checks values against widths the caller declared explicitly.

use crate::error::*;
use crate::types::*;

const SIGNED_LADDER: [ValueType; 4] = [ValueType::I8, ValueType::I16, ValueType::I32, ValueType::I64];
const UNSIGNED_LADDER: [ValueType; 4] = [ValueType::U8, ValueType::U16, ValueType::U32, ValueType::U64];

/// Smallest signed width in `i8 -> i16 -> i32 -> i64` containing `value`
pub fn select_int_width(value: i64) -> ValueType {
    ladder_select(&SIGNED_LADDER, value as i128)
}

/// Smallest unsigned width in `u8 -> u16 -> u32 -> u64` containing `value`
pub fn select_uint_width(value: u64) -> ValueType {
    ladder_select(&UNSIGNED_LADDER, value as i128)
}

fn ladder_select(ladder: &[ValueType; 4], value: i128) -> ValueType {
    ladder
        .iter()
        .copied()
        .find(|ty| fits(value, *ty))
        .unwrap_or(ladder[3])
}

fn fits(value: i128, ty: ValueType) -> bool {
    ty.int_range()
        .is_some_and(|(min, max)| (min..=max).contains(&value))
}

/// Smallest ladder width >= the code-point count of `value`
pub fn select_string_width(value: &str) -> Result<StringWidth> {
    let length = value.chars().count();
    StringWidth::LADDER
        .iter()
        .find(|w| usize::from(**w) >= length)
        .and_then(|w| StringWidth::new(usize::from(*w)))
        .ok_or_else(|| GblnError::string_too_long(value, length, StringWidth::MAX))
}

/// Check `value` against an explicitly declared integer type
pub fn check_int_fits(value: i128, declared: ValueType) -> Result<ScalarValue> {
    let Some((min, max)) = declared.int_range() else {
        return Err(GblnError::type_mismatch("integer type", declared.name()));
    };
    ScalarValue::int(value, declared).ok_or(GblnError::IntegerOutOfRange {
        value,
        type_name: declared.name(),
        min,
        max,
    })
}

/// Check `value` against an explicitly declared string width
pub fn check_string_fits(value: &str, declared: StringWidth) -> Result<()> {
    let length = value.chars().count();
    if length > declared.get() {
        return Err(GblnError::string_too_long(value, length, declared.get()));
    }
    Ok(())
}

/// Narrow to `f32` only when the value survives the round trip
pub fn narrow_to_f32(value: f64) -> Result<f32> {
    let narrowed = value as f32;
    if value.is_nan() || f64::from(narrowed) == value {
        Ok(narrowed)
    } else {
        Err(GblnError::FloatPrecisionLoss {
            value,
            type_name: "f32",
        })
    }
}
