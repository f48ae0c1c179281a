//! Random and mutated values for scalar, string and bytes fields.
//!
//! Integer, bool and float values are handled as 64-bit patterns so the
//! boundary tables and bit flips are shared across kinds; `scalar_value`
//! brings a pattern back into the range of the declared kind.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use bytes::Bytes;
use prost_reflect::{Kind, MapKey, Value};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

const INT32_BOUNDARIES: &[u64] = &[0, 1, u64::MAX, i32::MIN as i64 as u64, i32::MAX as u64];
const UINT32_BOUNDARIES: &[u64] = &[0, 1, 0x7fff_ffff, 0xffff_ffff];
const INT64_BOUNDARIES: &[u64] = &[0, 1, u64::MAX, i64::MIN as u64, i64::MAX as u64];
const UINT64_BOUNDARIES: &[u64] = &[0, 1, i64::MAX as u64, u64::MAX];

/// Random value of `kind`, or `None` for message kinds.
///
/// Strings and bytes are at most `growth` long.
#[must_use]
pub fn random_value(kind: &Kind, growth: usize, rng: &mut StdRng) -> Option<Value> {
    match kind {
        Kind::Message(_) => None,
        Kind::String => {
            let len = rng.gen_range(0..=growth);
            Some(Value::String((0..len).map(|_| random_char(rng)).collect()))
        }
        Kind::Bytes => {
            let len = rng.gen_range(0..=growth);
            Some(Value::Bytes((0..len).map(|_| rng.gen::<u8>()).collect()))
        }
        scalar => scalar_value(scalar, random_bits(scalar, rng)),
    }
}

/// Mutate a scalar, string or bytes value in place. Other values are left alone.
pub fn mutate_value(value: &mut Value, kind: &Kind, growth: usize, rng: &mut StdRng) {
    match value {
        Value::String(s) => mutate_string(s, growth, rng),
        Value::Bytes(b) => {
            let mut buf = b.to_vec();
            mutate_bytes(&mut buf, growth, rng);
            *b = Bytes::from(buf);
        }
        other => {
            if let Some(mutated) =
                scalar_bits(other).and_then(|bits| scalar_value(kind, mutate_bits(kind, bits, rng)))
            {
                *other = mutated;
            }
        }
    }
}

/// Random key for a map whose key field is of `kind`
#[must_use]
pub fn random_key(kind: &Kind, growth: usize, rng: &mut StdRng) -> Option<MapKey> {
    Some(match random_value(kind, growth, rng)? {
        Value::Bool(v) => MapKey::Bool(v),
        Value::I32(v) => MapKey::I32(v),
        Value::I64(v) => MapKey::I64(v),
        Value::U32(v) => MapKey::U32(v),
        Value::U64(v) => MapKey::U64(v),
        Value::String(v) => MapKey::String(v),
        _ => return None,
    })
}

/// Total order over keys of one map, used to pick entries deterministically
#[must_use]
pub fn key_order(a: &MapKey, b: &MapKey) -> Ordering {
    match (a, b) {
        (MapKey::Bool(a), MapKey::Bool(b)) => a.cmp(b),
        (MapKey::I32(a), MapKey::I32(b)) => a.cmp(b),
        (MapKey::I64(a), MapKey::I64(b)) => a.cmp(b),
        (MapKey::U32(a), MapKey::U32(b)) => a.cmp(b),
        (MapKey::U64(a), MapKey::U64(b)) => a.cmp(b),
        (MapKey::String(a), MapKey::String(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// 64-bit pattern of a scalar value; `None` for strings, bytes and aggregates
fn scalar_bits(value: &Value) -> Option<u64> {
    Some(match value {
        Value::Bool(v) => u64::from(*v),
        Value::I32(v) | Value::EnumNumber(v) => i64::from(*v) as u64,
        Value::I64(v) => *v as u64,
        Value::U32(v) => u64::from(*v),
        Value::U64(v) => *v,
        Value::F32(v) => u64::from(v.to_bits()),
        Value::F64(v) => v.to_bits(),
        _ => return None,
    })
}

/// Value of `kind` from a 64-bit pattern. 32-bit kinds keep the low bits.
fn scalar_value(kind: &Kind, bits: u64) -> Option<Value> {
    Some(match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(bits as i32),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(bits as i64),
        Kind::Uint32 | Kind::Fixed32 => Value::U32(bits as u32),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(bits),
        Kind::Bool => Value::Bool(bits != 0),
        Kind::Float => Value::F32(f32::from_bits(bits as u32)),
        Kind::Double => Value::F64(f64::from_bits(bits)),
        Kind::Enum(_) => Value::EnumNumber(bits as i32),
        Kind::String | Kind::Bytes | Kind::Message(_) => return None,
    })
}

fn boundaries(kind: &Kind) -> &'static [u64] {
    match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Enum(_) => INT32_BOUNDARIES,
        Kind::Uint32 | Kind::Fixed32 => UINT32_BOUNDARIES,
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => INT64_BOUNDARIES,
        Kind::Uint64 | Kind::Fixed64 => UINT64_BOUNDARIES,
        _ => &[0, 1],
    }
}

fn bit_width(kind: &Kind) -> u32 {
    match kind {
        Kind::Bool => 1,
        Kind::Int32
        | Kind::Sint32
        | Kind::Sfixed32
        | Kind::Enum(_)
        | Kind::Uint32
        | Kind::Fixed32
        | Kind::Float => 32,
        _ => 64,
    }
}

/// Declared number of an enum, biased towards declared values
fn declared_number(kind: &Kind, rng: &mut StdRng) -> Option<u64> {
    let Kind::Enum(descriptor) = kind else {
        return None;
    };
    if !rng.gen_bool(0.75) {
        return None;
    }
    let numbers: Vec<i32> = descriptor.values().map(|v| v.number()).collect();
    numbers.choose(rng).map(|n| i64::from(*n) as u64)
}

fn random_bits(kind: &Kind, rng: &mut StdRng) -> u64 {
    if let Some(number) = declared_number(kind, rng) {
        return number;
    }
    match kind {
        Kind::Float => u64::from(special_f32(rng).to_bits()),
        Kind::Double => special_f64(rng).to_bits(),
        _ => match rng.gen_range(0..3) {
            0 => boundaries(kind).choose(rng).copied().unwrap_or(0),
            1 => rng.gen_range(0..=16),
            _ => rng.gen(),
        },
    }
}

fn mutate_bits(kind: &Kind, bits: u64, rng: &mut StdRng) -> u64 {
    if matches!(kind, Kind::Bool) {
        return bits ^ 1;
    }
    if let Some(number) = declared_number(kind, rng) {
        return number;
    }
    match kind {
        Kind::Float => {
            let value = f32::from_bits(bits as u32);
            let next = match rng.gen_range(0..4) {
                0 => special_f32(rng),
                1 => value + rng.gen_range(-16.0..16.0),
                2 => -value,
                _ => f32::from_bits((bits as u32) ^ (1u32 << rng.gen_range(0..32u32))),
            };
            u64::from(next.to_bits())
        }
        Kind::Double => {
            let value = f64::from_bits(bits);
            let next = match rng.gen_range(0..4) {
                0 => special_f64(rng),
                1 => value + rng.gen_range(-16.0..16.0),
                2 => -value,
                _ => f64::from_bits(bits ^ (1u64 << rng.gen_range(0..64u32))),
            };
            next.to_bits()
        }
        _ => match rng.gen_range(0..4) {
            0 => bits ^ (1u64 << rng.gen_range(0..bit_width(kind))),
            1 => {
                let delta = rng.gen_range(1..=16u64);
                if rng.gen_bool(0.5) {
                    bits.wrapping_add(delta)
                } else {
                    bits.wrapping_sub(delta)
                }
            }
            2 => boundaries(kind).choose(rng).copied().unwrap_or(bits),
            _ => rng.gen(),
        },
    }
}

fn special_f32(rng: &mut StdRng) -> f32 {
    let specials = [
        0.0,
        -0.0,
        1.0,
        -1.0,
        f32::NAN,
        f32::INFINITY,
        f32::NEG_INFINITY,
        f32::MIN_POSITIVE,
        f32::MAX,
        f32::MIN,
        f32::EPSILON,
    ];
    specials.choose(rng).copied().unwrap_or(0.0)
}

fn special_f64(rng: &mut StdRng) -> f64 {
    let specials = [
        0.0,
        -0.0,
        1.0,
        -1.0,
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::MIN_POSITIVE,
        f64::MAX,
        f64::MIN,
        f64::EPSILON,
    ];
    specials.choose(rng).copied().unwrap_or(0.0)
}

fn random_char(rng: &mut StdRng) -> char {
    const INTERESTING: &[char] = &[
        '\0', '\n', '%', '\'', '"', '\\', '/', '{', '\u{7f}', '\u{fffd}', '\u{202e}', '\u{1f600}',
    ];
    match rng.gen_range(0..10) {
        0 => INTERESTING.choose(rng).copied().unwrap_or('\0'),
        1 => rng.gen(),
        _ => char::from(rng.gen_range(0x20u8..0x7f)),
    }
}

fn mutate_string(s: &mut String, growth: usize, rng: &mut StdRng) {
    let mut chars: Vec<char> = s.chars().collect();
    mutate_sequence(&mut chars, growth, rng, random_char);
    *s = chars.into_iter().collect();
}

fn mutate_bytes(b: &mut Vec<u8>, growth: usize, rng: &mut StdRng) {
    if !b.is_empty() && rng.gen_bool(0.2) {
        let at = rng.gen_range(0..b.len());
        if let Some(byte) = b.get_mut(at) {
            *byte ^= 1u8 << rng.gen_range(0..8u32);
        }
        return;
    }
    mutate_sequence(b, growth, rng, |rng| rng.gen());
}

/// Edits shared by strings (as chars) and bytes. Grows by at most `growth`.
fn mutate_sequence<T: Clone>(
    items: &mut Vec<T>,
    growth: usize,
    rng: &mut StdRng,
    mut make: impl FnMut(&mut StdRng) -> T,
) {
    let growth = growth.max(1);
    let len = items.len();

    match rng.gen_range(0..5) {
        1 if len > 0 => {
            let start = rng.gen_range(0..len);
            let end = rng.gen_range(start + 1..=len);
            items.drain(start..end);
        }
        2 if len > 0 => {
            let at = rng.gen_range(0..len);
            let replacement = make(rng);
            if let Some(slot) = items.get_mut(at) {
                *slot = replacement;
            }
        }
        3 if len > 0 => items.truncate(rng.gen_range(0..len)),
        4 if len > 0 => {
            let start = rng.gen_range(0..len);
            let end = rng.gen_range(start + 1..=len.min(start.saturating_add(growth)));
            if let Some(chunk) = items.get(start..end).map(<[T]>::to_vec) {
                let tail = items.split_off(end);
                items.extend(chunk);
                items.extend(tail);
            }
        }
        _ => {
            let count = rng.gen_range(1..=growth);
            let at = rng.gen_range(0..=len);
            let tail = items.split_off(at);
            items.extend((0..count).map(|_| make(rng)));
            items.extend(tail);
        }
    }
}
