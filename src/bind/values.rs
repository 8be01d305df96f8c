//! Conversions between native Rust values and ABI values.

use alloy::dyn_abi::{DynSolType, DynSolValue, Word};
use alloy::primitives::{Address, Bytes, FixedBytes, I256, U256};

use super::error::{Error, Result};

/// Native value usable as a contract argument.
pub trait IntoSolValue {
    fn into_sol_value(self) -> DynSolValue;
}

/// Native value a decoded ABI value can be converted into.
pub trait FromSolValue: Sized {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String>;
}

impl IntoSolValue for DynSolValue {
    fn into_sol_value(self) -> DynSolValue {
        self
    }
}

impl FromSolValue for DynSolValue {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        Ok(value)
    }
}

impl IntoSolValue for bool {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::Bool(self)
    }
}

impl FromSolValue for bool {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        match value {
            DynSolValue::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl IntoSolValue for Address {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::Address(self)
    }
}

impl FromSolValue for Address {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        match value {
            DynSolValue::Address(address) => Ok(address),
            other => Err(mismatch("address", &other)),
        }
    }
}

impl IntoSolValue for String {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::String(self)
    }
}

impl IntoSolValue for &str {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::String(self.to_string())
    }
}

impl FromSolValue for String {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        match value {
            DynSolValue::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl IntoSolValue for Bytes {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::Bytes(self.to_vec())
    }
}

impl FromSolValue for Bytes {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        match value {
            DynSolValue::Bytes(bytes) => Ok(Bytes::from(bytes)),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl IntoSolValue for U256 {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::Uint(self, 256)
    }
}

impl FromSolValue for U256 {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        match value {
            DynSolValue::Uint(n, _) => Ok(n),
            other => Err(mismatch("uint", &other)),
        }
    }
}

impl IntoSolValue for I256 {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::Int(self, 256)
    }
}

impl FromSolValue for I256 {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        match value {
            DynSolValue::Int(n, _) => Ok(n),
            other => Err(mismatch("int", &other)),
        }
    }
}

macro_rules! impl_small_uint {
    ($($t:ty),+) => {$(
        impl IntoSolValue for $t {
            fn into_sol_value(self) -> DynSolValue {
                DynSolValue::Uint(U256::from(self), <$t>::BITS as usize)
            }
        }

        impl FromSolValue for $t {
            fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
                match value {
                    DynSolValue::Uint(n, bits) => <$t>::try_from(n)
                        .map_err(|_| format!("uint{} value {} overflows {}", bits, n, stringify!($t))),
                    other => Err(mismatch("uint", &other)),
                }
            }
        }
    )+};
}

impl_small_uint!(u8, u16, u32, u64);

/// Solidity has no fixed-size byte type wider than one word.
const fn assert_fits_word<const N: usize>() {
    assert!(N >= 1 && N <= 32, "bytesN requires 1 <= N <= 32");
}

impl<const N: usize> IntoSolValue for FixedBytes<N> {
    fn into_sol_value(self) -> DynSolValue {
        const { assert_fits_word::<N>() };
        let mut word = Word::ZERO;
        word[..N].copy_from_slice(self.as_slice());
        DynSolValue::FixedBytes(word, N)
    }
}

impl<const N: usize> FromSolValue for FixedBytes<N> {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        const { assert_fits_word::<N>() };
        match value {
            DynSolValue::FixedBytes(word, size) if size == N => {
                Ok(FixedBytes::from_slice(&word[..N]))
            }
            other => Err(mismatch(&format!("bytes{}", N), &other)),
        }
    }
}

impl<T: IntoSolValue> IntoSolValue for Vec<T> {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::Array(self.into_iter().map(IntoSolValue::into_sol_value).collect())
    }
}

impl<T: FromSolValue> FromSolValue for Vec<T> {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        match value {
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
                items.into_iter().map(T::from_sol_value).collect()
            }
            other => Err(mismatch("array", &other)),
        }
    }
}

impl<T: IntoSolValue, const N: usize> IntoSolValue for [T; N] {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::FixedArray(self.into_iter().map(IntoSolValue::into_sol_value).collect())
    }
}

impl<T: FromSolValue, const N: usize> FromSolValue for [T; N] {
    fn from_sol_value(value: DynSolValue) -> Result<Self, String> {
        match value {
            DynSolValue::FixedArray(items) => {
                let len = items.len();
                let items = items
                    .into_iter()
                    .map(T::from_sol_value)
                    .collect::<Result<Vec<_>, _>>()?;
                items
                    .try_into()
                    .map_err(|_| format!("expected {} array elements, got {}", N, len))
            }
            other => Err(mismatch(&format!("fixed array [{}]", N), &other)),
        }
    }
}

/// Builds one topic rule from the accepted values of an indexed argument.
/// An empty slice matches any value.
pub fn rule<T: IntoSolValue + Clone>(accepted: &[T]) -> Vec<DynSolValue> {
    accepted.iter().cloned().map(IntoSolValue::into_sol_value).collect()
}

fn mismatch(expected: &str, got: &DynSolValue) -> String {
    match got.as_type() {
        Some(ty) => format!("expected {}, got {}", expected, ty.sol_type_name()),
        None => format!("expected {}, got {:?}", expected, got),
    }
}

/// Cursor over decoded values in ABI declaration order.
#[derive(Debug)]
pub struct Values {
    name: String,
    inner: std::vec::IntoIter<DynSolValue>,
    position: usize,
}

impl Values {
    pub fn new(name: impl Into<String>, values: Vec<DynSolValue>) -> Self {
        Self {
            name: name.into(),
            inner: values.into_iter(),
            position: 0,
        }
    }

    /// Converts the next value, failing on a missing or mistyped field.
    pub fn take<T: FromSolValue>(&mut self) -> Result<T> {
        let position = self.position;
        self.position += 1;
        let value = self.inner.next().ok_or_else(|| {
            Error::decode(&self.name, format!("missing value at position {}", position))
        })?;
        T::from_sol_value(value)
            .map_err(|e| Error::decode(&self.name, format!("position {}: {}", position, e)))
    }

    /// Splits the next tuple value into its own cursor.
    pub fn take_tuple(&mut self) -> Result<Values> {
        let position = self.position;
        match self.take::<DynSolValue>()? {
            DynSolValue::Tuple(fields) => Ok(Values::new(self.name.clone(), fields)),
            other => Err(Error::decode(
                &self.name,
                format!("position {}: {}", position, mismatch("tuple", &other)),
            )),
        }
    }
}

/// Rewrites `value` so it carries exactly the widths and sizes of `ty`.
///
/// Native arguments are converted with their own natural width (a `u32`
/// becomes `uint32`, a `U256` becomes `uint256`); the declared parameter
/// type decides what is actually encoded. Values that cannot represent the
/// target type are rejected.
pub fn conform(value: DynSolValue, ty: &DynSolType) -> Result<DynSolValue, String> {
    match (value, ty) {
        (DynSolValue::Uint(n, _), DynSolType::Uint(bits)) => {
            if *bits < 256 && n.bit_len() > *bits {
                return Err(format!("value {} does not fit uint{}", n, bits));
            }
            Ok(DynSolValue::Uint(n, *bits))
        }
        (DynSolValue::Int(n, _), DynSolType::Int(bits)) => {
            if *bits < 256 {
                let max = I256::MAX.asr(256 - *bits);
                let min = I256::MIN.asr(256 - *bits);
                if n > max || n < min {
                    return Err(format!("value {} does not fit int{}", n, bits));
                }
            }
            Ok(DynSolValue::Int(n, *bits))
        }
        (DynSolValue::Uint(n, _), DynSolType::Int(bits)) => {
            let n = I256::try_from(n).map_err(|_| format!("value {} does not fit int{}", n, bits))?;
            conform(DynSolValue::Int(n, 256), ty)
        }
        (DynSolValue::FixedBytes(word, size), DynSolType::FixedBytes(target)) => {
            if size > *target && word[*target..].iter().any(|b| *b != 0) {
                return Err(format!("bytes{} does not fit bytes{}", size, target));
            }
            Ok(DynSolValue::FixedBytes(word, *target))
        }
        (DynSolValue::Array(items), DynSolType::Array(inner)) => items
            .into_iter()
            .map(|item| conform(item, inner))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Array),
        (DynSolValue::FixedArray(items), DynSolType::FixedArray(inner, len))
        | (DynSolValue::Array(items), DynSolType::FixedArray(inner, len)) => {
            if items.len() != *len {
                return Err(format!("expected {} array elements, got {}", len, items.len()));
            }
            items
                .into_iter()
                .map(|item| conform(item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray)
        }
        (DynSolValue::Tuple(fields), DynSolType::Tuple(types)) => {
            if fields.len() != types.len() {
                return Err(format!(
                    "expected tuple of {} fields, got {}",
                    types.len(),
                    fields.len()
                ));
            }
            fields
                .into_iter()
                .zip(types)
                .map(|(field, ty)| conform(field, ty))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple)
        }
        (value, ty) => {
            if ty.matches(&value) {
                Ok(value)
            } else {
                Err(mismatch(&ty.sol_type_name(), &value))
            }
        }
    }
}
