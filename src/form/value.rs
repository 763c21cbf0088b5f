//! Field names and values accepted by [`UploadForm`](super::UploadForm).

use anyhow::{Context, Result};
use bytes::Bytes;
use std::borrow::Cow;

/// Name of a form field, given either as text or as raw bytes.
///
/// Byte names are decoded as UTF-8 when the form is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldName {
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldName {
    pub(crate) fn decode(&self) -> Result<Cow<'_, str>> {
        match self {
            FieldName::Text(s) => Ok(Cow::Borrowed(s)),
            FieldName::Bytes(b) => std::str::from_utf8(b)
                .map(Cow::Borrowed)
                .with_context(|| format!("Field name {:?} is not valid UTF-8", b)),
        }
    }
}

impl From<&str> for FieldName {
    fn from(s: &str) -> Self {
        FieldName::Text(s.to_string())
    }
}

impl From<String> for FieldName {
    fn from(s: String) -> Self {
        FieldName::Text(s)
    }
}

impl From<&[u8]> for FieldName {
    fn from(b: &[u8]) -> Self {
        FieldName::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for FieldName {
    fn from(b: Vec<u8>) -> Self {
        FieldName::Bytes(b)
    }
}

/// A single scalar field value.
///
/// Bytes are written to the body untouched; text is written as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Bytes(Bytes),
}

impl FormValue {
    pub(crate) fn into_bytes(self) -> Bytes {
        match self {
            FormValue::Text(s) => Bytes::from(s),
            FormValue::Bytes(b) => b,
        }
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        FormValue::Text(s.to_string())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        FormValue::Text(s)
    }
}

impl From<&String> for FormValue {
    fn from(s: &String) -> Self {
        FormValue::Text(s.clone())
    }
}

impl From<Bytes> for FormValue {
    fn from(b: Bytes) -> Self {
        FormValue::Bytes(b)
    }
}

impl From<Vec<u8>> for FormValue {
    fn from(b: Vec<u8>) -> Self {
        FormValue::Bytes(Bytes::from(b))
    }
}

impl From<&[u8]> for FormValue {
    fn from(b: &[u8]) -> Self {
        FormValue::Bytes(Bytes::copy_from_slice(b))
    }
}

macro_rules! display_form_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for FormValue {
                fn from(v: $t) -> Self {
                    FormValue::Text(v.to_string())
                }
            }
        )*
    };
}

display_form_value!(bool, char, i32, i64, u32, u64, usize, f64);

/// The value side of a form field: zero or more optional scalars.
///
/// A scalar becomes a one-element sequence. `None` elements are dropped at
/// encoding time, so a field whose every element is `None` produces no part.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldValue(Vec<Option<FormValue>>);

impl FieldValue {
    /// A value that is absent; the field is skipped when encoding.
    pub fn null() -> Self {
        FieldValue(vec![None])
    }

    /// One part per element, in iteration order.
    pub fn many<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FormValue>,
    {
        FieldValue(items.into_iter().map(|v| Some(v.into())).collect())
    }

    /// Like [`FieldValue::many`], but `None` elements are accepted and dropped.
    pub fn many_optional<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = Option<T>>,
        T: Into<FormValue>,
    {
        FieldValue(items.into_iter().map(|v| v.map(Into::into)).collect())
    }

    pub(crate) fn into_present(self) -> impl Iterator<Item = FormValue> {
        self.0.into_iter().flatten()
    }
}

impl From<FormValue> for FieldValue {
    fn from(v: FormValue) -> Self {
        FieldValue(vec![Some(v)])
    }
}

impl From<Option<FormValue>> for FieldValue {
    fn from(v: Option<FormValue>) -> Self {
        FieldValue(vec![v])
    }
}

macro_rules! scalar_field_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue(vec![Some(FormValue::from(v))])
                }
            }

            impl From<Option<$t>> for FieldValue {
                fn from(v: Option<$t>) -> Self {
                    FieldValue(vec![v.map(FormValue::from)])
                }
            }
        )*
    };
}

scalar_field_value!(
    &str, String, &String, Bytes, Vec<u8>, &[u8], bool, char, i32, i64, u32, u64, usize, f64,
);
