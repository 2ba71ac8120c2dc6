use core::fmt;

use serde::{Deserialize, Serialize};

/// Block execution phase an event was emitted in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Applying the extrinsic at the given index.
    ApplyExtrinsic(u32),
    Finalization,
    Initialization,
}

impl Phase {
    #[must_use]
    pub const fn extrinsic_index(self) -> Option<u32> {
        match self {
            Self::ApplyExtrinsic(index) => Some(index),
            Self::Finalization | Self::Initialization => None,
        }
    }
}

/// Decoded entry of the `System.Events` log of one block.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub phase: Phase,
    pub pallet: String,
    pub variant: String,
    pub fields: Vec<EventField>,
}

impl EventRecord {
    #[must_use]
    pub fn is(&self, pallet: &str, variant: &str) -> bool {
        self.pallet == pallet && self.variant == variant
    }

    /// Field by name, falling back to position for unnamed payloads.
    #[must_use]
    pub fn field(&self, name: &str, position: usize) -> Option<&EventValue> {
        self.fields
            .iter()
            .find(|field| field.name.as_deref() == Some(name))
            .or_else(|| self.fields.get(position))
            .map(|field| &field.value)
    }

    #[must_use]
    pub fn field_at(&self, position: usize) -> Option<&EventValue> {
        self.fields.get(position).map(|field| &field.value)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pallet, self.variant)?;
        fmt_fields(f, &self.fields)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EventField {
    pub name: Option<String>,
    pub value: EventValue,
}

impl EventField {
    #[must_use]
    pub fn named(name: impl Into<String>, value: EventValue) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }

    #[must_use]
    pub const fn unnamed(value: EventValue) -> Self {
        Self { name: None, value }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventValue {
    Bool(bool),
    Char(char),
    Str(String),
    U128(u128),
    I128(i128),
    Bytes(Vec<u8>),
    Composite(Vec<EventField>),
    Variant {
        name: String,
        fields: Vec<EventField>,
    },
}

impl EventValue {
    #[must_use]
    pub fn variant(name: impl Into<String>, fields: Vec<EventField>) -> Self {
        Self::Variant {
            name: name.into(),
            fields,
        }
    }

    #[must_use]
    pub const fn as_u128(&self) -> Option<u128> {
        match self {
            Self::U128(v) => Some(*v),
            _ => None,
        }
    }

    /// Named or positional member of a composite or variant payload.
    #[must_use]
    pub fn member(&self, name: &str, position: usize) -> Option<&Self> {
        let fields = match self {
            Self::Composite(fields) | Self::Variant { fields, .. } => fields,
            _ => return None,
        };
        fields
            .iter()
            .find(|field| field.name.as_deref() == Some(name))
            .or_else(|| fields.get(position))
            .map(|field| &field.value)
    }

    /// Flattens byte-like values: raw bytes, composites of `u8` sized
    /// numbers, and single-member wrappers around either (e.g. `H256`).
    #[must_use]
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Some(bytes.clone()),
            Self::Composite(fields) if fields.len() == 1 => fields[0].value.as_bytes(),
            Self::Composite(fields) if !fields.is_empty() => fields
                .iter()
                .map(|field| field.value.as_u128().and_then(|v| u8::try_from(v).ok()))
                .collect(),
            _ => None,
        }
    }

    /// Flattens to a single number, unwrapping one-member composites and
    /// taking the first byte of byte arrays (module error codes are
    /// `[u8; 4]` on recent runtimes and `u8` on older ones).
    #[must_use]
    pub fn leading_u8(&self) -> Option<u8> {
        match self {
            Self::U128(v) => u8::try_from(*v).ok(),
            Self::Composite(fields) if fields.len() == 1 => fields[0].value.leading_u8(),
            _ => self.as_bytes().and_then(|bytes| bytes.first().copied()),
        }
    }
}

fn fmt_fields(f: &mut fmt::Formatter<'_>, fields: &[EventField]) -> fmt::Result {
    if fields.is_empty() {
        return Ok(());
    }
    let named = fields.iter().all(|field| field.name.is_some());
    f.write_str(if named { " { " } else { "(" })?;
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(name) = &field.name {
            write!(f, "{name}: ")?;
        }
        write!(f, "{}", field.value)?;
    }
    f.write_str(if named { " }" } else { ")" })
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::U128(v) => write!(f, "{v}"),
            Self::I128(v) => write!(f, "{v}"),
            Self::Bytes(v) => f.write_str(&const_hex::encode_prefixed(v)),
            Self::Composite(fields) => match self.as_bytes() {
                Some(bytes) if fields.len() > 1 => f.write_str(&const_hex::encode_prefixed(bytes)),
                _ if fields.is_empty() => f.write_str("()"),
                _ => fmt_fields(f, fields),
            },
            Self::Variant { name, fields } => {
                f.write_str(name)?;
                fmt_fields(f, fields)
            }
        }
    }
}
