use blake2::{digest::consts::U32, Blake2b, Digest as _};

type Blake2b256 = Blake2b<U32>;

macro_rules! hex_bytes_newtype {
    ($(#[$meta:meta])* $newtype:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $newtype([u8; 32]);

        impl $newtype {
            #[must_use]
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            #[must_use]
            pub fn to_hex(&self) -> String {
                const_hex::encode_prefixed(self.0)
            }
        }

        impl From<[u8; 32]> for $newtype {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl From<$newtype> for [u8; 32] {
            fn from(value: $newtype) -> Self {
                value.0
            }
        }

        impl TryFrom<&[u8]> for $newtype {
            type Error = Error;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let bytes: [u8; 32] = slice
                    .try_into()
                    .map_err(|_| Error::InvalidLength(slice.len()))?;
                Ok(Self(bytes))
            }
        }

        impl core::str::FromStr for $newtype {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                const_hex::decode_to_array(s)
                    .map(Self)
                    .map_err(|e| Error::InvalidHex(e.to_string()))
            }
        }

        impl core::fmt::Display for $newtype {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                write!(f, "0x")?;
                for v in self.0 {
                    write!(f, "{v:02x}")?;
                }
                Ok(())
            }
        }

        impl serde::Serialize for $newtype {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                if serializer.is_human_readable() {
                    self.to_hex().serialize(serializer)
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $newtype {
            fn deserialize<D>(deserializer: D) -> Result<$newtype, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                if deserializer.is_human_readable() {
                    let s = <String>::deserialize(deserializer)?;
                    s.parse().map_err(serde::de::Error::custom)
                } else {
                    <[u8; 32]>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

hex_bytes_newtype!(
    /// Hash of a sealed block, as returned by `engine_createBlock`.
    BlockHash
);
hex_bytes_newtype!(
    /// Dispatch acknowledgment hash of a submitted transaction.
    TxHash
);
hex_bytes_newtype!(AccountId);

/// blake2b-256 over `bytes`, the hasher substrate uses for extrinsics.
#[must_use]
pub fn blake2_256(bytes: &[u8]) -> [u8; 32] {
    Blake2b256::digest(bytes).into()
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid hash size: {0}")]
    InvalidLength(usize),
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),
}
