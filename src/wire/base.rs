//! The protocol's base types and their invalid sentinels.

/// A base type, as declared by the third byte of a field definition.
///
/// The code encodes element width, signedness, and endianness sensitivity.
/// Every base type reserves one bit pattern per element as its 'invalid'
/// sentinel, meaning no value is present: all bits set for the unsigned
/// family (including `Enum` and `Byte`), zero for the `z` variants, the
/// greatest positive value for the signed family, and the all-ones bit
/// pattern for floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    /// `enum`
    Enum,
    /// `sint8`
    SInt8,
    /// `uint8`
    UInt8,
    /// `sint16`
    SInt16,
    /// `uint16`
    UInt16,
    /// `sint32`
    SInt32,
    /// `uint32`
    UInt32,
    /// `string`, null-terminated
    Text,
    /// `float32`
    Float32,
    /// `float64`
    Float64,
    /// `uint8z`
    UInt8z,
    /// `uint16z`
    UInt16z,
    /// `uint32z`
    UInt32z,
    /// `byte`, an opaque array
    Byte,
    /// `sint64`
    SInt64,
    /// `uint64`
    UInt64,
    /// `uint64z`
    UInt64z,
}

impl BaseType {
    /// Resolve a base type code.
    ///
    /// Codes outside the protocol's table return `None`; callers treat those
    /// fields as opaque bytes so documents written against a newer protocol
    /// still decode.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Self::Enum,
            0x01 => Self::SInt8,
            0x02 => Self::UInt8,
            0x83 => Self::SInt16,
            0x84 => Self::UInt16,
            0x85 => Self::SInt32,
            0x86 => Self::UInt32,
            0x07 => Self::Text,
            0x88 => Self::Float32,
            0x89 => Self::Float64,
            0x0A => Self::UInt8z,
            0x8B => Self::UInt16z,
            0x8C => Self::UInt32z,
            0x0D => Self::Byte,
            0x8E => Self::SInt64,
            0x8F => Self::UInt64,
            0x90 => Self::UInt64z,
            _ => return None,
        })
    }

    /// Element width in bytes.
    ///
    /// A field whose declared size is a multiple of this width greater than
    /// one element is an array.
    pub fn size(self) -> usize {
        match self {
            Self::Enum | Self::SInt8 | Self::UInt8 | Self::UInt8z | Self::Text | Self::Byte => 1,
            Self::SInt16 | Self::UInt16 | Self::UInt16z => 2,
            Self::SInt32 | Self::UInt32 | Self::UInt32z | Self::Float32 => 4,
            Self::SInt64 | Self::UInt64 | Self::UInt64z | Self::Float64 => 8,
        }
    }

    /// Extract one element, rejecting the invalid sentinel.
    ///
    /// `r` must hold exactly [`Self::size`] bytes. Returns `None` when the
    /// element holds its base type's sentinel. `Text` and `Byte` elements
    /// carry no per-element sentinel here; their absence rules apply to the
    /// whole field and are the caller's concern.
    pub fn extract(self, r: &[u8], big_endian: bool) -> Option<RawScalar> {
        macro_rules! int {
            ($t:ty, $invalid:expr, $variant:ident) => {{
                let x = if big_endian {
                    <$t>::from_be_bytes(r.try_into().ok()?)
                } else {
                    <$t>::from_le_bytes(r.try_into().ok()?)
                };

                (x != $invalid).then(|| RawScalar::$variant(x.into()))
            }};
        }

        macro_rules! float {
            ($b:ty, $f:ty) => {{
                let bits = if big_endian {
                    <$b>::from_be_bytes(r.try_into().ok()?)
                } else {
                    <$b>::from_le_bytes(r.try_into().ok()?)
                };

                (bits != <$b>::MAX).then(|| RawScalar::Float(<$f>::from_bits(bits).into()))
            }};
        }

        match self {
            Self::Enum => int!(u8, u8::MAX, Unsigned),
            Self::UInt8 => int!(u8, u8::MAX, Unsigned),
            Self::UInt8z => int!(u8, u8::MIN, Unsigned),
            Self::SInt8 => int!(i8, i8::MAX, Signed),
            Self::UInt16 => int!(u16, u16::MAX, Unsigned),
            Self::UInt16z => int!(u16, u16::MIN, Unsigned),
            Self::SInt16 => int!(i16, i16::MAX, Signed),
            Self::UInt32 => int!(u32, u32::MAX, Unsigned),
            Self::UInt32z => int!(u32, u32::MIN, Unsigned),
            Self::SInt32 => int!(i32, i32::MAX, Signed),
            Self::UInt64 => int!(u64, u64::MAX, Unsigned),
            Self::UInt64z => int!(u64, u64::MIN, Unsigned),
            Self::SInt64 => int!(i64, i64::MAX, Signed),
            Self::Float32 => float!(u32, f32),
            Self::Float64 => float!(u64, f64),
            Self::Text | Self::Byte => Some(RawScalar::Unsigned((*r.first()?).into())),
        }
    }
}

/// One extracted element, prior to scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawScalar {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl RawScalar {
    /// The element widened to a signed integer, for guard comparison.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Unsigned(x) => x as i64,
            Self::Signed(x) => x,
            Self::Float(x) => x as i64,
        }
    }

    /// The element widened to a float, for scaling.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Unsigned(x) => x as f64,
            Self::Signed(x) => x as f64,
            Self::Float(x) => x,
        }
    }
}
