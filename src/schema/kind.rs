use std::{fmt, time::Duration};


/// The closed set of leaf types a configuration field can have.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FieldKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    String,
    /// A [`Duration`], written as humantime text (`1m30s`) or integer nanoseconds.
    Duration,
    /// A `Vec<u8>`, written as standard base64 text.
    Bytes,
    /// A `Vec<String>`, written as repeated flags or comma-separated text.
    StringList,
}

impl FieldKind {
    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            FieldKind::I8 | FieldKind::I16 | FieldKind::I32 | FieldKind::I64 | FieldKind::Isize
        )
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            FieldKind::U8 | FieldKind::U16 | FieldKind::U32 | FieldKind::U64 | FieldKind::Usize
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, FieldKind::F32 | FieldKind::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer() || self.is_float()
    }

    /// Scalars are the kinds whose default literal can be attached to a flag definition.
    pub fn is_scalar(self) -> bool {
        !matches!(self, FieldKind::Bytes | FieldKind::StringList)
    }

    /// Inclusive range of a signed integer kind.
    pub(crate) fn signed_range(self) -> Option<(i64, i64)> {
        match self {
            FieldKind::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            FieldKind::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            FieldKind::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            FieldKind::I64 => Some((i64::MIN, i64::MAX)),
            FieldKind::Isize => Some((isize::MIN as i64, isize::MAX as i64)),
            _ => None,
        }
    }

    /// Upper bound of an unsigned integer kind.
    pub(crate) fn unsigned_max(self) -> Option<u64> {
        match self {
            FieldKind::U8 => Some(u8::MAX as u64),
            FieldKind::U16 => Some(u16::MAX as u64),
            FieldKind::U32 => Some(u32::MAX as u64),
            FieldKind::U64 => Some(u64::MAX),
            FieldKind::Usize => Some(usize::MAX as u64),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::I8 => "i8",
            FieldKind::I16 => "i16",
            FieldKind::I32 => "i32",
            FieldKind::I64 => "i64",
            FieldKind::Isize => "isize",
            FieldKind::U8 => "u8",
            FieldKind::U16 => "u16",
            FieldKind::U32 => "u32",
            FieldKind::U64 => "u64",
            FieldKind::Usize => "usize",
            FieldKind::F32 => "f32",
            FieldKind::F64 => "f64",
            FieldKind::String => "String",
            FieldKind::Duration => "Duration",
            FieldKind::Bytes => "Vec<u8>",
            FieldKind::StringList => "Vec<String>",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}


/// Maps a Rust field type onto its [`FieldKind`], see [`Field::of`][super::Field::of].
pub trait LeafKind {
    const KIND: FieldKind;
}

macro_rules! impl_leaf_kind {
    ($($rust_type:ty => $kind:ident),* $(,)?) => {
        $(
            impl LeafKind for $rust_type {
                const KIND: FieldKind = FieldKind::$kind;
            }
        )*
    };
}

impl_leaf_kind!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    String => String,
    Duration => Duration,
    Vec<u8> => Bytes,
    Vec<String> => StringList,
);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_types_map_to_their_kinds() {
        assert_eq!(<u16 as LeafKind>::KIND, FieldKind::U16);
        assert_eq!(<Duration as LeafKind>::KIND, FieldKind::Duration);
        assert_eq!(<Vec<u8> as LeafKind>::KIND, FieldKind::Bytes);
        assert_eq!(<Vec<String> as LeafKind>::KIND, FieldKind::StringList);
    }

    #[test]
    fn integer_ranges_follow_the_width() {
        assert_eq!(FieldKind::I8.signed_range(), Some((-128, 127)));
        assert_eq!(FieldKind::U16.unsigned_max(), Some(65535));
        assert_eq!(FieldKind::String.signed_range(), None);
    }

    #[test]
    fn lists_are_not_scalars() {
        assert!(FieldKind::Duration.is_scalar());
        assert!(!FieldKind::Bytes.is_scalar());
        assert!(!FieldKind::StringList.is_scalar());
    }
}
