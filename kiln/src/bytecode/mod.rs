//! Program bytecode format
//!
//! A linked program is a list of variable-length instructions.  Each
//! instruction is identified by its [`Address`] (an index into the program's
//! address table, which stores the instruction's byte offset) and is encoded
//! as a little-endian `u16` [`OpType`] followed by a packed argument record
//! (see [`args`]).
//!
//! Address 0 is always the reserved [`OpType::None`] instruction, which is
//! also how missing children are encoded.
//!
//! The format is **not stable**; it may change without notice.  Interpreters
//! in other languages should check themselves against [`iter_ops`], which
//! associates opcode integers with their names.
pub mod args;

use crate::graph::DataType;
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

/// Address of an instruction in a linked program
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
)]
pub struct Address(pub u32);

assert_eq_size!(Address, u32);

impl Address {
    /// The reserved null instruction
    pub const NULL: Address = Address(0);

    /// Checks whether this is the null address
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Returns the address as an index into the address table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Instruction opcode
///
/// Opcodes are prefixed by the type of data they produce: `Bo` (bool), `Nu`
/// (int), `Sc` (scalar), `Co` (color), `St` (string), `Ma` (matrix), `Pr`
/// (projector), `Im` (image), `Me` (mesh), `La` (layout), `In` (instance), and
/// `Ed` (extension data).
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::FromRepr,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum OpType {
    None = 0,

    BoConstant,
    NuConstant,
    ScConstant,
    CoConstant,
    StConstant,
    MaConstant,
    PrConstant,
    ImConstant,
    MeConstant,
    LaConstant,
    EdConstant,

    BoParameter,
    NuParameter,
    ScParameter,
    CoParameter,
    StParameter,
    MaParameter,
    PrParameter,
    ImParameter,
    MeParameter,

    BoConditional,
    NuConditional,
    ScConditional,
    CoConditional,
    StConditional,
    MaConditional,
    PrConditional,
    ImConditional,
    MeConditional,
    LaConditional,
    InConditional,
    EdConditional,

    BoSwitch,
    NuSwitch,
    ScSwitch,
    CoSwitch,
    StSwitch,
    MaSwitch,
    PrSwitch,
    ImSwitch,
    MeSwitch,
    LaSwitch,
    InSwitch,
    EdSwitch,

    BoAnd,
    BoOr,
    BoNot,
    BoEqualIntConst,

    NuArithmetic,
    ScArithmetic,
    CoArithmetic,
    ScCurve,
    CoFromScalars,
    CoSampleImage,

    ImMipmap,
    ImPixelFormat,
    ImResize,
    ImResizeLike,
    ImLayer,
    ImLayerColor,
    ImPlainColor,
    ImCompose,
    ImInterpolate,
    ImSwizzle,
    ImDisplace,
    ImCrop,

    MeMorph,
    MeMerge,
    MeMaskClip,
    MeClipShape,
    MeRemoveMask,
    MeFormat,
    MeTransform,
    MeExtractLayoutBlocks,
    MeAddTags,
    MeApplyLayout,
    MeApplyPose,
    MeSetSkeleton,
    MeProject,

    LaPack,
    LaMerge,
    LaFromMesh,
    LaRemoveBlocks,

    InAddComponent,
    InAddSurface,
    InAddMesh,
    InAddImage,
    InAddVector,
    InAddScalar,
    InAddString,
    InAddExtensionData,
    InAddLod,
}

impl OpType {
    /// Returns the constant opcode for the given type
    ///
    /// # Panics
    /// If the type has no constant opcode
    pub fn constant(ty: DataType) -> Self {
        match ty {
            DataType::Bool => OpType::BoConstant,
            DataType::Int => OpType::NuConstant,
            DataType::Scalar => OpType::ScConstant,
            DataType::Color => OpType::CoConstant,
            DataType::String => OpType::StConstant,
            DataType::Matrix => OpType::MaConstant,
            DataType::Projector => OpType::PrConstant,
            DataType::Image => OpType::ImConstant,
            DataType::Mesh => OpType::MeConstant,
            DataType::Layout => OpType::LaConstant,
            DataType::ExtensionData => OpType::EdConstant,
            ty => panic!("no constant opcode for {ty:?}"),
        }
    }

    /// Returns the parameter opcode for the given type
    ///
    /// # Panics
    /// If the type can't be a parameter
    pub fn parameter(ty: DataType) -> Self {
        match ty {
            DataType::Bool => OpType::BoParameter,
            DataType::Int => OpType::NuParameter,
            DataType::Scalar => OpType::ScParameter,
            DataType::Color => OpType::CoParameter,
            DataType::String => OpType::StParameter,
            DataType::Matrix => OpType::MaParameter,
            DataType::Projector => OpType::PrParameter,
            DataType::Image => OpType::ImParameter,
            DataType::Mesh => OpType::MeParameter,
            ty => panic!("no parameter opcode for {ty:?}"),
        }
    }

    /// Returns the conditional opcode for the given type
    ///
    /// # Panics
    /// If the type is [`DataType::None`]
    pub fn conditional(ty: DataType) -> Self {
        match ty {
            DataType::Bool => OpType::BoConditional,
            DataType::Int => OpType::NuConditional,
            DataType::Scalar => OpType::ScConditional,
            DataType::Color => OpType::CoConditional,
            DataType::String => OpType::StConditional,
            DataType::Matrix => OpType::MaConditional,
            DataType::Projector => OpType::PrConditional,
            DataType::Image => OpType::ImConditional,
            DataType::Mesh => OpType::MeConditional,
            DataType::Layout => OpType::LaConditional,
            DataType::Instance => OpType::InConditional,
            DataType::ExtensionData => OpType::EdConditional,
            DataType::None => panic!("no conditional opcode for {ty:?}"),
        }
    }

    /// Returns the switch opcode for the given type
    ///
    /// # Panics
    /// If the type is [`DataType::None`]
    pub fn switch(ty: DataType) -> Self {
        match ty {
            DataType::Bool => OpType::BoSwitch,
            DataType::Int => OpType::NuSwitch,
            DataType::Scalar => OpType::ScSwitch,
            DataType::Color => OpType::CoSwitch,
            DataType::String => OpType::StSwitch,
            DataType::Matrix => OpType::MaSwitch,
            DataType::Projector => OpType::PrSwitch,
            DataType::Image => OpType::ImSwitch,
            DataType::Mesh => OpType::MeSwitch,
            DataType::Layout => OpType::LaSwitch,
            DataType::Instance => OpType::InSwitch,
            DataType::ExtensionData => OpType::EdSwitch,
            DataType::None => panic!("no switch opcode for {ty:?}"),
        }
    }

    /// Returns the arithmetic opcode for the given type
    ///
    /// # Panics
    /// If the type doesn't support arithmetic
    pub fn arithmetic(ty: DataType) -> Self {
        match ty {
            DataType::Int => OpType::NuArithmetic,
            DataType::Scalar => OpType::ScArithmetic,
            DataType::Color => OpType::CoArithmetic,
            ty => panic!("no arithmetic opcode for {ty:?}"),
        }
    }

    /// Returns the type of data produced by this opcode
    pub fn data_type(self) -> DataType {
        let name: &'static str = self.into();
        match name.get(..2) {
            Some("Bo") => DataType::Bool,
            Some("Nu") => DataType::Int,
            Some("Sc") => DataType::Scalar,
            Some("Co") => DataType::Color,
            Some("St") => DataType::String,
            Some("Ma") => DataType::Matrix,
            Some("Pr") => DataType::Projector,
            Some("Im") => DataType::Image,
            Some("Me") => DataType::Mesh,
            Some("La") => DataType::Layout,
            Some("In") => DataType::Instance,
            Some("Ed") => DataType::ExtensionData,
            _ => DataType::None,
        }
    }
}

/// Iterates over opcode `(names, value)` tuples, with names in `CamelCase`
///
/// This is a helper function for defining constants in an external evaluator.
pub fn iter_ops<'a>() -> impl Iterator<Item = (&'a str, u16)> {
    use strum::IntoEnumIterator;

    OpType::iter().map(|op| {
        let s: &'static str = op.into();
        (s, op as u16)
    })
}

////////////////////////////////////////////////////////////////////////////////

/// Append-only little-endian byte cursor
pub struct ByteWriter<'a> {
    out: &'a mut Vec<u8>,
}

impl<'a> ByteWriter<'a> {
    /// Builds a writer that appends to an existing buffer
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out }
    }

    /// Appends raw bytes
    pub fn bytes(&mut self, b: &[u8]) {
        self.out.extend_from_slice(b);
    }

    /// Appends a packed value
    pub fn put<T: Packed>(&mut self, v: &T) {
        v.write(self);
    }
}

/// Little-endian byte cursor over a slice
///
/// Reading past the end of the slice panics, because it indicates a mismatch
/// between an opcode and its argument record.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Builds a reader starting at the given byte offset
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Returns the current byte offset
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Reads a fixed number of raw bytes
    ///
    /// # Panics
    /// If there aren't enough bytes left
    pub fn bytes<const N: usize>(&mut self) -> [u8; N] {
        let end = self.pos + N;
        assert!(end <= self.data.len(), "read past the end of the bytecode");
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        out
    }

    /// Reads a packed value
    pub fn get<T: Packed>(&mut self) -> T {
        T::read(self)
    }
}

/// A value with a fixed-size little-endian byte representation
pub trait Packed: Sized {
    /// Size in bytes of the packed representation
    const SIZE: usize;
    /// Appends the packed representation
    fn write(&self, w: &mut ByteWriter);
    /// Reads a value from its packed representation
    fn read(r: &mut ByteReader) -> Self;
}

macro_rules! packed_int {
    ($($t:ty),*) => {
        $(
        impl Packed for $t {
            const SIZE: usize = std::mem::size_of::<$t>();
            fn write(&self, w: &mut ByteWriter) {
                w.bytes(&self.to_le_bytes());
            }
            fn read(r: &mut ByteReader) -> Self {
                <$t>::from_le_bytes(r.bytes())
            }
        }
        )*
    };
}
packed_int!(u8, u16, u32, i32, f32);

impl Packed for bool {
    const SIZE: usize = 1;
    fn write(&self, w: &mut ByteWriter) {
        w.put(&u8::from(*self));
    }
    fn read(r: &mut ByteReader) -> Self {
        r.get::<u8>() != 0
    }
}

impl Packed for Address {
    const SIZE: usize = 4;
    fn write(&self, w: &mut ByteWriter) {
        w.put(&self.0);
    }
    fn read(r: &mut ByteReader) -> Self {
        Address(r.get())
    }
}

impl<T: Packed, const N: usize> Packed for [T; N] {
    const SIZE: usize = T::SIZE * N;
    fn write(&self, w: &mut ByteWriter) {
        self.iter().for_each(|v| v.write(w));
    }
    fn read(r: &mut ByteReader) -> Self {
        std::array::from_fn(|_| T::read(r))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opcode_names() {
        let ops = iter_ops().collect::<Vec<_>>();
        assert_eq!(ops[0], ("None", 0));
        for (i, (_, v)) in ops.iter().enumerate() {
            assert_eq!(*v as usize, i);
        }
        assert_eq!(OpType::ImConditional.data_type(), DataType::Image);
        assert_eq!(OpType::InAddLod.data_type(), DataType::Instance);
        assert_eq!(OpType::None.data_type(), DataType::None);
    }

    #[test]
    fn typed_opcodes() {
        use strum::IntoEnumIterator;
        for ty in DataType::iter().filter(|t| *t != DataType::None) {
            assert_eq!(OpType::conditional(ty).data_type(), ty);
            assert_eq!(OpType::switch(ty).data_type(), ty);
        }
    }

    #[test]
    fn cursor() {
        let mut buf = vec![0xAA];
        let mut w = ByteWriter::new(&mut buf);
        w.put(&0x1234u16);
        w.put(&-1i32);
        w.put(&1.5f32);
        w.put(&true);
        w.put(&[Address(7), Address::NULL]);
        assert_eq!(buf.len(), 1 + 2 + 4 + 4 + 1 + 8);
        assert_eq!(buf[1..3], [0x34, 0x12]);

        let mut r = ByteReader::new(&buf, 1);
        assert_eq!(r.get::<u16>(), 0x1234);
        assert_eq!(r.get::<i32>(), -1);
        assert_eq!(r.get::<f32>(), 1.5);
        assert!(r.get::<bool>());
        assert_eq!(r.get::<[Address; 2]>(), [Address(7), Address::NULL]);
        assert_eq!(r.pos(), buf.len());
    }

    #[test]
    #[should_panic]
    fn read_past_end() {
        let buf = [1u8, 2];
        ByteReader::new(&buf, 0).get::<u32>();
    }
}
