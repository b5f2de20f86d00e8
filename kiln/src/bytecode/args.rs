//! Argument records for each opcode
//!
//! Fixed-size records are declared with `define_args!`, which generates the
//! struct, its packed encoding (fields in declaration order), and the list of
//! opcodes that use it.  Records with a variable number of entries encode a
//! `u16` count followed by that many fixed-size entries.
use super::{Address, ByteReader, ByteWriter, OpType, Packed};

/// Argument record for one or more opcodes
pub trait OpArgs: Sized {
    /// Opcodes whose arguments are encoded with this record
    const OP_TYPES: &'static [OpType];
    /// Appends the packed record
    fn write(&self, w: &mut ByteWriter);
    /// Reads a packed record
    fn read(r: &mut ByteReader) -> Self;
}

macro_rules! define_args {
    (
        $(#[$meta:meta])*
        $name:ident [$($op:ident),+ $(,)?] {
            $($field:ident: $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq)]
        #[allow(missing_docs)]
        pub struct $name {
            $(pub $field: $ty),*
        }
        impl OpArgs for $name {
            const OP_TYPES: &'static [OpType] = &[$(OpType::$op),+];
            #[allow(unused_variables)]
            fn write(&self, w: &mut ByteWriter) {
                $(w.put(&self.$field);)*
            }
            #[allow(unused_variables)]
            fn read(r: &mut ByteReader) -> Self {
                Self { $($field: r.get()),* }
            }
        }
    };
}

/// Writes a `u16` count followed by the entries
///
/// # Panics
/// If there are more than `u16::MAX` entries
fn write_list<T: Packed>(w: &mut ByteWriter, items: &[T]) {
    assert!(
        items.len() <= u16::MAX as usize,
        "too many entries in record"
    );
    w.put(&(items.len() as u16));
    items.iter().for_each(|i| w.put(i));
}

fn read_list<T: Packed>(r: &mut ByteReader) -> Vec<T> {
    let n = r.get::<u16>();
    (0..n).map(|_| r.get()).collect()
}

define_args!(
    /// The reserved null instruction
    NoneArgs[None] {}
);

define_args!(
    /// Inline boolean constant
    BoolConstantArgs[BoConstant] { value: bool }
);

define_args!(
    /// Inline integer constant
    IntConstantArgs[NuConstant] { value: i32 }
);

define_args!(
    /// Inline scalar constant
    ScalarConstantArgs[ScConstant] { value: f32 }
);

define_args!(
    /// Inline color constant
    ColorConstantArgs[CoConstant] { value: [f32; 4] }
);

define_args!(
    /// Constant stored in one of the program's tables
    ///
    /// For images and meshes, `value` indexes the image / mesh range table,
    /// which in turn refers to the (possibly streamed) resource data.
    ResourceConstantArgs[
        StConstant,
        MaConstant,
        PrConstant,
        ImConstant,
        MeConstant,
        LaConstant,
        EdConstant,
    ] {
        value: u32
    }
);

define_args!(
    /// Index into the program's parameter table
    ParameterArgs[
        BoParameter,
        NuParameter,
        ScParameter,
        CoParameter,
        StParameter,
        MaParameter,
        PrParameter,
        ImParameter,
        MeParameter,
    ] {
        variable: u32
    }
);

define_args!(
    ConditionalArgs[
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
    ] {
        condition: Address,
        yes: Address,
        no: Address,
    }
);

define_args!(
    BoolBinaryArgs[BoAnd, BoOr] { a: Address, b: Address }
);

define_args!(
    BoolNotArgs[BoNot] { source: Address }
);

define_args!(
    EqualIntConstArgs[BoEqualIntConst] { value: Address, constant: i32 }
);

define_args!(
    /// `op` is an [`ArithmeticOp`](crate::data::ArithmeticOp) discriminant
    ArithmeticArgs[NuArithmetic, ScArithmetic, CoArithmetic] {
        op: u8,
        a: Address,
        b: Address,
    }
);

define_args!(
    CurveArgs[ScCurve] { time: Address, curve: u32 }
);

define_args!(
    ColorFromScalarsArgs[CoFromScalars] { channels: [Address; 4] }
);

define_args!(
    ColorSampleImageArgs[CoSampleImage] {
        image: Address,
        x: Address,
        y: Address,
    }
);

define_args!(
    ImageMipmapArgs[ImMipmap] {
        source: Address,
        levels: u8,
        only_tail: bool,
    }
);

define_args!(
    /// `format` is an [`ImageFormat`](crate::data::ImageFormat) discriminant
    ImagePixelFormatArgs[ImPixelFormat] { source: Address, format: u8 }
);

define_args!(
    ImageResizeArgs[ImResize] { source: Address, size: [u16; 2] }
);

define_args!(
    ImageResizeLikeArgs[ImResizeLike] {
        source: Address,
        size_source: Address,
    }
);

define_args!(
    /// `blend` is a [`BlendType`](crate::data::BlendType) discriminant
    ImageLayerArgs[ImLayer] {
        base: Address,
        blended: Address,
        mask: Address,
        blend: u8,
    }
);

define_args!(
    ImageLayerColorArgs[ImLayerColor] {
        base: Address,
        color: Address,
        mask: Address,
        blend: u8,
    }
);

define_args!(
    ImagePlainColorArgs[ImPlainColor] {
        color: Address,
        size: [u16; 2],
        format: u8,
        lods: u8,
    }
);

define_args!(
    ImageComposeArgs[ImCompose] {
        layout: Address,
        base: Address,
        block_image: Address,
        block_id: u32,
    }
);

define_args!(
    ImageSwizzleArgs[ImSwizzle] {
        format: u8,
        sources: [Address; 4],
        channels: [u8; 4],
    }
);

define_args!(
    ImageDisplaceArgs[ImDisplace] {
        source: Address,
        displacement_map: Address,
    }
);

define_args!(
    ImageCropArgs[ImCrop] {
        source: Address,
        min: [u16; 2],
        size: [u16; 2],
    }
);

define_args!(
    MeshMorphArgs[MeMorph] {
        base: Address,
        target: Address,
        factor: Address,
    }
);

define_args!(
    MeshMergeArgs[MeMerge] {
        base: Address,
        added: Address,
        new_surface_id: u32,
    }
);

define_args!(
    MeshMaskClipArgs[MeMaskClip] { source: Address, clip: Address }
);

define_args!(
    MeshClipShapeArgs[MeClipShape] { source: Address, shape: u32 }
);

define_args!(
    /// `flags` is a [`MeshContentFlags`](crate::data::MeshContentFlags)
    /// bitmask
    MeshFormatArgs[MeFormat] {
        source: Address,
        format_source: Address,
        flags: u8,
    }
);

define_args!(
    MeshTransformArgs[MeTransform] { source: Address, matrix: Address }
);

define_args!(
    MeshApplyLayoutArgs[MeApplyLayout] {
        mesh: Address,
        layout: Address,
        channel: u16,
    }
);

define_args!(
    MeshApplyPoseArgs[MeApplyPose] { base: Address, pose: Address }
);

define_args!(
    MeshSetSkeletonArgs[MeSetSkeleton] {
        source: Address,
        skeleton: Address,
    }
);

define_args!(
    MeshProjectArgs[MeProject] { mesh: Address, projector: Address }
);

define_args!(
    LayoutPackArgs[LaPack] { source: Address }
);

define_args!(
    LayoutMergeArgs[LaMerge] { base: Address, added: Address }
);

define_args!(
    LayoutFromMeshArgs[LaFromMesh] { mesh: Address, layout_index: u8 }
);

define_args!(
    LayoutRemoveBlocksArgs[LaRemoveBlocks] {
        source: Address,
        reference_mesh: Address,
        layout_index: u8,
    }
);

define_args!(
    /// `name` indexes the string table
    InstanceAddArgs[
        InAddComponent,
        InAddSurface,
        InAddMesh,
        InAddImage,
        InAddVector,
        InAddScalar,
        InAddString,
        InAddExtensionData,
    ] {
        instance: Address,
        value: Address,
        id: u32,
        external_id: u32,
        name: u32,
    }
);

////////////////////////////////////////////////////////////////////////////////
// Variable-length records

/// One case of a [`SwitchArgs`] record
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct SwitchCaseArgs {
    pub condition: i32,
    pub branch: Address,
}

impl Packed for SwitchCaseArgs {
    const SIZE: usize = i32::SIZE + Address::SIZE;
    fn write(&self, w: &mut ByteWriter) {
        w.put(&self.condition);
        w.put(&self.branch);
    }
    fn read(r: &mut ByteReader) -> Self {
        Self {
            condition: r.get(),
            branch: r.get(),
        }
    }
}

/// Switch on an integer variable
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct SwitchArgs {
    pub variable: Address,
    pub default: Address,
    pub cases: Vec<SwitchCaseArgs>,
}

impl OpArgs for SwitchArgs {
    const OP_TYPES: &'static [OpType] = &[
        OpType::BoSwitch,
        OpType::NuSwitch,
        OpType::ScSwitch,
        OpType::CoSwitch,
        OpType::StSwitch,
        OpType::MaSwitch,
        OpType::PrSwitch,
        OpType::ImSwitch,
        OpType::MeSwitch,
        OpType::LaSwitch,
        OpType::InSwitch,
        OpType::EdSwitch,
    ];
    fn write(&self, w: &mut ByteWriter) {
        w.put(&self.variable);
        w.put(&self.default);
        write_list(w, &self.cases);
    }
    fn read(r: &mut ByteReader) -> Self {
        Self {
            variable: r.get(),
            default: r.get(),
            cases: read_list(r),
        }
    }
}

/// Blend between a list of images
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct ImageInterpolateArgs {
    pub factor: Address,
    pub targets: Vec<Address>,
}

impl OpArgs for ImageInterpolateArgs {
    const OP_TYPES: &'static [OpType] = &[OpType::ImInterpolate];
    fn write(&self, w: &mut ByteWriter) {
        w.put(&self.factor);
        write_list(w, &self.targets);
    }
    fn read(r: &mut ByteReader) -> Self {
        Self {
            factor: r.get(),
            targets: read_list(r),
        }
    }
}

/// One conditional removal of a [`MeshRemoveMaskArgs`] record
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct MaskRemovalArgs {
    pub condition: Address,
    pub mask: Address,
}

impl Packed for MaskRemovalArgs {
    const SIZE: usize = Address::SIZE * 2;
    fn write(&self, w: &mut ByteWriter) {
        w.put(&self.condition);
        w.put(&self.mask);
    }
    fn read(r: &mut ByteReader) -> Self {
        Self {
            condition: r.get(),
            mask: r.get(),
        }
    }
}

/// Remove the vertices of several masks, each behind a condition
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct MeshRemoveMaskArgs {
    pub source: Address,
    pub removes: Vec<MaskRemovalArgs>,
}

impl OpArgs for MeshRemoveMaskArgs {
    const OP_TYPES: &'static [OpType] = &[OpType::MeRemoveMask];
    fn write(&self, w: &mut ByteWriter) {
        w.put(&self.source);
        write_list(w, &self.removes);
    }
    fn read(r: &mut ByteReader) -> Self {
        Self {
            source: r.get(),
            removes: read_list(r),
        }
    }
}

/// Keep only the given layout blocks
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct MeshExtractLayoutBlocksArgs {
    pub source: Address,
    pub layout: u16,
    pub blocks: Vec<u32>,
}

impl OpArgs for MeshExtractLayoutBlocksArgs {
    const OP_TYPES: &'static [OpType] = &[OpType::MeExtractLayoutBlocks];
    fn write(&self, w: &mut ByteWriter) {
        w.put(&self.source);
        w.put(&self.layout);
        write_list(w, &self.blocks);
    }
    fn read(r: &mut ByteReader) -> Self {
        Self {
            source: r.get(),
            layout: r.get(),
            blocks: read_list(r),
        }
    }
}

/// Add tags to a mesh; tags index the string table
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct MeshAddTagsArgs {
    pub source: Address,
    pub tags: Vec<u32>,
}

impl OpArgs for MeshAddTagsArgs {
    const OP_TYPES: &'static [OpType] = &[OpType::MeAddTags];
    fn write(&self, w: &mut ByteWriter) {
        w.put(&self.source);
        write_list(w, &self.tags);
    }
    fn read(r: &mut ByteReader) -> Self {
        Self {
            source: r.get(),
            tags: read_list(r),
        }
    }
}

/// Build an instance from its levels of detail
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct InstanceAddLodArgs {
    pub lods: Vec<Address>,
}

impl OpArgs for InstanceAddLodArgs {
    const OP_TYPES: &'static [OpType] = &[OpType::InAddLod];
    fn write(&self, w: &mut ByteWriter) {
        write_list(w, &self.lods);
    }
    fn read(r: &mut ByteReader) -> Self {
        Self {
            lods: read_list(r),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn roundtrip<T: OpArgs + PartialEq + std::fmt::Debug>(args: T) -> usize {
        let mut buf = vec![];
        args.write(&mut ByteWriter::new(&mut buf));
        let mut r = ByteReader::new(&buf, 0);
        assert_eq!(T::read(&mut r), args);
        assert_eq!(r.pos(), buf.len());
        buf.len()
    }

    #[test]
    fn fixed_size_records() {
        let size = roundtrip(ConditionalArgs {
            condition: Address(1),
            yes: Address(2),
            no: Address::NULL,
        });
        assert_eq!(size, 12);
        assert_eq!(roundtrip(NoneArgs {}), 0);
        assert_eq!(
            roundtrip(ImageMipmapArgs {
                source: Address(3),
                levels: 4,
                only_tail: true
            }),
            6
        );
    }

    #[test]
    fn variable_size_records() {
        let size = roundtrip(SwitchArgs {
            variable: Address(1),
            default: Address(2),
            cases: vec![
                SwitchCaseArgs {
                    condition: -3,
                    branch: Address(4),
                },
                SwitchCaseArgs {
                    condition: 7,
                    branch: Address(5),
                },
            ],
        });
        assert_eq!(size, 4 + 4 + 2 + 2 * SwitchCaseArgs::SIZE);
        assert_eq!(roundtrip(InstanceAddLodArgs { lods: vec![] }), 2);
    }

    #[test]
    fn op_types_are_disjoint() {
        use std::collections::HashSet;
        let lists: &[&[OpType]] = &[
            ConditionalArgs::OP_TYPES,
            SwitchArgs::OP_TYPES,
            ParameterArgs::OP_TYPES,
            ResourceConstantArgs::OP_TYPES,
            InstanceAddArgs::OP_TYPES,
            ArithmeticArgs::OP_TYPES,
        ];
        let mut seen = HashSet::new();
        for op in lists.iter().flat_map(|l| l.iter()) {
            assert!(seen.insert(*op), "{op:?} is used by two records");
        }
    }
}
