use super::Program;
use crate::bytecode::{args::*, Address, OpType};
use crate::graph::DataType;

use enum_map::EnumMap;
use std::fmt::Write;

/// Summary of a linked program's contents
#[derive(Clone, Debug, Default)]
pub struct ProgramStats {
    /// Number of instructions, including the null instruction
    pub op_count: usize,
    /// Size of the instruction stream in bytes
    pub byte_code_size: usize,
    /// Instructions per produced data type
    pub ops_per_type: EnumMap<DataType, usize>,
    /// Number of streamable roms
    pub rom_count: usize,
    /// Total size of streamable payloads in bytes
    pub rom_size: usize,
    /// Number of constant images
    pub image_count: usize,
    /// Number of constant meshes
    pub mesh_count: usize,
    /// Number of entries in the string table
    pub string_count: usize,
    /// Number of parameters
    pub parameter_count: usize,
}

impl std::fmt::Display for ProgramStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} instructions ({} bytes)",
            self.op_count, self.byte_code_size
        )?;
        for (ty, n) in self.ops_per_type.iter().filter(|(_, n)| **n > 0) {
            let name: &'static str = ty.into();
            writeln!(f, "  {name:<14}{n}")?;
        }
        writeln!(f, "{} roms ({} bytes)", self.rom_count, self.rom_size)?;
        writeln!(
            f,
            "{} images, {} meshes, {} strings, {} parameters",
            self.image_count,
            self.mesh_count,
            self.string_count,
            self.parameter_count
        )
    }
}

/// Tries each argument record in turn, formatting the first one that encodes
/// the opcode
macro_rules! describe_args {
    ($program:ident, $addr:ident, $ty:ident, [$($t:ty),* $(,)?]) => {
        $(
            if <$t>::OP_TYPES.contains(&$ty) {
                return Some(format!("{:?}", $program.op_args::<$t>($addr)));
            }
        )*
    };
}

impl Program {
    /// Formats the argument record of the instruction at `addr`
    ///
    /// Returns `None` if no record is known for the opcode, which would be a
    /// bug in the bytecode tables.
    fn describe(&self, addr: Address) -> Option<String> {
        let ty = self.op_type(addr);
        describe_args!(
            self,
            addr,
            ty,
            [
                NoneArgs,
                BoolConstantArgs,
                IntConstantArgs,
                ScalarConstantArgs,
                ColorConstantArgs,
                ResourceConstantArgs,
                ParameterArgs,
                ConditionalArgs,
                SwitchArgs,
                BoolBinaryArgs,
                BoolNotArgs,
                EqualIntConstArgs,
                ArithmeticArgs,
                CurveArgs,
                ColorFromScalarsArgs,
                ColorSampleImageArgs,
                ImageMipmapArgs,
                ImagePixelFormatArgs,
                ImageResizeArgs,
                ImageResizeLikeArgs,
                ImageLayerArgs,
                ImageLayerColorArgs,
                ImagePlainColorArgs,
                ImageComposeArgs,
                ImageInterpolateArgs,
                ImageSwizzleArgs,
                ImageDisplaceArgs,
                ImageCropArgs,
                MeshMorphArgs,
                MeshMergeArgs,
                MeshMaskClipArgs,
                MeshClipShapeArgs,
                MeshRemoveMaskArgs,
                MeshFormatArgs,
                MeshTransformArgs,
                MeshExtractLayoutBlocksArgs,
                MeshAddTagsArgs,
                MeshApplyLayoutArgs,
                MeshApplyPoseArgs,
                MeshSetSkeletonArgs,
                MeshProjectArgs,
                LayoutPackArgs,
                LayoutMergeArgs,
                LayoutFromMeshArgs,
                LayoutRemoveBlocksArgs,
                InstanceAddArgs,
                InstanceAddLodArgs,
            ]
        );
        None
    }

    /// Returns a human-readable listing of the program
    ///
    /// Each line is an address, an opcode name, and the decoded argument
    /// record; states are listed first.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for s in &self.states {
            let _ = writeln!(
                out,
                "state {:?}: root {}, {} runtime parameters",
                s.name,
                s.root,
                s.runtime_params.len()
            );
        }
        for addr in self.addresses() {
            let ty: &'static str = self.op_type(addr).into();
            let args = self.describe(addr).unwrap_or_else(|| "?".to_owned());
            let _ = writeln!(out, "{addr:>6} {ty:<22}{args}");
        }
        out
    }

    /// Returns a summary of the program's contents
    pub fn stats(&self) -> ProgramStats {
        let mut ops_per_type = EnumMap::default();
        for addr in self.addresses() {
            ops_per_type[self.op_type(addr).data_type()] += 1;
        }
        ProgramStats {
            op_count: self.op_count(),
            byte_code_size: self.byte_code_size(),
            ops_per_type,
            rom_count: self.roms.len(),
            rom_size: self.roms.iter().map(|r| r.size as usize).sum(),
            image_count: self.constant_images.len(),
            mesh_count: self.constant_meshes.len(),
            string_count: self.constant_strings.len(),
            parameter_count: self.parameters.len(),
        }
    }
}

/// Returns whether some argument record encodes the given opcode
#[cfg(test)]
fn has_record(ty: OpType) -> bool {
    macro_rules! any_record {
        ($($t:ty),*) => { false $(|| <$t>::OP_TYPES.contains(&ty))* };
    }
    any_record!(
        NoneArgs,
        BoolConstantArgs,
        IntConstantArgs,
        ScalarConstantArgs,
        ColorConstantArgs,
        ResourceConstantArgs,
        ParameterArgs,
        ConditionalArgs,
        SwitchArgs,
        BoolBinaryArgs,
        BoolNotArgs,
        EqualIntConstArgs,
        ArithmeticArgs,
        CurveArgs,
        ColorFromScalarsArgs,
        ColorSampleImageArgs,
        ImageMipmapArgs,
        ImagePixelFormatArgs,
        ImageResizeArgs,
        ImageResizeLikeArgs,
        ImageLayerArgs,
        ImageLayerColorArgs,
        ImagePlainColorArgs,
        ImageComposeArgs,
        ImageInterpolateArgs,
        ImageSwizzleArgs,
        ImageDisplaceArgs,
        ImageCropArgs,
        MeshMorphArgs,
        MeshMergeArgs,
        MeshMaskClipArgs,
        MeshClipShapeArgs,
        MeshRemoveMaskArgs,
        MeshFormatArgs,
        MeshTransformArgs,
        MeshExtractLayoutBlocksArgs,
        MeshAddTagsArgs,
        MeshApplyLayoutArgs,
        MeshApplyPoseArgs,
        MeshSetSkeletonArgs,
        MeshProjectArgs,
        LayoutPackArgs,
        LayoutMergeArgs,
        LayoutFromMeshArgs,
        LayoutRemoveBlocksArgs,
        InstanceAddArgs,
        InstanceAddLodArgs
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn every_opcode_has_a_record() {
        use strum::IntoEnumIterator;
        for ty in OpType::iter() {
            assert!(has_record(ty), "no argument record for {ty:?}");
        }
    }

    #[test]
    fn listing() {
        let txt = "
            p param-int p 0 1 2
            a int 10
            b int 20
            e eq p 1
            c if e a b
        ";
        let (g, root) = Graph::from_text(txt.as_bytes()).unwrap();
        let out = crate::compile::Compiler::default()
            .compile_single(g, root)
            .unwrap();
        let text = out.program.disassemble();
        assert!(text.contains("NuConditional"));
        assert!(text.contains("BoEqualIntConst"));
        assert!(text.contains("@0 None"), "{text}");

        let stats = out.program.stats();
        assert_eq!(stats.op_count, out.program.op_count());
        assert_eq!(stats.ops_per_type[DataType::Int], 4);
        assert_eq!(stats.ops_per_type[DataType::Bool], 1);
        assert_eq!(stats.ops_per_type[DataType::None], 1);
    }
}
