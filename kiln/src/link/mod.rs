//! Linking optimized graphs into bytecode programs
//!
//! The [`Linker`] walks a graph children-first, appending one instruction per
//! node to a [`Program`] and remembering the address of every linked node, so
//! that shared subgraphs (and nodes shared between several states) are only
//! linked once.
//!
//! Image and mesh constants are split while linking: each image mip and each
//! mesh content slice is deduplicated by value, then either stored in the
//! program or, if it's large enough, moved into a streamable rom.
use crate::bytecode::{args::*, Address, OpType};
use crate::data::{ConstantResource, Image, Mesh, MeshContentFlags};
use crate::graph::{Child, Graph, InstanceAddKind, Node, Op};
use crate::program::{
    rom::{
        ConstantResourceIndex, MeshContentRange, RomData, RomDataType,
        RomMetadata, RomPayload,
    },
    Program,
};

use arrayvec::ArrayVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Options controlling how constants are split into roms
#[derive(Copy, Clone, Debug)]
pub struct LinkerOptions {
    /// Image mips and mesh slices of at least this many bytes are streamed
    pub min_rom_size: usize,
    /// Image mips with a width or height of at least this many pixels are
    /// flagged as high-resolution
    pub high_res_min_size: u16,
}

impl Default for LinkerOptions {
    fn default() -> Self {
        Self {
            min_rom_size: 4096,
            high_res_min_size: 512,
        }
    }
}

/// Incremental linker for a single [`Program`]
///
/// A linker must always be used with the same program, since it records
/// addresses and constant indices into it.
#[derive(Default)]
pub struct Linker {
    options: LinkerOptions,
    addresses: HashMap<Node, Address>,

    images: HashMap<ConstantResource<Image>, u32>,
    image_lods: HashMap<Image, ConstantResourceIndex>,
    meshes: HashMap<ConstantResource<Mesh>, u32>,
    mesh_slices: HashMap<ConstantResource<Mesh>, ConstantResourceIndex>,

    roms: Vec<RomPayload>,
}

impl Linker {
    /// Builds a new linker
    pub fn new(options: LinkerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Returns the address of an already-linked node
    pub fn address(&self, node: Node) -> Option<Address> {
        self.addresses.get(&node).copied()
    }

    /// Links a node and all of its descendants, returning its address
    ///
    /// Linking a node that already has an address is a no-op.
    pub fn link(
        &mut self,
        graph: &Graph,
        program: &mut Program,
        node: Node,
    ) -> Address {
        assert_eq!(
            program.roms().len(),
            self.roms.len(),
            "linker used with a different program"
        );
        if let Some(a) = self.address(node) {
            return a;
        }
        let before = program.op_count();
        for n in graph.postorder_from(&[node]) {
            if self.addresses.contains_key(&n) {
                continue;
            }
            let addr = self.link_op(graph.op(n), program);
            self.addresses.insert(n, addr);
        }
        log::debug!(
            "linked {} new instructions for node {}",
            program.op_count() - before,
            node.get()
        );
        self.addresses[&node]
    }

    /// Consumes the linker, returning the payloads of every rom
    ///
    /// Payloads are in rom index order, so the result can be used directly as
    /// a [`RomSource`](crate::program::rom::RomSource).
    pub fn finish(self) -> Vec<RomPayload> {
        self.roms
    }

    /// Address of a child slot; missing children are the null instruction
    fn child(&self, c: Child) -> Address {
        match c {
            Some(n) => self.addresses[&n],
            None => Address::NULL,
        }
    }

    fn link_op(&mut self, op: &Op, program: &mut Program) -> Address {
        let ty = op.data_type();
        match op {
            Op::BoolConstant(value) => program
                .push_op(OpType::BoConstant, &BoolConstantArgs { value: *value }),
            Op::IntConstant(value) => program
                .push_op(OpType::NuConstant, &IntConstantArgs { value: *value }),
            Op::ScalarConstant(v) => program
                .push_op(OpType::ScConstant, &ScalarConstantArgs { value: v.0 }),
            Op::ColorConstant(v) => program.push_op(
                OpType::CoConstant,
                &ColorConstantArgs {
                    value: v.map(|c| c.0),
                },
            ),
            Op::StringConstant(s) => {
                let value = program.add_constant_string(s);
                program.push_op(OpType::constant(ty), &ResourceConstantArgs { value })
            }
            Op::MatrixConstant(m) => {
                let value = program.add_constant_matrix(**m.value());
                program.push_op(OpType::constant(ty), &ResourceConstantArgs { value })
            }
            Op::ProjectorConstant(p) => {
                let value = program.add_constant_projector(**p.value());
                program.push_op(OpType::constant(ty), &ResourceConstantArgs { value })
            }
            Op::LayoutConstant(layout) => {
                let value = program.add_constant_layout(layout.clone());
                program.push_op(OpType::constant(ty), &ResourceConstantArgs { value })
            }
            Op::ExtensionDataConstant(e) => {
                let value =
                    program.add_constant_extension_data(e.value().as_ref().clone());
                program.push_op(OpType::constant(ty), &ResourceConstantArgs { value })
            }
            Op::ImageConstant(image) => {
                let value = self.link_image(image, program);
                program.push_op(OpType::constant(ty), &ResourceConstantArgs { value })
            }
            Op::MeshConstant(mesh) => {
                let value = self.link_mesh(mesh, program);
                program.push_op(OpType::constant(ty), &ResourceConstantArgs { value })
            }

            Op::Parameter { ty, desc } => {
                let variable = program.add_parameter(desc.clone());
                program.push_op(OpType::parameter(*ty), &ParameterArgs { variable })
            }
            Op::Conditional {
                ty,
                condition,
                yes,
                no,
            } => program.push_op(
                OpType::conditional(*ty),
                &ConditionalArgs {
                    condition: self.child(*condition),
                    yes: self.child(*yes),
                    no: self.child(*no),
                },
            ),
            Op::Switch {
                ty,
                variable,
                default,
                cases,
            } => program.push_op(
                OpType::switch(*ty),
                &SwitchArgs {
                    variable: self.child(*variable),
                    default: self.child(*default),
                    cases: cases
                        .iter()
                        .map(|c| SwitchCaseArgs {
                            condition: c.condition,
                            branch: self.child(c.branch),
                        })
                        .collect(),
                },
            ),

            Op::BoolAnd { a, b } => program.push_op(
                OpType::BoAnd,
                &BoolBinaryArgs {
                    a: self.child(*a),
                    b: self.child(*b),
                },
            ),
            Op::BoolOr { a, b } => program.push_op(
                OpType::BoOr,
                &BoolBinaryArgs {
                    a: self.child(*a),
                    b: self.child(*b),
                },
            ),
            Op::BoolNot { a } => program.push_op(
                OpType::BoNot,
                &BoolNotArgs {
                    source: self.child(*a),
                },
            ),
            Op::IntEqualConst { value, constant } => program.push_op(
                OpType::BoEqualIntConst,
                &EqualIntConstArgs {
                    value: self.child(*value),
                    constant: *constant,
                },
            ),

            Op::Arithmetic { ty, op, a, b } => program.push_op(
                OpType::arithmetic(*ty),
                &ArithmeticArgs {
                    op: *op as u8,
                    a: self.child(*a),
                    b: self.child(*b),
                },
            ),
            Op::ScalarCurve { time, curve } => {
                let curve = program.add_constant_curve(curve.value().as_ref().clone());
                program.push_op(
                    OpType::ScCurve,
                    &CurveArgs {
                        time: self.child(*time),
                        curve,
                    },
                )
            }
            Op::ColorFromScalars { channels } => program.push_op(
                OpType::CoFromScalars,
                &ColorFromScalarsArgs {
                    channels: channels.map(|c| self.child(c)),
                },
            ),
            Op::ColorSampleImage { image, x, y } => program.push_op(
                OpType::CoSampleImage,
                &ColorSampleImageArgs {
                    image: self.child(*image),
                    x: self.child(*x),
                    y: self.child(*y),
                },
            ),

            Op::ImageMipmap {
                source,
                levels,
                only_tail,
            } => program.push_op(
                OpType::ImMipmap,
                &ImageMipmapArgs {
                    source: self.child(*source),
                    levels: *levels,
                    only_tail: *only_tail,
                },
            ),
            Op::ImagePixelFormat { source, format } => program.push_op(
                OpType::ImPixelFormat,
                &ImagePixelFormatArgs {
                    source: self.child(*source),
                    format: *format as u8,
                },
            ),
            Op::ImageResize { source, size } => program.push_op(
                OpType::ImResize,
                &ImageResizeArgs {
                    source: self.child(*source),
                    size: *size,
                },
            ),
            Op::ImageResizeLike {
                source,
                size_source,
            } => program.push_op(
                OpType::ImResizeLike,
                &ImageResizeLikeArgs {
                    source: self.child(*source),
                    size_source: self.child(*size_source),
                },
            ),
            Op::ImageLayer {
                base,
                blended,
                mask,
                blend,
            } => program.push_op(
                OpType::ImLayer,
                &ImageLayerArgs {
                    base: self.child(*base),
                    blended: self.child(*blended),
                    mask: self.child(*mask),
                    blend: *blend as u8,
                },
            ),
            Op::ImageLayerColor {
                base,
                color,
                mask,
                blend,
            } => program.push_op(
                OpType::ImLayerColor,
                &ImageLayerColorArgs {
                    base: self.child(*base),
                    color: self.child(*color),
                    mask: self.child(*mask),
                    blend: *blend as u8,
                },
            ),
            Op::ImagePlainColor {
                color,
                size,
                format,
                lods,
            } => program.push_op(
                OpType::ImPlainColor,
                &ImagePlainColorArgs {
                    color: self.child(*color),
                    size: *size,
                    format: *format as u8,
                    lods: *lods,
                },
            ),
            Op::ImageCompose {
                layout,
                base,
                block_image,
                block_id,
            } => program.push_op(
                OpType::ImCompose,
                &ImageComposeArgs {
                    layout: self.child(*layout),
                    base: self.child(*base),
                    block_image: self.child(*block_image),
                    block_id: *block_id,
                },
            ),
            Op::ImageInterpolate { factor, targets } => program.push_op(
                OpType::ImInterpolate,
                &ImageInterpolateArgs {
                    factor: self.child(*factor),
                    targets: targets.iter().map(|t| self.child(*t)).collect(),
                },
            ),
            Op::ImageSwizzle {
                format,
                sources,
                channels,
            } => program.push_op(
                OpType::ImSwizzle,
                &ImageSwizzleArgs {
                    format: *format as u8,
                    sources: sources.map(|s| self.child(s)),
                    channels: *channels,
                },
            ),
            Op::ImageDisplace {
                source,
                displacement_map,
            } => program.push_op(
                OpType::ImDisplace,
                &ImageDisplaceArgs {
                    source: self.child(*source),
                    displacement_map: self.child(*displacement_map),
                },
            ),
            Op::ImageCrop { source, min, size } => program.push_op(
                OpType::ImCrop,
                &ImageCropArgs {
                    source: self.child(*source),
                    min: *min,
                    size: *size,
                },
            ),

            Op::MeshMorph {
                base,
                target,
                factor,
            } => program.push_op(
                OpType::MeMorph,
                &MeshMorphArgs {
                    base: self.child(*base),
                    target: self.child(*target),
                    factor: self.child(*factor),
                },
            ),
            Op::MeshMerge {
                base,
                added,
                new_surface_id,
            } => program.push_op(
                OpType::MeMerge,
                &MeshMergeArgs {
                    base: self.child(*base),
                    added: self.child(*added),
                    new_surface_id: *new_surface_id,
                },
            ),
            Op::MeshMaskClip { source, clip } => program.push_op(
                OpType::MeMaskClip,
                &MeshMaskClipArgs {
                    source: self.child(*source),
                    clip: self.child(*clip),
                },
            ),
            Op::MeshClipShape { source, shape } => {
                let shape = program.add_constant_shape(**shape.value());
                program.push_op(
                    OpType::MeClipShape,
                    &MeshClipShapeArgs {
                        source: self.child(*source),
                        shape,
                    },
                )
            }
            Op::MeshRemoveMask { source, removes } => program.push_op(
                OpType::MeRemoveMask,
                &MeshRemoveMaskArgs {
                    source: self.child(*source),
                    removes: removes
                        .iter()
                        .map(|r| MaskRemovalArgs {
                            condition: self.child(r.condition),
                            mask: self.child(r.mask),
                        })
                        .collect(),
                },
            ),
            Op::MeshFormat {
                source,
                format_source,
                flags,
            } => program.push_op(
                OpType::MeFormat,
                &MeshFormatArgs {
                    source: self.child(*source),
                    format_source: self.child(*format_source),
                    flags: *flags,
                },
            ),
            Op::MeshTransform { source, matrix } => program.push_op(
                OpType::MeTransform,
                &MeshTransformArgs {
                    source: self.child(*source),
                    matrix: self.child(*matrix),
                },
            ),
            Op::MeshExtractLayoutBlocks {
                source,
                layout,
                blocks,
            } => program.push_op(
                OpType::MeExtractLayoutBlocks,
                &MeshExtractLayoutBlocksArgs {
                    source: self.child(*source),
                    layout: *layout,
                    blocks: blocks.clone(),
                },
            ),
            Op::MeshAddTags { source, tags } => {
                let tags = tags
                    .iter()
                    .map(|t| program.add_constant_string(t))
                    .collect();
                program.push_op(
                    OpType::MeAddTags,
                    &MeshAddTagsArgs {
                        source: self.child(*source),
                        tags,
                    },
                )
            }
            Op::MeshApplyLayout {
                mesh,
                layout,
                channel,
            } => program.push_op(
                OpType::MeApplyLayout,
                &MeshApplyLayoutArgs {
                    mesh: self.child(*mesh),
                    layout: self.child(*layout),
                    channel: *channel,
                },
            ),
            Op::MeshApplyPose { base, pose } => program.push_op(
                OpType::MeApplyPose,
                &MeshApplyPoseArgs {
                    base: self.child(*base),
                    pose: self.child(*pose),
                },
            ),
            Op::MeshSetSkeleton { source, skeleton } => program.push_op(
                OpType::MeSetSkeleton,
                &MeshSetSkeletonArgs {
                    source: self.child(*source),
                    skeleton: self.child(*skeleton),
                },
            ),
            Op::MeshProject { mesh, projector } => program.push_op(
                OpType::MeProject,
                &MeshProjectArgs {
                    mesh: self.child(*mesh),
                    projector: self.child(*projector),
                },
            ),

            Op::LayoutPack { source } => program.push_op(
                OpType::LaPack,
                &LayoutPackArgs {
                    source: self.child(*source),
                },
            ),
            Op::LayoutMerge { base, added } => program.push_op(
                OpType::LaMerge,
                &LayoutMergeArgs {
                    base: self.child(*base),
                    added: self.child(*added),
                },
            ),
            Op::LayoutFromMesh { mesh, layout_index } => program.push_op(
                OpType::LaFromMesh,
                &LayoutFromMeshArgs {
                    mesh: self.child(*mesh),
                    layout_index: *layout_index,
                },
            ),
            Op::LayoutRemoveBlocks {
                source,
                reference_mesh,
                layout_index,
            } => program.push_op(
                OpType::LaRemoveBlocks,
                &LayoutRemoveBlocksArgs {
                    source: self.child(*source),
                    reference_mesh: self.child(*reference_mesh),
                    layout_index: *layout_index,
                },
            ),

            Op::InstanceAdd {
                kind,
                instance,
                value,
                id,
                external_id,
                name,
            } => {
                let name = program.add_constant_string(name);
                let opcode = match kind {
                    InstanceAddKind::Component => OpType::InAddComponent,
                    InstanceAddKind::Surface => OpType::InAddSurface,
                    InstanceAddKind::Mesh => OpType::InAddMesh,
                    InstanceAddKind::Image => OpType::InAddImage,
                    InstanceAddKind::Vector => OpType::InAddVector,
                    InstanceAddKind::Scalar => OpType::InAddScalar,
                    InstanceAddKind::String => OpType::InAddString,
                    InstanceAddKind::ExtensionData => {
                        OpType::InAddExtensionData
                    }
                };
                program.push_op(
                    opcode,
                    &InstanceAddArgs {
                        instance: self.child(*instance),
                        value: self.child(*value),
                        id: *id,
                        external_id: *external_id,
                        name,
                    },
                )
            }
            Op::InstanceAddLod { lods } => program.push_op(
                OpType::InAddLod,
                &InstanceAddLodArgs {
                    lods: lods.iter().map(|l| self.child(*l)).collect(),
                },
            ),
        }
    }

    /// Stores a mip or slice either in a new rom or in the program
    fn push_resource(
        &mut self,
        payload: RomPayload,
        metadata: RomMetadata,
        program: &mut Program,
    ) -> ConstantResourceIndex {
        let size = payload.size();
        if size < self.options.min_rom_size {
            return match payload {
                RomPayload::Image(i) => program.push_image_lod_permanent(i),
                RomPayload::Mesh(m) => program.push_mesh_slice_permanent(m),
            };
        }
        let (resource_type, hash) = match &payload {
            RomPayload::Image(i) => (
                RomDataType::Image,
                ConstantResource::from_arc(i.clone()).content_hash(),
            ),
            RomPayload::Mesh(m) => (
                RomDataType::Mesh,
                ConstantResource::from_arc(m.clone()).content_hash(),
            ),
        };
        let index = program.push_rom(RomData {
            id: hash as u32,
            size: u32::try_from(size)
                .unwrap_or_else(|_| panic!("rom of {size} bytes is too large")),
            resource_type,
            metadata,
        });
        self.roms.push(payload);
        ConstantResourceIndex::new(index, true)
    }

    /// Links a constant image, returning its index in the image table
    fn link_image(
        &mut self,
        image: &ConstantResource<Image>,
        program: &mut Program,
    ) -> u32 {
        if let Some(i) = self.images.get(image) {
            return *i;
        }
        let mut lods = Vec::with_capacity(image.lod_count() as usize);
        for lod in 0..image.lod_count() {
            let mip = image.extract_lod(lod);
            let index = match self.image_lods.get(&mip) {
                Some(i) => *i,
                None => {
                    let [w, h] = mip.size();
                    let metadata = RomMetadata {
                        lod_or_content: lod,
                        is_high_res: w.max(h) >= self.options.high_res_min_size,
                    };
                    let payload = RomPayload::Image(Arc::new(mip.clone()));
                    let i = self.push_resource(payload, metadata, program);
                    self.image_lods.insert(mip, i);
                    i
                }
            };
            lods.push(index);
        }
        let out = program.push_image(image, &lods);
        self.images.insert(image.clone(), out);
        out
    }

    /// Links a constant mesh, returning its index in the mesh table
    fn link_mesh(
        &mut self,
        mesh: &ConstantResource<Mesh>,
        program: &mut Program,
    ) -> u32 {
        if let Some(i) = self.meshes.get(mesh) {
            return *i;
        }
        let content_flags = mesh.content_flags();
        let mut slices = ArrayVec::<ConstantResourceIndex, 4>::new();
        for slice in MeshContentFlags::SLICES {
            if !content_flags.contains(slice) {
                continue;
            }
            let part = ConstantResource::new(mesh.extract_content(slice));
            let index = match self.mesh_slices.get(&part) {
                Some(i) => *i,
                None => {
                    let metadata = RomMetadata {
                        lod_or_content: slice.bits(),
                        is_high_res: false,
                    };
                    let payload = RomPayload::Mesh(part.value().clone());
                    let i = self.push_resource(payload, metadata, program);
                    self.mesh_slices.insert(part, i);
                    i
                }
            };
            slices.push(index);
        }
        let range = MeshContentRange {
            first_index: 0,
            content_flags,
            skeleton: mesh
                .skeleton
                .as_ref()
                .map(|s| program.add_constant_skeleton(s.clone())),
            physics_body: mesh
                .physics_body
                .as_ref()
                .map(|p| program.add_constant_physics_body(p.clone())),
        };
        let out = program.push_mesh(range, &slices);
        self.meshes.insert(mesh.clone(), out);
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{ImageFormat, ParameterDesc};

    fn link_all(g: &Graph, roots: &[Node]) -> (Program, Vec<Address>) {
        let mut p = Program::new();
        let mut linker = Linker::default();
        let addrs = roots.iter().map(|n| linker.link(g, &mut p, *n)).collect();
        (p, addrs)
    }

    #[test]
    fn children_first() {
        let mut g = Graph::new();
        let a = g.parameter(ParameterDesc::new_bool("a", false));
        let b = g.bool_constant(true);
        let c = g.and(a, b).unwrap();
        let (p, addrs) = link_all(&g, &[c]);
        assert_eq!(addrs, [Address(3)]);
        assert_eq!(p.op_type(Address(1)), OpType::BoParameter);
        assert_eq!(p.op_type(Address(2)), OpType::BoConstant);
        let args = p.op_args::<BoolBinaryArgs>(Address(3));
        assert_eq!((args.a, args.b), (Address(1), Address(2)));
    }

    #[test]
    fn idempotent() {
        let mut g = Graph::new();
        let a = g.int_constant(1);
        let b = g.int_constant(2);
        let eq = g.equal_int(a, 3).unwrap();
        let c = g.conditional(eq, Some(a), Some(b)).unwrap();
        let mut p = Program::new();
        let mut linker = Linker::default();
        let first = linker.link(&g, &mut p, c);
        let count = p.op_count();
        assert_eq!(linker.link(&g, &mut p, c), first);
        assert_eq!(linker.link(&g, &mut p, a), Address(1));
        assert_eq!(p.op_count(), count);
    }

    #[test]
    fn missing_children_are_null() {
        let mut g = Graph::new();
        let x = g.int_constant(1);
        let c = g.insert(Op::Conditional {
            ty: crate::graph::DataType::Int,
            condition: None,
            yes: Some(x),
            no: None,
        });
        let (p, addrs) = link_all(&g, &[c]);
        let args = p.op_args::<ConditionalArgs>(addrs[0]);
        assert!(args.condition.is_null());
        assert!(args.no.is_null());
        assert_eq!(args.yes, Address(1));
    }

    #[test]
    fn string_dedup() {
        let mut g = Graph::new();
        let a = g.string_constant("Wheel");
        let b = g.string_constant("Wheel");
        let (p, addrs) = link_all(&g, &[a, b]);
        assert_ne!(addrs[0], addrs[1]);
        for a in addrs {
            assert_eq!(p.op_args::<ResourceConstantArgs>(a).value, 0);
        }
        assert_eq!(p.strings(), ["Wheel"]);
    }

    #[test]
    fn deterministic() {
        let txt = "
            p param-int p 0 1 2 3
            c color 1 0 0 1
            w color 0 0 1 1
            i0 plain-color c 64 64 Rgba8 3
            i1 plain-color w 64 64 Rgba8 3
            s switch p i0 1 i1 2 i0
            m mipmap s 4
            r instance-image m tex
        ";
        let link = || {
            let (g, root) = Graph::from_text(txt.as_bytes()).unwrap();
            let (p, _) = link_all(&g, &[root]);
            let mut buf = vec![];
            p.serialise(&mut buf).unwrap();
            buf
        };
        assert_eq!(link(), link());
    }

    #[test]
    fn image_lod_dedup() {
        // Two images sharing their tail mips share the mip storage
        let base = Image::from_fn(8, 8, 4, ImageFormat::L8, |lod, _| lod);
        let mut other = base.clone();
        other.lod_data_mut(0).fill(0xff);

        let mut g = Graph::new();
        let a = g.insert(Op::ImageConstant(ConstantResource::new(base)));
        let b = g.insert(Op::ImageConstant(ConstantResource::new(other)));
        let mut p = Program::new();
        let mut linker = Linker::new(LinkerOptions {
            min_rom_size: 0,
            high_res_min_size: 8,
        });
        linker.link(&g, &mut p, a);
        linker.link(&g, &mut p, b);
        let roms = linker.finish();
        assert_eq!(p.constant_image_count(), 2);
        assert_eq!(p.roms().len(), 5);
        assert_eq!(roms.len(), 5);
        assert!(p.roms()[0].metadata.is_high_res);
        assert!(!p.roms()[1].metadata.is_high_res);
        assert_eq!(p.roms()[3].metadata.lod_or_content, 3);
    }

    #[test]
    fn whole_constant_dedup() {
        let img = Image::new(4, 4, 1, ImageFormat::Rgba8);
        let mut g = Graph::new();
        let a = g.insert(Op::ImageConstant(ConstantResource::new(img.clone())));
        let b = g.insert(Op::ImageConstant(ConstantResource::new(img)));
        let (p, addrs) = link_all(&g, &[a, b]);
        assert_eq!(p.constant_image_count(), 1);
        assert_eq!(
            p.op_args::<ResourceConstantArgs>(addrs[0]),
            p.op_args::<ResourceConstantArgs>(addrs[1])
        );
    }
}
