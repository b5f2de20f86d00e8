use crate::data::{
    ArithmeticOp, BlendType, ConstantResource, Curve, ExtensionData, Image,
    ImageFormat, Layout, Mesh, ParameterDesc, Projector, Shape,
};
use crate::graph::Node;
use nalgebra::Matrix4;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Type of data produced by an operation
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    enum_map::Enum,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[allow(missing_docs)]
pub enum DataType {
    None,
    Bool,
    Int,
    Scalar,
    Color,
    String,
    Image,
    Mesh,
    Layout,
    Projector,
    Instance,
    ExtensionData,
    Matrix,
}

/// Child slot of an operation
///
/// Missing children are allowed by most operations and are linked as the
/// null address.
pub type Child = Option<Node>;

/// One case of a [`Op::Switch`]
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct SwitchCase {
    /// Value of the switch variable selecting this case
    pub condition: i32,
    /// Branch taken
    pub branch: Child,
}

/// One conditional mask removal of a [`Op::MeshRemoveMask`]
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct MaskRemoval {
    /// Boolean condition enabling the removal
    pub condition: Child,
    /// Mesh with the vertices to remove
    pub mask: Child,
}

/// Component of an instance added by [`Op::InstanceAdd`]
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, strum::IntoStaticStr)]
#[allow(missing_docs)]
pub enum InstanceAddKind {
    Component,
    Surface,
    Mesh,
    Image,
    Vector,
    Scalar,
    String,
    ExtensionData,
}

impl InstanceAddKind {
    /// Type of the value child
    pub fn value_type(self) -> DataType {
        match self {
            InstanceAddKind::Component | InstanceAddKind::Surface => {
                DataType::Instance
            }
            InstanceAddKind::Mesh => DataType::Mesh,
            InstanceAddKind::Image => DataType::Image,
            InstanceAddKind::Vector => DataType::Color,
            InstanceAddKind::Scalar => DataType::Scalar,
            InstanceAddKind::String => DataType::String,
            InstanceAddKind::ExtensionData => DataType::ExtensionData,
        }
    }
}

/// Operation in a content graph
///
/// `Op`s are inserted into a [`Graph`](crate::graph::Graph), which returns an
/// opaque [`Node`] handle.  Children are stored as handles, so deriving
/// `Hash` and `Eq` compares an operation's own fields and the *identity* of
/// its children; this is exactly the shallow equality used by CSE.
#[derive(Clone, Debug, Hash, Eq, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(
    name(OpKind),
    derive(Hash, strum::IntoStaticStr, strum::EnumIter),
    allow(missing_docs)
)]
#[allow(missing_docs)]
pub enum Op {
    BoolConstant(bool),
    IntConstant(i32),
    ScalarConstant(OrderedFloat<f32>),
    ColorConstant([OrderedFloat<f32>; 4]),
    StringConstant(String),
    MatrixConstant(ConstantResource<Matrix4<f32>>),
    ProjectorConstant(ConstantResource<Projector>),
    ImageConstant(ConstantResource<Image>),
    MeshConstant(ConstantResource<Mesh>),
    LayoutConstant(Layout),
    ExtensionDataConstant(ConstantResource<ExtensionData>),

    /// User-facing parameter producing data of the given type
    Parameter {
        ty: DataType,
        desc: ParameterDesc,
    },

    /// Selects `yes` or `no` depending on a boolean condition
    Conditional {
        ty: DataType,
        condition: Child,
        yes: Child,
        no: Child,
    },
    /// Selects a case depending on an integer variable
    Switch {
        ty: DataType,
        variable: Child,
        default: Child,
        cases: Vec<SwitchCase>,
    },

    BoolAnd {
        a: Child,
        b: Child,
    },
    BoolOr {
        a: Child,
        b: Child,
    },
    BoolNot {
        a: Child,
    },
    /// Checks whether an integer equals a constant
    IntEqualConst {
        value: Child,
        constant: i32,
    },

    /// Arithmetic on two values of type `ty` (int, scalar, or color)
    Arithmetic {
        ty: DataType,
        op: ArithmeticOp,
        a: Child,
        b: Child,
    },
    ScalarCurve {
        time: Child,
        curve: ConstantResource<Curve>,
    },
    ColorFromScalars {
        channels: [Child; 4],
    },
    ColorSampleImage {
        image: Child,
        x: Child,
        y: Child,
    },

    ImageMipmap {
        source: Child,
        levels: u8,
        only_tail: bool,
    },
    ImagePixelFormat {
        source: Child,
        format: ImageFormat,
    },
    ImageResize {
        source: Child,
        size: [u16; 2],
    },
    ImageResizeLike {
        source: Child,
        size_source: Child,
    },
    ImageLayer {
        base: Child,
        blended: Child,
        mask: Child,
        blend: BlendType,
    },
    ImageLayerColor {
        base: Child,
        color: Child,
        mask: Child,
        blend: BlendType,
    },
    ImagePlainColor {
        color: Child,
        size: [u16; 2],
        format: ImageFormat,
        lods: u8,
    },
    ImageCompose {
        layout: Child,
        base: Child,
        block_image: Child,
        block_id: u32,
    },
    ImageInterpolate {
        factor: Child,
        targets: Vec<Child>,
    },
    ImageSwizzle {
        format: ImageFormat,
        sources: [Child; 4],
        channels: [u8; 4],
    },
    ImageDisplace {
        source: Child,
        displacement_map: Child,
    },
    ImageCrop {
        source: Child,
        min: [u16; 2],
        size: [u16; 2],
    },

    MeshMorph {
        base: Child,
        target: Child,
        factor: Child,
    },
    MeshMerge {
        base: Child,
        added: Child,
        new_surface_id: u32,
    },
    MeshMaskClip {
        source: Child,
        clip: Child,
    },
    MeshClipShape {
        source: Child,
        shape: ConstantResource<Shape>,
    },
    MeshRemoveMask {
        source: Child,
        removes: Vec<MaskRemoval>,
    },
    MeshFormat {
        source: Child,
        format_source: Child,
        flags: u8,
    },
    MeshTransform {
        source: Child,
        matrix: Child,
    },
    MeshExtractLayoutBlocks {
        source: Child,
        layout: u16,
        blocks: Vec<u32>,
    },
    /// Tag-annotation passthrough
    MeshAddTags {
        source: Child,
        tags: Vec<String>,
    },
    /// Layout passthrough
    MeshApplyLayout {
        mesh: Child,
        layout: Child,
        channel: u16,
    },
    /// Pose passthrough
    MeshApplyPose {
        base: Child,
        pose: Child,
    },
    /// Skeleton passthrough
    MeshSetSkeleton {
        source: Child,
        skeleton: Child,
    },
    MeshProject {
        mesh: Child,
        projector: Child,
    },

    LayoutPack {
        source: Child,
    },
    LayoutMerge {
        base: Child,
        added: Child,
    },
    LayoutFromMesh {
        mesh: Child,
        layout_index: u8,
    },
    LayoutRemoveBlocks {
        source: Child,
        reference_mesh: Child,
        layout_index: u8,
    },

    /// Adds a named value to an instance
    InstanceAdd {
        kind: InstanceAddKind,
        instance: Child,
        value: Child,
        id: u32,
        external_id: u32,
        name: String,
    },
    /// Builds an instance from a list of levels of detail
    InstanceAddLod {
        lods: Vec<Child>,
    },
}

impl Op {
    /// Returns the operation's kind tag
    pub fn kind(&self) -> OpKind {
        self.into()
    }

    /// Returns the type of data produced by this operation
    pub fn data_type(&self) -> DataType {
        match self {
            Op::BoolConstant(..)
            | Op::BoolAnd { .. }
            | Op::BoolOr { .. }
            | Op::BoolNot { .. }
            | Op::IntEqualConst { .. } => DataType::Bool,
            Op::IntConstant(..) => DataType::Int,
            Op::ScalarConstant(..) | Op::ScalarCurve { .. } => DataType::Scalar,
            Op::ColorConstant(..)
            | Op::ColorFromScalars { .. }
            | Op::ColorSampleImage { .. } => DataType::Color,
            Op::StringConstant(..) => DataType::String,
            Op::MatrixConstant(..) => DataType::Matrix,
            Op::ProjectorConstant(..) => DataType::Projector,
            Op::ExtensionDataConstant(..) => DataType::ExtensionData,
            Op::LayoutConstant(..)
            | Op::LayoutPack { .. }
            | Op::LayoutMerge { .. }
            | Op::LayoutFromMesh { .. }
            | Op::LayoutRemoveBlocks { .. } => DataType::Layout,

            Op::Parameter { ty, .. }
            | Op::Conditional { ty, .. }
            | Op::Switch { ty, .. }
            | Op::Arithmetic { ty, .. } => *ty,

            Op::ImageConstant(..)
            | Op::ImageMipmap { .. }
            | Op::ImagePixelFormat { .. }
            | Op::ImageResize { .. }
            | Op::ImageResizeLike { .. }
            | Op::ImageLayer { .. }
            | Op::ImageLayerColor { .. }
            | Op::ImagePlainColor { .. }
            | Op::ImageCompose { .. }
            | Op::ImageInterpolate { .. }
            | Op::ImageSwizzle { .. }
            | Op::ImageDisplace { .. }
            | Op::ImageCrop { .. } => DataType::Image,

            Op::MeshConstant(..)
            | Op::MeshMorph { .. }
            | Op::MeshMerge { .. }
            | Op::MeshMaskClip { .. }
            | Op::MeshClipShape { .. }
            | Op::MeshRemoveMask { .. }
            | Op::MeshFormat { .. }
            | Op::MeshTransform { .. }
            | Op::MeshExtractLayoutBlocks { .. }
            | Op::MeshAddTags { .. }
            | Op::MeshApplyLayout { .. }
            | Op::MeshApplyPose { .. }
            | Op::MeshSetSkeleton { .. }
            | Op::MeshProject { .. } => DataType::Mesh,

            Op::InstanceAdd { .. } | Op::InstanceAddLod { .. } => {
                DataType::Instance
            }
        }
    }

    /// Checks whether this is a constant (leaf) operation
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Op::BoolConstant(..)
                | Op::IntConstant(..)
                | Op::ScalarConstant(..)
                | Op::ColorConstant(..)
                | Op::StringConstant(..)
                | Op::MatrixConstant(..)
                | Op::ProjectorConstant(..)
                | Op::ImageConstant(..)
                | Op::MeshConstant(..)
                | Op::LayoutConstant(..)
                | Op::ExtensionDataConstant(..)
        )
    }

    /// Visits every child slot (including missing ones) with the type of data
    /// the slot must produce.
    ///
    /// The visiting order is fixed per kind and is the order used by the
    /// linker, so it must match [`for_each_child_mut`](Self::for_each_child_mut).
    pub fn for_each_typed_child<F: FnMut(DataType, Child)>(&self, mut f: F) {
        use DataType as T;
        match self {
            Op::BoolConstant(..)
            | Op::IntConstant(..)
            | Op::ScalarConstant(..)
            | Op::ColorConstant(..)
            | Op::StringConstant(..)
            | Op::MatrixConstant(..)
            | Op::ProjectorConstant(..)
            | Op::ImageConstant(..)
            | Op::MeshConstant(..)
            | Op::LayoutConstant(..)
            | Op::ExtensionDataConstant(..)
            | Op::Parameter { .. } => (),

            Op::Conditional {
                ty,
                condition,
                yes,
                no,
            } => {
                f(T::Bool, *condition);
                f(*ty, *yes);
                f(*ty, *no);
            }
            Op::Switch {
                ty,
                variable,
                default,
                cases,
            } => {
                f(T::Int, *variable);
                f(*ty, *default);
                for c in cases {
                    f(*ty, c.branch);
                }
            }
            Op::BoolAnd { a, b } | Op::BoolOr { a, b } => {
                f(T::Bool, *a);
                f(T::Bool, *b);
            }
            Op::BoolNot { a } => f(T::Bool, *a),
            Op::IntEqualConst { value, .. } => f(T::Int, *value),
            Op::Arithmetic { ty, a, b, .. } => {
                f(*ty, *a);
                f(*ty, *b);
            }
            Op::ScalarCurve { time, .. } => f(T::Scalar, *time),
            Op::ColorFromScalars { channels } => {
                channels.iter().for_each(|c| f(T::Scalar, *c))
            }
            Op::ColorSampleImage { image, x, y } => {
                f(T::Image, *image);
                f(T::Scalar, *x);
                f(T::Scalar, *y);
            }

            Op::ImageMipmap { source, .. }
            | Op::ImagePixelFormat { source, .. }
            | Op::ImageResize { source, .. }
            | Op::ImageCrop { source, .. } => f(T::Image, *source),
            Op::ImageResizeLike {
                source,
                size_source,
            } => {
                f(T::Image, *source);
                f(T::Image, *size_source);
            }
            Op::ImageLayer {
                base,
                blended,
                mask,
                ..
            } => {
                f(T::Image, *base);
                f(T::Image, *blended);
                f(T::Image, *mask);
            }
            Op::ImageLayerColor {
                base, color, mask, ..
            } => {
                f(T::Image, *base);
                f(T::Color, *color);
                f(T::Image, *mask);
            }
            Op::ImagePlainColor { color, .. } => f(T::Color, *color),
            Op::ImageCompose {
                layout,
                base,
                block_image,
                ..
            } => {
                f(T::Layout, *layout);
                f(T::Image, *base);
                f(T::Image, *block_image);
            }
            Op::ImageInterpolate { factor, targets } => {
                f(T::Scalar, *factor);
                targets.iter().for_each(|t| f(T::Image, *t));
            }
            Op::ImageSwizzle { sources, .. } => {
                sources.iter().for_each(|s| f(T::Image, *s))
            }
            Op::ImageDisplace {
                source,
                displacement_map,
            } => {
                f(T::Image, *source);
                f(T::Image, *displacement_map);
            }

            Op::MeshMorph {
                base,
                target,
                factor,
            } => {
                f(T::Mesh, *base);
                f(T::Mesh, *target);
                f(T::Scalar, *factor);
            }
            Op::MeshMerge { base, added, .. } => {
                f(T::Mesh, *base);
                f(T::Mesh, *added);
            }
            Op::MeshMaskClip { source, clip } => {
                f(T::Mesh, *source);
                f(T::Mesh, *clip);
            }
            Op::MeshClipShape { source, .. }
            | Op::MeshExtractLayoutBlocks { source, .. }
            | Op::MeshAddTags { source, .. } => f(T::Mesh, *source),
            Op::MeshRemoveMask { source, removes } => {
                f(T::Mesh, *source);
                for r in removes {
                    f(T::Bool, r.condition);
                    f(T::Mesh, r.mask);
                }
            }
            Op::MeshFormat {
                source,
                format_source,
                ..
            } => {
                f(T::Mesh, *source);
                f(T::Mesh, *format_source);
            }
            Op::MeshTransform { source, matrix } => {
                f(T::Mesh, *source);
                f(T::Matrix, *matrix);
            }
            Op::MeshApplyLayout { mesh, layout, .. } => {
                f(T::Mesh, *mesh);
                f(T::Layout, *layout);
            }
            Op::MeshApplyPose { base, pose } => {
                f(T::Mesh, *base);
                f(T::Mesh, *pose);
            }
            Op::MeshSetSkeleton { source, skeleton } => {
                f(T::Mesh, *source);
                f(T::Mesh, *skeleton);
            }
            Op::MeshProject { mesh, projector } => {
                f(T::Mesh, *mesh);
                f(T::Projector, *projector);
            }

            Op::LayoutPack { source } => f(T::Layout, *source),
            Op::LayoutMerge { base, added } => {
                f(T::Layout, *base);
                f(T::Layout, *added);
            }
            Op::LayoutFromMesh { mesh, .. } => f(T::Mesh, *mesh),
            Op::LayoutRemoveBlocks {
                source,
                reference_mesh,
                ..
            } => {
                f(T::Layout, *source);
                f(T::Mesh, *reference_mesh);
            }

            Op::InstanceAdd {
                kind,
                instance,
                value,
                ..
            } => {
                f(T::Instance, *instance);
                f(kind.value_type(), *value);
            }
            Op::InstanceAddLod { lods } => {
                lods.iter().for_each(|l| f(T::Instance, *l))
            }
        }
    }

    /// Visits every present child, in linking order
    pub fn for_each_child<F: FnMut(Node)>(&self, mut f: F) {
        self.for_each_typed_child(|_, c| {
            if let Some(c) = c {
                f(c)
            }
        })
    }

    /// Collects present children into a `Vec`, in linking order
    pub fn children(&self) -> Vec<Node> {
        let mut out = vec![];
        self.for_each_child(|c| out.push(c));
        out
    }

    /// Visits every child slot mutably, in the same order as
    /// [`for_each_typed_child`](Self::for_each_typed_child)
    pub fn for_each_child_mut<F: FnMut(&mut Child)>(&mut self, mut f: F) {
        match self {
            Op::BoolConstant(..)
            | Op::IntConstant(..)
            | Op::ScalarConstant(..)
            | Op::ColorConstant(..)
            | Op::StringConstant(..)
            | Op::MatrixConstant(..)
            | Op::ProjectorConstant(..)
            | Op::ImageConstant(..)
            | Op::MeshConstant(..)
            | Op::LayoutConstant(..)
            | Op::ExtensionDataConstant(..)
            | Op::Parameter { .. } => (),

            Op::Conditional {
                condition, yes, no, ..
            } => {
                f(condition);
                f(yes);
                f(no);
            }
            Op::Switch {
                variable,
                default,
                cases,
                ..
            } => {
                f(variable);
                f(default);
                for c in cases {
                    f(&mut c.branch);
                }
            }
            Op::BoolAnd { a, b }
            | Op::BoolOr { a, b }
            | Op::Arithmetic { a, b, .. } => {
                f(a);
                f(b);
            }
            Op::BoolNot { a } => f(a),
            Op::IntEqualConst { value, .. } => f(value),
            Op::ScalarCurve { time, .. } => f(time),
            Op::ColorFromScalars { channels } => channels.iter_mut().for_each(f),
            Op::ColorSampleImage { image, x, y } => {
                f(image);
                f(x);
                f(y);
            }

            Op::ImageMipmap { source, .. }
            | Op::ImagePixelFormat { source, .. }
            | Op::ImageResize { source, .. }
            | Op::ImageCrop { source, .. } => f(source),
            Op::ImageResizeLike {
                source,
                size_source,
            } => {
                f(source);
                f(size_source);
            }
            Op::ImageLayer {
                base,
                blended,
                mask,
                ..
            } => {
                f(base);
                f(blended);
                f(mask);
            }
            Op::ImageLayerColor {
                base, color, mask, ..
            } => {
                f(base);
                f(color);
                f(mask);
            }
            Op::ImagePlainColor { color, .. } => f(color),
            Op::ImageCompose {
                layout,
                base,
                block_image,
                ..
            } => {
                f(layout);
                f(base);
                f(block_image);
            }
            Op::ImageInterpolate { factor, targets } => {
                f(factor);
                targets.iter_mut().for_each(f);
            }
            Op::ImageSwizzle { sources, .. } => sources.iter_mut().for_each(f),
            Op::ImageDisplace {
                source,
                displacement_map,
            } => {
                f(source);
                f(displacement_map);
            }

            Op::MeshMorph {
                base,
                target,
                factor,
            } => {
                f(base);
                f(target);
                f(factor);
            }
            Op::MeshMerge { base, added, .. } => {
                f(base);
                f(added);
            }
            Op::MeshMaskClip { source, clip } => {
                f(source);
                f(clip);
            }
            Op::MeshClipShape { source, .. }
            | Op::MeshExtractLayoutBlocks { source, .. }
            | Op::MeshAddTags { source, .. } => f(source),
            Op::MeshRemoveMask { source, removes } => {
                f(source);
                for r in removes {
                    f(&mut r.condition);
                    f(&mut r.mask);
                }
            }
            Op::MeshFormat {
                source,
                format_source,
                ..
            } => {
                f(source);
                f(format_source);
            }
            Op::MeshTransform { source, matrix } => {
                f(source);
                f(matrix);
            }
            Op::MeshApplyLayout { mesh, layout, .. } => {
                f(mesh);
                f(layout);
            }
            Op::MeshApplyPose { base, pose } => {
                f(base);
                f(pose);
            }
            Op::MeshSetSkeleton { source, skeleton } => {
                f(source);
                f(skeleton);
            }
            Op::MeshProject { mesh, projector } => {
                f(mesh);
                f(projector);
            }

            Op::LayoutPack { source } => f(source),
            Op::LayoutMerge { base, added } => {
                f(base);
                f(added);
            }
            Op::LayoutFromMesh { mesh, .. } => f(mesh),
            Op::LayoutRemoveBlocks {
                source,
                reference_mesh,
                ..
            } => {
                f(source);
                f(reference_mesh);
            }

            Op::InstanceAdd {
                instance, value, ..
            } => {
                f(instance);
                f(value);
            }
            Op::InstanceAddLod { lods } => lods.iter_mut().for_each(f),
        }
    }

    /// Returns a structural copy with every present child remapped
    pub fn clone_with<F: FnMut(Node) -> Node>(&self, mut map: F) -> Op {
        let mut out = self.clone();
        out.for_each_child_mut(|c| {
            if let Some(n) = c {
                *c = Some(map(*n));
            }
        });
        out
    }

    /// Returns the primary data source of operations that transform a single
    /// input of their own type
    ///
    /// This is the slot that sink transformations push operations through.
    pub fn source(&self) -> Option<Child> {
        match self {
            Op::ImageMipmap { source, .. }
            | Op::ImagePixelFormat { source, .. }
            | Op::ImageResize { source, .. }
            | Op::ImageCrop { source, .. }
            | Op::MeshFormat { source, .. }
            | Op::MeshExtractLayoutBlocks { source, .. }
            | Op::MeshAddTags { source, .. }
            | Op::MeshSetSkeleton { source, .. }
            | Op::MeshClipShape { source, .. }
            | Op::LayoutPack { source }
            | Op::LayoutRemoveBlocks { source, .. } => Some(*source),
            Op::MeshApplyLayout { mesh, .. } => Some(*mesh),
            Op::MeshApplyPose { base, .. } => Some(*base),
            _ => None,
        }
    }

    /// Returns a copy of this operation with its [source](Self::source)
    /// replaced
    ///
    /// # Panics
    /// If the operation has no source slot
    pub fn with_source(&self, new_source: Child) -> Op {
        let mut out = self.clone();
        match &mut out {
            Op::ImageMipmap { source, .. }
            | Op::ImagePixelFormat { source, .. }
            | Op::ImageResize { source, .. }
            | Op::ImageCrop { source, .. }
            | Op::MeshFormat { source, .. }
            | Op::MeshExtractLayoutBlocks { source, .. }
            | Op::MeshAddTags { source, .. }
            | Op::MeshSetSkeleton { source, .. }
            | Op::MeshClipShape { source, .. }
            | Op::LayoutPack { source }
            | Op::LayoutRemoveBlocks { source, .. }
            | Op::MeshApplyLayout { mesh: source, .. }
            | Op::MeshApplyPose { base: source, .. } => *source = new_source,
            op => panic!("{:?} has no source slot", op.kind()),
        }
        out
    }

    /// Returns the color to be used in a GraphViz drawing for this node
    pub fn dot_node_color(&self) -> &str {
        match self {
            op if op.is_constant() => "green",
            Op::Parameter { .. } => "red",
            Op::Conditional { .. } | Op::Switch { .. } => "dodgerblue",
            _ => "goldenrod",
        }
    }

    /// Returns the shape to be used in a GraphViz drawing for this node
    pub fn dot_node_shape(&self) -> &str {
        match self {
            op if op.is_constant() => "oval",
            Op::Parameter { .. } => "circle",
            Op::Conditional { .. } | Op::Switch { .. } => "diamond",
            _ => "box",
        }
    }

    /// Returns a GraphViz string of edges from this node to its children
    pub fn dot_edges(&self, i: Node) -> String {
        let mut out = String::new();
        self.for_each_child(|c| {
            out += &format!(
                "n{} -> n{} [color = \"{}\"]\n",
                i.get(),
                c.get(),
                dot_color_to_rgb(self.dot_node_color())
            );
        });
        out
    }
}

fn dot_color_to_rgb(s: &str) -> &'static str {
    match s {
        "red" => "#FF0000",
        "green" => "#00FF00",
        "goldenrod" => "#DAA520",
        "dodgerblue" => "#1E90FF",
        s => panic!("Unknown X11 color '{s}'"),
    }
}
