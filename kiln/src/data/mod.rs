//! Constant data carried by graph nodes and stored in program tables
//!
//! Everything in here is plain data: the compiler never interprets pixels or
//! vertices, it only deduplicates, splits, and moves these values around.
mod image;
mod mesh;

pub use image::{Image, ImageFormat};
pub use mesh::{BonePose, Mesh, MeshContentFlags, MeshGeometry};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared constant with a precomputed content hash
///
/// Large constants (images, meshes, matrices) live in graph nodes, which must
/// be hashable and comparable for deduplication.  The hash is computed once on
/// construction; equality falls back to a content comparison only when the
/// pointers differ.
#[derive(Debug)]
pub struct ConstantResource<T> {
    value: Arc<T>,
    hash: u64,
}

impl<T> Clone for ConstantResource<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            hash: self.hash,
        }
    }
}

/// Adapter to feed serialized bytes straight into a hasher
struct HashWriter<H>(H);

impl<H: Hasher> std::io::Write for HashWriter<H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<T: Serialize> ConstantResource<T> {
    /// Wraps a value, computing its content hash
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already-shared value, computing its content hash
    pub fn from_arc(value: Arc<T>) -> Self {
        let mut w = HashWriter(std::collections::hash_map::DefaultHasher::new());
        // Only fails for types that refuse to serialize
        if bincode::serialize_into(&mut w, value.as_ref()).is_err() {
            log::warn!("could not hash constant resource");
        }
        Self {
            value,
            hash: w.0.finish(),
        }
    }
}

impl<T> ConstantResource<T> {
    /// Returns the shared value
    pub fn value(&self) -> &Arc<T> {
        &self.value
    }

    /// Returns the precomputed content hash
    pub fn content_hash(&self) -> u64 {
        self.hash
    }
}

impl<T> std::ops::Deref for ConstantResource<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: PartialEq> PartialEq for ConstantResource<T> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && (Arc::ptr_eq(&self.value, &other.value)
                || *self.value == *other.value)
    }
}

// Content types that only implement `PartialEq` because they contain floats
// never hold NaNs in practice; equality is treated as total.
impl<T: PartialEq> Eq for ConstantResource<T> {}

impl<T> Hash for ConstantResource<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// How blocks are packed into a layout grid
#[derive(
    Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize,
)]
pub enum PackStrategy {
    /// The layout grows to fit its blocks
    #[default]
    Resizable,
    /// The layout has a fixed size and blocks are shrunk to fit
    Fixed,
    /// Blocks keep their positions
    Overlay,
}

/// Rectangular region of a layout, in grid units
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    /// Grid position of the block
    pub min: [u16; 2],
    /// Grid size of the block
    pub size: [u16; 2],
    /// Block identifier, stable across layout operations
    pub id: u32,
    /// Packing priority; higher values are reduced last
    pub priority: i32,
}

/// Texture layout: a grid of blocks that image compositions refer to
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Grid size
    pub size: [u16; 2],
    /// Maximum grid size the layout may grow to (zero means unbounded)
    pub max_size: [u16; 2],
    /// Blocks in the layout
    pub blocks: Vec<LayoutBlock>,
    /// Packing strategy
    pub strategy: PackStrategy,
}

impl Layout {
    /// Looks up the index of a block by id
    pub fn find_block(&self, id: u32) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }
}

/// Projection style for a [`Projector`]
#[derive(
    Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize,
)]
#[allow(missing_docs)]
pub enum ProjectorKind {
    #[default]
    Planar,
    Cylindrical,
    Wrapping,
}

/// Texture projector
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Projector {
    pub kind: ProjectorKind,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub up: [f32; 3],
    pub scale: [f32; 3],
    pub angle: f32,
}

/// Bone hierarchy shared between meshes
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// Bone names, in hierarchy order
    pub bone_names: Vec<String>,
    /// Parent index of each bone, or `-1` for roots
    pub parents: Vec<i16>,
}

impl Skeleton {
    /// Looks up a bone by name
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bone_names.iter().position(|b| b == name)
    }
}

/// Primitive collision shape type
#[derive(
    Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize,
)]
#[allow(missing_docs)]
pub enum ShapeKind {
    #[default]
    None,
    Ellipse,
    AaBox,
    Sphere,
    Capsule,
}

/// Primitive shape, used for clipping and collision
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Shape {
    pub kind: ShapeKind,
    pub position: [f32; 3],
    pub up: [f32; 3],
    pub side: [f32; 3],
    pub size: [f32; 3],
}

/// Collision body attached to a bone
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneBody {
    /// Bone the body follows
    pub bone: String,
    /// Collision primitives
    pub shapes: Vec<Shape>,
}

/// Physics body shared between meshes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    /// Per-bone collision bodies
    pub bodies: Vec<BoneBody>,
}

/// Key of a [`Curve`]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

/// Piecewise-linear scalar curve
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    /// Keys, sorted by time
    pub keys: Vec<CurveKey>,
}

impl Curve {
    /// Samples the curve at the given time, clamping outside the key range
    ///
    /// ```
    /// # use kiln::data::{Curve, CurveKey};
    /// let c = Curve {
    ///     keys: vec![
    ///         CurveKey { time: 0.0, value: 0.0 },
    ///         CurveKey { time: 1.0, value: 10.0 },
    ///     ],
    /// };
    /// assert_eq!(c.sample(0.5), 5.0);
    /// assert_eq!(c.sample(2.0), 10.0);
    /// ```
    pub fn sample(&self, t: f32) -> f32 {
        let Some(first) = self.keys.first() else {
            return 0.0;
        };
        if t <= first.time {
            return first.value;
        }
        for w in self.keys.windows(2) {
            let (a, b) = (w[0], w[1]);
            if t <= b.time {
                let span = b.time - a.time;
                if span <= 0.0 {
                    return b.value;
                }
                let f = (t - a.time) / span;
                return a.value + (b.value - a.value) * f;
            }
        }
        self.keys.last().map(|k| k.value).unwrap_or(0.0)
    }
}

/// Opaque blob owned by an engine-side extension
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExtensionData {
    /// Extension name
    pub name: String,
    /// Raw payload
    pub data: Vec<u8>,
}

////////////////////////////////////////////////////////////////////////////////

/// Type of a user-facing parameter
#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize,
    Deserialize,
)]
#[allow(missing_docs)]
pub enum ParamType {
    Bool,
    Int,
    Float,
    Color,
    Projector,
    Image,
    Mesh,
    String,
    Matrix,
}

/// Value of a parameter
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ParamValue {
    /// Resource-typed parameters have no inline default
    None,
    Bool(bool),
    Int(i32),
    Float(OrderedFloat<f32>),
    Color([OrderedFloat<f32>; 4]),
    String(String),
}

/// One of the named values an integer parameter may take
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct IntValueDesc {
    /// Integer value
    pub value: i32,
    /// Display name
    pub name: String,
}

/// Description of a parameter, as linked into the program
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParameterDesc {
    /// Parameter name, used to look up runtime parameters
    pub name: String,
    /// Unique identifier supplied by the front end
    pub uid: String,
    /// Parameter type
    pub ty: ParamType,
    /// Default value
    pub default: ParamValue,
    /// Enumerated values for integer parameters (empty if open-ended)
    pub possible_values: Vec<IntValueDesc>,
}

impl ParameterDesc {
    /// Builds a boolean parameter with the given default
    pub fn new_bool(name: &str, default: bool) -> Self {
        Self::new(name, ParamType::Bool, ParamValue::Bool(default))
    }

    /// Builds a scalar parameter with the given default
    pub fn new_float(name: &str, default: f32) -> Self {
        Self::new(
            name,
            ParamType::Float,
            ParamValue::Float(OrderedFloat(default)),
        )
    }

    /// Builds an integer parameter with an enumerable domain
    ///
    /// The first value is used as the default; an empty `values` list makes
    /// the parameter open-ended.
    pub fn new_int(name: &str, values: &[(i32, &str)]) -> Self {
        let default = values.first().map(|v| v.0).unwrap_or(0);
        let mut out = Self::new(name, ParamType::Int, ParamValue::Int(default));
        out.possible_values = values
            .iter()
            .map(|&(value, name)| IntValueDesc {
                value,
                name: name.to_owned(),
            })
            .collect();
        out
    }

    /// Builds a generic parameter
    pub fn new(name: &str, ty: ParamType, default: ParamValue) -> Self {
        Self {
            name: name.to_owned(),
            uid: String::new(),
            ty,
            default,
            possible_values: vec![],
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Binary arithmetic operation on numbers and colors
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
    strum::IntoStaticStr,
)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    /// Applies the operation to a pair of scalars
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Sub => a - b,
            ArithmeticOp::Mul => a * b,
            ArithmeticOp::Div => a / b,
        }
    }

    /// Applies the operation to a pair of integers
    ///
    /// Returns `None` on division by zero or overflow, in which case the
    /// expression is left for the evaluator.
    pub fn apply_int(self, a: i32, b: i32) -> Option<i32> {
        match self {
            ArithmeticOp::Add => a.checked_add(b),
            ArithmeticOp::Sub => a.checked_sub(b),
            ArithmeticOp::Mul => a.checked_mul(b),
            ArithmeticOp::Div => a.checked_div(b),
        }
    }
}

/// Blending mode for image layering
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
    strum::IntoStaticStr,
)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum BlendType {
    None,
    SoftLight,
    HardLight,
    Burn,
    Dodge,
    Screen,
    Overlay,
    Multiply,
    Lighten,
    Blend,
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn resource_equality() {
        let a = ConstantResource::new(ExtensionData {
            name: "cloth".to_owned(),
            data: vec![1, 2, 3],
        });
        let b = ConstantResource::new(ExtensionData {
            name: "cloth".to_owned(),
            data: vec![1, 2, 3],
        });
        let c = ConstantResource::new(ExtensionData {
            name: "cloth".to_owned(),
            data: vec![1, 2, 4],
        });
        assert!(!Arc::ptr_eq(a.value(), b.value()));
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn curve_sampling() {
        let c = Curve {
            keys: vec![
                CurveKey { time: 0.0, value: 1.0 },
                CurveKey { time: 2.0, value: 2.0 },
                CurveKey { time: 3.0, value: -1.0 },
            ],
        };
        assert_relative_eq!(c.sample(-1.0), 1.0);
        assert_relative_eq!(c.sample(0.5), 1.25);
        assert_relative_eq!(c.sample(2.5), 0.5);
        assert_relative_eq!(c.sample(10.0), -1.0);
        assert_relative_eq!(Curve::default().sample(1.0), 0.0);
    }

    #[test]
    fn arithmetic() {
        assert_relative_eq!(ArithmeticOp::Div.apply(1.0, 3.0), 0.333_333_34);
        assert_eq!(ArithmeticOp::Mul.apply_int(6, 7), Some(42));
        assert_eq!(ArithmeticOp::Div.apply_int(1, 0), None);
        assert_eq!(ArithmeticOp::Add.apply_int(i32::MAX, 1), None);
    }

    #[test]
    fn int_parameter_defaults() {
        let p = ParameterDesc::new_int("size", &[(4, "S"), (8, "L")]);
        assert_eq!(p.default, ParamValue::Int(4));
        assert_eq!(p.possible_values.len(), 2);
        let open = ParameterDesc::new_int("n", &[]);
        assert_eq!(open.default, ParamValue::Int(0));
        assert!(open.possible_values.is_empty());
    }
}
