//! Linked programs
//!
//! A [`Program`] is the output of the [linker](crate::link): a bytecode
//! instruction stream, deduplicated constant tables, and a list of named
//! [`State`]s, each of which is an entry point into the instruction stream.
//!
//! Programs are immutable once linked, except for the payloads of streamed
//! constants (see [`rom`]), which can be loaded and unloaded through a shared
//! reference.
mod disasm;
pub mod rom;

pub use disasm::ProgramStats;
use rom::{
    ConstantResourceIndex, ImageLodRange, MeshContentRange, RomData,
};

use crate::bytecode::{args::OpArgs, Address, ByteReader, ByteWriter, OpType};
use crate::data::{
    Curve, ExtensionData, Image, Layout, Mesh, ParameterDesc, PhysicsBody,
    Projector, Shape, Skeleton,
};
use crate::Error;

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, RwLock};

/// Entry point into a program
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Unique state name
    pub name: String,
    /// Instruction producing the state's result
    pub root: Address,
    /// Parameters that may change while the state is active, as indices into
    /// the parameter table
    ///
    /// Bit `i` of the masks in [`dynamic_resources`](Self::dynamic_resources)
    /// refers to `runtime_params[i]`.
    pub runtime_params: Vec<u32>,
    /// Instructions whose results don't depend on runtime parameters but
    /// feed into ones that do, and are therefore worth caching
    pub update_cache: Vec<Address>,
    /// Instance resources that depend on runtime parameters, with the mask
    /// of runtime parameters they depend on
    pub dynamic_resources: Vec<(Address, u64)>,
    /// Index into the program's parameter lists, naming every parameter
    /// reachable from the state root
    pub relevant_params: u32,
}

/// Linked program
///
/// Instructions are addressed by [`Address`]; each one is a `u16` opcode
/// followed by its argument record (see [`crate::bytecode`]).  Address 0 is
/// always the null instruction.
#[derive(Debug, Serialize, Deserialize)]
pub struct Program {
    op_address: Vec<u32>,
    byte_code: Vec<u8>,
    states: Vec<State>,

    roms: Vec<RomData>,
    constant_image_lod_indices: Vec<ConstantResourceIndex>,
    constant_images: Vec<ImageLodRange>,
    constant_image_lods_permanent: Vec<Arc<Image>>,
    constant_mesh_content_indices: Vec<ConstantResourceIndex>,
    constant_meshes: Vec<MeshContentRange>,
    constant_meshes_permanent: Vec<Arc<Mesh>>,

    constant_strings: Vec<String>,
    constant_matrices: Vec<Matrix4<f32>>,
    constant_curves: Vec<Curve>,
    constant_projectors: Vec<Projector>,
    constant_shapes: Vec<Shape>,
    constant_skeletons: Vec<Arc<Skeleton>>,
    constant_physics_bodies: Vec<Arc<PhysicsBody>>,
    constant_layouts: Vec<Layout>,
    constant_extension_data: Vec<ExtensionData>,

    parameters: Vec<ParameterDesc>,
    parameter_lists: Vec<Vec<u32>>,

    /// Loaded image roms, keyed by rom index
    #[serde(skip)]
    streamed_images: RwLock<HashMap<u32, Arc<Image>>>,
    /// Loaded mesh roms, keyed by rom index
    #[serde(skip)]
    streamed_meshes: RwLock<HashMap<u32, Arc<Mesh>>>,
}

/// Magic bytes at the start of a serialized program
const MAGIC: &[u8; 4] = b"KILN";

/// Version of the serialized format, bumped on any layout change
const VERSION: u32 = 1;

/// Appends `v` to `table` unless an equal value is already present, returning
/// its index
fn add_constant<T: PartialEq>(table: &mut Vec<T>, v: T) -> u32 {
    let i = match table.iter().position(|t| *t == v) {
        Some(i) => i,
        None => {
            table.push(v);
            table.len() - 1
        }
    };
    u32::try_from(i).unwrap_or_else(|_| panic!("constant table overflow"))
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// Builds an empty program, containing only the null instruction
    pub fn new() -> Self {
        let mut out = Self {
            op_address: vec![],
            byte_code: vec![],
            states: vec![],
            roms: vec![],
            constant_image_lod_indices: vec![],
            constant_images: vec![],
            constant_image_lods_permanent: vec![],
            constant_mesh_content_indices: vec![],
            constant_meshes: vec![],
            constant_meshes_permanent: vec![],
            constant_strings: vec![],
            constant_matrices: vec![],
            constant_curves: vec![],
            constant_projectors: vec![],
            constant_shapes: vec![],
            constant_skeletons: vec![],
            constant_physics_bodies: vec![],
            constant_layouts: vec![],
            constant_extension_data: vec![],
            parameters: vec![],
            parameter_lists: vec![],
            streamed_images: RwLock::default(),
            streamed_meshes: RwLock::default(),
        };
        let null = out.push_op(OpType::None, &crate::bytecode::args::NoneArgs {});
        debug_assert!(null.is_null());
        out
    }

    ////////////////////////////////////////////////////////////////////////////
    // Instructions

    /// Appends an instruction, returning its address
    ///
    /// # Panics
    /// If `ty` is not encoded with the argument record `T`
    pub fn push_op<T: OpArgs>(&mut self, ty: OpType, args: &T) -> Address {
        assert!(
            T::OP_TYPES.contains(&ty),
            "{ty:?} is not encoded with {}",
            std::any::type_name::<T>()
        );
        let addr = Address(self.op_address.len() as u32);
        let offset = u32::try_from(self.byte_code.len())
            .unwrap_or_else(|_| panic!("bytecode is too large"));
        self.op_address.push(offset);
        let mut w = ByteWriter::new(&mut self.byte_code);
        w.put(&(ty as u16));
        args.write(&mut w);
        addr
    }

    /// Returns the number of instructions, including the null instruction
    pub fn op_count(&self) -> usize {
        self.op_address.len()
    }

    /// Returns the size of the instruction stream in bytes
    pub fn byte_code_size(&self) -> usize {
        self.byte_code.len()
    }

    /// Iterates over every address in the program
    pub fn addresses(&self) -> impl Iterator<Item = Address> {
        (0..self.op_address.len() as u32).map(Address)
    }

    fn reader(&self, addr: Address) -> ByteReader<'_> {
        let Some(&offset) = self.op_address.get(addr.index()) else {
            panic!("address {addr} is out of range");
        };
        ByteReader::new(&self.byte_code, offset as usize)
    }

    /// Returns the opcode of the instruction at the given address
    ///
    /// # Panics
    /// If the address is out of range or the stored opcode is invalid
    pub fn op_type(&self, addr: Address) -> OpType {
        let raw = self.reader(addr).get::<u16>();
        let Some(ty) = OpType::from_repr(raw) else {
            panic!("invalid opcode {raw} at {addr}");
        };
        ty
    }

    /// Decodes the argument record of the instruction at the given address
    ///
    /// # Panics
    /// If the address is out of range or the instruction is not encoded with
    /// the record `T`
    pub fn op_args<T: OpArgs>(&self, addr: Address) -> T {
        let ty = self.op_type(addr);
        assert!(
            T::OP_TYPES.contains(&ty),
            "{ty:?} at {addr} is not encoded with {}",
            std::any::type_name::<T>()
        );
        let mut r = self.reader(addr);
        r.get::<u16>();
        let out = T::read(&mut r);
        let end = self
            .op_address
            .get(addr.index() + 1)
            .map(|o| *o as usize)
            .unwrap_or(self.byte_code.len());
        assert_eq!(
            r.pos(),
            end,
            "{ty:?} at {addr} was not fully decoded by {}",
            std::any::type_name::<T>()
        );
        out
    }

    ////////////////////////////////////////////////////////////////////////////
    // States

    /// Returns every state, in compilation order
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Looks up a state by name
    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    pub(crate) fn push_state(&mut self, state: State) {
        assert!(
            self.state(&state.name).is_none(),
            "duplicate state {}",
            state.name
        );
        self.states.push(state);
    }

    ////////////////////////////////////////////////////////////////////////////
    // Constant tables

    /// Adds a string to the string table, returning its index
    pub fn add_constant_string(&mut self, v: &str) -> u32 {
        add_constant(&mut self.constant_strings, v.to_owned())
    }

    /// Adds a matrix to the matrix table, returning its index
    pub fn add_constant_matrix(&mut self, v: Matrix4<f32>) -> u32 {
        add_constant(&mut self.constant_matrices, v)
    }

    /// Adds a curve to the curve table, returning its index
    pub fn add_constant_curve(&mut self, v: Curve) -> u32 {
        add_constant(&mut self.constant_curves, v)
    }

    /// Adds a projector to the projector table, returning its index
    pub fn add_constant_projector(&mut self, v: Projector) -> u32 {
        add_constant(&mut self.constant_projectors, v)
    }

    /// Adds a shape to the shape table, returning its index
    pub fn add_constant_shape(&mut self, v: Shape) -> u32 {
        add_constant(&mut self.constant_shapes, v)
    }

    /// Adds a skeleton to the skeleton table, returning its index
    pub fn add_constant_skeleton(&mut self, v: Arc<Skeleton>) -> u32 {
        add_constant(&mut self.constant_skeletons, v)
    }

    /// Adds a physics body to the physics body table, returning its index
    pub fn add_constant_physics_body(&mut self, v: Arc<PhysicsBody>) -> u32 {
        add_constant(&mut self.constant_physics_bodies, v)
    }

    /// Adds a layout to the layout table, returning its index
    pub fn add_constant_layout(&mut self, v: Layout) -> u32 {
        add_constant(&mut self.constant_layouts, v)
    }

    /// Adds extension data to its table, returning its index
    pub fn add_constant_extension_data(&mut self, v: ExtensionData) -> u32 {
        add_constant(&mut self.constant_extension_data, v)
    }

    /// Adds a parameter to the parameter table, returning its index
    pub fn add_parameter(&mut self, v: ParameterDesc) -> u32 {
        add_constant(&mut self.parameters, v)
    }

    /// Adds a list of parameter indices, returning its index
    pub fn add_parameter_list(&mut self, v: Vec<u32>) -> u32 {
        add_constant(&mut self.parameter_lists, v)
    }

    pub(crate) fn push_rom(&mut self, rom: RomData) -> usize {
        self.roms.push(rom);
        self.roms.len() - 1
    }

    pub(crate) fn push_image_lod_permanent(
        &mut self,
        mip: Arc<Image>,
    ) -> ConstantResourceIndex {
        self.constant_image_lods_permanent.push(mip);
        ConstantResourceIndex::new(
            self.constant_image_lods_permanent.len() - 1,
            false,
        )
    }

    pub(crate) fn push_image(
        &mut self,
        image: &Image,
        lods: &[ConstantResourceIndex],
    ) -> u32 {
        let first_index = self.constant_image_lod_indices.len() as u32;
        self.constant_image_lod_indices.extend_from_slice(lods);
        self.constant_images.push(ImageLodRange {
            first_index,
            lod_count: image.lod_count(),
            size: image.size(),
            format: image.format(),
        });
        (self.constant_images.len() - 1) as u32
    }

    pub(crate) fn push_mesh_slice_permanent(
        &mut self,
        slice: Arc<Mesh>,
    ) -> ConstantResourceIndex {
        self.constant_meshes_permanent.push(slice);
        ConstantResourceIndex::new(self.constant_meshes_permanent.len() - 1, false)
    }

    pub(crate) fn push_mesh(
        &mut self,
        range: MeshContentRange,
        slices: &[ConstantResourceIndex],
    ) -> u32 {
        assert_eq!(range.content_flags.count(), slices.len());
        let range = MeshContentRange {
            first_index: self.constant_mesh_content_indices.len() as u32,
            ..range
        };
        self.constant_mesh_content_indices.extend_from_slice(slices);
        self.constant_meshes.push(range);
        (self.constant_meshes.len() - 1) as u32
    }

    /// Returns the string table
    pub fn strings(&self) -> &[String] {
        &self.constant_strings
    }

    /// Returns the matrix table
    pub fn matrices(&self) -> &[Matrix4<f32>] {
        &self.constant_matrices
    }

    /// Returns the curve table
    pub fn curves(&self) -> &[Curve] {
        &self.constant_curves
    }

    /// Returns the projector table
    pub fn projectors(&self) -> &[Projector] {
        &self.constant_projectors
    }

    /// Returns the shape table
    pub fn shapes(&self) -> &[Shape] {
        &self.constant_shapes
    }

    /// Returns the layout table
    pub fn layouts(&self) -> &[Layout] {
        &self.constant_layouts
    }

    /// Returns the extension data table
    pub fn extension_data(&self) -> &[ExtensionData] {
        &self.constant_extension_data
    }

    /// Returns the parameter table
    pub fn parameters(&self) -> &[ParameterDesc] {
        &self.parameters
    }

    /// Returns the parameter list table
    pub fn parameter_lists(&self) -> &[Vec<u32>] {
        &self.parameter_lists
    }

    /// Looks up a parameter by name
    pub fn find_parameter(&self, name: &str) -> Option<u32> {
        self.parameters
            .iter()
            .position(|p| p.name == name)
            .map(|i| i as u32)
    }

    /// Returns the number of constant images
    pub fn constant_image_count(&self) -> usize {
        self.constant_images.len()
    }

    /// Returns the number of constant meshes
    pub fn constant_mesh_count(&self) -> usize {
        self.constant_meshes.len()
    }

    ////////////////////////////////////////////////////////////////////////////
    // Archive

    /// Writes the program to a byte stream
    ///
    /// Streamed payloads are not included; they are stored separately by
    /// whoever owns the roms.
    pub fn serialise<W: Write>(&self, mut w: W) -> Result<(), Error> {
        w.write_all(MAGIC)?;
        w.write_all(&VERSION.to_le_bytes())?;
        bincode::serialize_into(&mut w, self)?;
        Ok(())
    }

    /// Reads a program written by [`serialise`](Self::serialise)
    ///
    /// Every rom of the returned program is unloaded.
    pub fn unserialise<R: Read>(mut r: R) -> Result<Self, Error> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::BadHeader);
        }
        let mut version = [0u8; 4];
        r.read_exact(&mut version)?;
        let version = u32::from_le_bytes(version);
        if version != VERSION {
            return Err(Error::BadVersion(version, VERSION));
        }
        let out = bincode::deserialize_from(r)?;
        Ok(out)
    }
}

/// Equality of the linked data, ignoring which roms are loaded
impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.op_address == other.op_address
            && self.byte_code == other.byte_code
            && self.states == other.states
            && self.roms == other.roms
            && self.constant_image_lod_indices
                == other.constant_image_lod_indices
            && self.constant_images == other.constant_images
            && self.constant_image_lods_permanent
                == other.constant_image_lods_permanent
            && self.constant_mesh_content_indices
                == other.constant_mesh_content_indices
            && self.constant_meshes == other.constant_meshes
            && self.constant_meshes_permanent == other.constant_meshes_permanent
            && self.constant_strings == other.constant_strings
            && self.constant_matrices == other.constant_matrices
            && self.constant_curves == other.constant_curves
            && self.constant_projectors == other.constant_projectors
            && self.constant_shapes == other.constant_shapes
            && self.constant_skeletons == other.constant_skeletons
            && self.constant_physics_bodies == other.constant_physics_bodies
            && self.constant_layouts == other.constant_layouts
            && self.constant_extension_data == other.constant_extension_data
            && self.parameters == other.parameters
            && self.parameter_lists == other.parameter_lists
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bytecode::args::{
        BoolBinaryArgs, ConditionalArgs, IntConstantArgs, SwitchArgs,
        SwitchCaseArgs,
    };

    #[test]
    fn null_instruction() {
        let p = Program::new();
        assert_eq!(p.op_count(), 1);
        assert_eq!(p.op_type(Address::NULL), OpType::None);
        assert_eq!(p.byte_code_size(), 2);
    }

    #[test]
    fn push_and_decode() {
        let mut p = Program::new();
        let a = p.push_op(OpType::NuConstant, &IntConstantArgs { value: -7 });
        let b = p.push_op(OpType::NuConstant, &IntConstantArgs { value: 3 });
        let s = p.push_op(
            OpType::NuSwitch,
            &SwitchArgs {
                variable: a,
                default: Address::NULL,
                cases: vec![SwitchCaseArgs {
                    condition: 1,
                    branch: b,
                }],
            },
        );
        assert_eq!(s, Address(3));
        assert_eq!(p.op_type(s), OpType::NuSwitch);
        assert_eq!(p.op_args::<IntConstantArgs>(a).value, -7);
        let args = p.op_args::<SwitchArgs>(s);
        assert_eq!(args.cases[0].branch, b);
        assert!(args.default.is_null());
    }

    #[test]
    #[should_panic]
    fn wrong_args() {
        let mut p = Program::new();
        let a = p.push_op(OpType::NuConstant, &IntConstantArgs { value: 1 });
        p.op_args::<ConditionalArgs>(a);
    }

    #[test]
    #[should_panic]
    fn wrong_opcode_for_record() {
        let mut p = Program::new();
        p.push_op(
            OpType::BoConditional,
            &BoolBinaryArgs {
                a: Address::NULL,
                b: Address::NULL,
            },
        );
    }

    #[test]
    #[should_panic]
    fn out_of_range() {
        Program::new().op_type(Address(10));
    }

    #[test]
    fn string_dedup() {
        let mut p = Program::new();
        assert_eq!(p.add_constant_string("Wheel"), 0);
        assert_eq!(p.add_constant_string("Wheel"), 0);
        assert_eq!(p.strings().len(), 1);
        assert_eq!(p.add_constant_string("Door"), 1);
        assert_eq!(p.add_constant_string("Wheel"), 0);
    }

    #[test]
    fn archive_errors() {
        let mut bad = b"NOPE".to_vec();
        bad.extend_from_slice(&VERSION.to_le_bytes());
        assert!(matches!(
            Program::unserialise(bad.as_slice()),
            Err(Error::BadHeader)
        ));

        let mut old = MAGIC.to_vec();
        old.extend_from_slice(&(VERSION + 1).to_le_bytes());
        assert!(matches!(
            Program::unserialise(old.as_slice()),
            Err(Error::BadVersion(v, VERSION)) if v == VERSION + 1
        ));

        assert!(matches!(
            Program::unserialise(&b"KI"[..]),
            Err(Error::IoError(..))
        ));
    }

    #[test]
    fn archive_roundtrip() {
        let mut p = Program::new();
        p.push_op(OpType::NuConstant, &IntConstantArgs { value: 5 });
        p.add_constant_string("Wheel");
        p.push_state(State {
            name: "default".to_owned(),
            root: Address(1),
            ..Default::default()
        });
        let mut buf = vec![];
        p.serialise(&mut buf).unwrap();
        assert_eq!(&buf[..4], MAGIC);
        let q = Program::unserialise(buf.as_slice()).unwrap();
        assert_eq!(p, q);
        assert_eq!(q.state("default").unwrap().root, Address(1));
    }

    #[test]
    fn compiled_archive_roundtrip() {
        use crate::compile::{Compiler, StateDesc};
        use crate::data::{
            ConstantResource, ImageFormat, MeshContentFlags, MeshGeometry,
            ParameterDesc,
        };
        use crate::graph::{Graph, InstanceAddKind, Op};

        let mut g = Graph::new();
        let b = g.parameter(ParameterDesc::new_bool("b", false));
        let img = Image::from_fn(32, 32, 3, ImageFormat::L8, |lod, i| {
            lod ^ i as u8
        });
        let image =
            g.insert(Op::ImageConstant(ConstantResource::new(img.clone())));
        let red = g.color_constant([1.0, 0.0, 0.0, 1.0]);
        let plain = g.insert(Op::ImagePlainColor {
            color: Some(red),
            size: [8, 8],
            format: ImageFormat::L8,
            lods: 1,
        });
        let cond = g.conditional(b, Some(image), Some(plain)).unwrap();
        let tex = g.insert(Op::InstanceAdd {
            kind: InstanceAddKind::Image,
            instance: None,
            value: Some(cond),
            id: 0,
            external_id: 0,
            name: "diffuse".to_owned(),
        });

        let mesh = Mesh {
            geometry: MeshGeometry {
                vertices: vec![[1.0, 2.0, 3.0]; 32],
                indices: (0..30).collect(),
                surface_ids: vec![0],
            },
            tags: vec!["Wheel".to_owned()],
            skeleton: Some(Arc::new(Skeleton {
                bone_names: vec!["root".to_owned(), "wheel".to_owned()],
                parents: vec![-1, 0],
            })),
            ..Default::default()
        };
        let m = g.insert(Op::MeshConstant(ConstantResource::new(mesh.clone())));
        let body = g.insert(Op::InstanceAdd {
            kind: InstanceAddKind::Mesh,
            instance: Some(tex),
            value: Some(m),
            id: 1,
            external_id: 0,
            name: "body".to_owned(),
        });

        let mut compiler = Compiler::default();
        compiler.options_mut().linker.min_rom_size = 64;
        let out = compiler
            .compile(
                g,
                &[
                    StateDesc::new("main", body).with_runtime_params(&["b"]),
                    StateDesc::new("textures", tex),
                ],
            )
            .unwrap();

        // Three image mips and the mesh geometry are streamed; the mesh tags
        // are small enough to stay in the program
        assert_eq!(out.program.roms().len(), 4);
        assert_eq!(out.roms.len(), 4);

        let mut buf = vec![];
        out.program.serialise(&mut buf).unwrap();
        let q = Program::unserialise(buf.as_slice()).unwrap();
        assert_eq!(q, out.program);

        assert_eq!(q.states().len(), 2);
        let main = q.state("main").unwrap();
        assert_eq!(main.runtime_params.len(), 1);
        assert_eq!(main.dynamic_resources.len(), 1);
        assert_eq!(main.dynamic_resources[0].1, 1);
        assert_eq!(q.parameter_lists()[main.relevant_params as usize], [0]);
        assert!(q.state("textures").unwrap().runtime_params.is_empty());

        // Nothing streamed survives the archive
        assert!((0..q.roms().len()).all(|i| !q.is_rom_loaded(i)));
        assert!(q.get_constant_image(0, 0).is_none());
        assert!(q.get_constant_mesh(0, MeshContentFlags::ALL).is_none());
        let tags = q
            .get_constant_mesh(0, MeshContentFlags::METADATA)
            .unwrap();
        assert_eq!(tags.tags, ["Wheel"]);

        for i in 0..out.roms.len() {
            q.load_rom(i, &out.roms).unwrap();
        }
        assert_eq!(*q.get_constant_image(0, 0).unwrap(), img);
        assert_eq!(*q.get_constant_mesh(0, MeshContentFlags::ALL).unwrap(), mesh);
    }
}
