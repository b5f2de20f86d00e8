//! Streaming model for large constants
//!
//! Image mips and mesh content slices above a size threshold are not stored
//! inside the [`Program`]; instead, the program records a [`RomData`] entry
//! for each of them, and the payload is loaded (and unloaded) on demand by the
//! embedding runtime.
use super::Program;
use crate::data::{Image, ImageFormat, Mesh, MeshContentFlags};
use crate::Error;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use std::sync::{Arc, PoisonError};

/// Index of an image mip or mesh slice, tagged with where its payload lives
///
/// The low 31 bits are an index; the top bit selects between the program's
/// permanent constants (clear) and the streamed roms (set).
#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize,
    Deserialize,
)]
pub struct ConstantResourceIndex(u32);

assert_eq_size!(ConstantResourceIndex, u32);

impl ConstantResourceIndex {
    const STREAMABLE_BIT: u32 = 1 << 31;

    /// Largest representable index
    pub const MAX_INDEX: usize = (Self::STREAMABLE_BIT - 1) as usize;

    /// Packs an index and streaming flag
    ///
    /// # Panics
    /// If `index` doesn't fit in 31 bits
    pub fn new(index: usize, streamable: bool) -> Self {
        assert!(index <= Self::MAX_INDEX, "resource index {index} too large");
        let mut bits = index as u32;
        if streamable {
            bits |= Self::STREAMABLE_BIT;
        }
        Self(bits)
    }

    /// Returns the index into the permanent constants or the rom table
    pub fn index(self) -> usize {
        (self.0 & !Self::STREAMABLE_BIT) as usize
    }

    /// Checks whether the payload is streamed
    pub fn is_streamable(self) -> bool {
        self.0 & Self::STREAMABLE_BIT != 0
    }

    /// Returns the packed representation
    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Type of resource held by a rom
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum RomDataType {
    Image,
    Mesh,
}

/// Per-rom information used by streaming heuristics
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RomMetadata {
    /// Mip level for images; content slice bits for meshes
    pub lod_or_content: u8,
    /// Set for image mips that are only needed at high quality settings
    pub is_high_res: bool,
}

/// Description of a streamable payload
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RomData {
    /// Content-derived identifier, stable across compilations
    pub id: u32,
    /// Payload size in bytes
    pub size: u32,
    /// Type of payload
    pub resource_type: RomDataType,
    /// Streaming hints
    pub metadata: RomMetadata,
}

/// Range of mip indices making up a constant image
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageLodRange {
    /// First entry in the program's image lod index table
    pub first_index: u32,
    /// Number of mips
    pub lod_count: u8,
    /// Size of the largest mip
    pub size: [u16; 2],
    /// Pixel format shared by every mip
    pub format: ImageFormat,
}

/// Range of slice indices making up a constant mesh
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshContentRange {
    /// First entry in the program's mesh content index table
    pub first_index: u32,
    /// Slices present in the mesh, one index table entry per slice in
    /// [`MeshContentFlags::SLICES`] order
    pub content_flags: MeshContentFlags,
    /// Index into the skeleton table
    pub skeleton: Option<u32>,
    /// Index into the physics body table
    pub physics_body: Option<u32>,
}

/// Payload of a single rom
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum RomPayload {
    Image(Arc<Image>),
    Mesh(Arc<Mesh>),
}

impl RomPayload {
    /// Returns the payload size in bytes
    pub fn size(&self) -> usize {
        match self {
            RomPayload::Image(i) => i.data_size(),
            RomPayload::Mesh(m) => m.content_size(MeshContentFlags::ALL),
        }
    }
}

/// Provider of rom payloads, e.g. a package reader
pub trait RomSource {
    /// Returns the payload of the rom at the given index, if available
    fn rom(&self, index: usize) -> Option<RomPayload>;
}

impl RomSource for [RomPayload] {
    fn rom(&self, index: usize) -> Option<RomPayload> {
        self.get(index).cloned()
    }
}

impl RomSource for Vec<RomPayload> {
    fn rom(&self, index: usize) -> Option<RomPayload> {
        self.as_slice().rom(index)
    }
}

impl Program {
    /// Returns the rom table
    pub fn roms(&self) -> &[RomData] {
        &self.roms
    }

    /// Checks whether the payload of a rom is currently loaded
    ///
    /// # Panics
    /// If `index` is out of range
    pub fn is_rom_loaded(&self, index: usize) -> bool {
        let key = index as u32;
        match self.roms[index].resource_type {
            RomDataType::Image => self
                .streamed_images
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&key),
            RomDataType::Mesh => self
                .streamed_meshes
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&key),
        }
    }

    /// Drops the payload of a rom, returning its size in bytes
    ///
    /// Returns `None` if the rom wasn't loaded.
    ///
    /// # Panics
    /// If `index` is out of range
    pub fn unload_rom(&self, index: usize) -> Option<usize> {
        let key = index as u32;
        let size = match self.roms[index].resource_type {
            RomDataType::Image => self
                .streamed_images
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key)?
                .data_size(),
            RomDataType::Mesh => self
                .streamed_meshes
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key)?
                .content_size(MeshContentFlags::ALL),
        };
        log::debug!("unloaded rom {index} ({size} bytes)");
        Some(size)
    }

    /// Installs the payload of an image rom
    ///
    /// # Panics
    /// If the rom is out of range, isn't an image, or is already loaded
    pub fn set_image_rom_value(&self, index: usize, image: Arc<Image>) {
        assert_eq!(
            self.roms[index].resource_type,
            RomDataType::Image,
            "rom {index} is not an image"
        );
        let prev = self
            .streamed_images
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index as u32, image);
        assert!(prev.is_none(), "rom {index} is already loaded");
    }

    /// Installs the payload of a mesh rom
    ///
    /// # Panics
    /// If the rom is out of range, isn't a mesh, or is already loaded
    pub fn set_mesh_rom_value(&self, index: usize, mesh: Arc<Mesh>) {
        assert_eq!(
            self.roms[index].resource_type,
            RomDataType::Mesh,
            "rom {index} is not a mesh"
        );
        let prev = self
            .streamed_meshes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index as u32, mesh);
        assert!(prev.is_none(), "rom {index} is already loaded");
    }

    /// Loads a rom from the given source
    ///
    /// # Panics
    /// If the rom is already loaded
    pub fn load_rom<S: RomSource + ?Sized>(
        &self,
        index: usize,
        source: &S,
    ) -> Result<(), Error> {
        let rom = self
            .roms
            .get(index)
            .ok_or(Error::BadRomIndex(index, self.roms.len()))?;
        let payload = source.rom(index).ok_or(Error::MissingRom(index))?;
        match (rom.resource_type, payload) {
            (RomDataType::Image, RomPayload::Image(i)) => {
                self.set_image_rom_value(index, i)
            }
            (RomDataType::Mesh, RomPayload::Mesh(m)) => {
                self.set_mesh_rom_value(index, m)
            }
            _ => return Err(Error::WrongRomType(index)),
        }
        log::debug!("loaded rom {index} ({} bytes)", rom.size);
        Ok(())
    }

    fn image_lod(&self, i: ConstantResourceIndex) -> Option<Arc<Image>> {
        if i.is_streamable() {
            self.streamed_images
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&(i.index() as u32))
                .cloned()
        } else {
            Some(self.constant_image_lods_permanent[i.index()].clone())
        }
    }

    fn mesh_slice(&self, i: ConstantResourceIndex) -> Option<Arc<Mesh>> {
        if i.is_streamable() {
            self.streamed_meshes
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&(i.index() as u32))
                .cloned()
        } else {
            Some(self.constant_meshes_permanent[i.index()].clone())
        }
    }

    /// Returns a constant image, skipping the given number of mips
    ///
    /// Mips that are not loaded are skipped as well, and the result contains
    /// every consecutive loaded mip after that point; the result may be
    /// smaller than requested, but it is never empty.  Returns `None` (and
    /// logs a warning) if none of the remaining mips is loaded.
    ///
    /// If a mip has a different format from the ones before it, the result
    /// stops at that mip.
    ///
    /// # Panics
    /// If `index` is out of range
    pub fn get_constant_image(
        &self,
        index: usize,
        mips_to_skip: u8,
    ) -> Option<Arc<Image>> {
        let range = &self.constant_images[index];
        let first = range.first_index as usize;
        let lods = &self.constant_image_lod_indices
            [first..first + range.lod_count as usize];

        let mut start = mips_to_skip.min(range.lod_count.saturating_sub(1));
        let mut mips = vec![];
        let mut format = None;
        for &i in &lods[start as usize..] {
            match self.image_lod(i) {
                Some(m) if format.is_some_and(|f| f != m.format()) => {
                    log::warn!(
                        "constant image {index} has mixed mip formats; \
                         dropping mips after {}",
                        start as usize + mips.len() - 1
                    );
                    break;
                }
                Some(m) => {
                    format = Some(m.format());
                    mips.push(m);
                }
                None if mips.is_empty() => start += 1,
                None => break,
            }
        }
        match mips.len() {
            0 => {
                log::warn!(
                    "no loaded mips for constant image {index} \
                     (skipping {mips_to_skip})"
                );
                None
            }
            1 => mips.pop(),
            _ => {
                let refs = mips.iter().map(|m| m.as_ref()).collect::<Vec<_>>();
                let out = Image::compose_lods(&refs)?;
                log::trace!(
                    "composed constant image {index} from mips {start}..{}",
                    start as usize + mips.len()
                );
                Some(Arc::new(out))
            }
        }
    }

    /// Returns the requested content slices of a constant mesh
    ///
    /// Slices requested by `filter` but absent from the mesh are ignored.
    /// Returns `None` (and logs a warning) if a requested slice is streamed
    /// and not currently loaded.
    ///
    /// # Panics
    /// If `index` is out of range
    pub fn get_constant_mesh(
        &self,
        index: usize,
        filter: MeshContentFlags,
    ) -> Option<Arc<Mesh>> {
        let range = &self.constant_meshes[index];
        let first = range.first_index as usize;
        let present: ArrayVec<MeshContentFlags, 4> = MeshContentFlags::SLICES
            .into_iter()
            .filter(|s| range.content_flags.contains(*s))
            .collect();
        let indices =
            &self.constant_mesh_content_indices[first..first + present.len()];

        let mut out = Mesh::default();
        for (slice, &i) in present.iter().zip(indices) {
            if !filter.contains(*slice) {
                continue;
            }
            let Some(part) = self.mesh_slice(i) else {
                log::warn!(
                    "content {:#x} of constant mesh {index} is not loaded",
                    slice.bits()
                );
                return None;
            };
            out.merge_content(&part);
        }
        out.skeleton = range
            .skeleton
            .map(|i| self.constant_skeletons[i as usize].clone());
        out.physics_body = range
            .physics_body
            .map(|i| self.constant_physics_bodies[i as usize].clone());
        Some(Arc::new(out))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compile::Compiler;
    use crate::data::{ConstantResource, MeshGeometry, Skeleton};
    use crate::graph::{Graph, Op};
    use crate::link::LinkerOptions;

    #[test]
    fn resource_index_bits() {
        let i = ConstantResourceIndex::new(5, true);
        assert_eq!(i.index(), 5);
        assert!(i.is_streamable());
        assert_eq!(i.bits(), 0x8000_0005);

        let j = ConstantResourceIndex::new(ConstantResourceIndex::MAX_INDEX, false);
        assert_eq!(j.index(), ConstantResourceIndex::MAX_INDEX);
        assert!(!j.is_streamable());
    }

    #[test]
    #[should_panic]
    fn resource_index_overflow() {
        ConstantResourceIndex::new(1 << 31, false);
    }

    /// Compiles a single image constant, streaming every mip
    fn streamed_image(img: Image) -> (Program, Vec<RomPayload>) {
        let mut g = Graph::new();
        let n = g.insert(Op::ImageConstant(ConstantResource::new(img)));
        let mut compiler = Compiler::default();
        compiler.options_mut().linker = LinkerOptions {
            min_rom_size: 0,
            ..Default::default()
        };
        let out = compiler.compile_single(g, n).unwrap();
        (out.program, out.roms)
    }

    #[test]
    fn mip_composition() {
        let img = Image::from_fn(16, 16, 4, ImageFormat::L8, |lod, i| {
            lod.wrapping_mul(37).wrapping_add(i as u8)
        });
        let (program, roms) = streamed_image(img.clone());
        assert_eq!(program.roms().len(), 4);
        assert!(program.get_constant_image(0, 0).is_none());

        program.load_rom(2, &roms).unwrap();
        program.load_rom(3, &roms).unwrap();
        assert!(program.is_rom_loaded(2));
        assert!(!program.is_rom_loaded(0));

        let out = program.get_constant_image(0, 0).unwrap();
        assert_eq!(out.lod_count(), 2);
        assert_eq!(out.size(), img.lod_size(2));
        assert_eq!(out.lod_data(0), img.lod_data(2));
        assert_eq!(out.lod_data(1), img.lod_data(3));

        // Skipping past the end clamps to the last mip
        let last = program.get_constant_image(0, 10).unwrap();
        assert_eq!(last.lod_count(), 1);
        assert_eq!(last.lod_data(0), img.lod_data(3));

        // A gap in the middle truncates the result
        program.load_rom(0, &roms).unwrap();
        let top = program.get_constant_image(0, 0).unwrap();
        assert_eq!(top.lod_count(), 1);
        assert_eq!(top.size(), [16, 16]);

        assert_eq!(program.unload_rom(2), Some(img.lod_byte_size(2)));
        assert_eq!(program.unload_rom(2), None);
        assert!(!program.is_rom_loaded(2));
    }

    #[test]
    fn permanent_mips() {
        // Everything below the threshold stays in the program
        let img = Image::new(4, 4, 3, ImageFormat::Rgba8);
        let mut g = Graph::new();
        let n = g.insert(Op::ImageConstant(ConstantResource::new(img.clone())));
        let out = Compiler::default().compile_single(g, n).unwrap();
        assert!(out.roms.is_empty());
        let back = out.program.get_constant_image(0, 0).unwrap();
        assert_eq!(*back, img);
        let tail = out.program.get_constant_image(0, 1).unwrap();
        assert_eq!(tail.lod_count(), 2);
    }

    #[test]
    #[should_panic(expected = "already loaded")]
    fn double_load() {
        let img = Image::new(8, 8, 1, ImageFormat::L8);
        let (program, roms) = streamed_image(img);
        program.load_rom(0, &roms).unwrap();
        let _ = program.load_rom(0, &roms);
    }

    #[test]
    fn load_errors() {
        let img = Image::new(8, 8, 1, ImageFormat::L8);
        let (program, _roms) = streamed_image(img);
        let empty: Vec<RomPayload> = vec![];
        assert!(matches!(
            program.load_rom(0, &empty),
            Err(Error::MissingRom(0))
        ));
        assert!(matches!(
            program.load_rom(3, &empty),
            Err(Error::BadRomIndex(3, 1))
        ));
        let wrong = vec![RomPayload::Mesh(Arc::new(Mesh::default()))];
        assert!(matches!(
            program.load_rom(0, &wrong),
            Err(Error::WrongRomType(0))
        ));
    }

    #[test]
    fn mesh_slices() {
        let skeleton = Arc::new(Skeleton {
            bone_names: vec!["root".to_owned()],
            parents: vec![-1],
        });
        let mesh = Mesh {
            geometry: MeshGeometry {
                vertices: vec![[0.0; 3]; 64],
                indices: (0..63).collect(),
                surface_ids: vec![0],
            },
            tags: vec!["Wheel".to_owned()],
            skeleton: Some(skeleton.clone()),
            ..Default::default()
        };
        let mut g = Graph::new();
        let n = g.insert(Op::MeshConstant(ConstantResource::new(mesh.clone())));
        let mut compiler = Compiler::default();
        compiler.options_mut().linker.min_rom_size = 64;
        let out = compiler.compile_single(g, n).unwrap();
        let program = out.program;

        // Geometry is streamed, tags are small enough to stay permanent
        assert_eq!(program.roms().len(), 1);
        let meta = program.get_constant_mesh(0, MeshContentFlags::METADATA);
        let meta = meta.unwrap();
        assert_eq!(meta.tags, ["Wheel"]);
        assert!(meta.geometry.is_empty());
        assert_eq!(meta.skeleton.as_deref(), Some(skeleton.as_ref()));

        assert!(program
            .get_constant_mesh(0, MeshContentFlags::ALL)
            .is_none());
        program.load_rom(0, &out.roms).unwrap();
        let all = program.get_constant_mesh(0, MeshContentFlags::ALL).unwrap();
        assert_eq!(*all, mesh);
    }

    #[test]
    fn surface_ids_only_mesh() {
        let mesh = Mesh {
            geometry: MeshGeometry {
                surface_ids: vec![1, 2, 3],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(mesh.content_flags().contains(MeshContentFlags::GEOMETRY));

        let mut g = Graph::new();
        let n = g.insert(Op::MeshConstant(ConstantResource::new(mesh.clone())));
        let out = Compiler::default().compile_single(g, n).unwrap();
        let back = out
            .program
            .get_constant_mesh(0, MeshContentFlags::ALL)
            .unwrap();
        assert_eq!(back.geometry.surface_ids, [1, 2, 3]);
        assert_eq!(*back, mesh);
    }

    #[test]
    fn mixed_mip_formats() {
        let mut p = Program::new();
        let a = p.push_image_lod_permanent(Arc::new(Image::new(
            4,
            4,
            1,
            ImageFormat::L8,
        )));
        let b = p.push_image_lod_permanent(Arc::new(Image::new(
            2,
            2,
            1,
            ImageFormat::Rgba8,
        )));
        p.push_image(&Image::new(4, 4, 2, ImageFormat::L8), &[a, b]);

        // The chain stops at the first mip with a different format
        let out = p.get_constant_image(0, 0).unwrap();
        assert_eq!(out.lod_count(), 1);
        assert_eq!(out.format(), ImageFormat::L8);
        assert_eq!(out.size(), [4, 4]);

        let tail = p.get_constant_image(0, 1).unwrap();
        assert_eq!(tail.format(), ImageFormat::Rgba8);
    }
}
