use serde::{Deserialize, Serialize};

/// Pixel format of an [`Image`]
///
/// Only uncompressed formats are modelled; block-compressed data is a
/// concern of the evaluator's format conversion kernels.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::FromRepr,
    strum::IntoStaticStr,
    strum::EnumString,
)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ImageFormat {
    #[default]
    None,
    L8,
    Rgb8,
    Rgba8,
    Bgra8,
}

impl ImageFormat {
    /// Returns the number of bytes used by a single pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::None => 0,
            ImageFormat::L8 => 1,
            ImageFormat::Rgb8 => 3,
            ImageFormat::Rgba8 | ImageFormat::Bgra8 => 4,
        }
    }
}

/// Mipmapped image
///
/// All mips are stored back to back in `data`, largest first.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Image {
    format: ImageFormat,
    width: u16,
    height: u16,
    lod_count: u8,
    data: Vec<u8>,
}

impl Image {
    /// Builds a zero-filled image with the given number of mips
    pub fn new(width: u16, height: u16, lod_count: u8, format: ImageFormat) -> Self {
        let mut out = Self {
            format,
            width,
            height,
            lod_count: lod_count.max(1),
            data: vec![],
        };
        let size = (0..out.lod_count).map(|l| out.lod_byte_size(l)).sum();
        out.data = vec![0; size];
        out
    }

    /// Builds an image where each byte is produced by `f(lod, offset)`
    ///
    /// Useful to give every mip recognizable contents.
    pub fn from_fn<F: Fn(u8, usize) -> u8>(
        width: u16,
        height: u16,
        lod_count: u8,
        format: ImageFormat,
        f: F,
    ) -> Self {
        let mut out = Self::new(width, height, lod_count, format);
        for lod in 0..out.lod_count {
            for (i, b) in out.lod_data_mut(lod).iter_mut().enumerate() {
                *b = f(lod, i);
            }
        }
        out
    }

    /// Pixel format
    pub fn format(&self) -> ImageFormat {
        self.format
    }
    /// Size of the largest mip
    pub fn size(&self) -> [u16; 2] {
        [self.width, self.height]
    }
    /// Number of mips stored in the image
    pub fn lod_count(&self) -> u8 {
        self.lod_count
    }
    /// Raw pixel data for every mip
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    /// Total size of the pixel data, in bytes
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Returns the size of the given mip, clamped to 1×1
    pub fn lod_size(&self, lod: u8) -> [u16; 2] {
        let w = (self.width >> lod.min(15)).max(1);
        let h = (self.height >> lod.min(15)).max(1);
        [w, h]
    }

    /// Returns the size in bytes of the given mip
    pub fn lod_byte_size(&self, lod: u8) -> usize {
        let [w, h] = self.lod_size(lod);
        w as usize * h as usize * self.format.bytes_per_pixel()
    }

    fn lod_offset(&self, lod: u8) -> usize {
        (0..lod).map(|l| self.lod_byte_size(l)).sum()
    }

    /// Borrows the pixel data of a single mip
    ///
    /// # Panics
    /// If `lod` is out of range
    pub fn lod_data(&self, lod: u8) -> &[u8] {
        assert!(lod < self.lod_count, "lod {lod} out of range");
        let start = self.lod_offset(lod);
        &self.data[start..start + self.lod_byte_size(lod)]
    }

    /// Mutably borrows the pixel data of a single mip
    ///
    /// # Panics
    /// If `lod` is out of range
    pub fn lod_data_mut(&mut self, lod: u8) -> &mut [u8] {
        assert!(lod < self.lod_count, "lod {lod} out of range");
        let start = self.lod_offset(lod);
        let size = self.lod_byte_size(lod);
        &mut self.data[start..start + size]
    }

    /// Copies a single mip into a new single-mip image
    pub fn extract_lod(&self, lod: u8) -> Image {
        let [width, height] = self.lod_size(lod);
        Image {
            format: self.format,
            width,
            height,
            lod_count: 1,
            data: self.lod_data(lod).to_vec(),
        }
    }

    /// Concatenates single-mip images into one mipmapped image
    ///
    /// The first image defines the size of the result.  Returns `None` if
    /// `mips` is empty or if the pixel formats don't match.
    pub fn compose_lods(mips: &[&Image]) -> Option<Image> {
        let first = mips.first()?;
        if mips.iter().any(|m| m.format != first.format) {
            return None;
        }
        let data = mips
            .iter()
            .flat_map(|m| m.lod_data(0).iter().copied())
            .collect();
        Some(Image {
            format: first.format,
            width: first.width,
            height: first.height,
            lod_count: u8::try_from(mips.len()).ok()?,
            data,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lod_sizes() {
        let img = Image::new(8, 4, 4, ImageFormat::Rgba8);
        assert_eq!(img.lod_size(0), [8, 4]);
        assert_eq!(img.lod_size(2), [2, 1]);
        assert_eq!(img.lod_size(3), [1, 1]);
        assert_eq!(img.data_size(), (32 + 8 + 2 + 1) * 4);
    }

    #[test]
    fn extract_and_compose() {
        let img = Image::from_fn(4, 4, 3, ImageFormat::L8, |l, i| {
            l * 16 + i as u8
        });
        let mips = (0..3).map(|l| img.extract_lod(l)).collect::<Vec<_>>();
        let refs = mips.iter().collect::<Vec<_>>();
        let out = Image::compose_lods(&refs).unwrap();
        assert_eq!(out, img);

        let tail = Image::compose_lods(&refs[1..]).unwrap();
        assert_eq!(tail.size(), [2, 2]);
        assert_eq!(tail.lod_count(), 2);
        assert_eq!(tail.lod_data(1), img.lod_data(2));
    }

    #[test]
    fn compose_rejects_mixed_formats() {
        let a = Image::new(2, 2, 1, ImageFormat::L8);
        let b = Image::new(1, 1, 1, ImageFormat::Rgba8);
        assert!(Image::compose_lods(&[&a, &b]).is_none());
        assert!(Image::compose_lods(&[]).is_none());
    }
}
