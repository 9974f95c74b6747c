use std::path::Path;

use crate::AssetError;

/// Decoded 8-bit RGBA pixels, row-major, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// Wrap raw pixels, checking the buffer matches the dimensions.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(AssetError::BadDimensions {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode a PNG or JPEG file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AssetError::MissingAsset(path.to_path_buf()));
        }
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        tracing::debug!(path = %path.display(), width, height, "decoded texture");
        Self::from_raw(width, height, img.into_raw())
    }

    /// Two-colour checkerboard, used when no texture file is configured.
    pub fn checkerboard(size: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let px = if (x / cell + y / cell) % 2 == 0 { a } else { b };
                pixels.extend_from_slice(&px);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_cells() {
        let img = RgbaImage::checkerboard(4, 2, [255, 0, 0, 255], [0, 0, 255, 255]);
        assert_eq!(img.pixels.len(), 64);
        assert_eq!(img.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(2, 0), Some([0, 0, 255, 255]));
        assert_eq!(img.pixel(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(4, 0), None);
    }

    #[test]
    fn raw_buffer_must_match_dimensions() {
        assert!(RgbaImage::from_raw(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            RgbaImage::from_raw(2, 2, vec![0; 15]),
            Err(AssetError::BadDimensions { len: 15, .. })
        ));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.png");
        match RgbaImage::load(&path) {
            Err(AssetError::MissingAsset(p)) => assert_eq!(p, path),
            other => panic!("expected MissingAsset, got {other:?}"),
        }
    }

    #[test]
    fn png_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.png");
        let src = RgbaImage::checkerboard(8, 4, [10, 20, 30, 255], [200, 100, 50, 255]);
        image::save_buffer(&path, &src.pixels, 8, 8, image::ColorType::Rgba8).unwrap();

        let loaded = RgbaImage::load(&path).unwrap();
        assert_eq!(loaded, src);
    }

    #[test]
    fn garbage_file_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(RgbaImage::load(&path), Err(AssetError::Decode(_))));
    }
}
