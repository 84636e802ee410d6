// Image loading and scaling module
// Decodes the crosshair image once at startup and resamples it on demand

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while loading the crosshair image at startup.
/// All of them are fatal: the caller prints the message and exits.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("crosshair image not found at {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The decoded source image, premultiplied BGRA (little-endian ARGB8888).
/// Never mutated after loading; scaled copies are derived from it.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub width: u32,
    pub height: u32,
    pub bgra: Vec<u8>,
}

/// A buffer resampled from the source image; this is what gets displayed.
#[derive(Debug, Clone)]
pub struct ScaledImage {
    pub width: u32,
    pub height: u32,
    pub bgra: Vec<u8>,
}

impl SourceImage {
    /// Load and decode an image file, converting it to premultiplied BGRA.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let data = fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let img = image::load_from_memory(&data).map_err(|source| LoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        // Wayland ARGB8888 buffers expect premultiplied alpha in BGRA byte
        // order on little-endian, so fold the alpha in while swapping channels.
        let mut bgra = Vec::with_capacity(width as usize * height as usize * 4);
        for pixel in rgba.pixels() {
            let a = pixel[3] as u32;
            bgra.push(((pixel[2] as u32 * a) / 255) as u8); // B
            bgra.push(((pixel[1] as u32 * a) / 255) as u8); // G
            bgra.push(((pixel[0] as u32 * a) / 255) as u8); // R
            bgra.push(pixel[3]); // A
        }

        Ok(Self {
            width,
            height,
            bgra,
        })
    }

    /// Dimensions of the buffer produced by `scale(percent)`.
    /// The percentage has no upper bound, so widen before multiplying.
    pub fn scaled_size(&self, percent: u32) -> (u32, u32) {
        (
            (self.width as u64 * percent as u64 / 100) as u32,
            (self.height as u64 * percent as u64 / 100) as u32,
        )
    }

    /// Byte length of the buffer produced by `scale(percent)`. The product
    /// can exceed `u32::MAX` for large percentages, so callers use this to
    /// check against their buffer limit before scaling.
    pub fn scaled_buffer_len(&self, percent: u32) -> usize {
        let (width, height) = self.scaled_size(percent);
        width as usize * height as usize * 4
    }

    /// Resample the image to `percent` of its original size using bilinear
    /// interpolation. The caller keeps `percent >= 10`, so the result is
    /// never zero-sized.
    pub fn scale(&self, percent: u32) -> ScaledImage {
        let (width, height) = self.scaled_size(percent);

        if (width, height) == (self.width, self.height) {
            return ScaledImage {
                width,
                height,
                bgra: self.bgra.clone(),
            };
        }

        let mut bgra = vec![0u8; width as usize * height as usize * 4];

        let scale_x = self.width as f32 / width as f32;
        let scale_y = self.height as f32 / height as f32;

        for y in 0..height {
            for x in 0..width {
                let src_x = x as f32 * scale_x;
                let src_y = y as f32 * scale_y;

                let x0 = src_x.floor() as u32;
                let y0 = src_y.floor() as u32;
                let x1 = (x0 + 1).min(self.width - 1);
                let y1 = (y0 + 1).min(self.height - 1);

                let fx = src_x - x0 as f32;
                let fy = src_y - y0 as f32;

                let get_pixel = |px: u32, py: u32| -> [u8; 4] {
                    let idx = (py as usize * self.width as usize + px as usize) * 4;
                    [
                        self.bgra[idx],
                        self.bgra[idx + 1],
                        self.bgra[idx + 2],
                        self.bgra[idx + 3],
                    ]
                };

                let p00 = get_pixel(x0, y0);
                let p10 = get_pixel(x1, y0);
                let p01 = get_pixel(x0, y1);
                let p11 = get_pixel(x1, y1);

                let interpolate = |c: usize| -> u8 {
                    let v0 = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
                    let v1 = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
                    let v = v0 * (1.0 - fy) + v1 * fy;
                    v.round().clamp(0.0, 255.0) as u8
                };

                let dst_idx = (y as usize * width as usize + x as usize) * 4;
                bgra[dst_idx] = interpolate(0);
                bgra[dst_idx + 1] = interpolate(1);
                bgra[dst_idx + 2] = interpolate(2);
                bgra[dst_idx + 3] = interpolate(3);
            }
        }

        ScaledImage {
            width,
            height,
            bgra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(width: u32, height: u32, pixel: [u8; 4]) -> SourceImage {
        let mut bgra = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width * height {
            bgra.extend_from_slice(&pixel);
        }
        SourceImage {
            width,
            height,
            bgra,
        }
    }

    #[test]
    fn scaled_size_floors() {
        let img = solid_image(64, 48, [0, 0, 0, 255]);
        assert_eq!(img.scaled_size(100), (64, 48));
        assert_eq!(img.scaled_size(105), (67, 50));
        assert_eq!(img.scaled_size(50), (32, 24));
        assert_eq!(img.scaled_size(10), (6, 4));
        // Rounds down, never up
        assert_eq!(img.scaled_size(33), (21, 15));
    }

    #[test]
    fn scale_at_100_percent_is_identity() {
        let mut img = solid_image(8, 8, [10, 20, 30, 255]);
        img.bgra[0] = 99; // make it non-uniform
        let scaled = img.scale(100);
        assert_eq!(scaled.width, 8);
        assert_eq!(scaled.height, 8);
        assert_eq!(scaled.bgra, img.bgra);
    }

    #[test]
    fn scale_preserves_solid_color() {
        let img = solid_image(16, 16, [40, 80, 120, 255]);
        let scaled = img.scale(50);
        assert_eq!((scaled.width, scaled.height), (8, 8));
        for pixel in scaled.bgra.chunks_exact(4) {
            assert_eq!(pixel, [40, 80, 120, 255]);
        }
    }

    #[test]
    fn scale_output_matches_scaled_size() {
        let img = solid_image(100, 60, [0, 0, 0, 0]);
        for percent in [10, 25, 77, 150, 300] {
            let (w, h) = img.scaled_size(percent);
            let scaled = img.scale(percent);
            assert_eq!((scaled.width, scaled.height), (w, h));
            assert_eq!(scaled.bgra.len(), (w * h * 4) as usize);
        }
    }

    #[test]
    fn scale_blends_neighbors_bilinearly() {
        // Upscaling a black/white pair puts the middle output sample at
        // 2/3 of the way between the source pixels: 255 * 2/3 rounds to 170.
        // Nearest-neighbor would produce 0 or 255 there.
        let horizontal = SourceImage {
            width: 2,
            height: 1,
            bgra: vec![0, 0, 0, 255, 255, 255, 255, 255],
        };
        let scaled = horizontal.scale(150);
        assert_eq!((scaled.width, scaled.height), (3, 1));
        assert_eq!(
            scaled.bgra,
            vec![0, 0, 0, 255, 170, 170, 170, 255, 255, 255, 255, 255]
        );

        let vertical = SourceImage {
            width: 1,
            height: 2,
            bgra: vec![0, 0, 0, 255, 255, 255, 255, 255],
        };
        let scaled = vertical.scale(150);
        assert_eq!((scaled.width, scaled.height), (1, 3));
        assert_eq!(
            scaled.bgra,
            vec![0, 0, 0, 255, 170, 170, 170, 255, 255, 255, 255, 255]
        );
    }

    #[test]
    fn scaled_buffer_len_handles_huge_percentages() {
        // 300x300 at 20000% is 60000x60000; the byte count exceeds u32::MAX
        // and must not wrap or panic.
        let img = solid_image(300, 300, [0, 0, 0, 255]);
        assert_eq!(img.scaled_size(20000), (60000, 60000));
        assert_eq!(img.scaled_buffer_len(20000), 14_400_000_000);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = SourceImage::load(Path::new("/nonexistent/crosshair.png")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }
}
