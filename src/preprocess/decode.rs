/// Tolerant image decoding: an ordered chain of format-probing decoders.
///
/// turbojpeg takes JPEG (what the camera sends), the image crate takes PNG/WebP/BMP/TIFF
/// and anything else it can sniff. Every decoder yields packed RGB, 3 bytes per pixel,
/// in R,G,B order; that order is kept all the way into the classifier tensor.

use crate::pipeline::PipelineError;
use image::{DynamicImage, ImageFormat};

/// Uploads shorter than this are treated as empty or truncated frames.
pub const MIN_IMAGE_BYTES: usize = 2048;

/// Largest RGB buffer a JPEG header may ask for, matching the image crate's default limit.
pub const MAX_DECODED_BYTES: usize = 512 * 1024 * 1024;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// RGB pixel data, row-major, 3 bytes per pixel
    pub data: Vec<u8>,
}

/// A decoded, alpha-free image plus the MIME type of the bytes it came from.
#[derive(Clone, Debug)]
pub struct NormalizedImage {
    pub image: DecodedImage,
    pub mime: &'static str,
}

/// Outcome of offering bytes to one decoder.
pub enum Probe {
    Decoded(NormalizedImage),
    /// Not this decoder's format; try the next one.
    Unsupported,
}

trait FormatDecoder {
    fn name(&self) -> &'static str;

    /// `Err` means the format matched but the payload is broken.
    fn probe(&self, data: &[u8]) -> Result<Probe, String>;
}

struct TurboJpeg;
struct ImageCrate;

const DECODERS: [&dyn FormatDecoder; 2] = [&TurboJpeg, &ImageCrate];

/// Decode arbitrary upload bytes into an opaque RGB image.
pub fn normalize(data: &[u8], min_len: usize) -> Result<NormalizedImage, PipelineError> {
    if data.len() < min_len {
        return Err(PipelineError::InputTooSmall {
            len: data.len(),
            min: min_len,
        });
    }

    let mut last_error = None;
    for decoder in DECODERS {
        match decoder.probe(data) {
            Ok(Probe::Decoded(normalized)) => {
                tracing::debug!(
                    decoder = decoder.name(),
                    width = normalized.image.width,
                    height = normalized.image.height,
                    mime = normalized.mime,
                    "decoded image"
                );
                return Ok(normalized);
            }
            Ok(Probe::Unsupported) => {}
            Err(e) => {
                tracing::debug!(decoder = decoder.name(), error = %e, "decoder rejected input");
                last_error = Some(format!("{}: {e}", decoder.name()));
            }
        }
    }

    Err(PipelineError::Decode(
        last_error.unwrap_or_else(|| "unrecognized image format".to_string()),
    ))
}

impl FormatDecoder for TurboJpeg {
    fn name(&self) -> &'static str {
        "turbojpeg"
    }

    fn probe(&self, data: &[u8]) -> Result<Probe, String> {
        // JPEG SOI marker
        if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
            return Ok(Probe::Unsupported);
        }

        let mut decompressor =
            turbojpeg::Decompressor::new().map_err(|e| format!("turbojpeg init: {e}"))?;
        let header = decompressor
            .read_header(data)
            .map_err(|e| format!("JPEG header: {e}"))?;

        let width = header.width;
        let height = header.height;
        let pitch = width * 3;
        let len = rgb_buffer_len(width, height)?;

        let mut pixels = vec![0u8; len];
        let image = turbojpeg::Image {
            pixels: pixels.as_mut_slice(),
            width,
            pitch,
            height,
            format: turbojpeg::PixelFormat::RGB,
        };

        decompressor
            .decompress(data, image)
            .map_err(|e| format!("JPEG decode: {e}"))?;

        Ok(Probe::Decoded(NormalizedImage {
            image: DecodedImage {
                width: width as u32,
                height: height as u32,
                data: pixels,
            },
            mime: "image/jpeg",
        }))
    }
}

impl FormatDecoder for ImageCrate {
    fn name(&self) -> &'static str {
        "image"
    }

    fn probe(&self, data: &[u8]) -> Result<Probe, String> {
        let Ok(format) = image::guess_format(data) else {
            return Ok(Probe::Unsupported);
        };

        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| format!("{format:?} decode: {e}"))?;

        Ok(Probe::Decoded(NormalizedImage {
            image: flatten(img),
            mime: mime_for(format),
        }))
    }
}

/// Size of a packed RGB buffer, refused past `MAX_DECODED_BYTES`.
fn rgb_buffer_len(width: usize, height: usize) -> Result<usize, String> {
    width
        .checked_mul(height)
        .and_then(|px| px.checked_mul(3))
        .filter(|&len| len <= MAX_DECODED_BYTES)
        .ok_or_else(|| format!("{width}x{height} exceeds the decode limit"))
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => OCTET_STREAM,
    }
}

/// Drop alpha by compositing onto white; everything else just becomes RGB8.
fn flatten(img: DynamicImage) -> DecodedImage {
    if !img.color().has_alpha() {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        return DecodedImage {
            width,
            height,
            data: rgb.into_raw(),
        };
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        data.extend_from_slice(&[over_white(r, a), over_white(g, a), over_white(b, a)]);
    }

    DecodedImage {
        width,
        height,
        data,
    }
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (channel as u32, alpha as u32);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}
