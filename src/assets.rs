use crate::error::ImageDecodeError;
use base64::Engine;
use image::GenericImageView;
use std::io::Write;
use std::sync::Arc;

const BUNDLED_LOGO: &[u8] = include_bytes!("../assets/logo.png");
const BUNDLED_FOOTER: &[u8] = include_bytes!("../assets/footer.png");

/// Decoded raster, already encoded the way the PDF writer embeds it.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub(crate) color_space: &'static str,
    pub(crate) bits_per_component: u8,
    pub(crate) filter: &'static str,
    pub(crate) data: Vec<u8>,
    pub(crate) alpha: Option<AlphaChannel>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AlphaChannel {
    pub(crate) data: Vec<u8>,
}

impl RasterImage {
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }

    pub(crate) fn encoded_len(&self) -> usize {
        self.data.len() + self.alpha.as_ref().map(|a| a.data.len()).unwrap_or(0)
    }
}

/// Masthead logo and footer strip shared by every page.
#[derive(Debug, Clone)]
pub struct BrandAssets {
    pub logo: Arc<RasterImage>,
    pub footer: Arc<RasterImage>,
}

impl BrandAssets {
    pub fn bundled() -> Result<Self, ImageDecodeError> {
        Self::from_bytes(BUNDLED_LOGO, BUNDLED_FOOTER)
    }

    pub fn from_bytes(logo: &[u8], footer: &[u8]) -> Result<Self, ImageDecodeError> {
        Ok(Self {
            logo: Arc::new(decode_image_bytes(logo)?),
            footer: Arc::new(decode_image_bytes(footer)?),
        })
    }
}

/// Decodes an image supplied by the report form: either a `data:` URI or bare base64.
pub fn decode_image(source: &str) -> Result<RasterImage, ImageDecodeError> {
    let source = source.trim();
    if source.is_empty() {
        return Err(ImageDecodeError::Empty);
    }
    let payload = match source.strip_prefix("data:") {
        Some(rest) => {
            let Some((header, data)) = rest.split_once(',') else {
                return Err(ImageDecodeError::Base64(
                    "data uri without payload".to_string(),
                ));
            };
            if !header.contains("base64") {
                return Err(ImageDecodeError::Base64(
                    "data uri is not base64 encoded".to_string(),
                ));
            }
            data
        }
        None => source,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(ImageDecodeError::Empty);
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| ImageDecodeError::Base64(err.to_string()))?;
    decode_image_bytes(&bytes)
}

pub fn decode_image_bytes(data: &[u8]) -> Result<RasterImage, ImageDecodeError> {
    if data.is_empty() {
        return Err(ImageDecodeError::Empty);
    }
    let format =
        image::guess_format(data).map_err(|err| ImageDecodeError::Format(err.to_string()))?;
    let decoded = image::load_from_memory_with_format(data, format)
        .map_err(|err| ImageDecodeError::Format(err.to_string()))?;
    let (width, height) = decoded.dimensions();

    // DCT data is embedded as-is only for gray and RGB scans. The decoder
    // already converts CMYK and YCCK to RGB, so those go through Flate.
    if format == image::ImageFormat::Jpeg {
        let color_space = match jpeg_components(data) {
            Some(1) => Some("/DeviceGray"),
            Some(3) => Some("/DeviceRGB"),
            _ => None,
        };
        if let Some(color_space) = color_space {
            return Ok(RasterImage {
                width,
                height,
                color_space,
                bits_per_component: 8,
                filter: "/DCTDecode",
                data: data.to_vec(),
                alpha: None,
            });
        }
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let alpha = if has_alpha {
        Some(AlphaChannel {
            data: flate_compress(&alpha)?,
        })
    } else {
        None
    };
    Ok(RasterImage {
        width,
        height,
        color_space: "/DeviceRGB",
        bits_per_component: 8,
        filter: "/FlateDecode",
        data: flate_compress(&rgb)?,
        alpha,
    })
}

/// Component count from the first SOF segment, or `None` if no frame header is found.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            // length(2) precision(1) height(2) width(2) components(1)
            return data.get(pos + 9).copied();
        }
        if marker == 0xDA || len < 2 {
            return None;
        }
        pos += 2 + len;
    }
    None
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>, ImageDecodeError> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|err| ImageDecodeError::Compress(err.to_string()))
}
