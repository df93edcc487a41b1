// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode JPEG/PNG inputs and normalise them to 8-bit RGB
// ready for embedding in a PDF.

use docops_core::DocumentFormat;
use docops_core::error::{DocOpsError, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

/// One decoded input image.
pub struct ImageProcessor {
    /// Input name, kept for error messages.
    name: String,
    image: DynamicImage,
}

impl ImageProcessor {
    /// Decode an image from raw encoded bytes in the declared `format`.
    /// Content in any other encoding is rejected, even if it would decode.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(name: &str, format: DocumentFormat, data: &[u8]) -> Result<Self> {
        let encoding = match format {
            DocumentFormat::Jpeg => ImageFormat::Jpeg,
            DocumentFormat::Png => ImageFormat::Png,
            other => {
                return Err(DocOpsError::Validation(format!(
                    "{name} is a {other} file, not a JPEG or PNG image"
                )));
            }
        };
        let image = image::load_from_memory_with_format(data, encoding).map_err(|err| {
            DocOpsError::ImageDecode {
                name: name.to_string(),
                detail: err.to_string(),
            }
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            color = ?image.color(),
            "Image decoded from bytes"
        );
        Ok(Self {
            name: name.to_string(),
            image,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Convert to 8-bit RGB. Transparent pixels are composited over white,
    /// matching how a viewer shows them on a blank page.
    pub fn normalize(self) -> RgbImage {
        if !self.image.color().has_alpha() {
            return self.image.into_rgb8();
        }
        let rgba = self.image.into_rgba8();
        image::ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let blend = |channel: u8| -> u8 {
                let alpha = a as u32;
                ((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8
            };
            image::Rgb([blend(r), blend(g), blend(b)])
        })
    }
}
