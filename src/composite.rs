//! Straight-RGBA8 paint surface and per-pixel blend kernels.
//!
//! Sources arrive pre-stretched to the surface dimensions; painting is a
//! flat per-pixel pass. Color math is 8-bit integer with round-half-up
//! scaling. Non-`source-over` modes first mix the separable blend
//! function with the backdrop in proportion to backdrop alpha, then
//! composite source-over; on a transparent backdrop every mode degrades
//! to a plain source-over paint.

use crate::{
    config::Dimensions,
    error::{EngineError, EngineResult},
    model::BlendMode,
};

pub type StraightRgba8 = [u8; 4];

pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>, // straight rgba8, row-major
}

impl Surface {
    /// Fully transparent surface.
    pub fn new(dims: Dimensions) -> Self {
        Self {
            width: dims.width,
            height: dims.height,
            pixels: vec![0u8; dims.width as usize * dims.height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Panics when `(x, y)` lies outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> StraightRgba8 {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} surface",
            self.width,
            self.height
        );
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Paint a source image over the whole surface. The source must
    /// already match the surface dimensions.
    pub fn paint(
        &mut self,
        source: &image::RgbaImage,
        blend: BlendMode,
        opacity: f64,
    ) -> EngineResult<()> {
        if source.width() != self.width || source.height() != self.height {
            return Err(EngineError::render(format!(
                "paint expects a {}x{} source, got {}x{}",
                self.width,
                self.height,
                source.width(),
                source.height()
            )));
        }
        let opacity = opacity as f32;
        for (d, s) in self
            .pixels
            .chunks_exact_mut(4)
            .zip(source.as_raw().chunks_exact(4))
        {
            let out = compose([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], blend, opacity);
            d.copy_from_slice(&out);
        }
        Ok(())
    }

    /// Deterministic lossless PNG bytes. Identical pixels give identical
    /// bytes; there are no timestamps or ancillary chunks.
    pub fn encode_png(&self) -> EngineResult<Vec<u8>> {
        use image::ImageEncoder;

        let mut png = Vec::new();
        image::codecs::png::PngEncoder::new(std::io::Cursor::new(&mut png))
            .write_image(
                &self.pixels,
                self.width,
                self.height,
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| EngineError::render(format!("png encode failed: {e}")))?;
        Ok(png)
    }
}

/// Composite one straight-alpha source pixel over a destination pixel.
pub fn compose(
    dst: StraightRgba8,
    src: StraightRgba8,
    mode: BlendMode,
    opacity: f32,
) -> StraightRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let da = dst[3];

    // Mix the blend result with the plain source color by backdrop
    // coverage before compositing.
    let mut sc = [src[0], src[1], src[2]];
    if mode != BlendMode::SourceOver && da > 0 {
        for i in 0..3 {
            let blended = blend_channel(mode, dst[i], src[i]);
            sc[i] = add_sat_u8(
                mul_div255(255 - u16::from(da), u16::from(src[i])),
                mul_div255(u16::from(da), u16::from(blended)),
            );
        }
    }

    let wd = mul_div255(u16::from(da), 255 - u16::from(sa));
    let ao = u16::from(sa) + u16::from(wd); // never exceeds 255

    let mut out = [0u8; 4];
    out[3] = ao as u8;
    for i in 0..3 {
        let num = u32::from(sc[i]) * u32::from(sa)
            + u32::from(dst[i]) * u32::from(wd)
            + u32::from(ao) / 2;
        out[i] = (num / u32::from(ao)) as u8;
    }
    out
}

/// Separable blend function on straight color channels.
fn blend_channel(mode: BlendMode, cb: u8, cs: u8) -> u8 {
    match mode {
        BlendMode::SourceOver => cs,
        BlendMode::Multiply => mul_div255(u16::from(cb), u16::from(cs)),
        BlendMode::Screen => screen(cb, cs),
        BlendMode::Overlay => {
            let twice = 2 * u16::from(cb);
            if twice <= 255 {
                mul_div255(u16::from(cs), twice)
            } else {
                screen(cs, (twice - 255) as u8)
            }
        }
        BlendMode::Darken => cb.min(cs),
        BlendMode::Lighten => cb.max(cs),
    }
}

fn screen(cb: u8, cs: u8) -> u8 {
    255 - mul_div255(255 - u16::from(cb), 255 - u16::from(cs))
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
