use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use crate::{
    command::SurfaceId,
    framebuffer::{Framebuffer, PixelMatrix, SurfaceGeometry, DISPLAY_SIZE},
    raster, GlowbitError, Result, Rgb,
};

/// Drawable image of one surface, with brightness already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub surface: SurfaceId,
    pub width: u32,
    pub height: u32,
    /// Row-major image pixels.
    pub pixels: Vec<Rgb>,
    /// The same picture at one entry per display cell.
    pub cells: [[Rgb; DISPLAY_SIZE]; DISPLAY_SIZE],
}

impl Frame {
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Rgb> {
        self.cells.get(y).and_then(|row| row.get(x)).copied()
    }
}

/// External drawing surface fed by the display engine after each change.
pub trait RenderSink {
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

/// Sink that keeps every presented frame behind a cloneable handle.
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl FrameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Result<Vec<Frame>> {
        self.frames
            .lock()
            .map(|frames| frames.clone())
            .map_err(|_| GlowbitError::msg("frame log has been poisoned"))
    }

    pub fn last(&self) -> Result<Option<Frame>> {
        Ok(self.frames()?.pop())
    }
}

impl RenderSink for FrameLog {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.frames
            .lock()
            .map_err(|_| GlowbitError::msg("frame log has been poisoned"))?
            .push(frame.clone());
        Ok(())
    }
}

/// Owns every attached framebuffer and draws rasterized content onto them.
#[derive(Debug)]
pub struct DisplayEngine {
    surfaces: BTreeMap<SurfaceId, Framebuffer>,
    brightness: u8,
    background: Rgb,
}

impl DisplayEngine {
    pub fn new(brightness: u8, background: Rgb) -> Self {
        Self {
            surfaces: BTreeMap::new(),
            brightness,
            background,
        }
    }

    /// Allocates a blank framebuffer for `surface`. Attaching an existing
    /// surface again replaces it.
    pub fn attach(&mut self, surface: SurfaceId, geometry: SurfaceGeometry) -> Result<()> {
        if surface.as_str().is_empty() {
            return Err(GlowbitError::UnknownSurface(surface));
        }
        geometry.validate()?;
        self.surfaces.insert(surface, Framebuffer::new(geometry));
        Ok(())
    }

    pub fn surface_ids(&self) -> impl Iterator<Item = &SurfaceId> {
        self.surfaces.keys()
    }

    pub fn framebuffer(&self, surface: &SurfaceId) -> Result<&Framebuffer> {
        self.surfaces
            .get(surface)
            .ok_or_else(|| GlowbitError::UnknownSurface(surface.clone()))
    }

    pub fn framebuffer_mut(&mut self, surface: &SurfaceId) -> Result<&mut Framebuffer> {
        self.surfaces
            .get_mut(surface)
            .ok_or_else(|| GlowbitError::UnknownSurface(surface.clone()))
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    pub fn set_pixel(&mut self, surface: &SurfaceId, x: i32, y: i32, color: Option<Rgb>) -> Result<bool> {
        let written = self.framebuffer_mut(surface)?.set_pixel(x, y, color);
        if !written {
            tracing::debug!(%surface, x, y, "ignoring out-of-range pixel");
        }
        Ok(written)
    }

    pub fn clear(&mut self, surface: &SurfaceId) -> Result<()> {
        self.framebuffer_mut(surface)?.clear();
        Ok(())
    }

    pub fn clear_all(&mut self) {
        for framebuffer in self.surfaces.values_mut() {
            framebuffer.clear();
        }
    }

    pub fn draw_icon(&mut self, surface: &SurfaceId, name: &str, color: Rgb) -> Result<()> {
        let matrix = raster::icon_matrix(name);
        self.framebuffer_mut(surface)?.blit(&matrix, 0, color);
        Ok(())
    }

    /// Shows the display-wide window of a filmstrip for scroll step
    /// `offset`. Step 0 has the strip just off the right edge; step
    /// `width + DISPLAY_SIZE` has it just off the left edge.
    pub fn draw_scroll_step(
        &mut self,
        surface: &SurfaceId,
        strip: &PixelMatrix,
        offset: usize,
        color: Rgb,
    ) -> Result<()> {
        let origin = offset as isize - DISPLAY_SIZE as isize;
        self.framebuffer_mut(surface)?.blit(strip, origin, color);
        Ok(())
    }

    /// Produces the drawable image for `surface`: every cell is a square of
    /// `pixel_size - padding` pixels, everything else is background.
    pub fn render(&self, surface: &SurfaceId) -> Result<Frame> {
        let framebuffer = self.framebuffer(surface)?;
        let geometry = framebuffer.geometry();
        let size = geometry.image_size();
        let lit = geometry.pixel_size - geometry.padding;

        let mut cells = [[self.background; DISPLAY_SIZE]; DISPLAY_SIZE];
        for (y, row) in cells.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                if let Some(color) = framebuffer.pixel(x as i32, y as i32) {
                    *cell = color.scaled(self.brightness);
                }
            }
        }

        let mut pixels = vec![self.background; (size * size) as usize];
        for py in 0..size {
            for px in 0..size {
                let (cx, ox) = (px / geometry.pixel_size, px % geometry.pixel_size);
                let (cy, oy) = (py / geometry.pixel_size, py % geometry.pixel_size);
                if ox < lit && oy < lit {
                    pixels[(py * size + px) as usize] = cells[cy as usize][cx as usize];
                }
            }
        }

        Ok(Frame {
            surface: surface.clone(),
            width: size,
            height: size,
            pixels,
            cells,
        })
    }
}

impl Default for DisplayEngine {
    fn default() -> Self {
        Self::new(255, Rgb::BLACK)
    }
}
