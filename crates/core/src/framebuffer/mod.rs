use serde::{Deserialize, Serialize};

use crate::{GlowbitError, Result, Rgb};

/// Width and height of every simulated display, in cells.
pub const DISPLAY_SIZE: usize = 8;

/// Drawing geometry for one surface. Only the render step looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceGeometry {
    /// Edge length of one cell in output pixels, including its padding.
    pub pixel_size: u32,
    /// Gap left between neighbouring cells, taken from `pixel_size`.
    pub padding: u32,
}

impl Default for SurfaceGeometry {
    fn default() -> Self {
        Self {
            pixel_size: 30,
            padding: 2,
        }
    }
}

impl SurfaceGeometry {
    pub fn new(pixel_size: u32, padding: u32) -> Result<Self> {
        let geometry = Self {
            pixel_size,
            padding,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<()> {
        let image_area = self
            .pixel_size
            .checked_mul(DISPLAY_SIZE as u32)
            .and_then(|side| side.checked_mul(side));
        if self.pixel_size == 0 || self.padding >= self.pixel_size || image_area.is_none() {
            return Err(GlowbitError::InvalidGeometry {
                pixel_size: self.pixel_size,
                padding: self.padding,
            });
        }
        Ok(())
    }

    /// Side length of the rendered image in output pixels. Validated
    /// geometries keep its square within `u32`.
    pub fn image_size(&self) -> u32 {
        self.pixel_size * DISPLAY_SIZE as u32
    }
}

/// Row-major on/off matrix produced by the rasterizer.
///
/// Height always matches the display; width may exceed it (text filmstrips).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMatrix {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl PixelMatrix {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width * height],
        }
    }

    /// Builds a display-sized matrix from eight row bytes, bit 7 leftmost.
    pub fn from_rows(rows: &[u8; DISPLAY_SIZE]) -> Self {
        let mut matrix = Self::new(DISPLAY_SIZE, DISPLAY_SIZE);
        for (y, row) in rows.iter().enumerate() {
            for x in 0..DISPLAY_SIZE {
                matrix.set(x, y, row & (0x80 >> x) != 0);
            }
        }
        matrix
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reads one cell; anything outside the matrix reads as off.
    pub fn get(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.bits[y as usize * self.width + x as usize]
    }

    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if x < self.width && y < self.height {
            self.bits[y * self.width + x] = on;
        }
    }

    pub fn lit_count(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }
}

/// The addressable grid of one simulated display.
///
/// Colours are kept exactly as written; brightness is a viewing parameter
/// applied when a frame is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    cells: [[Option<Rgb>; DISPLAY_SIZE]; DISPLAY_SIZE],
    geometry: SurfaceGeometry,
}

impl Framebuffer {
    pub fn new(geometry: SurfaceGeometry) -> Self {
        Self {
            cells: [[None; DISPLAY_SIZE]; DISPLAY_SIZE],
            geometry,
        }
    }

    pub fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    /// Writes one cell. Coordinates outside the grid are ignored and the
    /// call reports whether anything was written.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Option<Rgb>) -> bool {
        match Self::index(x, y) {
            Some((x, y)) => {
                self.cells[y][x] = color;
                true
            }
            None => false,
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        Self::index(x, y).and_then(|(x, y)| self.cells[y][x])
    }

    pub fn clear(&mut self) {
        self.cells = [[None; DISPLAY_SIZE]; DISPLAY_SIZE];
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_none)
    }

    /// Replaces the whole grid with a window of `matrix` starting at column
    /// `origin`; lit cells take `color`, everything else turns off.
    pub fn blit(&mut self, matrix: &PixelMatrix, origin: isize, color: Rgb) {
        for (y, row) in self.cells.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                let on = matrix.get(origin + x as isize, y as isize);
                *cell = on.then_some(color);
            }
        }
    }

    fn index(x: i32, y: i32) -> Option<(usize, usize)> {
        let range = 0..DISPLAY_SIZE as i32;
        (range.contains(&x) && range.contains(&y)).then(|| (x as usize, y as usize))
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new(SurfaceGeometry::default())
    }
}
