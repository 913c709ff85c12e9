use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use winit::window::Window;

use crate::world::Vec2;

use super::Canvas;

/// Presents a logical-resolution [`Canvas`] scaled onto the window surface.
pub struct Renderer {
    pixels: Pixels<'static>,
    logical_size: (u32, u32),
}

impl Renderer {
    pub fn new(window: Arc<Window>, logical_width: u32, logical_height: u32) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels = Pixels::new(logical_width, logical_height, surface)?;
        Ok(Self {
            pixels,
            logical_size: (logical_width, logical_height),
        })
    }

    pub fn logical_size(&self) -> (u32, u32) {
        self.logical_size
    }

    /// Zero-sized surfaces (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// A canvas of any other size than the logical resolution is not copied.
    pub fn present(&mut self, canvas: &Canvas) -> Result<(), Error> {
        if canvas.size() == self.logical_size {
            self.pixels.frame_mut().copy_from_slice(canvas.frame());
        }
        self.pixels.render()
    }

    /// Maps a physical window position to canvas coordinates, clamped to the canvas edges.
    pub fn window_to_logical(&self, x: f64, y: f64) -> Vec2 {
        let (px, py) = self
            .pixels
            .window_pos_to_pixel((x as f32, y as f32))
            .unwrap_or_else(|outside| self.pixels.clamp_pixel_pos(outside));
        Vec2::new(px as f32, py as f32)
    }
}
