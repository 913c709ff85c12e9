use crate::assets::Image;

/// Software RGBA8 surface at the logical resolution. Scenes draw here; the renderer
/// scales it to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn pixel_at(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.offset_of(x, y)?;
        let mut color = [0; 4];
        color.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(color)
    }

    /// Draws `image` with its top-left at `position`, clipped to the canvas.
    /// Fully transparent source pixels are skipped.
    pub fn blit(&mut self, image: &Image, position: (i32, i32), flip_x: bool) {
        self.blit_with_opacity(image, position, flip_x, u8::MAX);
    }

    /// Like [`Canvas::blit`] with every source pixel's alpha scaled by `opacity / 255`.
    pub fn blit_translucent(&mut self, image: &Image, position: (i32, i32), opacity: u8) {
        self.blit_with_opacity(image, position, false, opacity);
    }

    fn blit_with_opacity(&mut self, image: &Image, position: (i32, i32), flip_x: bool, opacity: u8) {
        if opacity == 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let (image_width, image_height) = (image.width() as i32, image.height() as i32);
        let (left, top) = position;

        let draw_left = left.max(0);
        let draw_top = top.max(0);
        let draw_right = left.saturating_add(image_width).min(self.width as i32);
        let draw_bottom = top.saturating_add(image_height).min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let source = image.rgba();
        for out_y in draw_top..draw_bottom {
            let src_y = (out_y - top) as usize;
            for out_x in draw_left..draw_right {
                let dx = out_x - left;
                let src_x = (if flip_x { image_width - 1 - dx } else { dx }) as usize;
                let src_offset = (src_y * image_width as usize + src_x) * 4;
                let alpha = scale_alpha(source[src_offset + 3], opacity);
                if alpha == 0 {
                    continue;
                }
                let dst_offset = (out_y as usize * self.width as usize + out_x as usize) * 4;
                let src = &source[src_offset..src_offset + 3];
                let dst = &mut self.pixels[dst_offset..dst_offset + 4];
                if alpha == u8::MAX {
                    dst[..3].copy_from_slice(src);
                } else {
                    for channel in 0..3 {
                        dst[channel] = blend_channel(src[channel], dst[channel], alpha);
                    }
                }
                dst[3] = u8::MAX;
            }
        }
    }

    fn offset_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

fn scale_alpha(alpha: u8, opacity: u8) -> u8 {
    ((alpha as u16 * opacity as u16 + 127) / 255) as u8
}

fn blend_channel(src: u8, dst: u8, alpha: u8) -> u8 {
    let alpha = alpha as u16;
    ((src as u16 * alpha + dst as u16 * (255 - alpha) + 127) / 255) as u8
}
