use std::sync::Arc;

use thiserror::Error;

use crate::assets::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnimationError {
    #[error("an animation needs at least one frame")]
    NoFrames,
}

/// Frame-duration based playback over a shared, read-only frame list.
#[derive(Debug, Clone)]
pub struct Animation {
    frames: Arc<[Image]>,
    frame_duration: u32,
    looping: bool,
    done: bool,
    cursor: u32,
}

impl Animation {
    /// `frame_duration` is in ticks and is raised to at least 1.
    pub fn new(
        frames: Vec<Image>,
        frame_duration: u32,
        looping: bool,
    ) -> Result<Self, AnimationError> {
        if frames.is_empty() {
            return Err(AnimationError::NoFrames);
        }
        Ok(Self {
            frames: frames.into(),
            frame_duration: frame_duration.max(1),
            looping,
            done: false,
            cursor: 0,
        })
    }

    /// Same frames, playback restarted. Used whenever an entity switches action.
    pub fn copy(&self) -> Self {
        Self {
            frames: Arc::clone(&self.frames),
            frame_duration: self.frame_duration,
            looping: self.looping,
            done: false,
            cursor: 0,
        }
    }

    fn total_ticks(&self) -> u32 {
        self.frames.len() as u32 * self.frame_duration
    }

    pub fn update(&mut self) {
        let total = self.total_ticks();
        if self.looping {
            self.cursor = (self.cursor + 1) % total;
        } else {
            self.cursor = (self.cursor + 1).min(total - 1);
            if self.cursor >= total - 1 {
                self.done = true;
            }
        }
    }

    pub fn frame_index(&self) -> usize {
        ((self.cursor / self.frame_duration) as usize).min(self.frames.len() - 1)
    }

    pub fn image(&self) -> &Image {
        &self.frames[self.frame_index()]
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_duration(&self) -> u32 {
        self.frame_duration
    }

    pub fn shares_frames_with(&self, other: &Animation) -> bool {
        Arc::ptr_eq(&self.frames, &other.frames)
    }
}
