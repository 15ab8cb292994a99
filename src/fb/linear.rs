//! Direct-mapped 8bpp framebuffer

use super::{FramebufferWriter, PixelRun};
use crate::hw::VideoMemory;

pub struct LinearWriter<M: VideoMemory> {
    mem: M,
    stride: usize,
}

impl<M: VideoMemory> LinearWriter<M> {
    pub fn new(mem: M, stride: usize) -> Self {
        Self { mem, stride }
    }
}

impl<M: VideoMemory> FramebufferWriter for LinearWriter<M> {
    fn write_run(&mut self, run: PixelRun) {
        let offset = run.y * self.stride + run.x;
        self.mem.fill_bytes(offset, run.len, run.color);
    }
}
