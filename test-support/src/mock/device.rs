//! 终端与磁盘的 Mock 实现

use std::collections::VecDeque;

use ::kernel::config::BLOCK_SIZE;
use ::kernel::{BlockDevice, Tty};

/// 预置输入、记录输出的终端
#[derive(Default)]
pub struct MockTty {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl MockTty {
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Tty for MockTty {
    fn read_byte(&mut self) -> u8 {
        self.input
            .pop_front()
            .unwrap_or_else(|| panic!("MockTty: input exhausted"))
    }

    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }
}

/// 内存中的块设备
pub struct MockDisk {
    pub data: Vec<u8>,
}

impl MockDisk {
    pub fn new(blocks: usize) -> Self {
        Self {
            data: vec![0u8; blocks * BLOCK_SIZE],
        }
    }

    /// 把 `bytes` 写到第 `block` 块起始处
    pub fn put(&mut self, block: u32, bytes: &[u8]) {
        let start = block as usize * BLOCK_SIZE;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

impl BlockDevice for MockDisk {
    fn read_blocks(&mut self, block: u32, dst: &mut [u8]) {
        let start = block as usize * BLOCK_SIZE;
        dst.copy_from_slice(&self.data[start..start + dst.len()]);
    }

    fn write_blocks(&mut self, block: u32, src: &[u8]) {
        let start = block as usize * BLOCK_SIZE;
        self.data[start..start + src.len()].copy_from_slice(src);
    }
}
