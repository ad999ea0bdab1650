//! 构造最小的 ELF32 可执行文件

use ::uapi::layout::APPS_ENTRY;

const EHDR_SIZE: usize = 52;
const PHDR_SIZE: usize = 32;
const DATA_START: usize = 0x1000;

/// RISC-V 的 e_machine
pub const EM_RISCV: u16 = 0xF3;

struct Segment {
    vaddr: u32,
    data: Vec<u8>,
    mem_size: u32,
}

/// ELF32 小端可执行文件构造器
pub struct ElfBuilder {
    entry: u32,
    machine: u16,
    segments: Vec<Segment>,
}

impl ElfBuilder {
    pub fn new(entry: u32) -> Self {
        Self {
            entry,
            machine: EM_RISCV,
            segments: Vec::new(),
        }
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    /// 文件内容与内存大小相同的段
    pub fn segment(self, vaddr: u32, data: &[u8]) -> Self {
        let len = data.len() as u32;
        self.bss_segment(vaddr, data, len)
    }

    /// 内存大小超出文件内容的部分清零
    pub fn bss_segment(mut self, vaddr: u32, data: &[u8], mem_size: u32) -> Self {
        self.segments.push(Segment {
            vaddr,
            data: data.to_vec(),
            mem_size,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut offsets = Vec::new();
        let mut end = DATA_START;
        for seg in &self.segments {
            offsets.push(end);
            end = (end + seg.data.len()).next_multiple_of(16);
        }
        let mut out = vec![0u8; end];

        out[0..4].copy_from_slice(b"\x7fELF");
        out[4] = 1; // ELFCLASS32
        out[5] = 1; // ELFDATA2LSB
        out[6] = 1; // EV_CURRENT
        put16(&mut out, 16, 2); // ET_EXEC
        put16(&mut out, 18, self.machine);
        put32(&mut out, 20, 1);
        put32(&mut out, 24, self.entry);
        put32(&mut out, 28, EHDR_SIZE as u32);
        put16(&mut out, 40, EHDR_SIZE as u16);
        put16(&mut out, 42, PHDR_SIZE as u16);
        put16(&mut out, 44, self.segments.len() as u16);
        put16(&mut out, 46, 40);

        for (i, (seg, &off)) in self.segments.iter().zip(&offsets).enumerate() {
            let ph = EHDR_SIZE + i * PHDR_SIZE;
            put32(&mut out, ph, 1); // PT_LOAD
            put32(&mut out, ph + 4, off as u32);
            put32(&mut out, ph + 8, seg.vaddr);
            put32(&mut out, ph + 12, seg.vaddr);
            put32(&mut out, ph + 16, seg.data.len() as u32);
            put32(&mut out, ph + 20, seg.mem_size);
            put32(&mut out, ph + 24, 0b111);
            put32(&mut out, ph + 28, 0x1000);
            out[off..off + seg.data.len()].copy_from_slice(&seg.data);
        }
        out
    }
}

/// 一个代码段位于 APPS_ENTRY 的小程序，内容为 `code`
pub fn app_image(code: &[u8]) -> Vec<u8> {
    ElfBuilder::new(APPS_ENTRY as u32)
        .segment(APPS_ENTRY as u32, code)
        .build()
}

fn put16(out: &mut [u8], off: usize, value: u16) {
    out[off..off + 2].copy_from_slice(&value.to_le_bytes());
}

fn put32(out: &mut [u8], off: usize, value: u32) {
    out[off..off + 4].copy_from_slice(&value.to_le_bytes());
}
