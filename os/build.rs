use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() != Ok("riscv32") {
        return;
    }
    let ld = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR")).join("linker.ld");
    fs::write(&ld, LINKER).expect("write linker script");
    println!("cargo:rustc-link-arg=-T{}", ld.display());
}

// 内核占据 RAM 开头 4 MiB，APPS_ENTRY 起留给应用
const LINKER: &[u8] = b"
OUTPUT_ARCH(riscv)
ENTRY(_start)
SECTIONS {
    . = 0x80000000;
    .text : {
        *(.text.entry)
        *(.text .text.*)
    }
    . = ALIGN(4K);
    .rodata : {
        *(.rodata .rodata.*)
        *(.srodata .srodata.*)
    }
    . = ALIGN(4K);
    .data : {
        *(.data .data.*)
        *(.sdata .sdata.*)
    }
    .bss : {
        *(.bss.stack)
        sbss = ALIGN(16);
        *(.bss .bss.*)
        *(.sbss .sbss.*)
        ebss = ALIGN(16);
    }
    ASSERT(. <= 0x80400000, \"kernel image overlaps APPS_ENTRY\")
    /DISCARD/ : {
        *(.eh_frame)
    }
}";
