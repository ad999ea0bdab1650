//! 控制台串口
//!
//! QEMU sifive_u 使用 SiFive UART，Arty 使用 LiteX UART，寄存器布局不同。

use core::fmt;

use kernel::Tty;
use mm::Platform;

use super::{read_reg, write_reg};

// SiFive UART
const SIFIVE_TXDATA: usize = 0x00;
const SIFIVE_RXDATA: usize = 0x04;
const SIFIVE_TXCTRL: usize = 0x08;
const SIFIVE_RXCTRL: usize = 0x0C;
const SIFIVE_FIFO_FLAG: u32 = 1 << 31;

// LiteX UART
const LITEX_RXTX: usize = 0x00;
const LITEX_TXFULL: usize = 0x04;
const LITEX_RXEMPTY: usize = 0x08;
const LITEX_EV_PENDING: usize = 0x10;
const LITEX_EV_RX: u32 = 1 << 1;

/// 串口句柄
///
/// 只保存基址，可以为同一个串口创建多个句柄。
#[derive(Debug)]
pub struct Uart {
    base: usize,
    platform: Platform,
}

impl Uart {
    /// 平台的控制台串口
    pub const fn new(platform: Platform) -> Self {
        Self {
            base: platform.uart_base(),
            platform,
        }
    }

    /// 打开收发
    pub fn init(&self) {
        if self.platform == Platform::Qemu {
            write_reg(self.base, SIFIVE_TXCTRL, read_reg(self.base, SIFIVE_TXCTRL) | 1);
            write_reg(self.base, SIFIVE_RXCTRL, read_reg(self.base, SIFIVE_RXCTRL) | 1);
        }
    }

    /// 阻塞写出一个字节
    pub fn putc(&mut self, byte: u8) {
        match self.platform {
            Platform::Qemu => {
                while read_reg(self.base, SIFIVE_TXDATA) & SIFIVE_FIFO_FLAG != 0 {}
                write_reg(self.base, SIFIVE_TXDATA, byte as u32);
            }
            Platform::Arty => {
                while read_reg(self.base, LITEX_TXFULL) != 0 {}
                write_reg(self.base, LITEX_RXTX, byte as u32);
            }
        }
    }

    /// 阻塞读取一个字节
    pub fn getc(&mut self) -> u8 {
        match self.platform {
            Platform::Qemu => loop {
                let data = read_reg(self.base, SIFIVE_RXDATA);
                if data & SIFIVE_FIFO_FLAG == 0 {
                    return data as u8;
                }
            },
            Platform::Arty => {
                while read_reg(self.base, LITEX_RXEMPTY) != 0 {}
                let byte = read_reg(self.base, LITEX_RXTX) as u8;
                write_reg(self.base, LITEX_EV_PENDING, LITEX_EV_RX);
                byte
            }
        }
    }
}

impl Tty for Uart {
    fn read_byte(&mut self) -> u8 {
        self.getc()
    }

    fn write_byte(&mut self, byte: u8) {
        self.putc(byte);
    }
}

impl fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.putc(byte);
        }
        Ok(())
    }
}
