//! 串口日志后端
//!
//! `log` 门面的实现：每条记录以 `[LEVEL] message\r\n` 写到串口，
//! 写出过程持有串口锁，多核输出不会交错。

use core::fmt::{self, Write};

use log::Level;

/// 写出一条日志记录
pub fn write_record(out: &mut impl Write, level: Level, args: fmt::Arguments<'_>) -> fmt::Result {
    write!(out, "[{}] {}\r\n", level, args)
}

#[cfg(target_arch = "riscv32")]
mod backend {
    use core::fmt::{self, Write};

    use log::{Metadata, Record};

    use super::write_record;
    use crate::drivers::{CONSOLE, Uart};
    use crate::platform::{LOG_LEVEL, PLATFORM};

    struct UartLogger;

    impl log::Log for UartLogger {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            metadata.level() <= LOG_LEVEL
        }

        fn log(&self, record: &Record<'_>) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let mut uart = CONSOLE.lock();
            let _ = write_record(&mut *uart, record.level(), *record.args());
        }

        fn flush(&self) {}
    }

    static LOGGER: UartLogger = UartLogger;

    /// 安装日志后端
    pub fn init() {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LOG_LEVEL);
        }
    }

    /// 绕过串口锁直接输出，只在 panic 时使用
    pub fn emergency(args: fmt::Arguments<'_>) {
        // panic 可能发生在持有串口锁期间
        let mut uart = Uart::new(PLATFORM);
        let _ = write!(uart, "[PANIC] {}\r\n", args);
    }
}

#[cfg(target_arch = "riscv32")]
pub use backend::{emergency, init};
