//! 内存抽象层
//!
//! 本模块定义了内存访问的统一接口 `Memory` trait，
//! 以及 256 字节的存储体 `Bank`。指令内存和数据内存是两个互不相交的 `Bank`，
//! 地址均为 8 位，访问总是合法的（越过 255 的地址按 256 回绕）。

/// 每个存储体的大小（字节）
pub const MEM_SIZE: usize = 256;

/// 内存访问的统一接口
pub trait Memory {
    /// 从指定地址读取 8 位数据
    fn load8(&self, addr: u8) -> u8;

    /// 向指定地址写入 8 位数据
    fn store8(&mut self, addr: u8, value: u8);

    /// 全部清零
    fn clear(&mut self);

    fn as_bytes(&self) -> &[u8; MEM_SIZE];

    /// 读取从 `start` 开始、以 0 结尾的字符串
    ///
    /// 字节按 Latin-1 映射为字符；没有 0 时读到存储体末尾为止。
    fn read_cstring(&self, start: u8) -> String {
        self.as_bytes()[start as usize..]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect()
    }
}

/// 256 字节存储体
#[derive(Clone, PartialEq, Eq)]
pub struct Bank {
    data: [u8; MEM_SIZE],
}

impl Bank {
    /// 创建清零的存储体
    ///
    /// # 示例
    ///
    /// ```
    /// use cdc_vm::memory::{Bank, Memory};
    ///
    /// let mut bank = Bank::new();
    /// bank.store8(3, 15);
    /// assert_eq!(bank.load8(3), 15);
    /// ```
    pub fn new() -> Self {
        Bank {
            data: [0; MEM_SIZE],
        }
    }

    /// 从切片构造，超出 256 字节的部分被拒绝
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let data = <[u8; MEM_SIZE]>::try_from(bytes).ok()?;
        Some(Bank { data })
    }

    /// 从 `start` 开始写入一段字节，越界部分回绕
    pub fn write_bytes(&mut self, start: u8, bytes: &[u8]) {
        let mut addr = start;
        for &b in bytes {
            self.data[addr as usize] = b;
            addr = addr.wrapping_add(1);
        }
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for Bank {
    #[inline]
    fn load8(&self, addr: u8) -> u8 {
        self.data[addr as usize]
    }

    #[inline]
    fn store8(&mut self, addr: u8, value: u8) {
        self.data[addr as usize] = value;
    }

    fn clear(&mut self) {
        self.data = [0; MEM_SIZE];
    }

    fn as_bytes(&self) -> &[u8; MEM_SIZE] {
        &self.data
    }
}

impl std::fmt::Debug for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 只显示到最后一个非零字节
        let used = self.data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        f.debug_struct("Bank")
            .field("used", &used)
            .field("data", &&self.data[..used])
            .finish()
    }
}
