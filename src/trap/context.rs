//! # 陷阱帧
//!
//! 进入陷阱时保存的用户上下文：x1..x31 共 31 个通用寄存器（x0 恒为 0，不保存）
//! 加上程序计数器。陷阱入口汇编按 `#[repr(C)]` 布局直接读写，内核与用户态
//! 必须对下面的寄存器下标达成一致。

/// `regs` 中 `ra` (x1) 的下标
pub const REG_RA: usize = 0;
/// `regs` 中 `sp` (x2) 的下标
pub const REG_SP: usize = 1;
/// `regs` 中 `fp`/`s0` (x8) 的下标
pub const REG_FP: usize = 7;
/// `regs` 中 `a0` (x10) 的下标，同时是返回值寄存器
pub const REG_A0: usize = 9;
pub const REG_A1: usize = 10;
pub const REG_A2: usize = 11;
pub const REG_A3: usize = 12;
/// `regs` 中 `a7` (x17) 的下标，系统调用号
pub const REG_A7: usize = 16;

/// 通用寄存器个数（不含 x0）
pub const NUM_REGS: usize = 31;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// x1..x31
    pub regs: [usize; NUM_REGS],
    /// 陷阱返回后继续执行的地址
    pub pc: usize,
}

impl TrapFrame {
    pub fn zero_init() -> Self {
        Self::default()
    }

    /// 新进程第一次被调度时的上下文
    ///
    /// 只需要 `pc`、`sp`（以及约定的 `ra` / `fp`），其余寄存器在进程自己写入
    /// 之前没有意义。
    pub fn app_init_context(entry: usize, sp: usize) -> Self {
        let mut frame = Self::zero_init();
        frame.pc = entry;
        frame.regs[REG_RA] = entry;
        frame.regs[REG_SP] = sp;
        frame.regs[REG_FP] = sp;
        frame
    }

    pub fn reg(&self, index: usize) -> usize {
        self.regs[index]
    }

    pub fn set_reg(&mut self, index: usize, value: usize) {
        self.regs[index] = value;
    }

    /// 系统调用号
    pub fn syscall_id(&self) -> usize {
        self.regs[REG_A7]
    }

    /// 系统调用参数 a0..a3
    pub fn syscall_args(&self) -> [usize; 4] {
        [
            self.regs[REG_A0],
            self.regs[REG_A1],
            self.regs[REG_A2],
            self.regs[REG_A3],
        ]
    }

    /// 写入返回值（a0）
    pub fn set_return(&mut self, value: isize) {
        self.regs[REG_A0] = value as usize;
    }
}

/// 把 `src` 的全部寄存器和 pc 复制到 `dst`
///
/// 保存（CPU → PCB）和恢复（PCB → CPU）上下文都用它。
pub fn copy_trap_frame(dst: &mut TrapFrame, src: &TrapFrame) {
    *dst = *src;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_total() {
        let mut src = TrapFrame::zero_init();
        for (i, reg) in src.regs.iter_mut().enumerate() {
            *reg = i * 3 + 1;
        }
        src.pc = 0x8040_0004;
        let mut dst = TrapFrame::zero_init();
        copy_trap_frame(&mut dst, &src);
        assert_eq!(dst, src);
        assert_eq!(dst.regs[NUM_REGS - 1], (NUM_REGS - 1) * 3 + 1);
    }

    #[test]
    fn register_indices_match_abi() {
        // x1 = ra, x2 = sp, x8 = s0/fp, x10..x13 = a0..a3, x17 = a7
        assert_eq!(REG_RA, 1 - 1);
        assert_eq!(REG_SP, 2 - 1);
        assert_eq!(REG_FP, 8 - 1);
        assert_eq!([REG_A0, REG_A1, REG_A2, REG_A3], [9, 10, 11, 12]);
        assert_eq!(REG_A7, 17 - 1);
        assert_eq!(core::mem::size_of::<TrapFrame>(), 32 * core::mem::size_of::<usize>());
    }

    #[test]
    fn negative_return_is_sign_extended() {
        let mut frame = TrapFrame::zero_init();
        frame.set_return(-1);
        assert_eq!(frame.reg(REG_A0) as isize, -1);
    }
}
