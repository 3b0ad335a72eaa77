//! # 用户程序注册表
//!
//! 内核没有可执行文件格式：用户程序与内核链接在一起，`exec` 时按名字查到
//! 入口地址即可。注册表是外部协作者，这里给出接口和一个基于静态数组的实现。

/// 一个可执行的用户程序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserProgram {
    pub name: &'static str,
    pub entry_point: usize,
}

/// 名字到入口地址的映射
pub trait ProgramRegistry: Send + Sync {
    fn find_user_program(&self, name: &str) -> Option<UserProgram>;
}

/// 基于静态程序列表的注册表
pub struct StaticProgramRegistry {
    programs: &'static [UserProgram],
}

impl StaticProgramRegistry {
    pub const fn new(programs: &'static [UserProgram]) -> Self {
        Self { programs }
    }

    /// 已注册的程序名
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.programs.iter().map(|program| program.name)
    }
}

impl ProgramRegistry for StaticProgramRegistry {
    fn find_user_program(&self, name: &str) -> Option<UserProgram> {
        self.programs.iter().find(|program| program.name == name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PROGRAMS: [UserProgram; 2] = [
        UserProgram { name: "sh", entry_point: 0x8040_0000 },
        UserProgram { name: "hello", entry_point: 0x8041_0000 },
    ];

    #[test]
    fn finds_program_by_name() {
        let registry = StaticProgramRegistry::new(&PROGRAMS);
        assert_eq!(registry.find_user_program("hello").map(|p| p.entry_point), Some(0x8041_0000));
        assert!(registry.find_user_program("nope").is_none());
        assert_eq!(registry.names().count(), 2);
    }
}
