//! 文档处理上下文
//!
//! 封装"我正在处理第几个文档、以谁的身份提交"这一信息

use std::fmt::Display;

/// 文档处理上下文
#[derive(Debug, Clone)]
pub struct DocumentCtx {
    /// 提交时的序号（从0开始）
    pub index: usize,

    /// 原始文件名
    pub file_name: String,

    /// 提交身份；为 None 时由注册号推导
    pub identity: Option<String>,
}

impl DocumentCtx {
    /// 创建新的文档上下文
    pub fn new(index: usize, file_name: impl Into<String>) -> Self {
        Self {
            index,
            file_name: file_name.into(),
            identity: None,
        }
    }

    /// 指定提交身份
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// 日志中显示的编号（从1开始）
    pub fn display_index(&self) -> usize {
        self.index + 1
    }
}

impl Display for DocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文档 {}]", self.display_index())
    }
}
