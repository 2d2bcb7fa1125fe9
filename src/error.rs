use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// OCR 相关错误
    #[error("OCR错误: {0}")]
    Ocr(#[from] OcrError),
    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 业务校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 外部存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// OCR 错误
#[derive(Debug, Error)]
pub enum OcrError {
    /// 单个 provider 调用失败（非致命，触发降级）
    #[error("OCR provider {provider} 不可用: {message}")]
    ProviderUnavailable { provider: String, message: String },
    /// 所有 provider 都未配置或失败
    #[error("所有 OCR provider 均失败 (尝试: {})", .attempts.join(", "))]
    AllProvidersFailed { attempts: Vec<String> },
}

/// 解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    /// 无法提取注册号、姓名或科目
    #[error("Documento inválido: no se pudo extraer datos básicos")]
    ParseInvalid {
        registration_found: bool,
        name_found: bool,
        subject_count: usize,
    },
}

/// 业务校验错误（全部为终止性错误）
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 相同指纹的文档已存在
    #[error("Documento duplicado detectado (subido: {})", .uploaded_at.format("%d/%m/%Y"))]
    DuplicateDocument {
        fingerprint: String,
        uploaded_at: chrono::DateTime<chrono::Utc>,
    },
    /// 已存储的注册号与解析结果不一致
    #[error("Número de registro no coincide: esperado {expected}, recibido {received}")]
    RegistrationMismatch { expected: String, received: String },
    /// 已存在未处理完成的文档
    #[error("Ya existe un documento pendiente (estado: {status})")]
    PendingDocumentExists { status: String },
    /// 超出科目上限
    #[error(
        "Límite excedido: {current} actuales + {new} nuevas = {total} > {limit} (slots disponibles: {remaining})"
    )]
    QuotaExceeded {
        current: usize,
        new: usize,
        total: usize,
        limit: usize,
        remaining: usize,
    },
}

/// 外部存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 没有激活的学期
    #[error("No active semester found")]
    NoActiveTerm,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 处理模式无法识别
    #[error("未知的处理模式: {0}")]
    UnknownMode(String),
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建 provider 失败错误
    pub fn provider_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Ocr(OcrError::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
