use crate::models::{DocumentStatus, ProcessMode};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 待处理文档目录
    pub input_folder: String,
    /// 内存存储的种子数据（TOML）
    pub seed_file: Option<String>,
    /// 报告输出文件
    pub report_file: String,
    /// 运行日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub ocr: OcrConfig,
    pub validation: ValidationConfig,
    pub scheduler: SchedulerConfig,
}

/// OCR provider 配置
///
/// 凭证为空或为占位符时，对应的 provider 视为未配置，会被跳过
#[derive(Clone, Debug)]
pub struct OcrConfig {
    // --- Vision LLM ---
    pub openai_api_key: Option<String>,
    pub openai_api_base_url: String,
    pub vision_model: String,
    pub vision_max_tokens: u32,
    // --- OCR.space ---
    pub ocr_space_api_key: Option<String>,
    pub ocr_space_url: String,
    pub ocr_space_engine: u8,
    // --- 本地 Tesseract ---
    pub tesseract_bin: String,
    pub tesseract_lang: String,
    /// 单次 provider 调用超时（秒）
    pub timeout_secs: u64,
}

/// 校验链配置
#[derive(Clone, Debug)]
pub struct ValidationConfig {
    /// 每个学生同时可拥有的科目上限
    pub max_subjects: usize,
    /// 视为"未处理完成"的文档状态
    pub pending_statuses: Vec<DocumentStatus>,
    /// 由注册号推导提交身份的模板，`{}` 会被替换为注册号
    pub identity_template: String,
}

/// 调度器配置
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub mode: ProcessMode,
    /// batch 模式下每批的文档数
    pub batch_size: usize,
    /// 是否跳过持久化
    pub skip_persist: bool,
    /// 报告中是否包含每个文档的结果
    pub detailed_metrics: bool,
    /// 单次运行最多处理的文档数
    pub max_documents: usize,
}

const PLACEHOLDER_KEYS: &[&str] = &["your_openai_api_key_here", "your_ocr_space_api_key_here"];

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_api_base_url: "https://api.openai.com/v1".to_string(),
            vision_model: "gpt-4o-mini".to_string(),
            vision_max_tokens: 1500,
            ocr_space_api_key: None,
            ocr_space_url: "https://api.ocr.space/parse/image".to_string(),
            ocr_space_engine: 3,
            tesseract_bin: "tesseract".to_string(),
            tesseract_lang: "spa".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_subjects: 8,
            pending_statuses: DocumentStatus::UNRESOLVED.to_vec(),
            identity_template: "test_{}@c.us".to_string(),
        }
    }
}

impl ValidationConfig {
    /// 根据注册号生成提交身份
    pub fn identity_for(&self, registration_number: &str) -> String {
        self.identity_template.replace("{}", registration_number)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: ProcessMode::Parallel,
            batch_size: 10,
            skip_persist: true,
            detailed_metrics: true,
            max_documents: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_folder: "boletas".to_string(),
            seed_file: None,
            report_file: "stress_report.json".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
            ocr: OcrConfig::default(),
            validation: ValidationConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            input_folder: std::env::var("INPUT_FOLDER").unwrap_or(default.input_folder),
            seed_file: std::env::var("SEED_FILE").ok().or(default.seed_file),
            report_file: std::env::var("REPORT_FILE").unwrap_or(default.report_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            ocr: OcrConfig {
                openai_api_key: credential("OPENAI_API_KEY"),
                openai_api_base_url: std::env::var("OPENAI_API_BASE_URL").unwrap_or(default.ocr.openai_api_base_url),
                vision_model: std::env::var("OPENAI_VISION_MODEL").unwrap_or(default.ocr.vision_model),
                vision_max_tokens: default.ocr.vision_max_tokens,
                ocr_space_api_key: credential("OCR_SPACE_API_KEY"),
                ocr_space_url: std::env::var("OCR_SPACE_URL").unwrap_or(default.ocr.ocr_space_url),
                ocr_space_engine: env_parse("OCR_SPACE_ENGINE").unwrap_or(default.ocr.ocr_space_engine),
                tesseract_bin: std::env::var("TESSERACT_BIN").unwrap_or(default.ocr.tesseract_bin),
                tesseract_lang: std::env::var("TESSERACT_LANG").unwrap_or(default.ocr.tesseract_lang),
                timeout_secs: env_parse("OCR_TIMEOUT_SECS").unwrap_or(default.ocr.timeout_secs),
            },
            validation: ValidationConfig {
                max_subjects: env_parse("MAX_SUBJECTS").unwrap_or(default.validation.max_subjects),
                pending_statuses: default.validation.pending_statuses,
                identity_template: std::env::var("IDENTITY_TEMPLATE").unwrap_or(default.validation.identity_template),
            },
            scheduler: SchedulerConfig {
                mode: env_parse("PROCESS_MODE").unwrap_or(default.scheduler.mode),
                batch_size: env_parse("BATCH_SIZE").unwrap_or(default.scheduler.batch_size),
                skip_persist: env_parse("SKIP_PERSIST").unwrap_or(default.scheduler.skip_persist),
                detailed_metrics: env_parse("DETAILED_METRICS").unwrap_or(default.scheduler.detailed_metrics),
                max_documents: default.scheduler.max_documents,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// 读取凭证，空值或占位符视为未配置
fn credential(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(normalize_credential)
}

pub(crate) fn normalize_credential(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || PLACEHOLDER_KEYS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}
