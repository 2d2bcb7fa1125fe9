//! 文档处理流程 - 流程层
//!
//! 核心职责：定义"一份成绩单"的完整处理流程
//!
//! 流程顺序：
//! 1. 指纹
//! 2. OCR（provider 降级链）
//! 3. 解析
//! 4. 校验链
//! 5. 持久化（可选）
//!
//! 任何失败都在这里转换为失败的 [`ProcessingResult`]，不会向上传播

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::ValidationConfig;
use crate::error::{AppError, AppResult, ParseError};
use crate::infrastructure::{hasher, EnrollmentStore, Submission};
use crate::models::{
    DocumentFingerprint, FailureKind, ParsedDocument, ProcessingResult, RawDocument, StageTimings,
    ValidationOutcome,
};
use crate::services::{parser, OcrOrchestrator};
use crate::workflow::document_ctx::DocumentCtx;
use crate::workflow::validation_chain::ValidationChain;

/// 流程开关
#[derive(Debug, Clone, Copy)]
pub struct FlowOptions {
    /// 校验通过后是否写入存储
    pub persist: bool,
    /// 是否在结果中保留各阶段耗时
    pub detailed_metrics: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            persist: false,
            detailed_metrics: true,
        }
    }
}

/// 文档处理流程
///
/// - 只持有共享能力（OCR、存储），不持有文档
/// - 单个文档的所有错误都在 `run` 内收敛
pub struct DocumentFlow {
    ocr: Arc<OcrOrchestrator>,
    store: Arc<dyn EnrollmentStore>,
    chain: ValidationChain,
    options: FlowOptions,
}

/// 处理中逐步填充的结果
#[derive(Default)]
struct Progress {
    timings: StageTimings,
    outcome: Option<ValidationOutcome>,
}

impl DocumentFlow {
    pub fn new(
        ocr: Arc<OcrOrchestrator>,
        store: Arc<dyn EnrollmentStore>,
        validation: ValidationConfig,
        options: FlowOptions,
    ) -> Self {
        Self {
            chain: ValidationChain::new(store.clone(), validation),
            ocr,
            store,
            options,
        }
    }

    pub async fn run(&self, document: &RawDocument, ctx: &DocumentCtx) -> ProcessingResult {
        let start = Instant::now();
        let fingerprint = hasher::fingerprint(document.bytes());
        let mut progress = Progress::default();

        info!(
            "{} 开始处理 {} ({} 字节)",
            ctx,
            document.file_name(),
            document.file_size()
        );

        let outcome = self
            .process(document, &fingerprint, ctx, &mut progress)
            .await;

        let mut result = ProcessingResult {
            index: ctx.index,
            file_name: document.file_name().to_string(),
            file_size: document.file_size(),
            mime_type: document.mime_type().to_string(),
            fingerprint: Some(fingerprint.to_string()),
            success: false,
            duration: 0,
            timings: self.options.detailed_metrics.then_some(progress.timings),
            extracted_data: progress.outcome.as_ref().map(|o| o.summary.clone()),
            validation_errors: progress
                .outcome
                .as_ref()
                .map(|o| o.errors.clone())
                .unwrap_or_default(),
            error: None,
            error_kind: None,
        };

        match outcome {
            Ok(()) => {
                let failure = progress.outcome.as_ref().and_then(|o| o.failure);
                match failure {
                    None => {
                        result.success = true;
                        info!("{} ✓ 处理成功", ctx);
                    }
                    Some(kind) => {
                        result.error_kind = Some(kind);
                        result.error = result.validation_errors.first().cloned();
                        warn!("{} ⚠️ 校验未通过: {:?}", ctx, result.validation_errors);
                    }
                }
            }
            Err(e) => {
                if let AppError::Parse(parse_error) = &e {
                    result.validation_errors.push(parse_error.to_string());
                }
                result.error_kind = Some(FailureKind::from(&e));
                result.error = Some(e.to_string());
                error!("{} ❌ 处理失败: {}", ctx, e);
            }
        }

        result.duration = start.elapsed().as_millis() as u64;
        result
    }

    async fn process(
        &self,
        document: &RawDocument,
        fingerprint: &DocumentFingerprint,
        ctx: &DocumentCtx,
        progress: &mut Progress,
    ) -> AppResult<()> {
        // OCR
        let stage = Instant::now();
        let text = self
            .ocr
            .extract_text(document.bytes(), document.mime_type())
            .await?;
        progress.timings.ocr_duration = stage.elapsed().as_millis() as u64;

        // 解析
        let stage = Instant::now();
        let parsed = parser::parse(&text);
        progress.timings.parse_duration = stage.elapsed().as_millis() as u64;
        let (registration, name) = require_basic_data(&parsed)?;

        // 校验
        let stage = Instant::now();
        let identity = ctx
            .identity
            .clone()
            .unwrap_or_else(|| self.chain.config().identity_for(&registration));
        let outcome = self.chain.validate(fingerprint, &parsed, &identity).await?;
        progress.timings.validation_duration = stage.elapsed().as_millis() as u64;

        let accepted = outcome.is_accepted();
        let mapped_subjects = outcome.mapped_subjects.clone();
        progress.outcome = Some(outcome);
        if !accepted {
            return Ok(());
        }

        // 持久化
        if self.options.persist {
            let stage = Instant::now();
            let submission = Submission {
                identity,
                registration_number: registration,
                student_name: name,
                fingerprint: fingerprint.clone(),
                parsed,
                mapped_subjects,
            };
            self.store.persist(&submission).await?;
            progress.timings.db_duration = stage.elapsed().as_millis() as u64;
        }

        Ok(())
    }
}

/// 注册号、姓名、科目缺一不可
fn require_basic_data(parsed: &ParsedDocument) -> AppResult<(String, String)> {
    match (&parsed.registration_number, &parsed.student_name) {
        (Some(registration), Some(name)) if parsed.is_valid => {
            Ok((registration.clone(), name.clone()))
        }
        _ => Err(ParseError::ParseInvalid {
            registration_found: parsed.registration_number.is_some(),
            name_found: parsed.student_name.is_some(),
            subject_count: parsed.subjects.len(),
        }
        .into()),
    }
}
