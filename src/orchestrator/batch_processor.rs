//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次压测运行的资源装配和收尾。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：日志文件、存储（种子数据）、OCR 降级链
//! 2. **批量加载**：扫描输入目录并加载文档（`Vec<RawDocument>`）
//! 3. **调度**：委托 [`BatchScheduler`] 按模式处理
//! 4. **输出**：失败记录写入日志文件，报告写入 JSON
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个文档的细节
//! - **资源所有者**：唯一持有存储和 OCR 的模块

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{EnrollmentStore, InMemoryStore};
use crate::models::{load_documents, load_seed_file, StressTestReport};
use crate::orchestrator::scheduler::{BatchScheduler, RunOptions};
use crate::services::{OcrOrchestrator, ReportWriter};
use crate::utils::logging::{init_log_file, log_documents_loaded, log_startup, print_final_stats};
use crate::workflow::{DocumentFlow, FlowOptions};

/// 应用主结构
pub struct App {
    config: Config,
    scheduler: BatchScheduler,
    writer: ReportWriter,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        let store: Arc<dyn EnrollmentStore> = match &config.seed_file {
            Some(path) => {
                let seed = load_seed_file(Path::new(path))
                    .await
                    .with_context(|| format!("加载种子数据失败: {}", path))?;
                info!("✓ 已加载种子数据: {}", path);
                Arc::new(InMemoryStore::from_seed(seed))
            }
            None => {
                warn!("⚠️ 未配置种子数据，使用空的内存存储");
                Arc::new(InMemoryStore::new())
            }
        };

        let ocr = OcrOrchestrator::from_config(&config.ocr);
        Ok(Self::with_components(config, store, ocr))
    }

    /// 使用已构建的存储和 OCR 组装应用
    pub fn with_components(
        config: Config,
        store: Arc<dyn EnrollmentStore>,
        ocr: OcrOrchestrator,
    ) -> Self {
        let persist = !config.scheduler.skip_persist;
        log_startup(config.scheduler.mode, &ocr.provider_names(), persist);

        let flow = DocumentFlow::new(
            Arc::new(ocr),
            store,
            config.validation.clone(),
            FlowOptions {
                persist,
                detailed_metrics: config.scheduler.detailed_metrics,
            },
        );
        let writer = ReportWriter::new(config.report_file.clone(), config.output_log_file.clone());

        Self {
            scheduler: BatchScheduler::new(Arc::new(flow)),
            writer,
            config,
        }
    }

    /// 运行应用主逻辑
    ///
    /// 输入目录为空时返回 `None`
    pub async fn run(&self) -> Result<Option<StressTestReport>> {
        info!("\n📁 正在扫描待处理的文档...");
        let documents = load_documents(&self.config.input_folder, self.config.scheduler.max_documents)
            .await
            .context("加载文档失败")?;

        if documents.is_empty() {
            warn!("⚠️ 没有找到待处理的文档，程序结束");
            return Ok(None);
        }

        let scheduler_config = &self.config.scheduler;
        log_documents_loaded(documents.len(), scheduler_config.mode, scheduler_config.batch_size);

        let report = self
            .scheduler
            .run(
                documents,
                RunOptions {
                    mode: scheduler_config.mode,
                    batch_size: scheduler_config.batch_size,
                    detailed_metrics: scheduler_config.detailed_metrics,
                },
            )
            .await;

        for result in report.results.iter().filter(|r| !r.success) {
            self.writer.append_failure(result)?;
        }
        self.writer.write_report(&report).context("写入报告失败")?;
        info!("📝 报告已写入: {}", self.writer.report_file_path());

        print_final_stats(&report, &self.config.output_log_file);

        Ok(Some(report))
    }
}
