//! 批量调度器 - 编排层
//!
//! 三种模式共用同一个工作池，只是并发上限不同：
//! - `sequential`：上限 1
//! - `batch`：上限 `batch_size`，批与批之间严格串行
//! - `parallel`：上限为文档总数，所有任务在等待前全部派发
//!
//! 任务 panic 会向上传播，被取消的任务记为失败结果

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::error;

use crate::infrastructure::resources;
use crate::models::{ProcessMode, ProcessingResult, RawDocument, ResourceDelta, StressTestReport};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{DocumentCtx, DocumentFlow};

/// 调度参数
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub mode: ProcessMode,
    pub batch_size: usize,
    /// 报告中是否包含每个文档的结果
    pub detailed_metrics: bool,
}

/// 批量调度器
pub struct BatchScheduler {
    flow: Arc<DocumentFlow>,
}

/// 各模式下同时在处理的文档数
pub fn concurrency_limit(mode: ProcessMode, batch_size: usize, total: usize) -> usize {
    match mode {
        ProcessMode::Sequential => 1,
        ProcessMode::Batch => batch_size.max(1),
        ProcessMode::Parallel => total.max(1),
    }
}

impl BatchScheduler {
    pub fn new(flow: Arc<DocumentFlow>) -> Self {
        Self { flow }
    }

    /// 处理全部文档并汇总报告，单个文档的失败不会中断整体
    pub async fn run(&self, documents: Vec<RawDocument>, options: RunOptions) -> StressTestReport {
        let total = documents.len();
        let rss_before = resources::resident_memory_bytes();
        let start = Instant::now();

        let results = self.process_all(documents, options).await;

        let total_duration = start.elapsed().as_millis() as u64;
        let rss_after = resources::resident_memory_bytes();

        build_report(
            results,
            total,
            total_duration,
            options,
            ResourceDelta {
                rss_bytes: resources::delta(rss_before, rss_after),
            },
        )
    }

    async fn process_all(
        &self,
        documents: Vec<RawDocument>,
        options: RunOptions,
    ) -> Vec<ProcessingResult> {
        let total = documents.len();
        if total == 0 {
            return Vec::new();
        }

        let limit = concurrency_limit(options.mode, options.batch_size, total);
        let semaphore = Arc::new(Semaphore::new(limit));
        let total_batches = total.div_ceil(limit);
        let mut results = Vec::with_capacity(total);

        let mut pending = documents.into_iter().enumerate().peekable();
        let mut batch_num = 0;
        while pending.peek().is_some() {
            batch_num += 1;
            let batch: Vec<(usize, RawDocument)> = pending.by_ref().take(limit).collect();
            let batch_start = batch.first().map(|(i, _)| *i).unwrap_or_default();

            if options.mode == ProcessMode::Batch {
                log_batch_start(batch_num, total_batches, batch_start + 1, batch_start + batch.len(), total);
            }

            let batch_results = self.process_batch(batch, semaphore.clone()).await;

            if options.mode == ProcessMode::Batch {
                let success = batch_results.iter().filter(|r| r.success).count();
                log_batch_complete(batch_num, success, batch_results.len());
            }
            results.extend(batch_results);
        }

        results
    }

    /// 派发本批全部任务，然后等待全部完成
    async fn process_batch(
        &self,
        batch: Vec<(usize, RawDocument)>,
        semaphore: Arc<Semaphore>,
    ) -> Vec<ProcessingResult> {
        let mut handles = Vec::with_capacity(batch.len());

        for (index, document) in batch {
            let file_name = document.file_name().to_string();
            let flow = self.flow.clone();
            let semaphore = semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let ctx = DocumentCtx::new(index, document.file_name());
                flow.run(&document, &ctx).await
            });
            handles.push((index, file_name, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (index, file_name, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                // 单文档错误已在流程内收敛，panic 只可能是程序缺陷
                Err(e) if e.is_panic() => {
                    error!("[文档 {}] 任务 panic", index + 1);
                    std::panic::resume_unwind(e.into_panic());
                }
                Err(e) => {
                    error!("[文档 {}] 任务执行失败: {}", index + 1, e);
                    results.push(ProcessingResult::crashed(index, &file_name, e.to_string()));
                }
            }
        }
        results
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 汇总报告
pub fn build_report(
    mut results: Vec<ProcessingResult>,
    total_files: usize,
    total_duration: u64,
    options: RunOptions,
    system_metrics: ResourceDelta,
) -> StressTestReport {
    results.sort_by_key(|r| r.index);

    let successful_files = results.iter().filter(|r| r.success).count();
    let durations: Vec<u64> = results.iter().map(|r| r.duration).collect();
    let average_duration = if durations.is_empty() {
        0
    } else {
        (durations.iter().sum::<u64>() as f64 / durations.len() as f64).round() as u64
    };

    // 不足 1ms 按 1ms 计，避免除零
    let throughput = if total_files == 0 {
        0.0
    } else {
        round2(total_files as f64 / total_duration.max(1) as f64 * 1000.0)
    };

    StressTestReport {
        total_files,
        processed_files: results.len(),
        successful_files,
        failed_files: results.len() - successful_files,
        total_duration,
        average_duration,
        min_duration: durations.iter().copied().min().unwrap_or(0),
        max_duration: durations.iter().copied().max().unwrap_or(0),
        throughput,
        mode: options.mode,
        results: if options.detailed_metrics { results } else { Vec::new() },
        system_metrics,
    }
}
