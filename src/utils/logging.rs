//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{AppResult, FileError};
use crate::models::{ProcessMode, StressTestReport};

/// 初始化 tracing 订阅者
///
/// 默认级别 `info`，可通过 `RUST_LOG` 覆盖；重复调用是安全的
pub fn init() {
    init_with_verbosity(false);
}

/// `verbose` 为 true 时默认级别为 `debug`
pub fn init_with_verbosity(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n成绩单压测日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|source| FileError::WriteFailed {
        path: log_file_path.to_string(),
        source,
    })?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(mode: ProcessMode, providers: &[&str], persist: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 成绩单压测模式");
    info!("📊 处理模式: {}", mode);
    info!("🔍 OCR 顺序: {}", providers.join(" → "));
    info!("💾 持久化: {}", if persist { "开启" } else { "关闭" });
    info!("{}", "=".repeat(60));
}

/// 记录文档加载信息
pub fn log_documents_loaded(total: usize, mode: ProcessMode, batch_size: usize) {
    info!("✓ 找到 {} 个待处理的文档", total);
    match mode {
        ProcessMode::Sequential => info!("📋 将逐个处理"),
        ProcessMode::Parallel => info!("📋 将全部并发处理"),
        ProcessMode::Batch => {
            info!("📋 将以每批 {} 个的方式处理", batch_size);
            info!("💡 每批完成后再开始下一批\n");
        }
    }
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始文档编号
/// - `end`: 结束文档编号
/// - `total`: 文档总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批文档: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &StressTestReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.successful_files, report.total_files);
    info!("❌ 失败: {}", report.failed_files);
    info!(
        "⏱️ 总耗时: {}ms (平均 {}ms, 最短 {}ms, 最长 {}ms)",
        report.total_duration, report.average_duration, report.min_duration, report.max_duration
    );
    info!("🚀 吞吐量: {:.2} 文档/秒", report.throughput);
    if let Some(rss) = report.system_metrics.rss_bytes {
        info!("🧠 内存变化: {:+.2} MB", rss as f64 / 1024.0 / 1024.0);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
