use anyhow::Result;
use clap::Parser;

use enrollment_pipeline::models::ProcessMode;
use enrollment_pipeline::utils::logging;
use enrollment_pipeline::{App, Config};

/// 成绩单批量处理压测
#[derive(Debug, Parser)]
#[command(name = "enrollment-stress", version)]
struct Args {
    /// 处理模式: sequential | parallel | batch
    #[arg(long)]
    mode: Option<ProcessMode>,

    /// batch 模式下每批的文档数
    #[arg(long)]
    batch_size: Option<usize>,

    /// 校验通过后写入存储
    #[arg(long)]
    persist: bool,

    /// 报告中只保留汇总数据
    #[arg(long)]
    summary_only: bool,

    /// 待处理文档目录
    #[arg(long)]
    input: Option<String>,

    /// 种子数据文件（TOML）
    #[arg(long)]
    seed: Option<String>,

    /// 报告输出文件
    #[arg(long)]
    report: Option<String>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.scheduler.mode = mode;
        }
        if let Some(batch_size) = self.batch_size {
            config.scheduler.batch_size = batch_size;
        }
        if self.persist {
            config.scheduler.skip_persist = false;
        }
        if self.summary_only {
            config.scheduler.detailed_metrics = false;
        }
        if let Some(input) = self.input {
            config.input_folder = input;
        }
        if self.seed.is_some() {
            config.seed_file = self.seed;
        }
        if let Some(report) = self.report {
            config.report_file = report;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 加载配置
    let mut config = Config::from_env();
    args.apply(&mut config);

    // 初始化日志
    logging::init_with_verbosity(config.verbose_logging);

    // 初始化并运行应用
    let _report = App::initialize(config).await?.run().await?;

    Ok(())
}
