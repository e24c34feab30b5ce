use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use rsubscan::error::Result;
use rsubscan::handle::LogReporter;
use rsubscan::input::Opts;
use rsubscan::logger;
use rsubscan::output::FileSink;
use rsubscan::ScanEngine;

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    logger::init_logger(opts.verbose, opts.silent);

    if let Err(e) = run(opts).await {
        error!("ERROR! : {}", e);
        std::process::exit(1);
    }
}

/// 执行扫描主逻辑
async fn run(opts: Opts) -> Result<()> {
    let config = opts.to_config()?;
    let format = opts.output_format()?;
    let domains = opts.collect_domains()?;

    // 引擎持有共享的HTTP客户端, 函数返回时随引擎一起释放
    let engine = ScanEngine::new(config)?.with_reporter(Arc::new(LogReporter::new(opts.silent)));
    let mut sink = FileSink::create(&opts.output, format)?;

    let reports = engine.run(&domains, &mut sink).await?;

    let found: usize = reports.iter().map(|r| r.found).sum();
    let probed: usize = reports.iter().map(|r| r.probed).sum();
    info!(
        "全部完成: {} 个域名, 探测 {} 个候选, 发现 {} 个子域名, 结果保存在 {}",
        reports.len(),
        probed,
        found,
        sink.path().display()
    );
    Ok(())
}
