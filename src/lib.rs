//! # rsubscan
//!
//! 通过HTTP探测暴破短子域名的工具库。
//!
//! 对每个根域名按长度生成 `[a-z0-9]` 上的全部标签, 拼接成完整域名后发起 `GET http://...`,
//! 返回200的记为存活并提取页面标题。
//!
//! ## 特性
//!
//! - 🚀 **并发可控**: 基于信号量限制同时进行中的请求数, 按分块同步推进
//! - 🔁 **自动重试**: 超时、连接失败和非200响应按线性退避重试
//! - 🧹 **去重**: 同一引擎内每个完整域名只探测一次
//! - 📊 **多格式输出**: 支持CSV、JSON、XML、TXT四种输出格式
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use rsubscan::{scan_subdomains, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig {
//!         max_length: 2,
//!         ..Default::default()
//!     };
//!     let results = scan_subdomains(vec!["example.com".to_string()], config).await?;
//!
//!     for result in &results {
//!         println!("{} -> {}", result.subdomain, result.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## 自定义输出
//!
//! ```rust,no_run
//! use rsubscan::{FileSink, OutputFormat, ScanConfig, ScanEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ScanEngine::new(ScanConfig::default())?;
//!     let mut sink = FileSink::create("subdomains_output.csv", OutputFormat::Csv)?;
//!
//!     let domains = vec!["example.com".to_string(), "example.org".to_string()];
//!     let reports = engine.run(&domains, &mut sink).await?;
//!     println!("扫描了 {} 个域名", reports.len());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod error;
pub mod gen;
pub mod handle;
pub mod input;
pub mod logger;
pub mod output;
pub mod state;
pub mod verify;

// 重新导出主要的公共API
pub use api::{scan_subdomains, ScanConfig, ScanEngine};
pub use error::ScanError;

pub use gen::{LabelGenerator, MAX_LABEL_LENGTH};
pub use handle::{DomainReport, FoundSubdomain, LogReporter, ProgressEvent, ProgressReporter};
pub use input::{load_domains, OutputFormat};
pub use output::{export_results, FileSink, MemorySink, ResultSink};
pub use verify::{extract_title, DomainVerifier, ProbeOutcome, Prober, RetryPolicy};
