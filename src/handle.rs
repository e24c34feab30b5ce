use std::fmt;
use std::time::Duration;

use colored::*;
use log::info;
use serde::{Deserialize, Serialize};

/// 发现的子域名, 也是写入结果文件的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundSubdomain {
    pub subdomain: String,
    pub title: String,
    pub domain: String,
}

impl fmt::Display for FoundSubdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<40} {}", self.subdomain, self.title)
    }
}

/// 扫描进度快照
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub domain: String,
    pub length: usize,
    /// 当前长度下已处理的候选数
    pub processed: usize,
    /// 当前长度下的候选总数
    pub total: usize,
    /// 从该域名开始扫描到现在的耗时
    pub elapsed: Duration,
    /// 该域名已发现的子域名数
    pub found_count: usize,
}

impl ProgressEvent {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 长度 {} 进度: {:.1}% ({}/{}) - 已发现: {} - 用时: {:.1}秒",
            self.domain,
            self.length,
            self.percent(),
            self.processed,
            self.total,
            self.found_count,
            self.elapsed.as_secs_f64()
        )
    }
}

/// 单个域名的扫描汇总
#[derive(Debug, Clone)]
pub struct DomainReport {
    pub domain: String,
    pub found: usize,
    /// 实际发出探测的候选数量 (去重后)
    pub probed: usize,
    pub elapsed: Duration,
}

/// 进度回调, 仅用于展示, 实现不应长时间阻塞
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);

    fn on_found(&self, _found: &FoundSubdomain) {}
}

/// 通过日志输出进度, 发现的子域名直接打印到终端
#[derive(Debug, Clone, Default)]
pub struct LogReporter {
    silent: bool,
}

impl LogReporter {
    pub fn new(silent: bool) -> Self {
        LogReporter { silent }
    }
}

impl ProgressReporter for LogReporter {
    fn on_progress(&self, event: &ProgressEvent) {
        info!("{}", event);
    }

    fn on_found(&self, found: &FoundSubdomain) {
        if self.silent {
            println!("{}", found.subdomain);
        } else {
            println!("{:<40} {}", found.subdomain.green(), found.title.cyan());
        }
    }
}

/// 不输出任何内容
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
