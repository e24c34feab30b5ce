use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};

use crate::api::ScanConfig;
use crate::error::{Result, ScanError};

/// 未指定域名时读取的默认域名列表
pub const DEFAULT_DOMAIN_FILE: &str = "domains.csv";

/// 输出格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Xml,
    Csv,
    Txt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            "csv" => Ok(OutputFormat::Csv),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(format!("不支持的输出格式: {}。支持的格式: json, xml, csv, txt", s)),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rsubscan")]
#[command(version)]
#[command(about = "A tool for brute-forcing short subdomains over HTTP", long_about = None)]
pub struct Opts {
    /// need scan domain
    #[arg(short, long)]
    pub domain: Vec<String>,

    /// domain list path, one domain per line (first csv column)
    #[arg(short, long)]
    pub file: Option<String>,

    /// output file path
    #[arg(short, long, default_value = "subdomains_output.csv")]
    pub output: String,

    /// output format (csv, json, txt, xml)
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// max concurrent requests
    #[arg(short, long, default_value_t = 50)]
    pub concurrency: usize,

    /// request timeout in seconds
    #[arg(short, long, default_value_t = 1.0)]
    pub timeout: f64,

    /// attempts per candidate
    #[arg(short, long, default_value_t = 2)]
    pub retries: usize,

    /// candidates per batch
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// min subdomain label length
    #[arg(long, default_value_t = 1)]
    pub min_length: usize,

    /// max subdomain label length
    #[arg(long, default_value_t = 3)]
    pub max_length: usize,

    /// http proxy for all requests
    #[arg(long)]
    pub proxy: Option<String>,

    /// silent, only print found subdomains
    #[arg(short, long)]
    pub silent: bool,

    /// debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Opts {
    pub fn to_config(&self) -> Result<ScanConfig> {
        let timeout = Duration::try_from_secs_f64(self.timeout)
            .map_err(|e| ScanError::InvalidConfig(format!("超时时间无效 {}: {}", self.timeout, e)))?;

        let config = ScanConfig {
            concurrent_requests: self.concurrency,
            timeout,
            max_retries: self.retries,
            chunk_size: self.chunk_size,
            min_length: self.min_length,
            max_length: self.max_length,
            proxy: self.proxy.clone(),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format.parse().map_err(ScanError::InvalidConfig)
    }

    /// 合并命令行指定的域名和域名列表文件
    pub fn collect_domains(&self) -> Result<Vec<String>> {
        let mut domains: Vec<String> = self
            .domain
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        match &self.file {
            Some(path) => domains.extend(load_domains(path)?),
            None if domains.is_empty() => domains.extend(load_domains(DEFAULT_DOMAIN_FILE)?),
            None => {}
        }

        if domains.is_empty() {
            return Err(ScanError::NoDomains);
        }
        Ok(domains)
    }
}

/// 读取域名列表
///
/// 每行取第一个逗号前的内容, 忽略空行和 `#` 开头的注释。
pub fn load_domains<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut domains = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let domain = line.split(',').next().unwrap_or_default().trim();
        if domain.is_empty() {
            warn!("{}:{} 第一列为空, 已跳过", path.display(), line_num + 1);
            continue;
        }
        domains.push(domain.to_string());
    }

    info!("从 {} 读取到 {} 个域名", path.display(), domains.len());
    Ok(domains)
}
