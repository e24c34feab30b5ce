use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::Semaphore;

use crate::error::{Result, ScanError};
use crate::gen::{build_fqc, LabelGenerator, MAX_LABEL_LENGTH};
use crate::handle::{DomainReport, FoundSubdomain, LogReporter, ProgressEvent, ProgressReporter};
use crate::output::{MemorySink, ResultSink};
use crate::state::SeenSet;
use crate::verify::{probe_with_retry, DomainVerifier, ProbeOutcome, Prober, RetryPolicy};

/// 扫描配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 同时进行中的探测数量上限
    pub concurrent_requests: usize,
    /// 单次请求超时 (连接 + 响应)
    pub timeout: Duration,
    /// 每个候选域名的最大尝试次数
    pub max_retries: usize,
    /// 线性退避的基础间隔
    pub retry_base_delay: Duration,
    /// 每批处理的候选数量
    pub chunk_size: usize,
    /// 子域名标签的最小长度 (含)
    pub min_length: usize,
    /// 子域名标签的最大长度 (含)
    pub max_length: usize,
    /// HTTP代理地址
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            concurrent_requests: 50,
            timeout: Duration::from_secs(1),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(100),
            chunk_size: 1000,
            min_length: 1,
            max_length: 3,
            proxy: None,
            user_agent: concat!("rsubscan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ScanConfig {
    /// 检查配置是否合法
    pub fn validate(&self) -> Result<()> {
        if self.concurrent_requests == 0 {
            return Err(ScanError::InvalidConfig("并发数必须大于0".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(ScanError::InvalidConfig("分块大小必须大于0".to_string()));
        }
        if self.max_retries == 0 {
            return Err(ScanError::InvalidConfig("尝试次数必须大于0".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig("超时时间必须大于0".to_string()));
        }
        if self.min_length == 0 {
            return Err(ScanError::InvalidLength(self.min_length));
        }
        if self.max_length > MAX_LABEL_LENGTH {
            return Err(ScanError::InvalidLength(self.max_length));
        }
        check_length_range(self.min_length, self.max_length)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_base_delay,
        }
    }
}

fn check_length_range(min_length: usize, max_length: usize) -> Result<()> {
    if min_length > max_length {
        return Err(ScanError::InvalidConfig(format!(
            "最小长度 {} 大于最大长度 {}",
            min_length, max_length
        )));
    }
    Ok(())
}

/// 子域名扫描引擎
///
/// 引擎拥有去重集合、并发限制器和共享的HTTP客户端。
/// 同一个引擎实例中, 每个完整候选域名最多只会被探测一次。
pub struct ScanEngine<P: Prober = DomainVerifier> {
    config: ScanConfig,
    prober: Arc<P>,
    generator: LabelGenerator,
    seen: SeenSet,
    rate_limiter: Arc<Semaphore>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ScanEngine<DomainVerifier> {
    /// 使用默认的HTTP探测器创建引擎
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let verifier = DomainVerifier::new(&config)?;
        Self::with_prober(config, verifier)
    }
}

impl<P: Prober + 'static> ScanEngine<P> {
    /// 使用自定义探测器创建引擎
    pub fn with_prober(config: ScanConfig, prober: P) -> Result<Self> {
        config.validate()?;
        Ok(ScanEngine {
            rate_limiter: Arc::new(Semaphore::new(config.concurrent_requests)),
            config,
            prober: Arc::new(prober),
            generator: LabelGenerator::default(),
            seen: SeenSet::new(),
            reporter: Arc::new(LogReporter::default()),
        })
    }

    /// 替换进度回调
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// 已经探测过的完整候选域名数量
    pub fn seen_count(&self) -> usize {
        self.seen.count()
    }

    /// 按配置的长度范围扫描一个域名
    pub async fn scan_domain_range(&self, domain: &str) -> Result<Vec<FoundSubdomain>> {
        self.scan_domain(domain, self.config.min_length, self.config.max_length)
            .await
    }

    /// 扫描一个域名在 `[min_length, max_length]` 范围内的所有子域名
    ///
    /// 长度按升序处理, 每个长度内按分块顺序处理, 一个分块的所有探测结束后才开始下一个分块。
    pub async fn scan_domain(
        &self,
        domain: &str,
        min_length: usize,
        max_length: usize,
    ) -> Result<Vec<FoundSubdomain>> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(ScanError::InvalidConfig("域名不能为空".to_string()));
        }
        check_length_range(min_length, max_length)?;

        let start_time = Instant::now();
        let mut results = Vec::new();

        for length in min_length..=max_length {
            info!("扫描 {} 长度为 {} 的子域名", domain, length);
            let mut labels = self.generator.generate(length)?;
            let total = self.generator.candidate_count(length);
            let mut processed = 0;

            // 每次只取出一个分块, 不一次性生成所有标签
            loop {
                let chunk: Vec<String> = labels.by_ref().take(self.config.chunk_size).collect();
                if chunk.is_empty() {
                    break;
                }
                processed += chunk.len();

                let found = self.scan_chunk(domain, &chunk).await;
                results.extend(found);

                self.reporter.on_progress(&ProgressEvent {
                    domain: domain.to_string(),
                    length,
                    processed,
                    total,
                    elapsed: start_time.elapsed(),
                    found_count: results.len(),
                });
            }
        }

        Ok(results)
    }

    /// 并发探测一个分块, 所有探测结束后返回
    async fn scan_chunk(&self, domain: &str, labels: &[String]) -> Vec<FoundSubdomain> {
        let policy = self.config.retry_policy();
        let mut tasks = Vec::with_capacity(labels.len());

        for label in labels {
            let fqc = build_fqc(label, domain);
            // 探测开始前就登记, 防止同一个域名被重复派发
            if !self.seen.insert_new(&fqc) {
                debug!("跳过已检查的域名 {}", fqc);
                continue;
            }

            let prober = Arc::clone(&self.prober);
            let rate_limiter = Arc::clone(&self.rate_limiter);
            tasks.push(tokio::spawn(async move {
                // permit 在任务结束时释放, 包括 panic
                let _permit = match rate_limiter.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return ProbeOutcome::Absent,
                };
                probe_with_retry(prober.as_ref(), &fqc, &policy).await
            }));
        }

        let mut found = Vec::new();
        for task in tasks {
            match task.await {
                Ok(ProbeOutcome::Found { fqc, title }) => {
                    let row = FoundSubdomain {
                        subdomain: fqc,
                        title,
                        domain: domain.to_string(),
                    };
                    self.reporter.on_found(&row);
                    found.push(row);
                }
                Ok(ProbeOutcome::Absent) => {}
                Err(e) => warn!("探测任务异常退出: {}", e),
            }
        }
        found
    }

    /// 依次扫描多个域名, 每个域名扫描完成后把结果写入 `sink`
    pub async fn run<S: ResultSink + ?Sized>(
        &self,
        domains: &[String],
        sink: &mut S,
    ) -> Result<Vec<DomainReport>> {
        let domains: Vec<&str> = domains
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .collect();
        if domains.is_empty() {
            return Err(ScanError::NoDomains);
        }

        let mut reports = Vec::with_capacity(domains.len());
        for domain in domains {
            info!("开始扫描: {}", domain);
            let start_time = Instant::now();
            let seen_before = self.seen_count();

            let found = self.scan_domain_range(domain).await?;
            sink.write_domain(domain, &found)?;
            info!("{} 完成，共 {} 个子域名", domain, found.len());

            reports.push(DomainReport {
                domain: domain.to_string(),
                found: found.len(),
                probed: self.seen_count() - seen_before,
                elapsed: start_time.elapsed(),
            });
        }

        sink.finish()?;
        Ok(reports)
    }
}

/// 便捷的子域名扫描函数
pub async fn scan_subdomains(
    domains: Vec<String>,
    config: ScanConfig,
) -> Result<Vec<FoundSubdomain>> {
    let engine = ScanEngine::new(config)?;
    let mut sink = MemorySink::new();
    engine.run(&domains, &mut sink).await?;
    Ok(sink.rows)
}
