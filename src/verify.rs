use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::debug;
use regex::{Captures, Regex};
use reqwest::{Client, Proxy, StatusCode};
use tokio::time::{sleep, timeout};

use crate::api::ScanConfig;
use crate::error::Result;

/// 页面没有标题时使用的占位符
pub const NO_TITLE: &str = "No Title";

lazy_static! {
    static ref TITLE_RE: Regex = Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title\s*>").unwrap();
    static ref NUMERIC_ENTITY_RE: Regex = Regex::new(r"&#([xX]?)([0-9a-fA-F]+);").unwrap();
}

/// 单次HTTP请求的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// 状态码200, 附带页面标题
    Hit(String),
    /// 非200状态码
    Status(u16),
    /// 连接失败、超时或协议错误
    Failed(String),
}

/// 一个候选域名的最终探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found { fqc: String, title: String },
    Absent,
}

/// 对单个完整候选域名发起一次探测
///
/// 实现必须可以被并发调用。
#[async_trait]
pub trait Prober: Send + Sync {
    async fn attempt(&self, fqc: &str) -> Attempt;
}

/// 重试策略: 最多尝试 `max_retries` 次, 第n次失败后等待 `base_delay * n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.base_delay * u32::try_from(attempt).unwrap_or(u32::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// 带重试地探测一个候选域名
///
/// 网络错误只在这里处理, 全部失败后返回 `Absent` 而不是错误。
pub async fn probe_with_retry<P: Prober + ?Sized>(
    prober: &P,
    fqc: &str,
    policy: &RetryPolicy,
) -> ProbeOutcome {
    let attempts = policy.max_retries.max(1);

    for attempt in 1..=attempts {
        let reason = match prober.attempt(fqc).await {
            Attempt::Hit(title) => {
                return ProbeOutcome::Found {
                    fqc: fqc.to_string(),
                    title,
                }
            }
            Attempt::Status(code) => format!("状态码 {}", code),
            Attempt::Failed(reason) => reason,
        };

        if attempt == attempts {
            debug!("检查域名失败 http://{}: {}", fqc, reason);
        } else {
            sleep(policy.delay_for(attempt)).await;
        }
    }

    ProbeOutcome::Absent
}

/// 基于reqwest的HTTP探测器
///
/// 内部的 `Client` 只创建一次, 所有探测共享同一个连接池。
#[derive(Debug, Clone)]
pub struct DomainVerifier {
    client: Client,
    timeout_duration: Duration,
}

impl DomainVerifier {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(config.concurrent_requests)
            .user_agent(config.user_agent.as_str());

        if let Some(ref proxy) = config.proxy {
            builder = builder.proxy(Proxy::http(proxy.as_str())?);
        }

        Ok(DomainVerifier {
            client: builder.build()?,
            timeout_duration: config.timeout,
        })
    }

    async fn fetch(&self, url: &str) -> std::result::Result<Attempt, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Ok(Attempt::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let title = extract_title(&body).unwrap_or_else(|| NO_TITLE.to_string());
        Ok(Attempt::Hit(title))
    }
}

#[async_trait]
impl Prober for DomainVerifier {
    async fn attempt(&self, fqc: &str) -> Attempt {
        let url = format!("http://{}", fqc);
        // 客户端的超时不覆盖读取响应体之前的全部阶段, 外层再限制一次
        match timeout(self.timeout_duration, self.fetch(&url)).await {
            Ok(Ok(attempt)) => attempt,
            Ok(Err(e)) => Attempt::Failed(e.to_string()),
            Err(_) => Attempt::Failed(format!("请求超时 ({:?})", self.timeout_duration)),
        }
    }
}

/// 提取HTML标题
pub fn extract_title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|s| !s.is_empty())
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let decoded = NUMERIC_ENTITY_RE.replace_all(text, |caps: &Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; 必须最后处理
    decoded
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
