use thiserror::Error;

/// 扫描过程中会传递给调用方的错误
///
/// 单个候选域名的探测失败不会出现在这里，它们在探测客户端内部被重试并最终视为不存在。
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    #[error("子域名长度必须大于等于1, 实际为 {0}")]
    InvalidLength(usize),

    #[error("字符集为空")]
    EmptyAlphabet,

    #[error("HTTP 客户端初始化失败: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("没有可扫描的域名")]
    NoDomains,
}

pub type Result<T> = std::result::Result<T, ScanError>;
