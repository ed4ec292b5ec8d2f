use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 链接捕获错误
    Capture(CaptureError),
    /// 外部服务探测错误
    Service(ServiceError),
    /// 台账读写错误
    Ledger(LedgerError),
    /// 文件操作错误
    File(FileError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Capture(e) => write!(f, "链接捕获错误: {}", e),
            AppError::Service(e) => write!(f, "服务探测错误: {}", e),
            AppError::Ledger(e) => write!(f, "台账错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => Some(e),
            AppError::Capture(e) => Some(e),
            AppError::Service(e) => Some(e),
            AppError::Ledger(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 启动无头浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 连接浏览器失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 在限定时间内未等到页面元素
    WaitTimeout { selector: String, secs: u64 },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::LaunchFailed { source } => {
                write!(f, "启动无头浏览器失败: {}", source)
            }
            BrowserError::ConnectionFailed { port, source } => {
                write!(f, "无法连接到浏览器 (端口: {}): {}", port, source)
            }
            BrowserError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            BrowserError::WaitTimeout { selector, secs } => {
                write!(f, "等待元素 '{}' 超时 ({}秒)", selector, secs)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::ConnectionFailed { source, .. }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            BrowserError::WaitTimeout { .. } => None,
        }
    }
}

/// 链接捕获错误
///
/// 每个变体对应一种有界等待的失败结局，调用方据此决定
/// 是重试整个文件还是中止本次运行
#[derive(Debug)]
pub enum CaptureError {
    /// 在限定时间内既没有发生跳转也没有出现链接元素
    LinkTimeout { secs: u64 },
    /// 链接元素反复失效，重试次数耗尽
    LinkUnavailable { attempts: usize },
    /// 进度条在限定时间内未达到 100
    ProgressTimeout { secs: u64 },
    /// 在限定时间内未等到下载确认按钮
    ConfirmTimeout { secs: u64 },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::LinkTimeout { secs } => {
                write!(f, "等待分享链接超时 ({}秒)", secs)
            }
            CaptureError::LinkUnavailable { attempts } => {
                write!(f, "重试 {} 次后仍无法读取分享链接", attempts)
            }
            CaptureError::ProgressTimeout { secs } => {
                write!(f, "等待上传进度完成超时 ({}秒)", secs)
            }
            CaptureError::ConfirmTimeout { secs } => {
                write!(f, "等待下载确认按钮超时 ({}秒)", secs)
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// 外部服务探测错误
#[derive(Debug)]
pub enum ServiceError {
    /// 目标服务不可达
    Unreachable {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器调试端口不可达
    DevtoolsUnreachable {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unreachable { url, source } => {
                write!(f, "目标服务不可达 ({}): {}", url, source)
            }
            ServiceError::DevtoolsUnreachable { port, source } => {
                write!(f, "浏览器调试端口不可达 (端口: {}): {}", port, source)
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Unreachable { source, .. }
            | ServiceError::DevtoolsUnreachable { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 台账读写错误
///
/// 台账损坏会导致已有记录丢失，因此一律视为致命错误，
/// 绝不允许静默丢弃已有行
#[derive(Debug)]
pub enum LedgerError {
    /// 读取台账失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入临时台账失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 原子替换台账文件失败
    ReplaceFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::ReadFailed { path, source } => {
                write!(f, "读取台账失败 ({}): {}", path, source)
            }
            LedgerError::WriteFailed { path, source } => {
                write!(f, "写入台账失败 ({}): {}", path, source)
            }
            LedgerError::ReplaceFailed { path, source } => {
                write!(f, "替换台账文件失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::ReadFailed { source, .. }
            | LedgerError::WriteFailed { source, .. }
            | LedgerError::ReplaceFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 创建目录失败
    DirectoryCreateFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 读取目录失败
    ReadDirFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 重命名失败
    RenameFailed {
        from: String,
        to: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 重命名目标已存在
    TargetExists { path: String },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::DirectoryCreateFailed { path, source } => {
                write!(f, "创建目录失败 ({}): {}", path, source)
            }
            FileError::ReadDirFailed { path, source } => {
                write!(f, "读取目录失败 ({}): {}", path, source)
            }
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::RenameFailed { from, to, source } => {
                write!(f, "重命名失败 ({} -> {}): {}", from, to, source)
            }
            FileError::TargetExists { path } => {
                write!(f, "重命名目标已存在: {}", path)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::DirectoryCreateFailed { source, .. }
            | FileError::ReadDirFailed { source, .. }
            | FileError::ReadFailed { source, .. }
            | FileError::RenameFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            FileError::TargetExists { .. } => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 超时配置违反约束：链接等待必须长于确认等待
    InvalidTimeouts { link_secs: u64, confirm_secs: u64 },
    /// 轮询间隔不能为 0
    ZeroPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeouts {
                link_secs,
                confirm_secs,
            } => {
                write!(
                    f,
                    "链接等待超时 ({}秒) 必须大于确认等待超时 ({}秒)",
                    link_secs, confirm_secs
                )
            }
            ConfigError::ZeroPollInterval => {
                write!(f, "轮询间隔必须大于 0 秒")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建等待元素超时错误
    pub fn wait_timeout(selector: impl Into<String>, secs: u64) -> Self {
        AppError::Browser(BrowserError::WaitTimeout {
            selector: selector.into(),
            secs,
        })
    }

    /// 创建服务不可达错误
    pub fn service_unreachable(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Service(ServiceError::Unreachable {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建重命名失败错误
    pub fn rename_failed(
        from: impl Into<String>,
        to: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::RenameFailed {
            from: from.into(),
            to: to.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
