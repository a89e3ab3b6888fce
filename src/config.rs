//! 服务配置
//!
//! 配置文件为 TOML，查找顺序：`$HOMESTEAD_CONFIG`、`config.toml`、
//! `config/config.toml`，都不存在时使用默认值。`DATABASE_URL` 与
//! `HOMESTEAD_PORT` 环境变量会覆盖文件中的值。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// 服务配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 登录配置
    pub auth: AuthConfig,
    /// 农场业务配置
    pub farm: FarmConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 绑定地址
    pub bind_address: String,
    /// HTTP 服务端口
    pub port: u16,
    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
    /// 日志文件目录，不设置则只输出到控制台
    pub log_dir: Option<PathBuf>,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 是否启用控制台输出
    pub console_output: bool,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres 连接串，不设置则使用内存存储
    pub url: Option<String>,
    pub max_connections: u32,
}

/// 登录账号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// 登录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// 关闭时所有接口无需登录
    pub enabled: bool,
    /// 会话有效期（小时）
    pub token_ttl_hours: i64,
    pub users: Vec<AuthUser>,
}

/// 农场业务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmConfig {
    pub name: String,
    /// 物资临期提醒窗口（天）
    pub expiring_within_days: i64,
    /// 周复盘以周一为一周开始，否则为周日
    pub week_starts_on_monday: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            timeout_seconds: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            file_prefix: "homestead".to_string(),
            console_output: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_ttl_hours: 12,
            users: Vec::new(),
        }
    }
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            name: "Homestead".to_string(),
            expiring_within_days: 30,
            week_starts_on_monday: true,
        }
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::FileWrite(e.to_string()))?;
        }

        fs::write(path.as_ref(), content).map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// 用环境变量覆盖
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database.url = Some(url);
            }
        }
        if let Ok(port) = std::env::var("HOMESTEAD_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Validation(format!("无效的端口: {}", port)))?;
        }
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("HTTP端口必须大于0".to_string()));
        }
        if self.server.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.logging.level, valid_levels
            )));
        }

        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Validation("会话有效期必须大于0".to_string()));
        }
        if self.auth.enabled && self.auth.users.is_empty() {
            return Err(ConfigError::Validation(
                "启用登录时至少需要配置一个账号".to_string(),
            ));
        }
        let mut names = std::collections::HashSet::new();
        for user in &self.auth.users {
            if user.username.trim().is_empty() {
                return Err(ConfigError::Validation("账号名不能为空".to_string()));
            }
            if !names.insert(user.username.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "账号重复: {}",
                    user.username
                )));
            }
        }

        if self.farm.expiring_within_days < 0 {
            return Err(ConfigError::Validation("临期天数不能为负".to_string()));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("文件读取错误: {0}")]
    FileRead(String),
    #[error("文件写入错误: {0}")]
    FileWrite(String),
    #[error("配置解析错误: {0}")]
    Parse(String),
    #[error("配置序列化错误: {0}")]
    Serialize(String),
    #[error("配置验证错误: {0}")]
    Validation(String),
}

/// 从文件或默认值加载配置，并应用环境变量覆盖
pub fn load_config() -> Result<Config, ConfigError> {
    let mut config = match find_config_file() {
        Some(path) => {
            info!("从配置文件加载: {}", path.display());
            Config::load_from_file(&path)?
        }
        None => {
            info!("未找到配置文件，使用默认配置");
            Config::default()
        }
    };

    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("HOMESTEAD_CONFIG") {
        return Some(PathBuf::from(path));
    }

    ["config.toml", "./config/config.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}
