use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;

use crate::error::{Error, Result};

/// 日志过滤使用的环境变量
pub const LOG_ENV: &str = "STACKLOOM_LOG";

/// 配置文件路径使用的环境变量
pub const CONFIG_ENV: &str = "STACKLOOM_CONFIG";

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!("unknown storage kind: {other}"))),
        }
    }
}

/// 服务配置
///
/// 先读取 `STACKLOOM_CONFIG` 指向的 TOML 文件（可选），再用环境变量覆盖：
///
/// | 字段 | 环境变量 | 默认值 |
/// |---|---|---|
/// | `listen` | `STACKLOOM_LISTEN` | `0.0.0.0:3000` |
/// | `storage` | `STACKLOOM_STORAGE` | `postgres` |
/// | `database_url` | `DATABASE_URL` | 无 |
/// | `seed_file` | `STACKLOOM_SEED` | 无 |
/// | `auto_migrate` | `STACKLOOM_AUTO_MIGRATE` | `true` |
/// | `cache_max_age` | `STACKLOOM_CACHE_MAX_AGE` | `60` |
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 监听地址
    pub listen: String,
    pub storage: StorageKind,
    pub database_url: Option<String>,
    /// 内存存储启动时载入的种子数据
    pub seed_file: Option<PathBuf>,
    /// 启动时执行建表语句
    pub auto_migrate: bool,
    /// GET 接口 `Cache-Control` 的 max-age（秒）
    pub cache_max_age: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            storage: StorageKind::default(),
            database_url: None,
            seed_file: None,
            auto_migrate: true,
            cache_max_age: 60,
        }
    }
}

impl Config {
    /// 从配置文件（可选）和环境变量加载
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// 用 `lookup` 提供的变量覆盖配置
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(listen) = lookup("STACKLOOM_LISTEN") {
            self.listen = listen;
        }
        if let Some(storage) = lookup("STACKLOOM_STORAGE") {
            self.storage = storage.parse()?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(seed) = lookup("STACKLOOM_SEED") {
            self.seed_file = Some(PathBuf::from(seed));
        }
        if let Some(flag) = lookup("STACKLOOM_AUTO_MIGRATE") {
            self.auto_migrate = parse_var("STACKLOOM_AUTO_MIGRATE", &flag)?;
        }
        if let Some(age) = lookup("STACKLOOM_CACHE_MAX_AGE") {
            self.cache_max_age = parse_var("STACKLOOM_CACHE_MAX_AGE", &age)?;
        }
        Ok(())
    }

    /// Postgres 连接串，未配置时返回错误
    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::Config("DATABASE_URL not set".to_string()))
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {key} value {value:?}: {e}")))
}
