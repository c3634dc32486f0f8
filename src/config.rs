use crate::error::ConfigError;
use crate::service::layout::Locale;
use serde::Deserialize;
use std::path::PathBuf;

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub line: LineConfig,
    pub output: OutputConfig,
    pub render: RenderConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// LINE 渠道凭据
#[derive(Clone, Deserialize)]
pub struct LineConfig {
    pub channel_secret: String,
    pub channel_access_token: String,
    pub api_base: String,
}

// 凭据不进日志
impl std::fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConfig")
            .field("channel_secret", &"***")
            .field("channel_access_token", &"***")
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub font_path: Option<PathBuf>,
    pub font_name: String,
    pub locale: Locale,
}

/// 交付方式: 回复下载链接, 或推送给用户
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    #[default]
    Reply,
    Push,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    pub mode: DeliveryMode,
}

impl AppConfig {
    /// 默认值 → quotebot.toml (可选) → QUOTEBOT_* 环境变量 → 常用环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("line.channel_secret", "")?
            .set_default("line.channel_access_token", "")?
            .set_default("line.api_base", "https://api.line.me")?
            .set_default("output.dir", "static/pdfs")?
            .set_default("output.public_base_url", "http://localhost:5000")?
            .set_default("render.font_name", "IPAexGothic")?
            .set_default("render.locale", "ja")?
            .set_default("delivery.mode", "reply")?
            .add_source(config::File::with_name("quotebot").required(false))
            .add_source(
                config::Environment::with_prefix("QUOTEBOT")
                    .separator("__")
                    .try_parsing(false),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("line.channel_secret", std::env::var("LINE_CHANNEL_SECRET").ok())?
            .set_override_option(
                "line.channel_access_token",
                std::env::var("LINE_CHANNEL_ACCESS_TOKEN").ok(),
            )?
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.line.channel_secret.is_empty() {
            return Err(ConfigError::Missing("line.channel_secret (LINE_CHANNEL_SECRET)"));
        }
        if self.line.channel_access_token.is_empty() {
            return Err(ConfigError::Missing(
                "line.channel_access_token (LINE_CHANNEL_ACCESS_TOKEN)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")
            .unwrap()
            .set_default("server.port", 8080)
            .unwrap()
            .set_default("line.channel_secret", "s")
            .unwrap()
            .set_default("line.channel_access_token", "t")
            .unwrap()
            .set_default("line.api_base", "https://api.line.me")
            .unwrap()
            .set_default("output.dir", "static/pdfs")
            .unwrap()
            .set_default("output.public_base_url", "http://localhost:8080")
            .unwrap()
            .set_default("render.font_name", "IPAexGothic")
            .unwrap()
            .set_default("render.locale", "ja")
            .unwrap()
            .set_default("delivery.mode", "reply")
            .unwrap()
    }

    #[test]
    fn deserializes_defaults() {
        let cfg: AppConfig = base().build().unwrap().try_deserialize().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.delivery.mode, DeliveryMode::Reply);
        assert_eq!(cfg.render.locale, Locale::Ja);
        assert!(cfg.render.font_path.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn overrides_mode_locale_and_font() {
        let cfg: AppConfig = base()
            .set_override("delivery.mode", "push")
            .unwrap()
            .set_override("render.locale", "en")
            .unwrap()
            .set_override("render.font_path", "static/fonts/ipaexg.ttf")
            .unwrap()
            .set_override("server.port", "9000")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.delivery.mode, DeliveryMode::Push);
        assert_eq!(cfg.render.locale, Locale::En);
        assert_eq!(
            cfg.render.font_path,
            Some(PathBuf::from("static/fonts/ipaexg.ttf"))
        );
        assert_eq!(cfg.server.port, 9000);
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let cfg: AppConfig = base()
            .set_override("line.channel_secret", "")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let cfg: AppConfig = base().build().unwrap().try_deserialize().unwrap();
        let printed = format!("{:?}", cfg);
        assert!(printed.contains("***"));
        assert!(!printed.contains("channel_secret: \"s\""));
    }
}
