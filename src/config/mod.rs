//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vivadoc";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DOCS_ROOT: &str = "builds";
const DEFAULT_CONVERTER_CLI_PATH: &str = "asciidoctor";
const DEFAULT_RENDER_WORKERS: u32 = 4;
const DEFAULT_HTML_WAIT_SECS: u64 = 5 * 60;
const DEFAULT_PDF_WAIT_SECS: u64 = 15 * 60;

/// Command-line arguments for the vivadoc binary.
#[derive(Debug, Parser)]
#[command(name = "vivadoc", version, about = "Living documentation publisher")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VIVADOC_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render the feature results of one build into the documentation store.
    Publish(Box<PublishArgs>),
    /// Serve published documentation over HTTP.
    Serve(ServeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PublishArgs {
    #[command(flatten)]
    pub overrides: PublishOverrides,

    /// Workspace directory that holds the build's feature results.
    #[arg(value_name = "WORKSPACE", value_hint = ValueHint::DirPath)]
    pub workspace: PathBuf,

    /// Number of the build being published.
    #[arg(long = "build-number", value_name = "NUMBER")]
    pub build_number: u32,

    /// Display name used in log output; defaults to `build #<number>`.
    #[arg(long = "display-name", value_name = "NAME")]
    pub display_name: Option<String>,

    /// Directory holding cucumber JSON files, relative to the workspace.
    #[arg(long = "features-dir", value_name = "PATH")]
    pub features_dir: Option<String>,

    /// Documentation format(s) to publish.
    #[arg(long, value_enum, default_value_t = FormatArg::Html)]
    pub format: FormatArg,

    /// Document title.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Table of contents placement.
    #[arg(long, value_enum)]
    pub toc: Option<TocArg>,

    /// Toggle section numbering.
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub numbered: Option<bool>,

    /// Toggle section anchors.
    #[arg(long = "sect-anchors", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub sect_anchors: Option<bool>,

    /// Omit the features section wrapper and promote feature headings.
    #[arg(long = "hide-features-section", action = clap::ArgAction::SetTrue)]
    pub hide_features_section: bool,

    /// Omit the summary section.
    #[arg(long = "hide-summary", action = clap::ArgAction::SetTrue)]
    pub hide_summary: bool,

    /// Omit scenario keywords.
    #[arg(long = "hide-scenario-keyword", action = clap::ArgAction::SetTrue)]
    pub hide_scenario_keyword: bool,

    /// Omit per-step timings.
    #[arg(long = "hide-step-time", action = clap::ArgAction::SetTrue)]
    pub hide_step_time: bool,

    /// Omit tags.
    #[arg(long = "hide-tags", action = clap::ArgAction::SetTrue)]
    pub hide_tags: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Html,
    Pdf,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TocArg {
    Left,
    Right,
    Center,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverride {
    /// Override the documentation store root directory.
    #[arg(long = "docs-root", value_name = "PATH")]
    pub docs_root: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the AsciiDoc converter executable path.
    #[arg(long = "render-converter-cli-path", value_name = "PATH")]
    pub converter_cli_path: Option<PathBuf>,

    /// Override the render worker pool size.
    #[arg(long = "render-workers", value_name = "COUNT")]
    pub workers: Option<u32>,

    /// Override the backend pass order for combined formats.
    #[arg(long = "render-pass-order", value_enum, value_name = "ORDER")]
    pub pass_order: Option<PassOrderSetting>,

    /// Override the wait ceiling for HTML-only render jobs.
    #[arg(long = "render-html-wait-seconds", value_name = "SECONDS")]
    pub html_wait_seconds: Option<u64>,

    /// Override the wait ceiling for render jobs that produce a PDF.
    #[arg(long = "render-pdf-wait-seconds", value_name = "SECONDS")]
    pub pdf_wait_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PublishOverrides {
    #[command(flatten)]
    pub store: StoreOverride,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub render: RenderOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub store: StoreOverride,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub docs_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub converter_cli_path: PathBuf,
    pub workers: NonZeroU32,
    pub pass_order: PassOrderSetting,
    pub html_wait: Duration,
    pub pdf_wait: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PassOrderSetting {
    #[default]
    HtmlFirst,
    PdfFirst,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VIVADOC").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Publish(args)) => raw.apply_publish_overrides(&args.overrides),
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_publish_overrides(&mut self, overrides: &PublishOverrides) {
        self.apply_store_override(&overrides.store);
        self.apply_logging_overrides(&overrides.logging);
        self.apply_render_overrides(&overrides.render);
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_store_override(&overrides.store);
        self.apply_logging_overrides(&overrides.logging);

        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
    }

    fn apply_store_override(&mut self, overrides: &StoreOverride) {
        if let Some(root) = overrides.docs_root.as_ref() {
            self.store.docs_root = Some(root.clone());
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(path) = overrides.converter_cli_path.as_ref() {
            self.render.converter_cli_path = Some(path.clone());
        }
        if let Some(workers) = overrides.workers {
            self.render.workers = Some(workers);
        }
        if let Some(order) = overrides.pass_order {
            self.render.pass_order = Some(order);
        }
        if let Some(seconds) = overrides.html_wait_seconds {
            self.render.html_wait_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.pdf_wait_seconds {
            self.render.pdf_wait_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            render,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let store = build_store_settings(store)?;
        let render = build_render_settings(render)?;

        Ok(Self {
            server,
            logging,
            store,
            render,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let docs_root = store
        .docs_root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCS_ROOT));
    if docs_root.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "store.docs_root",
            "path must not be empty",
        ));
    }

    Ok(StoreSettings { docs_root })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let converter_cli_path = render
        .converter_cli_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONVERTER_CLI_PATH));
    if converter_cli_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.converter_cli_path",
            "path must not be empty",
        ));
    }

    let workers_value = render.workers.unwrap_or(DEFAULT_RENDER_WORKERS);
    let workers = NonZeroU32::new(workers_value)
        .ok_or_else(|| LoadError::invalid("render.workers", "must be greater than zero"))?;

    let html_wait_secs = render.html_wait_seconds.unwrap_or(DEFAULT_HTML_WAIT_SECS);
    if html_wait_secs == 0 {
        return Err(LoadError::invalid(
            "render.html_wait_seconds",
            "must be greater than zero",
        ));
    }
    let pdf_wait_secs = render.pdf_wait_seconds.unwrap_or(DEFAULT_PDF_WAIT_SECS);
    if pdf_wait_secs == 0 {
        return Err(LoadError::invalid(
            "render.pdf_wait_seconds",
            "must be greater than zero",
        ));
    }

    Ok(RenderSettings {
        converter_cli_path,
        workers,
        pass_order: render.pass_order.unwrap_or_default(),
        html_wait: Duration::from_secs(html_wait_secs),
        pdf_wait: Duration::from_secs(pdf_wait_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    docs_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    converter_cli_path: Option<PathBuf>,
    workers: Option<u32>,
    pass_order: Option<PassOrderSetting>,
    html_wait_seconds: Option<u64>,
    pdf_wait_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_any_source() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.store.docs_root, PathBuf::from(DEFAULT_DOCS_ROOT));
        assert_eq!(
            settings.render.converter_cli_path,
            PathBuf::from(DEFAULT_CONVERTER_CLI_PATH)
        );
        assert_eq!(settings.render.workers.get(), DEFAULT_RENDER_WORKERS);
        assert_eq!(settings.render.html_wait, Duration::from_secs(300));
        assert_eq!(settings.render.pdf_wait, Duration::from_secs(900));
        assert_eq!(settings.render.pass_order, PassOrderSetting::HtmlFirst);
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            logging: LoggingOverrides {
                log_level: Some("debug".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            logging: LoggingOverrides {
                log_json: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut raw = RawSettings::default();
        raw.render.workers = Some(0);
        let err = Settings::from_raw(raw).expect_err("must reject");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "render.workers",
                ..
            }
        ));
    }

    #[test]
    fn parse_publish_arguments() {
        let args = CliArgs::parse_from([
            "vivadoc",
            "publish",
            "--build-number",
            "42",
            "--format",
            "all",
            "--features-dir",
            "target/cucumber",
            "--toc",
            "left",
            "--numbered",
            "false",
            "--hide-step-time",
            "/work/builds/42",
        ]);

        match args.command.expect("publish command") {
            Command::Publish(publish) => {
                assert_eq!(publish.build_number, 42);
                assert_eq!(publish.format, FormatArg::All);
                assert_eq!(publish.features_dir.as_deref(), Some("target/cucumber"));
                assert_eq!(publish.toc, Some(TocArg::Left));
                assert_eq!(publish.numbered, Some(false));
                assert!(publish.sect_anchors.is_none());
                assert!(publish.hide_step_time);
                assert!(!publish.hide_tags);
                assert_eq!(publish.workspace, PathBuf::from("/work/builds/42"));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "vivadoc",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--docs-root",
            "/var/lib/vivadoc/builds",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(
                    serve.overrides.store.docs_root,
                    Some(PathBuf::from("/var/lib/vivadoc/builds"))
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn publish_render_overrides_reach_the_settings() {
        let args = CliArgs::parse_from([
            "vivadoc",
            "publish",
            "--build-number",
            "1",
            "--render-workers",
            "2",
            "--render-pass-order",
            "pdf-first",
            "--render-pdf-wait-seconds",
            "60",
            "/tmp/ws",
        ]);

        let mut raw = RawSettings::default();
        match args.command.expect("publish command") {
            Command::Publish(publish) => raw.apply_publish_overrides(&publish.overrides),
            _ => panic!("wrong command parsed"),
        }
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.render.workers.get(), 2);
        assert_eq!(settings.render.pass_order, PassOrderSetting::PdfFirst);
        assert_eq!(settings.render.pdf_wait, Duration::from_secs(60));
    }
}
