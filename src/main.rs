use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde_json::json;

use fragment_translator::core::{
    decode_body, encode_body, parse_content_type, print_error_message, print_info_message,
    ResponseKind,
};
use fragment_translator::env::{self as fragment_env, EnvVar};
use fragment_translator::translation::{
    ConfigManager, FragmentService, HttpBackend, PipelineState, TranslationConfig,
    TranslationResult,
};

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Translate JSON fragments embedded in HTML pages and JSON responses"
)]
struct Cli {
    /// Input file, reads stdin when omitted or `-`
    input: Option<PathBuf>,

    /// Write the result to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Body kind: html, json or other (detected when omitted)
    #[arg(short, long)]
    kind: Option<String>,

    /// Content-Type of the body, used for kind detection and charset
    #[arg(long)]
    content_type: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Target language
    #[arg(short, long)]
    target: Option<String>,

    /// Source language
    #[arg(short, long)]
    source: Option<String>,

    /// Translation backend URL
    #[arg(long)]
    api_url: Option<String>,

    /// Backend timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Path of the page, passed to the backend as context
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Logical name of a JSON body
    #[arg(short, long, default_value = "response")]
    name: String,

    /// Print the translatable fragments as JSON lines instead of translating
    #[arg(long)]
    extract: bool,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<String>,

    /// Print the supported environment variables and exit
    #[arg(long)]
    env_docs: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        print_error_message(&format!("Error: {e}"));
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => fragment_env::core::LogLevel::get_or_default("warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::fmt()
        .with_max_level(level.parse().unwrap_or(tracing::Level::WARN))
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> TranslationResult<()> {
    if let Some(path) = &cli.init_config {
        ConfigManager::generate_example_config(path)?;
        print_info_message(&format!("Example configuration written to {path}"));
        return Ok(());
    }

    if cli.env_docs {
        print!("{}", fragment_env::generate_env_docs());
        return Ok(());
    }

    let raw = read_input(cli.input.as_ref())?;
    let charset = cli
        .content_type
        .as_deref()
        .map(|content_type| parse_content_type(content_type).1)
        .filter(|charset| !charset.is_empty());
    let body = decode_body(&raw, charset.as_deref());

    let config = load_config(&cli)?;
    let kind = match cli.kind.as_deref() {
        Some(name) => ResponseKind::from_name(name).unwrap_or_else(|| {
            tracing::warn!("未知的内容类型 '{}'，改为自动检测", name);
            ResponseKind::detect(cli.content_type.as_deref(), &body)
        }),
        None => ResponseKind::detect(cli.content_type.as_deref(), &body),
    };
    tracing::debug!("内容类型: {:?}", kind);

    let service = FragmentService::new(config)?;

    if cli.extract {
        return print_fragments(&service, kind, &body, &cli.name);
    }

    let content = match kind {
        ResponseKind::Html | ResponseKind::Json => {
            let backend = HttpBackend::from_config(service.config())?;
            let outcome = match kind {
                ResponseKind::Json => service.translate_json(&body, &cli.name, &cli.path, &backend),
                _ => service.translate_html(&body, &cli.path, &backend),
            };

            if outcome.state == PipelineState::Failed {
                if let Some(error) = &outcome.error {
                    print_error_message(&format!("Translation skipped: {error}"));
                }
            }
            for bundle in outcome.bundles.iter().filter(|b| b.fell_back()) {
                if let Some(error) = &bundle.error {
                    print_error_message(&format!("Fragment '{}' kept original: {error}", bundle.name));
                }
            }
            Some(outcome.content)
        }
        ResponseKind::Other => None,
    };

    let stats = service.get_stats().snapshot();
    tracing::info!(
        "{} 个片段包, {} 个片段, {} 个叶子已翻译",
        stats.bundles_extracted,
        stats.fragments_extracted,
        stats.leaves_translated
    );

    // 解码后内容未变时原样写回输入字节
    match content {
        Some(content) if content != body => {
            write_output(cli.output.as_ref(), &encode_body(&content, charset.as_deref()))
        }
        _ => write_output(cli.output.as_ref(), &raw),
    }
}

fn load_config(cli: &Cli) -> TranslationResult<TranslationConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_path(path)?,
        None => ConfigManager::new()?,
    };
    let mut config = manager.into_config();

    if let Some(target) = &cli.target {
        config.target_lang = target.clone();
    }
    if let Some(source) = &cli.source {
        config.source_lang = source.clone();
    }
    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }

    config.validate()?;
    Ok(config)
}

fn print_fragments(
    service: &FragmentService,
    kind: ResponseKind,
    body: &str,
    name: &str,
) -> TranslationResult<()> {
    let bundles = match kind {
        ResponseKind::Html => service.find_fragments(body),
        ResponseKind::Json => {
            let value = serde_json::from_str(body)?;
            vec![service.extract_value(name, &value)]
        }
        ResponseKind::Other => Vec::new(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for fragment in bundles.iter().flat_map(|bundle| bundle.fragments.iter()) {
        let line = json!({
            "name": fragment.name,
            "path": fragment.path.as_str(),
            "value": fragment.value,
        });
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

fn read_input(input: Option<&PathBuf>) -> TranslationResult<Vec<u8>> {
    match input {
        Some(path) if path.as_os_str() != "-" => Ok(fs::read(path)?),
        _ => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_output(output: Option<&PathBuf>, data: &[u8]) -> TranslationResult<()> {
    match output {
        Some(path) => fs::write(path, data)?,
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(data)?;
            out.flush()?;
        }
    }
    Ok(())
}
