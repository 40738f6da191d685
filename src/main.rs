use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use agentic_forms::field::load_field_list;
use agentic_forms::mapping::{self, MappingConfig, Profile};
use agentic_forms::runlog::{self, RunLogEntry, RunStatus};
use agentic_forms::{
    inspect, rows, runner, BrowserBuilder, Error, FillSettings, FormBrowser, FormConfig, Page, Result,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fill and submit web forms from JSON, CSV or a model mapping", long_about = None)]
struct Cli {
    /// Chrome/Chromium executable; auto-detected when unset
    #[arg(long, global = true, env = "CHROME_PATH")]
    chrome_path: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill one form from a JSON config (and optional data file), then submit it
    Fill {
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        /// JSON list of fields, replacing the config's own fields
        #[arg(long)]
        data: Option<PathBuf>,
        /// Overrides the config's form URL
        #[arg(long)]
        url: Option<String>,
        #[arg(long, env = "HEADLESS", value_parser = FalseyValueParser::new())]
        headless: bool,
        /// Action timeout in milliseconds
        #[arg(long, default_value_t = 30_000)]
        timeout: u64,
        /// Directory for screenshots
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        /// CSV run log to append to
        #[arg(long, default_value = "logs/run_log.csv")]
        log: PathBuf,
    },
    /// Submit a Google Form once per CSV row
    Csv {
        #[arg(long, default_value = "form_data.csv")]
        csv: PathBuf,
        #[arg(long)]
        url: String,
        #[arg(long, env = "HEADLESS", value_parser = FalseyValueParser::new())]
        headless: bool,
        /// Submit at most this many rows (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: usize,
        /// Leave the browser open until Ctrl-C
        #[arg(long, env = "KEEP_OPEN", value_parser = FalseyValueParser::new())]
        keep_open: bool,
    },
    /// List a form's questions and optionally write a CSV template
    Inspect {
        #[arg(long)]
        url: String,
        #[arg(long)]
        write_template: Option<PathBuf>,
        #[arg(long, env = "HEADLESS", value_parser = FalseyValueParser::new())]
        headless: bool,
    },
    /// Map a JSON profile onto a Google Form with Gemini and write the config
    Map {
        #[arg(long)]
        form: String,
        /// JSON object of personal details
        #[arg(long, default_value = "basic_info.json")]
        basic: PathBuf,
        #[arg(long, default_value = "config.json")]
        out: PathBuf,
        /// Extra guidance for the model
        #[arg(long, default_value = "prompts/mapping_prompt.md")]
        prompt: PathBuf,
        /// Prefill the form with the mapping (never submits)
        #[arg(long)]
        fill: bool,
        #[arg(long, env = "HEADLESS", value_parser = FalseyValueParser::new())]
        headless: bool,
        #[arg(long, env = "KEEP_OPEN", value_parser = FalseyValueParser::new())]
        keep_open: bool,
        /// Block images, media and fonts
        #[arg(long)]
        fast: bool,
        #[arg(long, default_value_t = 5_000)]
        timeout_ms: u64,
    },
}

fn browser_builder(chrome_path: Option<&str>, headless: bool, fast: bool, timeout: Duration) -> BrowserBuilder {
    let builder = FormBrowser::builder().headless(headless).fast(fast).timeout(timeout);
    match chrome_path {
        Some(path) => builder.chrome_path(path),
        None => builder,
    }
}

async fn launch(builder: BrowserBuilder) -> Result<(FormBrowser, Page)> {
    let browser = builder.build().await?;
    let page = browser.new_page("about:blank").await?;
    Ok((browser, page))
}

async fn hold_open(headless: bool) {
    if headless {
        return;
    }
    info!("browser left open, press Ctrl-C to exit");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {e}");
    }
}

async fn screenshot(page: &Page, path: &Path) {
    match page.screenshot_to_file(path).await {
        Ok(()) => info!(path = %path.display(), "screenshot saved"),
        Err(e) => warn!("{e}"),
    }
}

/// Fill, submit and confirm on an open page. `<ts>.png` captures the page
/// right after the submit click; failures get `<ts>_error.png`.
async fn fill_on_page(
    page: &Page,
    config: &FormConfig,
    settings: &FillSettings,
    output_dir: &Path,
    ts: &str,
) -> Result<()> {
    let result = async {
        let fields = runner::fill_and_submit(page, config, settings).await?;
        screenshot(page, &output_dir.join(format!("{ts}.png"))).await;
        let signal = runner::confirm(page, config, settings).await?;
        let filled = fields.iter().filter(|f| f.is_filled()).count();
        info!(filled, total = fields.len(), %signal, "run finished");
        Ok::<_, Error>(())
    }
    .await;
    if result.is_err() {
        screenshot(page, &output_dir.join(format!("{ts}_error.png"))).await;
    }
    result
}

async fn run_fill(
    config: &Path,
    data: Option<&Path>,
    url: Option<String>,
    browser: BrowserBuilder,
    timeout: Duration,
    output_dir: &Path,
    log: &Path,
) -> Result<ExitCode> {
    let mut config = FormConfig::load(config)?;
    if let Some(data) = data {
        config.fields = load_field_list(data)?;
    }
    if let Some(url) = url {
        config.form_url = url;
    }
    let form_url = config.url().unwrap_or_default().to_string();
    let settings = FillSettings::default().with_timeout(timeout);

    std::fs::create_dir_all(output_dir)?;
    let ts = runlog::timestamp();

    let result = match launch(browser).await {
        Ok((browser, page)) => {
            let result = fill_on_page(&page, &config, &settings, output_dir, &ts).await;
            if let Err(e) = browser.close().await {
                warn!("closing browser: {e}");
            }
            result
        }
        Err(e) => Err(e),
    };

    let (entry, code) = match result {
        Ok(()) => (RunLogEntry::new(&ts, &form_url, RunStatus::Success), ExitCode::SUCCESS),
        Err(e) => {
            error!("run failed: {e}");
            (RunLogEntry::failed(&ts, &form_url, &e), ExitCode::FAILURE)
        }
    };
    runlog::append(log, &entry)?;
    Ok(code)
}

async fn run_csv(
    csv: &Path,
    url: &str,
    browser: BrowserBuilder,
    headless: bool,
    limit: usize,
    keep_open: bool,
) -> Result<ExitCode> {
    let rows = rows::read_rows(csv, limit)?;
    if rows.is_empty() {
        info!("no rows found in {}, nothing to submit", csv.display());
        return Ok(ExitCode::SUCCESS);
    }
    let settings = FillSettings::default();
    let (browser, page) = launch(browser).await?;

    let summary = runner::run_rows(&page, url, &rows, &settings).await;
    if keep_open {
        hold_open(headless).await;
    }
    browser.close().await?;

    let summary = summary?;
    info!(submitted = summary.submitted, without_submit = summary.missing_submit, "done");
    Ok(ExitCode::SUCCESS)
}

async fn run_inspect(url: &str, write_template: Option<&Path>, browser: BrowserBuilder) -> Result<ExitCode> {
    let settings = FillSettings::default();
    let (browser, page) = launch(browser).await?;

    page.goto(url).await?;
    runner::wait_until_ready(&page, &settings).await?;
    runner::accept_consent(&page, &settings).await?;

    let questions = inspect::extract_questions(&page).await?;
    if questions.is_empty() {
        println!("{}", inspect::render_generic(&page).await?);
    } else {
        println!("{}", inspect::render(&questions));
        let (headers, _) = inspect::csv_template(&questions);
        println!("Suggested CSV headers:\n{}", inspect::header_line(&headers)?);
        if let Some(path) = write_template {
            inspect::write_template(path, &questions)?;
            println!("\nWrote template with sample row to: {}", path.display());
        }
    }
    browser.close().await?;
    Ok(ExitCode::SUCCESS)
}

fn load_profile(path: &Path) -> Result<Profile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("{} must hold a JSON object: {e}", path.display())))
}

#[allow(clippy::too_many_arguments)]
async fn run_map(
    form: &str,
    basic: &Path,
    out: &Path,
    prompt: PathBuf,
    fill: bool,
    browser: BrowserBuilder,
    headless: bool,
    keep_open: bool,
    timeout: Duration,
) -> Result<ExitCode> {
    let profile = load_profile(basic)?;
    let mapping_config = MappingConfig::from_env().with_prompt_path(prompt);
    let (browser, page) = launch(browser).await?;

    let config = mapping::map_form(&page, form, &profile, &mapping_config).await?;
    std::fs::write(out, serde_json::to_string_pretty(&config)?)?;
    println!("Wrote {}", out.display());

    if fill {
        let settings = FillSettings::default().with_timeout(timeout);
        let reports = runner::prefill(&page, &config, &settings).await?;
        let filled = reports.iter().filter(|r| r.is_filled()).count();
        info!(filled, total = reports.len(), "prefill done, nothing submitted");
        if keep_open {
            hold_open(headless).await;
        }
    }
    browser.close().await?;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let chrome_path = cli.chrome_path.as_deref();
    let result = match cli.command {
        Command::Fill { config, data, url, headless, timeout, output_dir, log } => {
            let timeout = Duration::from_millis(timeout);
            let browser = browser_builder(chrome_path, headless, false, timeout);
            run_fill(&config, data.as_deref(), url, browser, timeout, &output_dir, &log).await
        }
        Command::Csv { csv, url, headless, limit, keep_open } => {
            let browser = browser_builder(chrome_path, headless, false, Duration::from_secs(30));
            run_csv(&csv, &url, browser, headless, limit, keep_open).await
        }
        Command::Inspect { url, write_template, headless } => {
            let browser = browser_builder(chrome_path, headless, false, Duration::from_secs(30));
            run_inspect(&url, write_template.as_deref(), browser).await
        }
        Command::Map { form, basic, out, prompt, fill, headless, keep_open, fast, timeout_ms } => {
            let timeout = Duration::from_millis(timeout_ms);
            let browser = browser_builder(chrome_path, headless, fast, timeout);
            run_map(&form, &basic, &out, prompt, fill, browser, headless, keep_open, timeout).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
