use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use linkmend_core::config::{self, Config};
use linkmend_core::remediate::{self, RemediationPlan};
use linkmend_core::report::{self, ReportFormat, confidence_tier};
use linkmend_core::{
    DocumentRepository, GitHubRepository, ProgressCallback, RepoLocator, ScanContext, ScanOptions, ScanPhase,
    ScanProgress, ScanReport,
};
use linkmend_scanner::{BreakReason, HttpSiteClient, LinkVerdict, SitemapCache, Suggestion};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

// Helper functions for the command handlers

/// Config file, then `LINKMEND_*` from `lookup`, then command-line flags.
pub fn load_settings_with<F>(args: &ArgMatches, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let path = args
        .get_one::<String>("config")
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .unwrap_or_else(config::default_config_path);

    let mut config = config::load_config(&path)?;
    debug!("Loaded configuration from {}", path.display());
    config.apply_overrides(lookup);
    apply_flags(&mut config, args);
    config.validate()?;
    Ok(config)
}

pub fn load_settings(args: &ArgMatches) -> Result<Config> {
    load_settings_with(args, |key| std::env::var(key).ok())
}

fn flag<'a>(args: &'a ArgMatches, id: &str) -> Option<&'a String> {
    args.try_get_one::<String>(id).ok().flatten()
}

fn apply_flags(config: &mut Config, args: &ArgMatches) {
    if let Some(site) = flag(args, "site") {
        config.site.base_url = Some(site.clone());
    }
    if let Some(repo) = flag(args, "repo") {
        config.repository.url = Some(repo.clone());
    }
    if let Ok(Some(concurrency)) = args.try_get_one::<usize>("concurrency") {
        config.scan.concurrency = *concurrency;
    }
    if let Ok(Some(limit)) = args.try_get_one::<usize>("limit") {
        config.scan.suggestion_limit = *limit;
    }
    if let Ok(Some(min)) = args.try_get_one::<u8>("min-confidence") {
        config.remediation.min_confidence = *min;
    }
}

/// `--branch`, then the branch in a tree/blob link, then the configured
/// branch. `None` means the repository's default branch.
pub fn resolve_branch(
    cli: Option<&str>,
    locator: &RepoLocator,
    configured: Option<&str>,
) -> Option<String> {
    cli.or(locator.branch.as_deref())
        .or(configured)
        .map(str::to_string)
}

/// `--path`, then the path in a tree/blob link, then the configured path.
pub fn resolve_path(
    cli: Option<&str>,
    locator: &RepoLocator,
    configured: Option<&str>,
) -> Option<String> {
    cli.or(locator.path.as_deref())
        .or(configured)
        .map(|p| p.trim_matches('/').to_string())
        .filter(|p| !p.is_empty())
}

/// Explicit `--format`, else the `--output` extension, else text.
pub fn resolve_format(format: Option<&str>, output: Option<&Path>) -> ReportFormat {
    format
        .and_then(ReportFormat::from_str)
        .or_else(|| output.and_then(ReportFormat::from_path))
        .unwrap_or(ReportFormat::Text)
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn describe_verdict(verdict: &LinkVerdict) -> String {
    match verdict {
        LinkVerdict::Indexed => "valid (listed in sitemap)".to_string(),
        LinkVerdict::Reachable { status } => format!("valid (HTTP {})", status),
        LinkVerdict::Broken(reason) => format!("broken ({})", reason),
    }
}

pub fn describe_suggestion(suggestion: &Suggestion) -> String {
    let percent = suggestion.percent();
    format!(
        "{:>3}% {:<6} {}",
        percent,
        confidence_tier(percent).label(),
        suggestion.url
    )
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn spinner(quiet: bool, message: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Cancellation flag raised by Ctrl-C while a scan runs.
pub struct CtrlCGuard {
    flag: Arc<AtomicBool>,
    listener: JoinHandle<()>,
}

impl CtrlCGuard {
    pub fn install() -> Self {
        let flag = Arc::new(AtomicBool::new(false));
        let raised = flag.clone();
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!(
                    "\n{} Stopping after the current document...",
                    "⚠".yellow().bold()
                );
                raised.store(true, Ordering::SeqCst);
            }
        });
        Self { flag, listener }
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }

    /// Stop listening so Ctrl-C terminates the process again.
    pub fn disarm(self) -> JoinHandle<()> {
        self.listener.abort();
        self.listener
    }
}

async fn build_context(config: &Config, quiet: bool) -> Result<ScanContext> {
    let settings = config.scan_settings()?;
    let site = Arc::new(HttpSiteClient::new()?);

    let pb = spinner(quiet, &format!("Fetching sitemap from {}", settings.base_url));
    let context = ScanContext::prepare(site, &settings, &SitemapCache::new(), None).await?;
    pb.finish_and_clear();

    if !quiet {
        if context.index.is_empty() {
            println!(
                "{} Sitemap unavailable, every link will be probed live",
                "⚠".yellow().bold()
            );
        } else {
            println!(
                "{} {} pages indexed from {}",
                "✓".green().bold(),
                context.index.len(),
                settings.base_url
            );
        }
    }
    Ok(context)
}

struct Target {
    repository: GitHubRepository,
    path_filter: Option<String>,
}

async fn build_target(config: &Config, args: &ArgMatches, token: Option<String>) -> Result<Target> {
    let url = config.repository.url.as_deref().with_context(|| {
        format!(
            "no repository configured (use --repo, [repository] url or {})",
            config::ENV_REPO
        )
    })?;
    let locator = RepoLocator::parse(url)?;
    let branch = resolve_branch(
        flag(args, "branch").map(String::as_str),
        &locator,
        config.repository.branch.as_deref(),
    )
    .or_else(|| config.remediation.base_branch.clone());
    let path_filter = resolve_path(
        flag(args, "path").map(String::as_str),
        &locator,
        config.repository.path.as_deref(),
    );

    let repository = GitHubRepository::new(&locator, branch.clone().unwrap_or_default(), token)?
        .with_api_base(config.repository.api_base.clone())
        .with_extensions(config.repository.extensions.clone())
        .with_base_branch(config.remediation.base_branch.clone());
    let repository = match branch {
        Some(_) => repository,
        None => {
            let default = repository.default_branch().await.with_context(|| {
                format!("failed to look up the default branch of {}", locator.slug())
            })?;
            debug!("Using default branch {}", default);
            repository.with_branch(default)
        }
    };

    Ok(Target {
        repository,
        path_filter,
    })
}

async fn run_scan(config: &Config, target: &Target, quiet: bool) -> Result<ScanReport> {
    let context = build_context(config, quiet).await?;

    if !quiet {
        println!(
            "{} Scanning {}@{}{}",
            "→".blue(),
            target.repository.describe(),
            target.repository.branch(),
            target
                .path_filter
                .as_deref()
                .map(|p| format!(" ({})", p))
                .unwrap_or_default()
        );
    }

    let pb = progress_bar(quiet);
    let bar = pb.clone();
    let progress: ProgressCallback = Arc::new(move |update: ScanProgress| {
        match update.phase {
            ScanPhase::ListingDocuments => {
                bar.set_length(update.total as u64);
                bar.set_message(update.phase.label());
            }
            ScanPhase::ScanningDocuments => {
                bar.set_position(update.current as u64);
                bar.set_message(update.path.unwrap_or_default());
            }
            _ => {}
        }
    });

    let ctrl_c = CtrlCGuard::install();
    let options = ScanOptions {
        path_filter: target.path_filter.clone(),
        concurrency: config.scan.concurrency,
        progress: Some(progress),
        cancel: Some(ctrl_c.flag()),
    };
    let result = linkmend_core::scan(&target.repository, &context, options).await;
    ctrl_c.disarm();
    pb.finish_and_clear();
    Ok(result?)
}

/// One-line scan summary, or nothing when `quiet`.
pub fn summary_line(report: &ScanReport, quiet: bool) -> Option<String> {
    if quiet {
        return None;
    }
    let broken = report.broken_count();
    let status = if broken == 0 {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    Some(format!(
        "{} {} documents, {} links checked, {} broken ({} confirmed), {} with a suggestion",
        status,
        report.documents_scanned,
        report.links_checked,
        broken,
        report.confirmed_count(),
        report.suggested_count()
    ))
}

fn print_summary(report: &ScanReport, quiet: bool) {
    if let Some(line) = summary_line(report, quiet) {
        println!("{}", line);
    }
}

// Command handlers

pub async fn handle_scan(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = load_settings(args)?;
    let target = build_target(&config, args, config::github_token()).await?;
    let report = run_scan(&config, &target, quiet).await?;

    let output = args.get_one::<PathBuf>("output");
    let format = resolve_format(
        args.get_one::<String>("format").map(String::as_str),
        output.map(PathBuf::as_path),
    );
    let rendered = report::render(&report, format)?;

    match output {
        Some(path) => {
            report::save_report(&rendered, path)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            print_summary(&report, quiet);
            if !quiet {
                println!("{} Report saved to {}", "✓".green().bold(), path.display());
            }
        }
        None => {
            println!("{}", rendered);
        }
    }
    Ok(())
}

fn print_plan(plan: &RemediationPlan) {
    print_divider();
    println!("{}", "  PLANNED FIXES".bright_white().bold());
    print_divider();
    for entry in &plan.manifest {
        let tier = confidence_tier(entry.confidence);
        let confidence = format!("{:>3}%", entry.confidence);
        let confidence = match tier {
            report::ConfidenceTier::High => confidence.green(),
            report::ConfidenceTier::Medium => confidence.yellow(),
            report::ConfidenceTier::Low => confidence.red(),
        };
        println!("{} {}", confidence, entry.file_path.bold());
        println!("     {} {}", "-".red(), entry.broken_url);
        println!("     {} {}", "+".green(), entry.suggested_url);
    }
    println!();
    println!(
        "{} fixes across {} files",
        plan.manifest.len(),
        plan.patches.len()
    );
}

pub async fn handle_fix(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = load_settings(args)?;
    let dry_run = args.get_flag("dry-run");
    let token = config::github_token();
    if token.is_none() && !dry_run {
        bail!(
            "{} must be set to open a pull request (or use --dry-run)",
            config::ENV_TOKEN
        );
    }

    let target = build_target(&config, args, token).await?;
    let report = run_scan(&config, &target, quiet).await?;
    print_summary(&report, quiet);

    if report.records.is_empty() {
        println!("{} No broken links found", "✓".green().bold());
        return Ok(());
    }

    let plan = remediate::build_patches(
        &target.repository,
        &report.records,
        &config.remediation_options(),
    )
    .await?;

    let unfixable: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.suggested_url.is_none())
        .collect();
    for record in &unfixable {
        println!(
            "{} {}: no suggestion for {} ({})",
            "⚠".yellow().bold(),
            record.file_path,
            record.broken_url,
            record.reason
        );
    }

    if plan.is_empty() {
        println!("{} Nothing to fix", "→".blue());
        return Ok(());
    }

    print_plan(&plan);

    if dry_run {
        println!("{} Dry run, nothing was written", "→".blue());
        return Ok(());
    }

    if !args.get_flag("yes") {
        let answer = print_prompt("Open a draft pull request with these changes? [y/N]")?;
        if !is_affirmative(&answer) {
            println!("{} Cancelled", "✗".red().bold());
            return Ok(());
        }
    }

    let branch_name = flag(args, "branch-name")
        .cloned()
        .unwrap_or_else(|| remediate::default_branch_name(chrono::Utc::now()));
    let text = remediate::describe(&plan);

    let pb = spinner(quiet, &format!("Opening pull request from {}", branch_name));
    let result = remediate::submit(&target.repository, &plan, &text, &branch_name).await;
    pb.finish_and_clear();
    let url = result?;

    println!("{} Draft pull request opened: {}", "✓".green().bold(), url.bold());
    Ok(())
}

pub async fn handle_check(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = load_settings(args)?;
    let url = args
        .get_one::<String>("URL")
        .context("a URL is required")?;
    let context = build_context(&config, quiet).await?;

    let verdict = context.inspect_link(url).await;
    let mark = if verdict.is_valid() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{} {} {}", mark, url, describe_verdict(&verdict));

    if let LinkVerdict::Broken(reason) = &verdict {
        if matches!(reason, BreakReason::Timeout | BreakReason::Network(_)) {
            println!("  {}", "the server did not confirm the page is gone".dimmed());
        }
        if let Some(best) = context.engine.suggest_best(url, &context.index) {
            println!("  suggestion: {}", describe_suggestion(&best));
        }
    }
    Ok(())
}

pub async fn handle_suggest(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = load_settings(args)?;
    let url = args
        .get_one::<String>("URL")
        .context("a URL is required")?;
    let context = build_context(&config, quiet).await?;

    let suggestions = context.suggestions(url);
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    if suggestions.is_empty() {
        println!("{} No suggestions for {}", "→".blue(), url);
        return Ok(());
    }
    for suggestion in &suggestions {
        println!("{}", describe_suggestion(suggestion));
    }
    Ok(())
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<String>("PATH")
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .unwrap_or_else(config::default_config_path);
    let force = args.get_flag("force");

    print_divider();
    println!("{}", "  LINKMEND INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    if path.exists() && force {
        println!("{} Overwriting {}", "→".yellow().bold(), path.display());
    }
    config::write_default_config(&path, force)?;

    println!("{} Configuration written to {}", "✓".green().bold(), path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set {} and {} in the file", "[site] base_url".cyan(), "[repository] url".cyan());
    println!("  2. Export {} to open pull requests", config::ENV_TOKEN.cyan());
    println!("  3. Run {}", "linkmend scan".cyan());
    Ok(())
}
