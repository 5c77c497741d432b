use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reminder_stack_core::assets::{fingerprint_directory, require_site_files};
use reminder_stack_core::config::StackConfig;
use reminder_stack_core::stack::StackDefinition;
use reminder_stack_core::template::{render_pretty, synthesize};
use reminder_stack_core::workflow::WorkflowTemplate;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "reminder_stack_lambda";
const DIST_DIR: &str = "dist";
const SITE_STAGING_DIR: &str = "static_website";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the reminder stack workspace",
    long_about = "Synthesizes the CloudFormation template, packages the Lambda\n\
                  artifacts and the static site, and runs CI checks for the\n\
                  reminder stack."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the CloudFormation template
    Synth {
        /// Stack configuration (TOML); defaults apply when omitted
        #[arg(long, env = "REMINDER_STACK_CONFIG")]
        config: Option<PathBuf>,
        /// Workflow definition template; the bundled one is used when omitted
        #[arg(long)]
        template: Option<PathBuf>,
        /// Output file path
        #[arg(long, default_value = "dist/template.json")]
        output: PathBuf,
    },
    /// Build and zip every Lambda binary as `bootstrap`
    LambdaPackage {
        /// Stack configuration used for artifact names
        #[arg(long, env = "REMINDER_STACK_CONFIG")]
        config: Option<PathBuf>,
        /// Compilation target triple for Lambda binaries
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for binaries
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Stage the static site for upload under the publisher's source prefix
    SitePackage {
        /// Stack configuration naming the site directory and asset bucket
        #[arg(long, env = "REMINDER_STACK_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Check plus template synthesis and site staging
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn load_config(path: Option<&Path>) -> Result<StackConfig> {
    match path {
        Some(path) => StackConfig::load(path)
            .with_context(|| format!("failed to load stack config '{}'", path.display())),
        None => {
            let config = StackConfig::default();
            config.validate().context("default stack config is invalid")?;
            Ok(config)
        }
    }
}

// ── synth ──────────────────────────────────────────────────────────

fn synth(config: Option<&Path>, template: Option<&Path>, output: &Path) -> Result<()> {
    let config = load_config(config)?;

    step("Load workflow template");
    let workflow = match template {
        Some(path) => WorkflowTemplate::load(path)
            .with_context(|| format!("failed to load workflow template '{}'", path.display()))?,
        None => WorkflowTemplate::bundled().context("bundled workflow template is invalid")?,
    };

    step("Fingerprint static site");
    require_site_files(&config.static_site_dir).with_context(|| {
        format!(
            "static site '{}' cannot be published",
            config.static_site_dir.display()
        )
    })?;
    let site_fingerprint = fingerprint_directory(&config.static_site_dir).with_context(|| {
        format!(
            "failed to fingerprint static site '{}'",
            config.static_site_dir.display()
        )
    })?;
    eprintln!("site fingerprint: {site_fingerprint}");

    step("Define stack");
    let stack = StackDefinition::define(&config, &workflow, &site_fingerprint)
        .context("stack definition failed")?;
    let order = stack.graph().creation_order()?;
    eprintln!("creation order: {}", order.join(" -> "));

    step("Write template");
    let rendered = render_pretty(&synthesize(&stack))?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    fs::write(output, rendered)
        .with_context(|| format!("failed to write '{}'", output.display()))?;

    eprintln!(
        "\nSynthesized {} resources into {}",
        stack.descriptors.len(),
        output.display()
    );
    Ok(())
}

// ── lambda packaging ───────────────────────────────────────────────

/// Binary name in `reminder_stack_lambda` paired with the deployed function
/// name that names its artifact.
fn lambda_artifacts(config: &StackConfig) -> [(&'static str, &str); 6] {
    let functions = &config.functions;
    [
        ("api_handler", functions.api_handler.as_str()),
        ("sms_reminder", functions.sms_reminder.as_str()),
        ("email_reminder", functions.email_reminder.as_str()),
        ("endpoint_writer", functions.endpoint_writer.as_str()),
        ("writer_trigger", functions.writer_trigger.as_str()),
        ("content_publisher", functions.content_publisher.as_str()),
    ]
}

fn package_lambdas(config: Option<&Path>, target: &str, profile: BuildProfile) -> Result<()> {
    let config = load_config(config)?;
    ensure_rust_target_installed(target)?;

    step("Build lambda binaries");
    let artifacts = lambda_artifacts(&config);
    let mut cargo_args = vec!["build", "-p", LAMBDA_PACKAGE, "--target", target];
    for (bin_name, _) in artifacts {
        cargo_args.push("--bin");
        cargo_args.push(bin_name);
    }
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifacts");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    let dist_dir = Path::new(DIST_DIR);
    fs::create_dir_all(dist_dir).context("failed to create lambda dist directory")?;

    let mut packaged = Vec::new();
    for (bin_name, function_name) in artifacts {
        let zip_path = dist_dir.join(format!("{function_name}.zip"));
        package_lambda_zip(&target_dir.join(bin_name), &zip_path)?;
        packaged.push(zip_path);
    }

    eprintln!("\nPackaged artifacts:");
    for path in &packaged {
        eprintln!("- {}", path.display());
    }
    eprintln!(
        "Upload them to s3://{}/{}/ before deploying.",
        config.asset_bucket,
        config.asset_prefix.trim_matches('/')
    );
    Ok(())
}

// ── static site ────────────────────────────────────────────────────

/// Mirrors the site into `dist/static_website/`, keyed the way the content
/// publisher expects to find it under the asset bucket's site prefix.
fn package_site(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;

    step("Collect static site");
    let files = require_site_files(&config.static_site_dir).with_context(|| {
        format!(
            "static site '{}' cannot be published",
            config.static_site_dir.display()
        )
    })?;

    step("Stage static site");
    let staging = Path::new(DIST_DIR).join(SITE_STAGING_DIR);
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("failed to clear '{}'", staging.display()))?;
    }
    for file in &files {
        let target = staging.join(&file.key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        fs::copy(&file.path, &target).with_context(|| {
            format!(
                "failed to copy '{}' to '{}'",
                file.path.display(),
                target.display()
            )
        })?;
        eprintln!("- {}", file.key);
    }

    eprintln!("\nStaged {} site files. Upload them before deploying:", files.len());
    eprintln!(
        "  aws s3 sync --delete {} s3://{}/{}",
        staging.display(),
        config.asset_bucket,
        config.site_source_prefix()
    );
    Ok(())
}

fn ensure_rust_target_installed(target: &str) -> Result<()> {
    let output = match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return Ok(());
        }
    };

    if !output.status.success() {
        bail!(
            "failed to list installed rust targets: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        bail!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- lambda-package`"
        );
    }
    Ok(())
}

fn package_lambda_zip(binary_path: &Path, zip_path: &Path) -> Result<()> {
    let binary = fs::read(binary_path)
        .with_context(|| format!("expected lambda binary at '{}'", binary_path.display()))?;
    let file = fs::File::create(zip_path)
        .with_context(|| format!("failed to create '{}'", zip_path.display()))?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .context("failed to start bootstrap entry in lambda zip")?;
    zip.write_all(&binary)
        .context("failed to write bootstrap entry")?;
    zip.finish().context("failed to finish lambda zip")?;
    Ok(())
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test reminder_stack_core");
    run_cargo(&["test", "-p", "reminder_stack_core"]);

    step("Test reminder_stack_lambda");
    run_cargo(&["test", "-p", LAMBDA_PACKAGE]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth {
            config,
            template,
            output,
        } => synth(config.as_deref(), template.as_deref(), &output)?,
        Commands::LambdaPackage {
            config,
            target,
            profile,
        } => package_lambdas(config.as_deref(), &target, profile)?,
        Commands::SitePackage { config } => package_site(config.as_deref())?,
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::All => {
                    ci_check();
                    synth(None, None, &Path::new(DIST_DIR).join("template.json"))?;
                    package_site(None)?;
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
    Ok(())
}
