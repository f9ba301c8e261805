//! Command-line interface for securegen.

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::analysis::AnalysisReport;
use crate::collab::{Generator, HttpGenerator, ReplayGenerator};
use crate::config::{self, Config};
use crate::detect::{language_for_path, LanguageSet};
use crate::pipeline::Pipeline;
use crate::report::{self, OutputFormat};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directories never descended into when scanning a project.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "target", "__pycache__"];

/// Secure code generation gate.
///
/// Securegen sends a prompt to a code generation service, writes the
/// generated files to a temporary project, detects their languages and runs
/// a static security analysis with rule packs chosen for those languages.
#[derive(Parser)]
#[command(name = "securegen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate code for a prompt and analyze it
    #[command(visible_alias = "generate")]
    Run(RunArgs),
    /// Analyze a generated blob file or an existing project directory
    Scan(ScanArgs),
    /// Show the rule packs selected for a set of languages
    Packs(PacksArgs),
    /// Create a securegen configuration file from a template
    Init(InitArgs),
}

/// Arguments for the run command.
#[derive(Parser)]
pub struct RunArgs {
    /// Prompt text
    #[arg(short, long, conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Replay a recorded generator output instead of calling the endpoint
    #[arg(long)]
    pub blob: Option<PathBuf>,

    /// Generation service URL (overrides generation.endpoint)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Blob file or project directory to analyze
    pub path: PathBuf,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the packs command.
#[derive(Parser)]
pub struct PacksArgs {
    /// Language names or aliases (e.g. java, ts, py)
    #[arg(required = true)]
    pub languages: Vec<String>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "securegen.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available configuration templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "Built-in defaults with every option documented",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "local",
        description: "Local generation service with framework rule packs",
        content: include_str!("templates/local.yaml"),
    },
];

/// Map an analysis report onto a process exit code.
pub fn exit_code_for(report: &AnalysisReport) -> i32 {
    if !report.ok {
        EXIT_ERROR
    } else if report.has_findings() {
        EXIT_FAILED
    } else {
        EXIT_SUCCESS
    }
}

/// Load and validate the configuration.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir()?;
    let (config, path) = Config::load(explicit, &cwd)?;
    match &path {
        Some(p) => info!(path = %p.display(), "loaded configuration"),
        None => debug!("no configuration file found, using defaults"),
    }
    config::validate(&config)?;
    Ok(config)
}

/// Collect the files of a project directory as sorted relative paths.
pub fn collect_files(root: &Path) -> anyhow::Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        if language_for_path(&rel).is_some() {
            files.push(rel);
        }
    }

    files.sort();
    Ok(files)
}

/// Resolve until Ctrl-C is received.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; never cancel.
        futures::future::pending::<()>().await;
    }
}

fn parse_format(format: &str) -> Option<OutputFormat> {
    match format.parse() {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn write_report(format: OutputFormat, target: &str, report: &AnalysisReport) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => report::write_json(report),
        OutputFormat::Sarif => report::write_sarif(report),
        OutputFormat::Pretty => {
            report::write_pretty_report(target, report);
            Ok(())
        }
    }
}

/// Run the generate-and-analyze command.
pub async fn run_generate(args: &RunArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };
    let config = load_config(config_path)?;

    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(p), _) => p.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) if args.blob.is_some() => String::new(),
        (None, None) => {
            eprintln!("Error: one of --prompt or --prompt-file is required");
            return Ok(EXIT_ERROR);
        }
    };

    let generator: Arc<dyn Generator> = match &args.blob {
        Some(path) => Arc::new(ReplayGenerator::from_text(&std::fs::read_to_string(path)?)),
        None => {
            let endpoint = args
                .endpoint
                .clone()
                .or_else(|| config.generation.endpoint.clone());
            let Some(endpoint) = endpoint else {
                eprintln!("Error: no generation endpoint configured");
                eprintln!("Set generation.endpoint in securegen.yaml, pass --endpoint, or use --blob");
                return Ok(EXIT_ERROR);
            };
            let connect_timeout = Duration::from_secs(config.generation.connect_timeout_secs);
            Arc::new(HttpGenerator::new(&endpoint, connect_timeout)?)
        }
    };

    let pipeline = Pipeline::from_config(&config, generator);
    let response = match pipeline.run_until(&prompt, interrupted()).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    match format {
        OutputFormat::Json => report::write_json(&response)?,
        OutputFormat::Sarif => report::write_sarif(&response.report.semgrep)?,
        OutputFormat::Pretty => report::write_pretty_response(&response),
    }

    Ok(exit_code_for(&response.report.semgrep))
}

/// Run the scan command.
pub async fn run_scan(args: &ScanArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };
    let config = load_config(config_path)?;

    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let pipeline = Pipeline::from_config(&config, Arc::new(ReplayGenerator::default()));
    let target = args.path.to_string_lossy().to_string();

    let report = if abs_path.is_dir() {
        let files = collect_files(&abs_path)?;
        if files.is_empty() {
            eprintln!("Warning: no files to scan");
            return Ok(EXIT_SUCCESS);
        }
        pipeline.analyze_directory(&abs_path, &files).await
    } else {
        let blob = std::fs::read_to_string(&abs_path)?;
        match pipeline.analyze_blob(&blob).await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    };

    write_report(format, &target, &report)?;
    Ok(exit_code_for(&report))
}

/// Run the packs command.
pub fn run_packs(args: &PacksArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let config = load_config(config_path)?;
    let languages: LanguageSet = args.languages.iter().collect();
    let packs = config.pack_selector().select(&languages);

    println!("Languages: {}", languages.to_vec().join(", "));
    println!();
    for pack in packs.iter() {
        println!("  {}", pack);
    }
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        return list_templates();
    }

    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'securegen init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, template.content) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Set generation.endpoint in {}", args.output.display());
    println!(
        "  2. Run: securegen run --config {} --prompt \"...\"",
        args.output.display()
    );

    Ok(EXIT_SUCCESS)
}

fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "default" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  securegen init --template <name>");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_templates_are_valid_configs() {
        for template in TEMPLATES {
            let config = Config::parse_str(template.content)
                .unwrap_or_else(|e| panic!("template {} does not parse: {}", template.name, e));
            config::validate(&config)
                .unwrap_or_else(|e| panic!("template {} is invalid: {}", template.name, e));
        }
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let config = Config::parse_str(TEMPLATES[0].content).unwrap();
        let defaults = Config::default();
        assert_eq!(config.analysis.binary, defaults.analysis.binary);
        assert_eq!(config.analysis.rule_timeout_secs, defaults.analysis.rule_timeout_secs);
        assert_eq!(config.analysis.scan_timeout_secs, defaults.analysis.scan_timeout_secs);
        assert_eq!(config.prompt.max_chars, defaults.prompt.max_chars);
        assert!(config.generation.endpoint.is_none());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("conf/securegen.yaml");
        let args = InitArgs {
            output: output.clone(),
            template: "local".to_string(),
            list: false,
        };

        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert!(fs::read_to_string(&output).unwrap().contains("127.0.0.1"));
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_init_unknown_template() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs {
            output: dir.path().join("securegen.yaml"),
            template: "enterprise".to_string(),
            list: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
        assert!(!args.output.exists());
    }

    #[test]
    fn test_collect_files_skips_hidden_and_vendor() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for rel in [
            "src/app.py",
            "src/util/helpers.ts",
            "config/settings.yaml",
            "README",
            ".git/config.py",
            "node_modules/lib/index.js",
            "vendor/dep/dep.go",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }

        let files = collect_files(root).unwrap();
        assert_eq!(
            files,
            vec!["config/settings.yaml", "src/app.py", "src/util/helpers.ts"]
        );
    }

    #[test]
    fn test_exit_codes() {
        let mut report = AnalysisReport {
            ok: true,
            ..Default::default()
        };
        assert_eq!(exit_code_for(&report), EXIT_SUCCESS);

        report.findings.push(crate::analysis::Finding {
            check_id: "r".to_string(),
            severity: "ERROR".to_string(),
            message: String::new(),
            metadata: Default::default(),
            path: "a.py".to_string(),
            start: Default::default(),
            end: Default::default(),
        });
        assert_eq!(exit_code_for(&report), EXIT_FAILED);

        report.ok = false;
        assert_eq!(exit_code_for(&report), EXIT_ERROR);
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "securegen", "-vv", "--log-json", "scan", "project", "--format", "sarif",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.path, PathBuf::from("project"));
                assert_eq!(args.format, "sarif");
            }
            _ => panic!("expected scan"),
        }

        assert!(Cli::try_parse_from(["securegen", "run", "-p", "x", "--prompt-file", "f"]).is_err());
        assert!(Cli::try_parse_from(["securegen", "packs"]).is_err());
    }
}
