mod server;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pbix_audit_core::config::Config;
use pbix_audit_core::report::{AnalysisReport, AnalysisResult};
use pbix_audit_core::types::Grade;
use pbix_audit_core::{analyze_package, AnalyzeOptions};

#[derive(Parser, Debug)]
#[command(
    name = "pbix-audit",
    version,
    about = "Structure and size audit for Power BI report packages"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one package and write the report to disk.
    #[command(alias = "analyse")]
    Analyze {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "pbix-audit-out")]
        out: PathBuf,

        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Exit with status 2 when the performance grade is worse than this.
        #[arg(long)]
        min_grade: Option<Grade>,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the upload-and-poll HTTP service.
    Serve {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overrides `[server] bind` from the config file.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
    All,
}

struct Style {
    bold: &'static str,
    dim: &'static str,
    red: &'static str,
    green: &'static str,
    yellow: &'static str,
    orange: &'static str,
    reset: &'static str,
}

const COLOR: Style = Style {
    bold: "\x1b[1m",
    dim: "\x1b[2m",
    red: "\x1b[31m",
    green: "\x1b[32m",
    yellow: "\x1b[33m",
    orange: "\x1b[38;5;208m",
    reset: "\x1b[0m",
};

const PLAIN: Style = Style {
    bold: "",
    dim: "",
    red: "",
    green: "",
    yellow: "",
    orange: "",
    reset: "",
};

fn style() -> &'static Style {
    if std::env::var_os("NO_COLOR").is_some() {
        &PLAIN
    } else {
        &COLOR
    }
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let res = match cli.cmd {
        Commands::Analyze {
            input,
            out,
            output_format,
            min_grade,
            config,
        } => {
            init_tracing("warn");
            let cfg = load_config(config.as_deref());
            run_analyze(&input, &out, &output_format, min_grade, &cfg)
        }
        Commands::Serve { config, bind } => {
            init_tracing("info");
            run_serve(config.as_deref(), bind)
        }
    };

    match res {
        Ok(code) => code,
        Err(e) => {
            let s = style();
            eprintln!(
                "{}{red}error:{reset} {:#}",
                s.bold,
                e,
                red = s.red,
                reset = s.reset
            );
            std::process::ExitCode::from(1)
        }
    }
}

fn print_banner() {
    let s = style();
    eprintln!(
        "\n  {bold}pbix{reset}{orange}|{reset}{dim}audit{reset}  {dim}report package audit{reset}\n",
        bold = s.bold,
        orange = s.orange,
        dim = s.dim,
        reset = s.reset,
    );
}

fn grade_color(grade: Grade) -> &'static str {
    let s = style();
    match grade {
        Grade::A => s.green,
        Grade::B | Grade::C => s.yellow,
        Grade::D => s.red,
    }
}

fn print_report(report: &AnalysisReport, written: &[PathBuf]) {
    let s = style();
    let perf = &report.performance;

    eprintln!(
        "  {dim}grade           {reset}{gc}{bold}{}{reset} {dim}(score {}){reset}",
        perf.performance_grade,
        perf.size_score,
        gc = grade_color(perf.performance_grade),
        dim = s.dim,
        bold = s.bold,
        reset = s.reset
    );
    eprintln!(
        "  {dim}size_mb         {reset}{bold}{:.2}{reset}",
        perf.file_size_mb,
        dim = s.dim,
        bold = s.bold,
        reset = s.reset
    );
    eprintln!(
        "  {dim}est. load time  {reset}{bold}{:.1}s{reset}",
        perf.estimated_load_time,
        dim = s.dim,
        bold = s.bold,
        reset = s.reset
    );

    if report.structure.has_layout {
        eprintln!(
            "  {dim}pages           {reset}{bold}{}{reset}",
            report.structure.page_count,
            dim = s.dim,
            bold = s.bold,
            reset = s.reset
        );
        eprintln!(
            "  {dim}visuals         {reset}{bold}{}{reset} {dim}({} types){reset}",
            report.structure.visual_count,
            report.structure.visual_types.len(),
            dim = s.dim,
            bold = s.bold,
            reset = s.reset
        );
    } else {
        eprintln!(
            "  {dim}layout          {reset}{yellow}not found{reset}",
            dim = s.dim,
            yellow = s.yellow,
            reset = s.reset
        );
    }

    if let Some(err) = &report.structure.error {
        eprintln!(
            "  {yellow}warning:{reset} {}",
            err,
            yellow = s.yellow,
            reset = s.reset
        );
    }

    eprintln!();
    for r in &report.recommendations {
        eprintln!("  {orange}\u{2022}{reset} {}", r, orange = s.orange, reset = s.reset);
    }

    eprintln!();
    for path in written {
        eprintln!(
            "  {dim}\u{2192} {}{reset}",
            path.display(),
            dim = s.dim,
            reset = s.reset
        );
    }
    eprintln!();
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(p) => Config::load(p).unwrap_or_else(|e| {
            eprintln!(
                "{}{}warning:{} failed to load config {}: {:#}",
                style().bold,
                style().yellow,
                style().reset,
                p.display(),
                e
            );
            Config::default()
        }),
        None => Config::discover().unwrap_or_default(),
    }
}

fn run_analyze(
    input: &Path,
    out: &Path,
    output_format: &OutputFormat,
    min_grade: Option<Grade>,
    cfg: &Config,
) -> anyhow::Result<std::process::ExitCode> {
    let s = style();

    print_banner();

    if let Some(scratch) = &cfg.scratch_dir {
        std::fs::create_dir_all(scratch)
            .with_context(|| format!("create scratch dir {}", scratch.display()))?;
    }

    let opts = AnalyzeOptions {
        scratch_root: cfg.scratch_dir.clone(),
    };
    let result = analyze_package(input, &opts);

    std::fs::create_dir_all(out).with_context(|| format!("create out dir {}", out.display()))?;

    let write_json = matches!(output_format, OutputFormat::Json | OutputFormat::All);
    let write_md = matches!(output_format, OutputFormat::Markdown | OutputFormat::All);
    let mut written = Vec::new();

    if write_json {
        let json_path = out.join("report.json");
        let json = serde_json::to_vec_pretty(&result).context("serialize report json")?;
        std::fs::write(&json_path, json)
            .with_context(|| format!("write {}", json_path.display()))?;
        written.push(json_path);
    }

    let report = match &result {
        AnalysisResult::Success(report) => report,
        AnalysisResult::Failure { error } => {
            anyhow::bail!("analysis of {} failed: {}", input.display(), error)
        }
    };

    if write_md {
        let md_path = out.join("report.md");
        std::fs::write(&md_path, report.to_markdown())
            .with_context(|| format!("write {}", md_path.display()))?;
        written.push(md_path);
    }

    // Machine-parseable line on stdout
    println!(
        "grade={} size_mb={:.2} pages={} visuals={}",
        report.performance.performance_grade,
        report.performance.file_size_mb,
        report.structure.page_count,
        report.structure.visual_count
    );

    // Human-readable output on stderr
    print_report(report, &written);

    let grade = report.performance.performance_grade;
    let exit = match min_grade {
        Some(min) if grade > min => {
            eprintln!(
                "  {red}{bold}GRADE BELOW MINIMUM{reset}  {dim}({} worse than {}){reset}",
                grade,
                min,
                red = s.red,
                bold = s.bold,
                dim = s.dim,
                reset = s.reset,
            );
            std::process::ExitCode::from(2)
        }
        _ => {
            eprintln!(
                "  {green}{bold}PASS{reset}",
                green = s.green,
                bold = s.bold,
                reset = s.reset
            );
            std::process::ExitCode::from(0)
        }
    };

    eprintln!();

    Ok(exit)
}

fn run_serve(config: Option<&Path>, bind: Option<String>) -> anyhow::Result<std::process::ExitCode> {
    let mut cfg = match config {
        Some(p) => Config::load(p)?,
        None => Config::discover().unwrap_or_default(),
    };
    if let Some(port) = port_from_env()? {
        cfg.apply_port(port);
    }
    if let Some(bind) = bind {
        cfg.server.bind = bind;
    }

    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    runtime.block_on(server::run_server(cfg))?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn port_from_env() -> anyhow::Result<Option<u16>> {
    match std::env::var("PORT") {
        Ok(raw) => raw
            .trim()
            .parse::<u16>()
            .map(Some)
            .with_context(|| format!("invalid PORT {raw:?}")),
        Err(_) => Ok(None),
    }
}
