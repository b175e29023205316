use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use verisight::analyzer::collect_files;
use verisight::analyzer::regions::FaceDetection;
use verisight::report::{self, html::CertificateRecord, Summary};
use verisight::serve::{self, AppState};
use verisight::{
    logging, Analyzer, AuthenticityLabel, CheckStatus, Database, EngineConfig, FileAnalysis,
    Modality,
};

#[derive(Parser, Debug)]
#[command(name = "verisight")]
#[command(author, version, about = "Rule-based checks that tell organic media from synthetic")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// File or directory to analyze (optional in GUI mode)
    path: Option<PathBuf>,

    /// Launch GUI file picker (auto-enabled when double-clicked)
    #[arg(long)]
    gui: bool,

    /// Output report file (.html, .csv, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "verisight-reports")]
    report_dir: PathBuf,

    /// Don't auto-generate CSV report
    #[arg(long)]
    no_report: bool,

    /// Don't prompt to open report
    #[arg(long)]
    no_open: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// JSON file overriding detection thresholds
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SeetaFace model enabling hair/face/clothing region texture (feature `faces`)
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Store every result in the history database
    #[arg(long)]
    store: bool,

    /// History database path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Show every check and debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start local web UI for uploads and history
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// History database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// JSON file overriding detection thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SeetaFace model enabling region texture (feature `faces`)
        #[arg(long)]
        face_model: Option<PathBuf>,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Stored analysis results
    History {
        /// History database path
        #[arg(long)]
        db: Option<PathBuf>,

        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List stored results, newest first
    List {
        /// Number of results to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show one result with all checks
    Show {
        id: i32,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one result
    Delete { id: i32 },

    /// Render the HTML certificate for a result
    Certificate {
        id: i32,

        /// Output path (default: certificate_<id>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Label counts and average trust score
    Summary,

    /// Delete every stored result
    Clear,
}

fn main() {
    let args = Args::parse();

    // The server reports requests at info level
    let serving = matches!(args.command, Some(Command::Serve { .. }));
    if serving && !args.verbose {
        logging::init_with_filter("warn,verisight=info");
    } else {
        logging::init(args.verbose);
    }

    // Handle subcommands first
    if let Some(cmd) = args.command {
        match cmd {
            Command::Serve { port, db, config, face_model, no_open } => {
                let state = AppState {
                    analyzer: build_analyzer(config.as_deref(), face_model.as_deref()),
                    db: open_db(db.as_deref()),
                };
                if let Err(e) = serve::start(port, state, !no_open) {
                    eprintln!("Server error: {}", e);
                    std::process::exit(1);
                }
                return;
            }
            Command::History { db, action } => {
                handle_history_action(&open_db(db.as_deref()), action);
                return;
            }
        }
    }

    // Determine if we should use GUI mode
    // With GUI feature: launch GUI if --gui flag OR no path provided
    // This makes double-click behavior "just work"
    #[cfg(feature = "gui")]
    let use_gui = args.gui || args.path.is_none();

    #[cfg(not(feature = "gui"))]
    let use_gui = false;

    let picked = if use_gui { pick_path() } else { args.path.clone() };
    let path = match picked {
        Some(p) => p,
        None if use_gui => {
            eprintln!("No file or folder selected.");
            std::process::exit(0);
        }
        None => {
            eprintln!("Usage: verisight <PATH>");
            eprintln!("Run 'verisight --help' for more options.");
            std::process::exit(1);
        }
    };

    // Set up thread pool
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let files = collect_files(&path);
    if files.is_empty() {
        let supported: Vec<&str> = Modality::supported_extensions().collect();
        eprintln!("No media files found (supported: {})", supported.join(", "));
        std::process::exit(1);
    }

    if !args.quiet {
        eprintln!("\x1b[1mVerisight - Media Authenticity Checks\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} file(s)\n", files.len());
    }

    // Set up progress bar
    let pb = if !args.quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let analyzer = build_analyzer(args.config.as_deref(), args.face_model.as_deref());

    // Analyze files in parallel
    let results: Vec<FileAnalysis> = files
        .par_iter()
        .map(|path| {
            let result = analyzer.analyze_path(path);
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(result.file_name.clone());
            }
            result
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    // Print results
    if !args.quiet {
        for r in &results {
            print_result_line(r);
            if args.verbose {
                for c in &r.result.checks {
                    let mark = match c.status {
                        CheckStatus::Pass => "\x1b[32mPASS\x1b[0m",
                        CheckStatus::Fail => "\x1b[31mFAIL\x1b[0m",
                    };
                    eprintln!("    {} {:<28} {}", mark, c.name, c.details);
                }
                if r.result.checks.is_empty() {
                    eprintln!("    {}", r.result.reasoning);
                }
            }
        }
    }

    let summary = Summary::from_results(&results);
    if !args.quiet {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  \x1b[32m✓ Organic:\x1b[0m      {}", summary.organic);
        eprintln!("  \x1b[33m? Inconclusive:\x1b[0m {}", summary.inconclusive);
        eprintln!("  \x1b[31m✗ Synthetic:\x1b[0m    {}", summary.synthetic);
        if summary.error > 0 {
            eprintln!("  \x1b[90mErrors:\x1b[0m         {}", summary.error);
        }
    }

    if args.store {
        let db = open_db(args.db.as_deref());
        let mut stored = 0;
        for r in &results {
            match db.insert_result(r) {
                Ok(_) => stored += 1,
                Err(e) => eprintln!("Failed to store {}: {}", r.file_name, e),
            }
        }
        if !args.quiet {
            eprintln!("\nStored {} result(s)", stored);
        }
    }

    // Determine report path
    let report_path = if let Some(ref output) = args.output {
        Some(output.clone())
    } else if !args.no_report {
        // Auto-generate report
        std::fs::create_dir_all(&args.report_dir).ok();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("verisight_report_{}.csv", timestamp);
        Some(args.report_dir.join(filename))
    } else {
        None
    };

    // Generate report
    if let Some(ref output_path) = report_path {
        if let Err(e) = report::generate(output_path, &results) {
            eprintln!("Failed to write report: {}", e);
            std::process::exit(1);
        }
        if !args.quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }

        if !args.no_open {
            if use_gui {
                // In GUI mode, auto-open the report (no prompt)
                let _ = open::that(output_path);
            } else if !args.quiet {
                prompt_open(output_path);
            }
        }
    }

    if !args.quiet {
        eprintln!("\n\x1b[90mAnalysis complete.\x1b[0m");
    }

    std::process::exit(exit_code(&summary));
}

/// 2 if anything looks synthetic, 1 if anything is inconclusive
fn exit_code(summary: &Summary) -> i32 {
    if summary.synthetic > 0 {
        2
    } else if summary.inconclusive > 0 {
        1
    } else {
        0
    }
}

fn build_analyzer(config: Option<&Path>, face_model: Option<&Path>) -> Analyzer {
    let config = match config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    let analyzer = Analyzer::new().with_config(config);

    match face_model {
        Some(path) => match FaceDetection::from_model_file(path) {
            Ok(faces) => analyzer.with_face_detection(faces),
            Err(e) => {
                eprintln!("Failed to load face model {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => analyzer,
    }
}

fn open_db(path: Option<&Path>) -> Database {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Database::db_path);
    match Database::open_at(&path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn label_color(label: AuthenticityLabel) -> &'static str {
    match label {
        AuthenticityLabel::LikelyOrganic => "\x1b[32m",   // Green
        AuthenticityLabel::Inconclusive => "\x1b[33m",    // Yellow
        AuthenticityLabel::LikelySynthetic => "\x1b[31m", // Red
        AuthenticityLabel::Error => "\x1b[90m",           // Gray
    }
}

fn print_result_line(r: &FileAnalysis) {
    let failed: Vec<&str> = r.result.failed_checks().map(|c| c.name.as_str()).collect();
    let failed_str = if failed.is_empty() {
        "-".to_string()
    } else {
        failed.join(",")
    };

    println!(
        "{}{:<18}{} {:>3}%  {:<5}  {:<40}  {}",
        label_color(r.result.authenticity_label),
        format!("[{}]", r.result.authenticity_label),
        "\x1b[0m",
        r.result.authenticity_score,
        r.modality.map(|m| m.as_str()).unwrap_or("?"),
        truncate(&failed_str, 40),
        &r.file_name
    );
}

fn prompt_open(path: &Path) {
    eprint!("\nOpen report? [Y/n] ");
    io::stderr().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        if input.is_empty() || input == "y" || input == "yes" {
            if let Err(e) = open::that(path) {
                eprintln!("Failed to open report: {}", e);
            }
        }
    }
}

#[cfg(feature = "gui")]
fn pick_path() -> Option<PathBuf> {
    // First try folder picker
    if let Some(folder) = rfd::FileDialog::new()
        .set_title("Select folder to analyze (or Cancel for single file)")
        .pick_folder()
    {
        return Some(folder);
    }

    // If cancelled, offer file picker
    let extensions: Vec<&str> = Modality::supported_extensions().collect();
    rfd::FileDialog::new()
        .set_title("Select image, audio or text file to analyze")
        .add_filter("Media files", &extensions)
        .pick_file()
}

#[cfg(not(feature = "gui"))]
fn pick_path() -> Option<PathBuf> {
    None
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn handle_history_action(db: &Database, action: HistoryAction) {
    match action {
        HistoryAction::List { limit } => match db.list_results(Some(limit)) {
            Ok(records) => {
                if records.is_empty() {
                    println!("No stored results.");
                } else {
                    println!(
                        "{:<5} {:<18} {:>5}  {:<6} {:<25} {}",
                        "ID", "VERDICT", "TRUST", "TYPE", "ANALYZED", "FILE"
                    );
                    println!("{}", "-".repeat(90));
                    for r in records {
                        println!(
                            "{:<5} {:<18} {:>5}  {:<6} {:<25} {}",
                            r.id,
                            r.authenticity_label,
                            r.authenticity_score,
                            r.file_type,
                            truncate(&r.analyzed_at, 25),
                            r.file_name
                        );
                    }
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        },

        HistoryAction::Show { id, json } => match db.get_result(id) {
            Ok(Some(stored)) => match stored.to_result() {
                Ok(result) if json => match serde_json::to_string_pretty(&result) {
                    Ok(out) => println!("{}", out),
                    Err(e) => eprintln!("Error serializing result: {}", e),
                },
                Ok(result) => {
                    println!("#{} {} ({})", stored.id, stored.file_name, stored.file_type);
                    println!("Analyzed: {}  schema {}", stored.analyzed_at, stored.schema_version);
                    println!(
                        "Verdict:  {}{}\x1b[0m  trust {}/100",
                        label_color(result.authenticity_label),
                        result.authenticity_label,
                        result.authenticity_score
                    );
                    println!("Sentiment: {} ({})", result.sentiment_label, result.sentiment_score);
                    println!("{}", result.reasoning);
                    for c in &result.checks {
                        println!("  [{}] {:<28} {}", c.status, c.name, c.details);
                    }
                }
                Err(e) => eprintln!("Error: {}", e),
            },
            Ok(None) => {
                eprintln!("No result with id {}", id);
                std::process::exit(1);
            }
            Err(e) => eprintln!("Error: {}", e),
        },

        HistoryAction::Delete { id } => match db.delete_result(id) {
            Ok(true) => println!("Deleted result {}", id),
            Ok(false) => {
                eprintln!("No result with id {}", id);
                std::process::exit(1);
            }
            Err(e) => eprintln!("Error: {}", e),
        },

        HistoryAction::Certificate { id, output } => {
            let record: CertificateRecord = match db.get_result(id) {
                Ok(Some(stored)) => match stored.to_certificate() {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
                Ok(None) => {
                    eprintln!("No result with id {}", id);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let path = output.unwrap_or_else(|| PathBuf::from(format!("certificate_{}.html", id)));
            let written = std::fs::File::create(&path)
                .and_then(|mut f| report::html::write_certificate(&mut f, &record));
            match written {
                Ok(()) => println!("Certificate saved: {}", path.display()),
                Err(e) => {
                    eprintln!("Failed to write certificate: {}", e);
                    std::process::exit(1);
                }
            }
        }

        HistoryAction::Summary => match db.get_summary() {
            Ok(s) => {
                println!("Total:            {}", s.total);
                println!("Likely Organic:   {}", s.organic_count);
                println!("Inconclusive:     {}", s.inconclusive_count);
                println!("Likely Synthetic: {}", s.synthetic_count);
                println!("Errors:           {}", s.error_count);
                match s.avg_score {
                    Some(avg) => println!("Average trust:    {:.1}", avg),
                    None => println!("Average trust:    -"),
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        },

        HistoryAction::Clear => match db.clear() {
            Ok(n) => println!("Deleted {} result(s)", n),
            Err(e) => eprintln!("Error: {}", e),
        },
    }
}
