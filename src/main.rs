//! csv-sleuth CLI - dialect sniffer and tokenizer

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use csv_sleuth::{CharReader, Dialect, Metadata, Quote, RowRealigner, Sniffer, Tokenizer, decode};
use foldhash::{HashMap, HashMapExt};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Delimited-text dialect sniffer and tokenizer.
///
/// Detects the delimiter, quote character, escape prefix, record terminator,
/// comment marker and header offset of delimited files.
#[derive(Parser, Debug)]
#[command(name = "csv-sleuth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect and print the dialect of one or more files
    Sniff {
        /// Input file(s) to sniff
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short = 'f', long, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        forced: ForcedDialect,
    },
    /// Tokenize a file and print its records as RFC 4180 CSV
    Tokenize {
        /// Input file to tokenize
        file: PathBuf,

        /// Merge misplaced fields of rows wider than the most common width
        #[arg(long)]
        realign: bool,

        #[command(flatten)]
        forced: ForcedDialect,
    },
}

/// Dialect parameters that skip detection when given.
#[derive(Args, Debug)]
struct ForcedDialect {
    /// Force the delimiter (single character, or 'tab')
    #[arg(short = 'd', long)]
    delimiter: Option<String>,

    /// Force the quote character (single character, or 'none')
    #[arg(short = 'q', long)]
    quote: Option<String>,

    /// Force the escape prefix (single character, or 'none')
    #[arg(short = 'e', long)]
    escape: Option<String>,

    /// Force the comment marker ('none' disables comments)
    #[arg(short = 'c', long)]
    comment: Option<String>,

    /// Force the number of preamble rows to skip
    #[arg(short = 's', long)]
    skip_rows: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut exit_code = ExitCode::SUCCESS;

    match &cli.command {
        Command::Sniff {
            files,
            format,
            forced,
        } => {
            for file in files {
                if let Err(e) = sniff_file(file, *format, forced) {
                    eprintln!("Error processing {}: {}", file.display(), e);
                    exit_code = ExitCode::FAILURE;
                }
            }
        }
        Command::Tokenize {
            file,
            realign,
            forced,
        } => {
            if let Err(e) = tokenize_file(file, *realign, forced) {
                eprintln!("Error processing {}: {}", file.display(), e);
                exit_code = ExitCode::FAILURE;
            }
        }
    }

    exit_code
}

fn build_sniffer(forced: &ForcedDialect) -> CliResult<Sniffer> {
    let mut sniffer = Sniffer::new();

    if let Some(delimiter) = &forced.delimiter {
        let delimiter = if delimiter.eq_ignore_ascii_case("tab") {
            '\t'
        } else {
            single_char("delimiter", delimiter)?
        };
        sniffer.delimiter(delimiter);
    }
    if let Some(quote) = &forced.quote {
        if quote.eq_ignore_ascii_case("none") {
            sniffer.quote(Quote::None);
        } else {
            sniffer.quote(Quote::Some(single_char("quote", quote)?));
        }
    }
    if let Some(escape) = &forced.escape {
        if escape.eq_ignore_ascii_case("none") {
            sniffer.escape(None);
        } else {
            sniffer.escape(Some(single_char("escape", escape)?));
        }
    }
    if let Some(comment) = &forced.comment {
        if comment.eq_ignore_ascii_case("none") {
            sniffer.comment(None);
        } else {
            sniffer.comment(Some(comment.as_str()));
        }
    }
    if let Some(skip_rows) = forced.skip_rows {
        sniffer.skip_rows(skip_rows);
    }

    Ok(sniffer)
}

fn single_char(name: &str, value: &str) -> CliResult<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("--{name} expects a single character, got {value:?}").into()),
    }
}

fn sniff_file(path: &Path, format: OutputFormat, forced: &ForcedDialect) -> CliResult<()> {
    let sniffer = build_sniffer(forced)?;
    let data = fs::read(path)?;
    let metadata = sniffer.sniff_bytes(&data)?;

    match format {
        OutputFormat::Text => print_text_output(path, &metadata),
        OutputFormat::Json => print_json_output(path, &metadata),
    }

    Ok(())
}

fn tokenize_file(path: &Path, realign: bool, forced: &ForcedDialect) -> CliResult<()> {
    let sniffer = build_sniffer(forced)?;
    let data = fs::read(path)?;
    let text = decode(&data);
    let mut reader = CharReader::from_text(text);
    let metadata = sniffer.sniff(&mut reader)?;
    let dialect = &metadata.dialect;

    let mut realigner = if realign {
        let width = modal_width(&mut reader, dialect)?;
        debug!(width, "realigning rows to the most common width");
        Some(RowRealigner::new(width))
    } else {
        None
    };

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(io::stdout().lock());

    for record in Tokenizer::from_start(&mut reader, dialect)? {
        let record = record?;
        // Blank lines have no CSV representation.
        if record.is_empty() {
            continue;
        }
        // Realignment warnings are logged by the realigner.
        let fields = match realigner.as_mut() {
            Some(realigner) => realigner.process(record).fields,
            None => record,
        };
        writer.write_record(&fields)?;
    }
    writer.flush()?;

    Ok(())
}

/// Most common field count among non-blank records. Ties go to the narrower
/// width.
fn modal_width(reader: &mut CharReader<'_>, dialect: &Dialect) -> CliResult<usize> {
    let mut widths: HashMap<usize, usize> = HashMap::new();
    for record in Tokenizer::from_start(reader, dialect)? {
        let record = record?;
        if !record.is_empty() {
            *widths.entry(record.len()).or_insert(0) += 1;
        }
    }
    Ok(widths
        .into_iter()
        .max_by(|(wa, ca), (wb, cb)| ca.cmp(cb).then(wb.cmp(wa)))
        .map_or(0, |(width, _)| width))
}

fn print_text_output(path: &Path, metadata: &Metadata) {
    let dialect = &metadata.dialect;
    println!("File: {}", path.display());
    println!("  Delimiter: {:?}", dialect.delimiter);
    println!(
        "  Quote: {}",
        match dialect.quote {
            Quote::None => "none".to_string(),
            Quote::Some(q) => format!("{q:?}"),
        }
    );
    println!(
        "  Escape: {}",
        dialect
            .escape
            .map_or_else(|| "none".to_string(), |e| format!("{e:?}"))
    );
    println!("  Record delimiter: {}", dialect.record_delimiter);
    println!(
        "  Comment: {}",
        dialect
            .comment
            .as_deref()
            .map_or_else(|| "none".to_string(), |c| format!("{c:?}"))
    );
    println!("  Skip rows: {}", dialect.skip_rows);
    println!("  Escaped qualifier: {}", metadata.escaped_qualifier);
    println!("  Duplicate qualifier: {}", metadata.duplicate_qualifier);
    println!();
}

fn print_json_output(path: &Path, metadata: &Metadata) {
    let dialect = &metadata.dialect;
    let optional = |value: Option<String>| value.map_or_else(|| "null".to_string(), |v| json_string(&v));

    println!(
        r#"{{"file":{},"dialect":{{"delimiter":{},"quote":{},"escape":{},"record_delimiter":{},"comment":{},"skip_rows":{}}},"escaped_qualifier":{},"duplicate_qualifier":{}}}"#,
        json_string(&path.display().to_string()),
        json_string(&dialect.delimiter.to_string()),
        optional(dialect.quote.char().map(String::from)),
        optional(dialect.escape.map(String::from)),
        json_string(&dialect.record_delimiter.to_string()),
        optional(dialect.comment.clone()),
        dialect.skip_rows,
        metadata.escaped_qualifier,
        metadata.duplicate_qualifier,
    );
}

fn json_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
