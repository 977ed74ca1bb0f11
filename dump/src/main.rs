//! A CLI tool for inspecting the contents of a DICOM file
//! by printing it in a human readable format.
use clap::Parser;
use dicomkit_core::dictionary::DataDictionary;
use dicomkit_core::Tag;
use dicomkit_dictionary_std::StandardDataDictionary;
use dicomkit_dump::{ColorMode, DumpFormat, DumpOptions};
use dicomkit_object::ReadOptions;
use snafu::{OptionExt, Report, ResultExt, Whatever};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Exit code for when an error emerged while reading the DICOM file.
const ERROR_READ: i32 = -2;
/// Exit code for when an error emerged while dumping the file.
const ERROR_PRINT: i32 = -3;

/// Dump the contents of DICOM files
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// The DICOM file(s) to read
    #[clap(required = true)]
    files: Vec<PathBuf>,
    /// Print text values to the end
    /// (limited to `width` by default)
    #[clap(long = "no-text-limit")]
    no_text_limit: bool,
    /// Print all values to the end
    /// (implies `no_text_limit`, limited to `width` by default)
    #[clap(long = "no-limit")]
    no_limit: bool,
    /// The width of the display
    /// (default is to check automatically)
    #[clap(short = 'w', long = "width")]
    width: Option<u32>,
    /// The color mode
    #[clap(long = "color", default_value = "auto")]
    color: ColorMode,
    /// Print tab separated columns with full tag paths
    #[clap(long = "table")]
    table: bool,
    /// Print the byte offset of each element
    #[clap(long = "offsets")]
    offsets: bool,
    /// Keep and print the elements read before a parsing error
    #[clap(long = "keep-on-error")]
    keep_on_error: bool,
    /// Stop reading after the element with this keyword or tag
    /// (e.g. `PixelSpacing` or `00280030`)
    #[clap(long = "until")]
    until: Option<String>,
    /// Fail if any errors are encountered
    #[clap(long = "fail-first")]
    fail_first: bool,
    /// Verbose mode
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    run().unwrap_or_else(|e| {
        eprintln!("{}", Report::from_error(e));
        std::process::exit(ERROR_READ);
    });
}

/// Resolve a keyword or a hexadecimal `ggggeeee` tag.
fn parse_tag(text: &str) -> Option<Tag> {
    if let Some((tag, _)) = StandardDataDictionary.resolve_keyword(text) {
        return Some(tag);
    }
    let digits: String = text.chars().filter(char::is_ascii_hexdigit).collect();
    if digits.len() != 8 {
        return None;
    }
    let group = u16::from_str_radix(&digits[..4], 16).ok()?;
    let element = u16::from_str_radix(&digits[4..], 16).ok()?;
    Some(Tag(group, element))
}

fn run() -> Result<(), Whatever> {
    let App {
        files: filenames,
        no_text_limit,
        no_limit,
        width,
        color,
        table,
        offsets,
        keep_on_error,
        until,
        fail_first,
        verbose,
    } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
            .with_env_filter(EnvFilter::from_default_env().add_directive(if verbose {
                Level::DEBUG.into()
            } else {
                Level::WARN.into()
            }))
            .with_writer(std::io::stderr)
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    let until = until
        .map(|text| parse_tag(&text).whatever_context(format!("Unknown attribute `{}`", text)))
        .transpose()?;

    let width = width
        .or_else(|| terminal_size::terminal_size().map(|(width, _)| width.0 as u32))
        .unwrap_or(120);

    let mut options = DumpOptions::new();
    options
        .no_text_limit(no_text_limit)
        .no_limit(no_limit)
        .width(width)
        .offsets(offsets)
        .color_mode(color)
        .format(if table {
            DumpFormat::Table
        } else {
            DumpFormat::Main
        });
    let fail_first = filenames.len() == 1 || fail_first;
    let mut errors: i32 = 0;

    for filename in &filenames {
        println!("{}: ", filename.display());
        let mut read_options = ReadOptions::new().keep_on_error(keep_on_error);
        if let Some(tag) = until {
            read_options = read_options.load_until(tag);
        }
        match read_options.read_file(filename) {
            Err(e) => {
                eprintln!("{}", Report::from_error(e));
                if fail_first {
                    std::process::exit(ERROR_READ);
                }
                errors += 1;
            }
            Ok(file) => {
                if let Some(message) = file.error_message() {
                    tracing::warn!("{}: {}", filename.display(), message);
                }
                if let Err(ref e) = options.dump_file(&file) {
                    if e.kind() == ErrorKind::BrokenPipe {
                        // handle broken pipe separately with a no-op
                    } else {
                        eprintln!("[ERROR] {}", Report::from_error(e));
                        if fail_first {
                            std::process::exit(ERROR_PRINT);
                        }
                    }
                    errors += 1;
                }
            }
        };
    }

    std::process::exit(errors);
}

#[cfg(test)]
mod tests {
    use crate::{parse_tag, App};
    use clap::CommandFactory;
    use dicomkit_core::Tag;

    #[test]
    fn verify_cli() {
        App::command().debug_assert();
    }

    #[test]
    fn tags_by_keyword_or_number() {
        assert_eq!(parse_tag("PixelSpacing"), Some(Tag(0x0028, 0x0030)));
        assert_eq!(parse_tag("00280030"), Some(Tag(0x0028, 0x0030)));
        assert_eq!(parse_tag("(0028,0030)"), Some(Tag(0x0028, 0x0030)));
        assert_eq!(parse_tag("Nonsense"), None);
    }
}
