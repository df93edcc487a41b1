// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface: argument definitions and translation into
// `OperationRequest`s.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use docops_core::error::{DocOpsError, Result};
use docops_core::{
    Document, OperationKind, OperationOptions, OperationRequest, PageRange, RenderEngine,
    SplitMode,
};

/// Convert, split, and merge PDF, Word, and image documents.
#[derive(Parser, Debug)]
#[command(name = "docops", version, arg_required_else_help = true)]
pub struct Cli {
    /// Config file (default: $DOCOPS_CONFIG, then ~/.config/docops/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Give up on the operation after this many seconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Print the operation report as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a PDF to a Word document.
    PdfToWord {
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        /// First page to convert (1-based).
        #[arg(long, requires = "end")]
        start: Option<u32>,
        /// Last page to convert (inclusive).
        #[arg(long, requires = "start")]
        end: Option<u32>,
    },
    /// Convert a Word document to PDF.
    WordToPdf {
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        /// Rendering backend: builtin, pandoc, or libreoffice.
        #[arg(long, value_parser = parse_engine)]
        engine: Option<RenderEngine>,
        /// LaTeX engine for pandoc, e.g. xelatex.
        #[arg(long)]
        pdf_engine: Option<String>,
    },
    /// Package JPEG/PNG images into one PDF, one image per page.
    ImagesToPdf {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Split a PDF into single-page PDFs.
    SplitPdf {
        input: PathBuf,
        /// Directory for the page files.
        #[arg(short = 'o', long = "output-dir", default_value = ".")]
        output_dir: PathBuf,
        /// Pages to extract, e.g. "1,3,5-7" (default: all).
        #[arg(long)]
        pages: Option<String>,
    },
    /// Merge PDFs in the order given.
    MergePdf {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show a PDF's page count.
    Info { input: PathBuf },
    /// Check the external rendering backends.
    Doctor {
        /// Run the configured provisioning command for missing backends.
        #[arg(long)]
        provision: bool,
    },
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Directory for the output file.
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub dir: PathBuf,
    /// Output file name without extension.
    #[arg(long)]
    pub name: Option<String>,
}

/// What a document command asks for: the request and where to put results.
pub struct Job {
    pub request: OperationRequest,
    pub output_dir: PathBuf,
}

impl Command {
    /// Read the inputs and build the request. `None` for `info` and `doctor`.
    pub fn job(&self) -> Result<Option<Job>> {
        let job = match self {
            Self::PdfToWord {
                input,
                output,
                start,
                end,
            } => {
                let page_range = match (start, end) {
                    (Some(start), Some(end)) => Some(PageRange {
                        start: *start,
                        end: *end,
                    }),
                    _ => None,
                };
                Job::new(OperationKind::PdfToWord, &[input], output, OperationOptions {
                    page_range,
                    ..OperationOptions::default()
                })?
            }
            Self::WordToPdf {
                input,
                output,
                engine,
                pdf_engine,
            } => Job::new(OperationKind::WordToPdf, &[input], output, OperationOptions {
                render_engine: *engine,
                pdf_engine: pdf_engine.clone(),
                ..OperationOptions::default()
            })?,
            Self::ImagesToPdf { images, output } => Job::new(
                OperationKind::ImagesToPdf,
                images,
                output,
                OperationOptions::default(),
            )?,
            Self::SplitPdf {
                input,
                output_dir,
                pages,
            } => {
                let split = match pages {
                    Some(expression) => SplitMode::Expression(expression.clone()),
                    None => SplitMode::All,
                };
                Job {
                    request: OperationRequest::new(OperationKind::SplitPdf, read_inputs(&[input])?)
                        .with_options(OperationOptions {
                            split,
                            ..OperationOptions::default()
                        }),
                    output_dir: output_dir.clone(),
                }
            }
            Self::MergePdf { inputs, output } => Job::new(
                OperationKind::MergePdf,
                inputs,
                output,
                OperationOptions::default(),
            )?,
            Self::Info { .. } | Self::Doctor { .. } => return Ok(None),
        };
        Ok(Some(job))
    }
}

impl Job {
    fn new<P: AsRef<Path>>(
        kind: OperationKind,
        paths: &[P],
        output: &OutputArgs,
        options: OperationOptions,
    ) -> Result<Self> {
        Ok(Self {
            request: OperationRequest::new(kind, read_inputs(paths)?).with_options(
                OperationOptions {
                    output_name: output.name.clone(),
                    ..options
                },
            ),
            output_dir: output.dir.clone(),
        })
    }
}

fn read_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Document>> {
    paths.iter().map(Document::from_path).collect()
}

fn parse_engine(value: &str) -> std::result::Result<RenderEngine, String> {
    value.parse().map_err(|err: DocOpsError| err.to_string())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;
    use clap::CommandFactory;
    use docops_core::DocumentFormat;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["docops", "doctor", "--provision", "--json", "-v"]).unwrap();
        assert!(cli.json && cli.verbose);
        assert!(matches!(cli.command, Command::Doctor { provision: true }));
    }

    #[test]
    fn start_requires_end() {
        assert!(Cli::try_parse_from(["docops", "pdf-to-word", "a.pdf", "--start", "2"]).is_err());
    }

    #[test]
    fn unknown_engine_rejected() {
        let parsed =
            Cli::try_parse_from(["docops", "word-to-pdf", "a.docx", "--engine", "wkhtmltopdf"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(Cli::try_parse_from(["docops", "--timeout", "0", "doctor"]).is_err());
    }

    #[test]
    fn split_job_carries_expression() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();

        let args: Vec<OsString> = vec![
            "docops".into(),
            "split-pdf".into(),
            input.into_os_string(),
            "--pages".into(),
            "2,1".into(),
            "-o".into(),
            dir.path().into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let job = cli.command.job().unwrap().unwrap();

        assert_eq!(job.request.kind, OperationKind::SplitPdf);
        assert_eq!(job.request.options.split, SplitMode::Expression("2,1".into()));
        assert_eq!(job.request.inputs[0].format(), DocumentFormat::Pdf);
        assert_eq!(job.output_dir, dir.path());
    }

    #[test]
    fn word_job_carries_engine_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("memo.docx");
        std::fs::write(&input, b"PK\x03\x04").unwrap();

        let args: Vec<OsString> = vec![
            "docops".into(),
            "word-to-pdf".into(),
            input.into_os_string(),
            "--engine".into(),
            "soffice".into(),
            "--name".into(),
            "memo".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let job = cli.command.job().unwrap().unwrap();

        assert_eq!(job.request.options.render_engine, Some(RenderEngine::LibreOffice));
        assert_eq!(job.request.options.output_name.as_deref(), Some("memo"));
        assert_eq!(job.output_dir, Path::new("."));
    }

    #[test]
    fn missing_input_is_io_error() {
        let cli =
            Cli::try_parse_from(["docops", "merge-pdf", "/nonexistent/a.pdf", "/nonexistent/b.pdf"])
                .unwrap();
        assert!(matches!(cli.command.job(), Err(DocOpsError::Io(_))));
    }

    #[test]
    fn doctor_and_info_have_no_job() {
        let cli = Cli::try_parse_from(["docops", "doctor"]).unwrap();
        assert!(cli.command.job().unwrap().is_none());

        let cli = Cli::try_parse_from(["docops", "info", "report.pdf", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(&cli.command, Command::Info { input } if input == Path::new("report.pdf")));
        assert!(cli.command.job().unwrap().is_none());
    }
}
