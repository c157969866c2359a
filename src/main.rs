use clap::{Parser, Subcommand};
use royalbit_glossa::cli;
use royalbit_glossa::error::GlossaResult;
use royalbit_glossa::translation::TranslationProvider;
use royalbit_glossa::types::{MatchPolicy, ProcessingOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "glossa")]
#[command(about = "Extract spreadsheet terms, translate them once, rewrite every workbook.")]
#[command(long_about = "Glossa - Dictionary-driven spreadsheet translation

Formulas, rich text, merged cells and shapes handled. Styles, charts and
images survive the rewrite untouched.

WORKFLOW:
  1. extract   - Collect unique terms from workbooks into a dictionary
  2. translate - Fill the dictionary through a translation backend
  3. edit/show - Review and correct individual entries
  4. apply     - Rewrite the workbooks with the dictionary

EXAMPLES:
  glossa extract q1.xlsx q2.xlsx -o terms.yaml
  glossa translate terms.yaml --language ru
  glossa edit terms.yaml 1718000000000-3 --target \"Итого\" --policy exact-only
  glossa apply terms.yaml q1.xlsx q2.xlsx --output-dir out --bundle

BACKEND CREDENTIALS:
  GEMINI_API_KEY (or API_KEY), GEMINI_MODEL, GEMINI_API_URL
  BAILIAN_API_KEY, BAILIAN_APP_ID, BAILIAN_API_URL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Extract every translatable string from one or more workbooks.

Cell text is trimmed, deduplicated across all files and sorted. Purely numeric
strings are skipped. Files other than .xlsx/.xls/.xlsm are ignored with a warning.

The processing options are stored in the dictionary so that 'apply' rewrites
with the same settings.")]
    /// Extract terms from workbooks into a dictionary file
    Extract {
        /// Workbook files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Dictionary file to write (.yaml or .json)
        #[arg(short, long)]
        output: PathBuf,

        /// Also collect "..." literals inside formulas
        #[arg(long)]
        translate_formulas: bool,

        /// Treat a rich-text cell as one term instead of one term per run
        #[arg(long)]
        flatten_rich_text: bool,

        /// Ignore text in shapes, text boxes and charts
        #[arg(long)]
        skip_shapes: bool,

        /// Include hidden and very hidden sheets
        #[arg(long)]
        include_hidden_sheets: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Fill dictionary targets through a translation backend
    Translate {
        /// Dictionary file
        dictionary: PathBuf,

        /// Target language name or code (default: stored language, then Russian)
        #[arg(short, long)]
        language: Option<String>,

        /// Translation backend
        #[arg(short, long, value_enum, default_value_t = TranslationProvider::Gemini)]
        provider: TranslationProvider,

        /// Write the filled dictionary here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Change the target or match policy of one entry
    Edit {
        /// Dictionary file
        dictionary: PathBuf,

        /// Entry id (see 'show')
        id: String,

        /// New translation
        #[arg(short, long)]
        target: Option<String>,

        /// New match policy
        #[arg(short, long, value_enum)]
        policy: Option<MatchPolicy>,
    },

    /// Print the dictionary with fill status
    Show {
        /// Dictionary file
        dictionary: PathBuf,
    },

    #[command(long_about = "Rewrite workbooks with a dictionary.

Outputs are named \"[CODE] original.xlsx\" in the output directory. A file that
fails is reported and the remaining files are still processed; the exit code
is non-zero if any file failed.")]
    /// Rewrite workbooks with a dictionary
    Apply {
        /// Dictionary file
        dictionary: PathBuf,

        /// Workbook files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory for translated workbooks
        #[arg(short = 'd', long)]
        output_dir: PathBuf,

        /// Language used to tag output names (default: stored language, then Russian)
        #[arg(short, long)]
        language: Option<String>,

        /// Also write a Translated_Files_<millis>.zip bundle
        #[arg(short, long)]
        bundle: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List supported target languages
    Languages,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> GlossaResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            files,
            output,
            translate_formulas,
            flatten_rich_text,
            skip_shapes,
            include_hidden_sheets,
            verbose,
        } => {
            init_tracing(verbose);
            let options = ProcessingOptions {
                translate_formulas,
                preserve_rich_text_formatting: !flatten_rich_text,
                extract_from_shapes: !skip_shapes,
                process_visible_sheets_only: !include_hidden_sheets,
            };
            cli::extract(files, output, options, verbose)
        }

        Commands::Translate {
            dictionary,
            language,
            provider,
            output,
            verbose,
        } => {
            init_tracing(verbose);
            cli::translate(dictionary, language, provider, output)
        }

        Commands::Edit {
            dictionary,
            id,
            target,
            policy,
        } => {
            init_tracing(false);
            cli::edit(dictionary, id, target, policy)
        }

        Commands::Show { dictionary } => {
            init_tracing(false);
            cli::show(dictionary)
        }

        Commands::Apply {
            dictionary,
            files,
            output_dir,
            language,
            bundle,
            verbose,
        } => {
            init_tracing(verbose);
            cli::apply(dictionary, files, output_dir, language, bundle)
        }

        Commands::Languages => cli::languages(),
    }
}
