use clap::Parser;
use interactive_feedback::config::LanguagePreference;

/// `interactive-feedback` - collect one round of operator feedback.
#[derive(Parser, Debug)]
#[command(name = "interactive-feedback")]
#[command(version)]
#[command(
    about = "Collect operator feedback with attachments and command output, emitted as JSON.",
    long_about = None
)]
pub struct Cli {
    /// Directory the command runs in (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project_directory: Option<String>,

    /// Summary of the work the feedback is about
    #[arg(long, default_value = "")]
    pub prompt: String,

    /// Command to run (default: the project's saved command)
    #[arg(long)]
    pub command: Option<String>,

    /// Run the command before submitting
    #[arg(long)]
    pub run: bool,

    /// Attach a file; may be repeated
    #[arg(long = "attach", value_name = "PATH")]
    pub attachments: Vec<String>,

    /// Feedback text (default: read from stdin when it is not a terminal)
    #[arg(long)]
    pub feedback: Option<String>,

    /// Use quick reply N as the feedback text
    #[arg(long, value_name = "N")]
    pub quick_reply: Option<usize>,

    /// Submit automatically after a quick reply (overrides the project setting)
    #[arg(long, value_name = "BOOL")]
    pub auto_submit: Option<bool>,

    /// Interface language: auto, en or zh
    #[arg(long, value_name = "LANG")]
    pub lang: Option<LanguagePreference>,

    /// Write the payload JSON to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<String>,

    /// Settings file (default: platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Load localized text from this JSON resource instead of the built-in one
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<String>,

    /// Write the built-in localization resource to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub export_catalog: Option<String>,

    /// List the quick replies for the active language and exit
    #[arg(long)]
    pub list_quick_replies: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
