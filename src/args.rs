use clap::Parser;

/// This is a survey program for consumer price-perception studies.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the study: groups, capacity,
    /// stimulus directory, registry and results locations. Without it, the built-in
    /// default study (premium/base/control, 15 participants per group) is used.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (string, optional) The participant number. If not provided, the program
    /// prompts for it at the start of the session.
    #[clap(short, long, value_parser)]
    pub participant: Option<String>,

    /// (file path, optional) Where the group registry is persisted. Setting this
    /// option overrides the path that may be specified with the --config option.
    #[clap(long, value_parser)]
    pub registry: Option<String>,

    /// (file path, optional) Where the response records are appended in CSV format.
    /// Setting this option overrides the path that may be specified with the
    /// --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// If passed as an argument, generates the condition CSV files for every group
    /// from the stimulus directory and exits without running a session.
    #[clap(long, takes_value = false)]
    pub make_conditions: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
