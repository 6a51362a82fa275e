use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::io::Write;

use group_balance::{AssignmentOutcome, Balancer};

use crate::args::Args;

pub mod conditions;
pub mod config_reader;
pub mod registry_store;
pub mod results;
pub mod session;

use crate::survey::config_reader::{read_study_config, validate_config, PersistenceMode, Study};
use crate::survey::registry_store::{JsonFileStore, MemoryStore, RegistryStore};

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error opening study config {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing study config {path}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid study config: {message}"))]
    InvalidConfig { message: String },

    #[snafu(display("Error listing stimulus images in {path}"))]
    ListingPhotos {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("No stimulus images found in {path}"))]
    NoPhotos { path: String },
    #[snafu(display("Error writing condition file {path}"))]
    WritingConditions { source: csv::Error, path: String },
    #[snafu(display("Error flushing condition file {path}"))]
    FlushingConditions {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("Error serializing the group registry"))]
    SerializingRegistry { source: serde_json::Error },
    #[snafu(display("Error writing registry file {path}"))]
    WritingRegistry {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("Error opening results file {path}"))]
    OpeningResults {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error appending to results file {path}"))]
    WritingResults { source: csv::Error, path: String },
    #[snafu(display("Error flushing results file {path}"))]
    FlushingResults {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("Error reading participant input"))]
    ReadingInput { source: std::io::Error },
    #[snafu(display("Error writing to the terminal"))]
    Prompting { source: std::io::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

fn open_store(study: &Study) -> Box<dyn RegistryStore> {
    match study.persistence {
        PersistenceMode::File => Box::new(JsonFileStore::new(&study.registry_file)),
        PersistenceMode::Session => Box::new(MemoryStore::new()),
    }
}

pub fn run_study(args: &Args) -> SurveyResult<()> {
    let config = match &args.config {
        Some(path) => read_study_config(path)?,
        None => config_reader::StudyConfig::default(),
    };
    let mut study = validate_config(&config)?;
    if let Some(path) = &args.registry {
        study.registry_file = path.clone();
    }
    if let Some(path) = &args.out {
        study.results_file = path.clone();
    }
    info!("study: {:?}", study);

    if args.make_conditions {
        return conditions::write_condition_files(&study);
    }

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let stdout = std::io::stdout();
    let mut output = stdout.lock();

    let participant = match &args.participant {
        Some(p) if !p.trim().is_empty() => p.trim().to_string(),
        _ => session::prompt_participant_number(&mut input, &mut output)?,
    };

    let mut store = open_store(&study);
    let mut registry = store.load(&study.groups);
    debug!("registry loaded: {:?}", registry.counts());

    let mut balancer = match Balancer::new(&study.groups, &study.rules) {
        Result::Ok(b) => b,
        Result::Err(e) => {
            whatever!("Balancing error: {:?}", e)
        }
    };
    let outcome = match balancer.assign(&mut registry) {
        Result::Ok(o) => o,
        Result::Err(e) => {
            whatever!("Balancing error: {:?}", e)
        }
    };

    let assignment = match outcome {
        AssignmentOutcome::Exhausted => {
            info!(
                "all groups at capacity ({} participants assigned)",
                registry.total()
            );
            writeln!(
                output,
                "\nAll groups are full ({} participants per group). The study is complete;\nno further participants can be enrolled.",
                study.rules.capacity
            )
            .context(PromptingSnafu {})?;
            return Ok(());
        }
        AssignmentOutcome::Assigned(a) => a,
    };

    // The increment must be durable before the assignment is acted on:
    // another session starting now should not see the stale counts.
    if let Err(e) = store.save(&registry) {
        if study.strict_registry {
            return Err(e);
        }
        warn!(
            "could not persist the group registry: {} (continuing without durability)",
            e
        );
    }
    info!(
        "participant {} assigned to group {} ({})",
        participant, assignment.group_key, assignment.label
    );

    let files = conditions::list_stimulus_files(&study.photos_dir, &assignment.group_key)?;
    if files.is_empty() {
        return NoPhotosSnafu {
            path: format!("{}/{}", study.photos_dir, assignment.group_key),
        }
        .fail();
    }

    let mut writer = results::CsvResultsWriter::new(&study.results_file);
    session::run_session(
        &study,
        &assignment,
        &participant,
        &files,
        &mut writer,
        &mut input,
        &mut output,
    )
}
