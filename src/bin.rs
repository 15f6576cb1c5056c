use clap::{Parser, ValueEnum};
use crossword_csp::backtracking_search::{find_fill, FillOptions, FillOutcome, InferenceMode};
use crossword_csp::grid_config::{render_grid, OwnedGridConfig};
use crossword_csp::layout::Layout;
use crossword_csp::parallel_search::find_fill_parallel;
use crossword_csp::word_list::{WordList, WordListSourceConfig};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::time::Duration;
use unicode_normalization::UnicodeNormalization;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum Inference {
    /// Check each choice against the partial assignment only
    #[default]
    None,

    /// Maintain arc consistency after every choice
    Mac,
}

impl From<Inference> for InferenceMode {
    fn from(inference: Inference) -> Self {
        match inference {
            Inference::None => InferenceMode::None,
            Inference::Mac => InferenceMode::MaintainArcConsistency,
        }
    }
}

/// crossword_csp: Fill a crossword structure from a word list by constraint satisfaction
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the structure file, as ASCII with _ representing open squares and # representing
    /// blocks
    structure_path: String,

    /// Path to a word list file with one word per line
    words_path: String,

    /// How much propagation to do after each choice
    #[arg(long, value_enum, default_value_t = Inference::None)]
    inference: Inference,

    /// Give up after this many seconds [default: no limit]
    #[arg(long)]
    timeout: Option<f64>,

    /// Explore the first choice's options on multiple threads
    #[arg(long)]
    parallel: bool,
}

struct Error(String);

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0) // Print error unquoted
    }
}

/// Turn a `--timeout` value in seconds into a `Duration`, rejecting negative, non-finite, and
/// unrepresentably large values.
fn parse_timeout(seconds: Option<f64>) -> Result<Option<Duration>, Error> {
    seconds
        .map(|seconds| {
            Duration::try_from_secs_f64(seconds)
                .map_err(|error| Error(format!("Invalid timeout “{seconds}”: {error}")))
        })
        .transpose()
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let raw_structure = fs::read_to_string(&args.structure_path)
        .map_err(|_| Error(format!("Couldn't read file '{}'", args.structure_path)))?
        .nfc()
        .collect::<String>();

    let layout = Layout::from_template(&raw_structure)
        .map_err(|error| Error(format!("Invalid structure: {error}")))?;
    let max_side = layout.width.max(layout.height);

    let timeout = parse_timeout(args.timeout)?;

    let word_list = WordList::new(
        vec![WordListSourceConfig::File {
            id: "0".into(),
            path: args.words_path.clone().into(),
        }],
        Some(max_side),
    );

    #[allow(clippy::comparison_chain)]
    if let Some(errors) = word_list.get_source_errors().get("0") {
        if errors.len() == 1 {
            return Err(Error(format!("{}", errors[0])));
        } else if errors.len() > 1 {
            let mut full_error: String = "".into();
            for error in errors {
                full_error.push_str(&format!("\n- {error}"));
            }
            return Err(Error(full_error));
        }
    }

    let grid_config = OwnedGridConfig { layout, word_list };
    let config = grid_config.to_config_ref();
    let options = FillOptions {
        inference: args.inference.into(),
        timeout,
        abort: None,
    };

    let outcome = if args.parallel {
        find_fill_parallel(&config, &options)
    } else {
        find_fill(&config, &options)
    }
    .map_err(|failure| Error(failure.to_string()))?;

    match outcome {
        FillOutcome::Solved(success) => {
            println!("{}", render_grid(&config, &success.assignment));
        }
        FillOutcome::Unsatisfiable(_) => println!("No solution."),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parse_timeout;
    use std::time::Duration;

    #[test]
    fn test_parse_timeout() {
        assert!(parse_timeout(None).unwrap().is_none());
        assert_eq!(
            parse_timeout(Some(1.5)).unwrap(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(parse_timeout(Some(0.0)).unwrap(), Some(Duration::ZERO));

        for bad in [-1.0, f64::NAN, f64::INFINITY, 1e20] {
            assert!(parse_timeout(Some(bad)).is_err(), "{bad} should be rejected");
        }
    }
}
