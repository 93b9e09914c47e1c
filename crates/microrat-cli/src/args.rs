//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;
use microrat_types::Hand;

/// Headless maze run against the simulated robot.
#[derive(Parser, Debug, Clone, PartialEq, Eq, Default)]
#[command(name = "microrat", author, version, about, long_about = None)]
pub struct Args {
    /// Calibration file (default ~/.microrat/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maze layout to simulate (default: built-in 7x4 maze)
    #[arg(long, value_name = "PATH")]
    pub maze: Option<PathBuf>,

    /// Wall to follow while exploring: left or right
    #[arg(long, value_name = "SIDE", value_parser = parse_hand)]
    pub hand: Option<Hand>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_hand(side: &str) -> Result<Hand, String> {
    side.parse().map_err(|e| format!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("microrat").chain(args.iter().copied()))
    }

    #[test]
    fn no_flags_is_default() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn all_flags() {
        let args = parse(&["--config", "rat.toml", "--maze", "m.txt", "--hand", "right", "--json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("rat.toml")));
        assert_eq!(args.maze, Some(PathBuf::from("m.txt")));
        assert_eq!(args.hand, Some(Hand::Right));
        assert!(args.json);
    }

    #[test]
    fn hand_is_case_insensitive() {
        assert_eq!(parse(&["--hand", "LEFT"]).unwrap().hand, Some(Hand::Left));
    }

    #[test]
    fn missing_value_and_unknown_flag_are_errors() {
        assert_eq!(parse(&["--maze"]).unwrap_err().kind(), ErrorKind::InvalidValue);
        assert_eq!(parse(&["--speed", "11"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
        let bad_hand = parse(&["--hand", "both"]).unwrap_err();
        assert_eq!(bad_hand.kind(), ErrorKind::ValueValidation);
        assert!(bad_hand.to_string().contains("unknown hand 'both'"));
    }

    #[test]
    fn help_is_handled_by_the_parser() {
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
    }
}
