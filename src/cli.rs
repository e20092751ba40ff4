use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::bad_nights::{BadNightsConfig, FailurePolicy, DEFAULT_ATTENDANCE_THRESHOLD};
use crate::models::{StarId, Variant};

#[derive(Parser)]
#[command(name = "trout")]
#[command(about = "Bad-night detection and star band tools for the photometric survey", long_about = None)]
pub struct Cli {
    #[arg(short, long, env = "TROUT_DATABASE", default_value = "trout.sqlite")]
    pub database: String,

    /// Log pipeline decisions (equivalent to RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Calculate bad nights for a year from star flux ratios
    CalcBadNights {
        #[command(flatten)]
        args: CalcBadNightsArgs,
    },

    /// List bad nights recorded in the registry
    BadNights {
        /// Restrict to one year
        #[arg(short, long)]
        year: Option<i32>,

        /// Use the secondary registry
        #[arg(long)]
        secondary: bool,
    },

    /// Show internight normalization bands
    Bands {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show data, attendance and band of a single star
    Star {
        /// Star number (1-2510)
        #[arg(value_parser = parse_star)]
        star: StarId,

        /// Restrict statistics to one year
        #[arg(short, long)]
        year: Option<i32>,

        /// Use the secondary dataset
        #[arg(long)]
        secondary: bool,
    },

    /// List the observed nights of a year with their registry status
    Nights {
        year: i32,

        /// Use the secondary dataset
        #[arg(long)]
        secondary: bool,
    },

    /// Create the database tables if they do not exist
    InitDb,
}

/// Options of `calc-bad-nights`, mapped onto a [`BadNightsConfig`].
#[derive(Args, Debug, Clone)]
pub struct CalcBadNightsArgs {
    /// Year to analyze
    pub year: i32,

    /// Minimum attendance (0.0-1.0) for a star to be used
    #[arg(long, default_value_t = DEFAULT_ATTENDANCE_THRESHOLD, value_parser = parse_fraction)]
    pub attendance_threshold: f64,

    /// LTPR above which a night is bad (default depends on the year)
    #[arg(long)]
    pub ltpr_threshold: Option<f64>,

    /// Comma separated star numbers to use instead of the default set
    #[arg(long, value_delimiter = ',', value_parser = parse_star)]
    pub stars: Option<Vec<StarId>>,

    /// Use the secondary dataset
    #[arg(long)]
    pub secondary: bool,

    /// Do not print the parameter echo or the bad-night list
    #[arg(long)]
    pub silent: bool,

    /// Print the LTPR value of every night
    #[arg(long)]
    pub show_all_ltpr_values: bool,

    /// Skip stars whose data cannot be read instead of aborting
    #[arg(long)]
    pub skip_failed_stars: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl CalcBadNightsArgs {
    pub fn to_config(&self) -> BadNightsConfig {
        BadNightsConfig {
            attendance_threshold: self.attendance_threshold,
            ltpr_threshold: self.ltpr_threshold,
            stars_to_use: self.stars.clone(),
            variant: Variant::from_primary(!self.secondary),
            failure_policy: if self.skip_failed_stars {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            },
            ..BadNightsConfig::new(self.year)
        }
    }
}

fn parse_star(value: &str) -> Result<StarId, String> {
    let number: i64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a star number", value))?;
    StarId::new(number).map_err(|e| e.to_string())
}

fn parse_fraction(value: &str) -> Result<f64, String> {
    let fraction: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=1.0).contains(&fraction) {
        Ok(fraction)
    } else {
        Err(format!("{} is not between 0.0 and 1.0", fraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_calc_bad_nights() {
        let cli = Cli::try_parse_from([
            "trout",
            "calc-bad-nights",
            "2005",
            "--stars",
            "2,3, 5",
            "--ltpr-threshold",
            "0.04",
            "--secondary",
        ])
        .unwrap();
        match cli.command {
            Commands::CalcBadNights { args } => {
                assert_eq!(args.year, 2005);
                assert_eq!(args.attendance_threshold, 0.5);
                assert_eq!(args.ltpr_threshold, Some(0.04));
                let stars: Vec<u16> = args.stars.clone().unwrap().iter().map(|s| s.get()).collect();
                assert_eq!(stars, vec![2, 3, 5]);
                assert!(args.secondary);
                assert_eq!(args.format, OutputFormat::Table);
                assert_eq!(args.to_config().variant, Variant::Secondary);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_rejects_out_of_range_inputs() {
        assert!(Cli::try_parse_from(["trout", "star", "2511"]).is_err());
        assert!(Cli::try_parse_from([
            "trout",
            "calc-bad-nights",
            "2005",
            "--attendance-threshold",
            "1.2"
        ])
        .is_err());
    }

    #[test]
    fn test_args_to_config() {
        let args = CalcBadNightsArgs {
            year: 2007,
            attendance_threshold: 0.8,
            ltpr_threshold: None,
            stars: None,
            secondary: true,
            silent: false,
            show_all_ltpr_values: false,
            skip_failed_stars: true,
            format: OutputFormat::Table,
        };
        let config = args.to_config();
        assert_eq!(config.year, 2007);
        assert_eq!(config.attendance_threshold, 0.8);
        assert_eq!(config.effective_ltpr_threshold(), 0.045);
        assert_eq!(config.variant, Variant::Secondary);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
    }
}
