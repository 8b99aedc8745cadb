use std::path::PathBuf;

use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["listharvest"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_profiles_command() {
    let cli = Cli::try_parse_from(["listharvest", "profiles"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Profiles)));
}

#[test]
fn run_without_flags_uses_defaults() {
    let cli = Cli::try_parse_from(["listharvest", "run"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Run(ref args)) if *args == RunArgs::default()));
}

#[test]
fn run_parses_path_overrides() {
    let cli = Cli::try_parse_from([
        "listharvest",
        "run",
        "--profile",
        "snapp-express",
        "--coordinates",
        "points.txt",
        "--output-dir",
        "out",
    ])
    .unwrap();
    let Some(Commands::Run(args)) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.profile.as_deref(), Some("snapp-express"));
    assert_eq!(args.coordinates, Some(PathBuf::from("points.txt")));
    assert_eq!(args.output_dir, Some(PathBuf::from("out")));
}

#[test]
fn run_parses_single_coordinate_with_negative_values() {
    let cli =
        Cli::try_parse_from(["listharvest", "run", "--lat", "-33.86", "--lng", "151.2"]).unwrap();
    let Some(Commands::Run(args)) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.lat, Some(-33.86));
    assert_eq!(args.lng, Some(151.2));
}

#[test]
fn run_rejects_lat_without_lng() {
    let result = Cli::try_parse_from(["listharvest", "run", "--lat", "35.7"]);
    assert!(result.is_err());
}

#[test]
fn run_parses_retry_and_resume_flags() {
    let cli = Cli::try_parse_from([
        "listharvest",
        "run",
        "--max-retries",
        "3",
        "--no-resume",
        "--dry-run",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Run(RunArgs {
            max_retries: Some(3),
            no_resume: true,
            dry_run: true,
            ..
        }))
    ));
}

#[test]
fn run_rejects_non_numeric_max_retries() {
    let result = Cli::try_parse_from(["listharvest", "run", "--max-retries", "lots"]);
    assert!(result.is_err());
}
