use clap::Parser;
use immuforge::config::{genome_length, Config, Variant};
use immuforge::error::ImmuForgeError;
use rstest::rstest;
use std::io::Write;
use strum::IntoEnumIterator;

#[derive(Parser)]
struct Cli {
    #[command(flatten)]
    config: Config,
}

#[test]
fn test_defaults_are_valid() {
    let cfg = Config::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.evolution.population_size_per_class, 20);
    assert_eq!(cfg.evolution.max_generations, 50);
    assert_eq!(cfg.evolution.variant, Variant::Evolutionary);
    assert_eq!(cfg.evolution.elitism, 0);
    assert_eq!(cfg.detectors.class_bias, None);
}

#[test]
fn test_cli_defaults_match_struct_defaults() {
    let cli = Cli::try_parse_from(["immuforge"]).unwrap();
    assert_eq!(cli.config, Config::default());
}

#[test]
fn test_cli_overrides() {
    let cli = Cli::try_parse_from([
        "immuforge",
        "--crossover-rate",
        "0.5",
        "--variant",
        "co-evolutionary",
        "--max-generations",
        "-1",
        "--pass-limit",
        "10",
        "--class-bias",
        "0.8",
        "--seed",
        "7",
    ])
    .unwrap();
    let cfg = cli.config;
    assert_eq!(cfg.evolution.crossover_rate, 0.5);
    assert_eq!(cfg.evolution.variant, Variant::CoEvolutionary);
    assert_eq!(cfg.evolution.max_generations, -1);
    assert_eq!(cfg.run.pass_limit, Some(10));
    assert_eq!(cfg.detectors.class_bias, Some(0.8));
    assert_eq!(cfg.run.seed, Some(7));
}

#[test]
fn test_partial_json_fills_defaults() {
    let cfg = Config::from_json_str(
        r#"{ "evolution": { "mutation_rate": 0.2, "variant": "co-evolutionary" } }"#,
    )
    .unwrap();
    assert_eq!(cfg.evolution.mutation_rate, 0.2);
    assert_eq!(cfg.evolution.variant, Variant::CoEvolutionary);
    assert_eq!(cfg.evolution.crossover_rate, 0.7);
    assert_eq!(cfg.detectors.generality_bias, 0.1);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, r#"{{ "run": {{ "seed": 42, "threads": 2 }} }}"#).unwrap();

    let cfg = Config::load_from_file(&path).unwrap();
    assert_eq!(cfg.run.seed, Some(42));
    assert_eq!(cfg.run.threads, Some(2));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Config::load_from_file("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, ImmuForgeError::Io(_)));
}

#[rstest]
#[case(r#"{ "evolution": { "crossover_rate": 1.5 } }"#)]
#[case(r#"{ "evolution": { "mutation_rate": -0.1 } }"#)]
#[case(r#"{ "evolution": { "population_size_per_class": 0 } }"#)]
#[case(r#"{ "evolution": { "population_size_per_class": 4, "elitism": 5 } }"#)]
#[case(r#"{ "detectors": { "generality_bias": 2.0 } }"#)]
#[case(r#"{ "detectors": { "class_bias": 1.01 } }"#)]
#[case(r#"{ "run": { "pass_limit": 0 } }"#)]
#[case(r#"{ "run": { "threads": 0 } }"#)]
fn test_invalid_config_rejected(#[case] json: &str) {
    let err = Config::from_json_str(json).unwrap_err();
    assert!(matches!(err, ImmuForgeError::Config(_)), "{:?}", err);
}

#[test]
fn test_nan_rate_rejected() {
    let mut cfg = Config::default();
    cfg.evolution.crossover_rate = f64::NAN;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_variant_names_round_trip() {
    for variant in Variant::iter() {
        let name = variant.to_string();
        assert_eq!(name.parse::<Variant>().unwrap(), variant);
        let json = serde_json::to_string(&variant).unwrap();
        assert_eq!(json, format!("\"{}\"", name));
    }
    assert!("genetic".parse::<Variant>().is_err());
}

#[rstest]
#[case(3, 14)]
#[case(10, 28)]
fn test_scaled_mutation_rate(#[case] features: usize, #[case] genome: usize) {
    let mut cfg = Config::default();
    assert_eq!(cfg.effective_mutation_rate(features), 0.05);

    cfg.evolution.scale_mutation_by_genome = true;
    assert_eq!(genome_length(features), genome);
    assert!((cfg.effective_mutation_rate(features) - 0.05 / genome as f64).abs() < 1e-15);
}
