use crate::cli::{format_route_table, Cli, Commands};
use crate::spec::load_embedded_spec;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_serve_flags_parse() {
    let cli = Cli::try_parse_from([
        "items-api",
        "serve",
        "--config",
        "config/config.yaml",
        "--addr",
        "127.0.0.1:9000",
        "--spec",
        "doc/openapi.yaml",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve { config, addr, spec } => {
            assert_eq!(config, Some(PathBuf::from("config/config.yaml")));
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
            assert_eq!(spec, Some(PathBuf::from("doc/openapi.yaml")));
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_routes_and_check_parse_without_spec() {
    let cli = Cli::try_parse_from(["items-api", "routes"]).unwrap();
    assert!(matches!(cli.command, Commands::Routes { spec: None }));

    let cli = Cli::try_parse_from(["items-api", "check", "-s", "api.json"]).unwrap();
    match cli.command {
        Commands::Check { spec } => assert_eq!(spec, Some(PathBuf::from("api.json"))),
        _ => panic!("Expected Check command"),
    }
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["items-api", "generate"]).is_err());
}

#[test]
fn test_route_table_lists_every_operation() {
    let spec = load_embedded_spec().unwrap();
    let table = format_route_table(&spec.routes);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("GET") && lines[0].contains("/health"));
    assert!(lines[0].contains("-> 200  #"));
    assert!(lines[1].starts_with("POST") && lines[1].contains("create_item"));
    assert!(lines[1].contains("body") && lines[1].contains("-> 200,400,422"));
    assert!(lines[2].contains("/items/{item_id}") && lines[2].contains("path:item_id(integer)"));
    assert!(lines[2].contains("-> 200,404,422  # Fetch an item"));
}
