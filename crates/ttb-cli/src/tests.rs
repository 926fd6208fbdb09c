use super::*;

#[test]
fn parses_search_with_postcode_and_sector() {
    let cli = Cli::try_parse_from([
        "ttb", "search", "--postcode", "69002", "--sector", "tech", "-r", "10",
    ])
    .expect("expected valid cli args");

    let Commands::Search(args) = cli.command else {
        panic!("expected search command");
    };
    let (request, options) = args.to_request(20.0);
    assert_eq!(request.location.postcode.as_deref(), Some("69002"));
    assert_eq!(request.sector_id.as_deref(), Some("tech"));
    assert!((request.radius_km - 10.0).abs() < f64::EPSILON);
    assert!(!options.enrich);
}

#[test]
fn search_radius_falls_back_to_default() {
    let cli = Cli::try_parse_from(["ttb", "search", "--city", "Lyon"]).unwrap();
    let Commands::Search(args) = cli.command else {
        panic!("expected search command");
    };
    let (request, _) = args.to_request(20.0);
    assert!((request.radius_km - 20.0).abs() < f64::EPSILON);
    assert_eq!(request.location.city.as_deref(), Some("Lyon"));
}

#[test]
fn negative_coordinates_are_accepted() {
    let cli = Cli::try_parse_from([
        "ttb", "search", "--lat", "43.6", "--lon", "-1.45", "--enrich",
    ])
    .unwrap();
    let Commands::Search(args) = cli.command else {
        panic!("expected search command");
    };
    assert_eq!(args.lon, Some(-1.45));
    assert!(args.enrich);
}

#[test]
fn lat_without_lon_is_rejected() {
    assert!(Cli::try_parse_from(["ttb", "search", "--lat", "45.7"]).is_err());
}

#[test]
fn enrichment_limit_requires_enrich() {
    assert!(
        Cli::try_parse_from(["ttb", "search", "--city", "Lyon", "--enrichment-limit", "5"]).is_err()
    );
    let cli = Cli::try_parse_from([
        "ttb", "search", "--city", "Lyon", "--enrich", "--enrichment-limit", "0",
    ])
    .unwrap();
    let Commands::Search(args) = cli.command else {
        panic!("expected search command");
    };
    assert_eq!(args.to_request(20.0).1.enrichment_limit, Some(0));
}

#[test]
fn parses_sectors_and_geocode() {
    let cli = Cli::try_parse_from(["ttb", "sectors", "--codes"]).unwrap();
    assert!(matches!(cli.command, Commands::Sectors { codes: true }));

    let cli = Cli::try_parse_from(["ttb", "geocode", "Villeurbanne"]).unwrap();
    assert!(matches!(cli.command, Commands::Geocode { ref term } if term == "Villeurbanne"));
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["ttb"]).is_err());
}
