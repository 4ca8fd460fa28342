use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use xrefbridge_kernel::{DataSourceRegistry, DriverRegistry, IdMapper, IdMapperError, Organism, Xref};
use xrefbridge_provider::{OrganismRouter, RoutingConfigError};
use xrefbridge_store::{TEXT_SCHEME, TextDriver};

fn fixture(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("fixture should write");
    file
}

#[tokio::test]
async fn config_routes_good_lines_and_reports_the_rest() {
    let registry = DataSourceRegistry::global();
    let gene = registry.register("Rg", "Routed Gene").unwrap().as_data_source();
    let probe = registry.register("Rp", "Routed Probe").unwrap().as_data_source();
    let metabolite = registry.register("Rm", "Routed Metabolite").unwrap().as_data_source();

    let human = fixture("Routed Gene\tRouted Probe\nINSR\tpr_1\n");
    let shared = fixture("Routed Probe\tRouted Metabolite\npr_1\tm_1\n");

    let config = format!(
        "# routing\n\
         Homo sapiens\t{TEXT_SCHEME}:{human}\n\
         *\t{TEXT_SCHEME}:{shared}\n\
         Mus musculus\t{TEXT_SCHEME}:{shared}\n\
         Unicornus magicus\t{TEXT_SCHEME}:{human}\n\
         Rattus norvegicus /data/Rn.bridge\n\
         Rattus norvegicus\t/data/Rn.bridge\n\
         \n",
        human = human.path().display(),
        shared = shared.path().display(),
    );

    let drivers = DriverRegistry::new();
    drivers.register(TEXT_SCHEME, Arc::new(TextDriver::new()));

    let router = OrganismRouter::new().with_transitive(true);
    let report = router.load_config(&config, &drivers).await;

    assert_eq!(report.routed, 3);
    assert_eq!(report.skipped.len(), 3);
    assert!(matches!(
        &report.skipped[0],
        RoutingConfigError::UnknownScope { line: 5, scope } if scope == "Unicornus magicus"
    ));
    assert!(matches!(&report.skipped[1], RoutingConfigError::Malformed { line: 6, .. }));
    match &report.skipped[2] {
        RoutingConfigError::Connect { line, connection, source } => {
            assert_eq!(*line, 7);
            assert_eq!(connection, "idmapper-pgdb:/data/Rn.bridge");
            assert!(matches!(source, IdMapperError::UnknownScheme(s) if s == "idmapper-pgdb"));
        }
        other => panic!("expected connect failure, got {other:?}"),
    }

    assert_eq!(
        router.organisms(),
        BTreeSet::from([Organism::HomoSapiens, Organism::MusMusculus])
    );
    // The shared file is opened once and routed both as wildcard and for mouse.
    assert_eq!(router.backends().len(), 2);
    assert_eq!(router.route_for(Organism::MusMusculus).len(), 1);
    assert_eq!(router.route_for(Organism::RattusNorvegicus).len(), 1);

    let stack = router.route_for(Organism::HomoSapiens);
    assert_eq!(stack.len(), 2);
    let mapped = stack
        .map_id(&Xref::new("INSR", gene.clone()), &[metabolite.clone()])
        .await
        .unwrap();
    assert_eq!(mapped, BTreeSet::from([Xref::new("m_1", metabolite)]));
    assert!(stack.capabilities().is_mapping_supported(&gene, &probe));

    router.close().await.unwrap();
}

#[tokio::test]
async fn unreadable_config_file_is_an_error() {
    let router = OrganismRouter::new();
    let err = router
        .load_config_file("/nonexistent/xrefbridge/gdb.config", &DriverRegistry::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RoutingConfigError::Io(_)));
}
