use fleet_profit::config::PipelineConfig;
use fleet_profit::error::{FleetError, ScenarioError};
use fleet_profit::loader::{CsvDirSource, TableSource};
use fleet_profit::model::ModelArtifact;
use fleet_profit::output::{feature_table_header, write_feature_csv};
use fleet_profit::pipeline;
use fleet_profit::scenario::{ScenarioRequest, build_scenario};
use fleet_profit::service::FleetService;
use fleet_profit::stats;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config(model_dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        data_dir: fixtures(),
        model_path: model_dir.path().join("model_pipeline.json.gz"),
        holdout_every: 0,
        ..Default::default()
    }
}

fn service(model_dir: &TempDir) -> FleetService<CsvDirSource> {
    let config = config(model_dir);
    FleetService::new(CsvDirSource::new(&config), config)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_full_pipeline_from_csv() {
    let dir = TempDir::new().unwrap();
    let tables = CsvDirSource::new(&config(&dir)).load().unwrap();
    let output = pipeline::run(&tables);

    // Truck 5 has no freight and truck 6 has no vehicle record.
    let ids: Vec<&str> = output.features.iter().map(|f| f.key.truck_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);

    let truck1 = &output.features[0];
    assert_eq!(truck1.key.truck_type, "Heavy");
    assert_eq!(truck1.key.plate, "HV-001");
    assert_eq!(truck1.trips, 2);
    assert!(close(truck1.base.distance_km, 250.0));
    assert!(close(truck1.base.fuel, 1000.0));
    assert!(close(truck1.base.net_revenue, 1600.0));
    assert!(close(truck1.base.goods_value, 75_000.0));
    assert!(close(truck1.derived.total_cost, 1200.0));
    assert!(close(truck1.derived.net_profit, 400.0));
    assert!(close(truck1.derived.cost_per_km, 4.8));

    // Decimal-comma weight and the "nan" fixed cost.
    let truck2 = &output.features[1];
    assert!(close(truck2.base.weight_kg, 9000.5));
    let truck3 = &output.features[2];
    assert_eq!(truck3.base.fixed_costs, 0.0);
    assert!(close(truck3.derived.net_profit, 240.0));

    // Every freight row survives the left joins; only matched trucks get an age.
    assert_eq!(output.trips.len(), 6);
    assert_eq!(output.trips[0].truck_age.as_deref(), Some("2015"));
    assert_eq!(output.trips[0].city.as_deref(), Some("Pune"));
    assert_eq!(output.trips[5].truck_age, None);

    for row in &output.features {
        assert!(row.trips >= 1);
        assert!(close(
            row.derived.total_cost,
            row.base.fuel + row.base.maintenance + row.base.fixed_costs
        ));
    }
}

#[test]
fn test_city_statistics_from_csv() {
    let dir = TempDir::new().unwrap();
    let tables = CsvDirSource::new(&config(&dir)).load().unwrap();
    let output = pipeline::run(&tables);

    let cities: Vec<&str> = output.cities.iter().map(|c| c.city.as_str()).collect();
    assert_eq!(cities, vec!["Mumbai", "Nashik", "Pune"]);

    let pune = &output.cities[2];
    assert!(close(pune.goods_value, 315_000.0));
    assert_eq!(pune.customers, Some(2));
    assert!(close(pune.latitude.unwrap(), 18.52));

    let top = stats::top_cities(&output.cities, 2);
    assert_eq!(top[0].city, "Pune");
    assert_eq!(top[0].goods_value, 315_000);
    assert_eq!(top[1].city, "Nashik");
    assert_eq!(stats::geo_points(&output.cities).len(), 3);
}

#[test]
fn test_missing_model_retrains_once_and_persists() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);

    svc.get_pipeline().unwrap();
    svc.get_pipeline().unwrap();
    assert_eq!(svc.retrain_count(), 1);

    let saved = ModelArtifact::load(&svc.config().model_path).unwrap();
    saved.sanity_check(svc.schema()).unwrap();

    // A second process finds the artifact and does not retrain.
    let next = service(&dir);
    next.get_pipeline().unwrap();
    assert_eq!(next.retrain_count(), 0);
}

#[test]
fn test_scenario_prediction_end_to_end() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);

    assert_eq!(svc.truck_types().unwrap(), vec!["Heavy", "Light", "Medium"]);

    let request = ScenarioRequest {
        distance_km: Some(400.0),
        weight_kg: Some(6000.0),
        ..ScenarioRequest::new("Heavy")
    };
    let outcome = svc.predict_scenario(&request).unwrap();
    assert_eq!(outcome.truck_type, "Heavy");
    assert!(outcome.predicted_net_profit.is_finite());
    assert!(!outcome.verdict.to_string().is_empty());
}

#[test]
fn test_scenario_uses_type_means() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let dataset = svc.dataset().unwrap();

    // Heavy trucks 1 and 2: per-trip distance 250 and 640.
    let row = build_scenario(&ScenarioRequest::new("Heavy"), &dataset.means).unwrap();
    assert!(close(row.base.distance_km, 445.0));

    let light = build_scenario(&ScenarioRequest::new("Light"), &dataset.means).unwrap();
    let truck3 = &dataset.features[2];
    assert!(close(light.derived.cost_per_km, truck3.derived.cost_per_km));
    assert!(close(light.derived.revenue_per_kg, truck3.derived.revenue_per_kg));
}

#[test]
fn test_unknown_truck_type_is_a_lookup_failure() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let err = svc
        .predict_scenario(&ScenarioRequest::new("Tanker"))
        .unwrap_err();
    assert!(matches!(
        err,
        FleetError::Lookup(ScenarioError::UnknownTruckType(_))
    ));
    assert!(err.to_string().contains("Tanker"));
}

#[test]
fn test_missing_source_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        data_dir: dir.path().join("does-not-exist"),
        model_path: dir.path().join("model.json.gz"),
        ..Default::default()
    };
    let svc = FleetService::new(CsvDirSource::new(&config), config);
    match svc.get_pipeline() {
        Err(FleetError::Retrain(inner)) => assert!(matches!(*inner, FleetError::Source(_))),
        other => panic!("expected retrain failure, got {other:?}"),
    }
}

#[test]
fn test_feature_export_matches_contract() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let dataset = svc.dataset().unwrap();

    let path = dir.path().join("features.csv");
    write_feature_csv(&path, svc.schema(), &dataset.features).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, feature_table_header(svc.schema()));
    assert_eq!(reader.records().count(), dataset.features.len());
}
