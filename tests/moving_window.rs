// Integration tests for a full moving-window run:
//   GeoJSON inputs through the registry, windows, metrics and CSV output

use std::{fs, path::Path, sync::Arc};

use geo::Validation;
use riverscape::{
    igo_ids,
    io::write_geojson_layer,
    network::{read_dgos, read_igos, NetworkFields, NetworkLines},
    raster::{GeoTransform, Raster},
    store::{AttributeTable, AttributeWriter, Record},
    vector::{DatasetRegistry, FeatureLayer},
    window::{DgoIndex, WindowBuilder, WindowLengths},
    zonal::{DensityBasis, InfrastructureAggregator, InfrastructureSource},
    MovingWindowRun, RunConfig,
};
use serde_json::{json, Value};

fn square(x0: f64, x1: f64) -> Value {
    json!({ "type": "Polygon", "coordinates": [[[x0, 0.0], [x1, 0.0], [x1, 10.0], [x0, 10.0], [x0, 0.0]]] })
}

/// Three 50 m DGOs on level path 100 at distances 0, 50 and 100.
fn write_dgos(dir: &Path) -> std::path::PathBuf {
    let features: Vec<Value> = [(1, 0.0), (2, 50.0), (3, 100.0)].iter()
        .map(|&(id, distance): &(i64, f64)| json!({
            "type": "Feature",
            "id": id,
            "geometry": square(distance, distance + 50.0),
            "properties": {
                "level_path": 100,
                "seg_distance": distance,
                "centerline_length": 50.0,
                "segment_area": 500.0,
            },
        }))
        .collect();
    let path = dir.join("dgos.geojson");
    fs::write(&path, json!({ "type": "FeatureCollection", "features": features }).to_string()).unwrap();
    path
}

fn write_igos(dir: &Path) -> std::path::PathBuf {
    let features: Vec<Value> = [(10, 0.0), (11, 50.0), (12, 100.0)].iter()
        .map(|&(id, distance): &(i64, f64)| json!({
            "type": "Feature",
            "id": id,
            "geometry": { "type": "Point", "coordinates": [distance + 25.0, 5.0] },
            "properties": { "level_path": 100, "seg_distance": distance, "stream_size": 0 },
        }))
        .collect();
    let path = dir.join("igos.geojson");
    fs::write(&path, json!({ "type": "FeatureCollection", "features": features }).to_string()).unwrap();
    path
}

fn flowlines() -> FeatureLayer {
    riverscape::io::layer_from_geojson("flowlines", &json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "id": 1,
            "geometry": { "type": "LineString", "coordinates": [[0.5, 5.5], [75.5, 5.5], [149.5, 5.5]] },
            "properties": { "level_path": 100 },
        }],
    })).unwrap()
}

/// 150 x 10 grid of 1 m cells dropping 0.1 m per metre downstream (eastward).
fn dem() -> Raster {
    let values = (0..1500).map(|i| 100.0 - 0.1 * (i % 150) as f64).collect();
    Raster::from_vec(values, 10, 150, GeoTransform::new(0.0, 10.0, 1.0, -1.0), Some(-9999.0)).unwrap()
}

#[test]
fn three_dgo_windows() {
    let dir = tempfile::tempdir().unwrap();
    let fields = NetworkFields::default();
    let mut registry = DatasetRegistry::new();

    let dgo_layer = registry.open_layer(&write_dgos(dir.path()), None).unwrap();
    let igo_layer = registry.open_layer(&write_igos(dir.path()), None).unwrap();
    assert_eq!(registry.len(), 2);

    let index = DgoIndex::new(read_dgos(&dgo_layer, &fields.dgo));
    let igos = read_igos(&igo_layer, &fields.igo);
    assert_eq!(index.len(), 3);
    assert_eq!(igos.len(), 3);

    let lengths = WindowLengths::new([(0, 100.0)]);
    let builder = WindowBuilder::new(&index, &lengths);

    let at_zero = builder.build(&igos[0]).unwrap();
    assert_eq!(at_zero.members, vec![1, 2]);
    assert_eq!(at_zero.centerline_length, 100.0);

    let at_fifty = builder.build(&igos[1]).unwrap();
    assert_eq!(at_fifty.members, vec![1, 2, 3]);
    assert_eq!(at_fifty.segment_area, 1500.0);
    assert!(at_fifty.polygon.is_valid());
    assert!((at_fifty.planar_area() - 1500.0).abs() < 1e-9);

    registry.close_layer(dgo_layer).unwrap();
    registry.close_layer(igo_layer).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn run_writes_metrics_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = DatasetRegistry::new();
    let dgo_layer = registry.open_layer(&write_dgos(dir.path()), None).unwrap();
    let igo_layer = registry.open_layer(&write_igos(dir.path()), None).unwrap();

    let config = RunConfig::from_json_str(r#"{ "window_lengths": { "0": 100 }, "buffer_elevation": 0.4 }"#).unwrap();
    let index = DgoIndex::new(read_dgos(&dgo_layer, &config.fields.dgo));
    let igos = read_igos(&igo_layer, &config.fields.igo);
    let flowlines = NetworkLines::from_layer(&flowlines(), &config.fields.line_level_path);
    let dem = dem();

    let roads = InfrastructureAggregator::prepare(
        &[
            InfrastructureSource::lines("Road", Some(Arc::new(riverscape::io::layer_from_geojson("roads", &json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": { "type": "LineString", "coordinates": [[20.0, -10.0], [20.0, 20.0]] },
                    "properties": {},
                }],
            })).unwrap()))),
            InfrastructureSource::points("DivPts", None),
        ],
        DensityBasis::SegmentArea,
        config.precision,
    );

    let mut table = AttributeTable::new(&config.igo_key);
    table.insert_rows(igo_ids(&igos).map(Record::new)).unwrap();

    let run = MovingWindowRun::new(&config, &index, dgo_layer.epsg())
        .with_flowlines(&flowlines)
        .with_dem(&dem)
        .with_infrastructure(&roads);
    let summary = run.run(&igos, &mut table).unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);

    // Window at 50 spans the whole flowline: 149 m falling from 100 to 85.1.
    let gradient = table.value(11, "stream_gradient").unwrap();
    assert!((gradient - 14.9 / 149.0).abs() < 1e-9, "gradient {gradient}");
    assert!((table.value(11, "sinuosity").unwrap() - 1.0).abs() < 1e-9);
    assert!((table.value(11, "azimuth").unwrap() - 90.0).abs() < 1e-9);
    assert_eq!(table.value(11, "valley_gradient"), None);

    // Road crosses windows at 0 and 50 only.
    assert!((table.value(10, "Road_len").unwrap() - 10.0).abs() < 1e-9);
    assert!((table.value(10, "Road_dens").unwrap() - 0.01).abs() < 1e-12);
    assert_eq!(table.value(12, "Road_len"), Some(0.0));
    assert_eq!(table.value(12, "Road_dens"), Some(0.0));
    assert_eq!(table.value(10, "DivPts_ct"), Some(0.0));
    assert_eq!(table.value(10, "DivPts_dens"), None);

    let csv_path = dir.path().join("out").join("igo_metrics.csv");
    table.write_csv(&csv_path).unwrap();
    let back = AttributeTable::read_csv(&csv_path, &config.igo_key).unwrap();
    assert_eq!(back.len(), 3);
    assert!(back.has_field("stream_gradient"));
    assert_eq!(back.value(10, "Road_len"), table.value(10, "Road_len"));

    let windows = dir.path().join("windows.geojson");
    assert_eq!(run.export_windows(&igos, &windows).unwrap(), 3);
    let exported = riverscape::io::read_geojson_layer(&windows).unwrap();
    assert_eq!(exported.feature(11).and_then(|f| f.get_i64("dgo_count")), Some(3));
}

#[test]
fn geojson_layer_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let layer = riverscape::io::read_geojson_layer(&write_dgos(dir.path())).unwrap();
    let path = dir.path().join("copy").join("dgos.geojson");
    write_geojson_layer(&layer, &path).unwrap();

    let back = riverscape::io::read_geojson_layer(&path).unwrap();
    assert_eq!(back.len(), 3);
    let original = layer.feature(2).unwrap();
    let copied = back.feature(2).unwrap();
    assert_eq!(copied.get_f64("seg_distance"), Some(50.0));
    assert_eq!(copied.geometry, original.geometry);
}
