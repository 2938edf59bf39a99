mod utils;

use std::{
    cell::Cell,
    path::{Path, PathBuf},
};
use tornado_figures::{
    config::CaseConfig,
    figures::{self, FigureId, Inputs},
    loaders::{open_or_fetch, parse_diamond5, read_diamond5, Fetch, RetrievalRequest},
    map::{Map, MapData, MapOptions},
    FigureError, FigureResult, GridKind,
};

#[test]
fn test_plot_rejects_mismatched_level() {
    let time = utils::valid_time();

    let surface = utils::small_dataset(GridKind::Surface);
    let mut map = Map::new(MapData::from_dataset(&surface), MapOptions::default());
    assert!(matches!(
        map.plot(time, Some(500.0), 1.0, 1.0),
        Err(FigureError::Usage(_))
    ));

    let upper = utils::small_dataset(GridKind::PressureLevels);
    let mut map = Map::new(MapData::from_dataset(&upper), MapOptions::default());
    assert!(matches!(map.plot(time, None, 1.0, 1.0), Err(FigureError::Usage(_))));

    let mut map = Map::new(MapData::Raw, MapOptions::default());
    assert!(matches!(
        map.plot(time, Some(500.0), 1.0, 1.0),
        Err(FigureError::Usage(_))
    ));
}

/// Writes a marker file and counts the calls.
struct WritingFetcher {
    calls: Cell<usize>,
    write: bool,
}

impl WritingFetcher {
    fn new(write: bool) -> Self {
        WritingFetcher {
            calls: Cell::new(0),
            write,
        }
    }
}

impl Fetch for WritingFetcher {
    fn fetch(&self, _request: &RetrievalRequest, target: &Path) -> FigureResult<()> {
        self.calls.set(self.calls.get() + 1);
        if self.write {
            std::fs::write(target, "retrieved")?;
        }
        Ok(())
    }
}

fn read_marker(opens: &Cell<usize>) -> impl Fn(&Path) -> FigureResult<String> + '_ {
    move |path: &Path| {
        opens.set(opens.get() + 1);
        Ok(std::fs::read_to_string(path)?)
    }
}

#[test]
fn test_fetch_once_then_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("era5/surface.nc");
    let request = RetrievalRequest::single_levels();

    let fetcher = WritingFetcher::new(true);
    let opens = Cell::new(0);
    let text = open_or_fetch(&path, &request, &fetcher, read_marker(&opens)).unwrap();
    assert_eq!(text, "retrieved");
    assert_eq!(fetcher.calls.get(), 1);
    assert_eq!(opens.get(), 1);

    // Now it exists, no more fetching.
    let text = open_or_fetch(&path, &request, &fetcher, read_marker(&opens)).unwrap();
    assert_eq!(text, "retrieved");
    assert_eq!(fetcher.calls.get(), 1);
    assert_eq!(opens.get(), 2);
}

#[test]
fn test_failed_fetch_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pressure.nc");
    let request = RetrievalRequest::pressure_levels();

    let fetcher = WritingFetcher::new(false);
    let opens = Cell::new(0);
    let result = open_or_fetch(&path, &request, &fetcher, read_marker(&opens));

    assert!(matches!(result, Err(FigureError::Io(_))));
    assert_eq!(fetcher.calls.get(), 1);
    assert_eq!(opens.get(), 1);
}

#[test]
fn test_micaps_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("20240427080000.000");

    let original = std::fs::read_to_string(utils::test_data("20240427080000.000")).unwrap();
    // Line breaks carry no meaning.
    std::fs::write(&path, original.split_whitespace().collect::<Vec<_>>().join("\n")).unwrap();

    let from_file = read_diamond5(&path).unwrap();
    let from_text = parse_diamond5(&original, "fixture").unwrap();
    assert_eq!(from_file.time, from_text.time);
    assert_eq!(from_file.stations.len(), from_text.stations.len());
    for (a, b) in from_file.stations.iter().zip(&from_text.stations) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.levels.len(), b.levels.len());
        for (la, lb) in a.levels.iter().zip(&b.levels) {
            for (va, vb) in la.iter().zip(lb) {
                assert!(va == vb || (va.is_nan() && vb.is_nan()));
            }
        }
    }

    let qy = from_file.station("59280").unwrap();
    assert_eq!(qy.levels.len(), 12);
    assert!(qy.levels[10][3].is_nan());
    assert_eq!(from_file.station("59316").unwrap().levels.len(), 2);
}

fn test_config(output: &Path) -> CaseConfig {
    let mut config = CaseConfig::default();
    config.output_dir = output.to_path_buf();
    config.station.path = utils::test_data("20240427080000.000");
    config.paths.surface = output.join("missing/surface.nc");
    config.paths.wrfout_dir = output.join("missing/wrfout");
    config
}

#[test]
fn test_station_skew_t_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = Inputs::new(test_config(dir.path()));

    let paths: Vec<PathBuf> = figures::draw(FigureId::P4_8, &inputs).unwrap();
    assert_eq!(paths.len(), 1);

    let path = &paths[0];
    assert_eq!(path.parent(), Some(dir.path()));
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("59280 清远 _ 2024-04-27 08_00 CST 单站探空数据.svg")
    );

    let svg = std::fs::read_to_string(path).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("SBCAPE"));
}

#[test]
fn test_missing_inputs_fail_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = Inputs::new(test_config(dir.path()));

    // No fetch command is configured.
    assert!(matches!(
        figures::draw(FigureId::P4_4, &inputs),
        Err(FigureError::Fetch(_))
    ));
    assert!(matches!(
        figures::draw(FigureId::P2_2, &inputs),
        Err(FigureError::MissingInput(_))
    ));

    let written = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().map_or(false, |ext| ext == "svg"))
        .count();
    assert_eq!(written, 0);
}
