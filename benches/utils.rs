use std::path::PathBuf;
use tornado_figures::{doctest::make_test_sounding, loaders::station_sounding, Sounding};

#[allow(dead_code)] // Not every bench uses soundings.
pub fn load_all_test_soundings() -> [Sounding; 2] {
    let snd1 = make_test_sounding();
    let snd2 = load_station_fixture();

    [snd1, snd2]
}

fn load_station_fixture() -> Sounding {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("data");
    path.push("20240427080000.000");

    station_sounding(&path, "59280", 1200.0)
        .unwrap_or_else(|err| panic!("Error loading {:#?}: {}", path, err))
}
