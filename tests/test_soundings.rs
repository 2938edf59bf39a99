#[macro_use]
mod utils;

use approx::assert_abs_diff_eq;
use metfor::{HectoPascal, JpKg, Meters};
use tornado_figures::{
    doctest::make_test_sounding, k_index, lift_parcel, surface_parcel, total_totals, PanelValue,
    SoundingAnalysis,
};

parcel_path_domain!(standard_atmosphere_parcel_path, utils::standard_atmosphere());
parcel_path_domain!(station_parcel_path, utils::load_station_sounding());
parcel_path_domain!(subtropical_parcel_path, make_test_sounding());

#[test]
fn test_standard_atmosphere_indexes() {
    let snd = utils::standard_atmosphere();

    // T850 = 5.5295, T700 = -4.578, T500 = -21.231 and Td = T - 20.
    assert_abs_diff_eq!(k_index(&snd).unwrap(), -7.71, epsilon = 1.0e-6);
    assert_abs_diff_eq!(total_totals(&snd).unwrap(), 33.521, epsilon = 1.0e-6);
}

#[test]
fn test_standard_atmosphere_is_stable() {
    let snd = utils::standard_atmosphere();
    let anal = lift_parcel(surface_parcel(&snd).unwrap(), &snd).unwrap();

    assert_eq!(anal.cape().unwrap(), JpKg(0.0));
    assert_eq!(anal.cin().unwrap(), JpKg(0.0));
    assert!(anal.lfc_pressure().is_none());

    // A 20 K dew point depression puts the LCL roughly 2.5 km above the ground.
    let lcl = anal.lcl_height_agl().unwrap();
    assert!(lcl > Meters(2000.0) && lcl < Meters(3000.0), "{:?}", lcl);

    let summary = SoundingAnalysis::analyze(&snd);
    assert_abs_diff_eq!(summary.value(PanelValue::SBCAPE).unwrap(), 0.0);
    assert_abs_diff_eq!(summary.value(PanelValue::K).unwrap(), -7.71, epsilon = 1.0e-6);
}

#[test]
fn test_station_fixture() {
    let snd = utils::load_station_sounding();

    // 200 hPa and above are higher than 1200 dam.
    let pressure: Vec<_> = snd.pressure_profile().iter().map(|p| p.unwrap()).collect();
    assert_eq!(pressure.len(), 9);
    assert_eq!(pressure[0], HectoPascal(1006.0));
    assert_eq!(pressure[8], HectoPascal(250.0));

    assert_eq!(snd.height_profile()[0].unwrap(), Meters(20.0));
    assert!(snd.wind_profile()[7].is_none());
    assert_eq!(snd.station_info().station_num().unwrap(), 59280);
    assert_eq!(
        snd.valid_time().unwrap().to_string(),
        "2024-04-27 08:00:00"
    );
}

#[test]
fn test_station_analysis() {
    let snd = utils::load_station_sounding();
    let anal = SoundingAnalysis::analyze(&snd);

    // (18.5 - -7.5) + 15.5 - (8 - 2)
    assert_abs_diff_eq!(anal.value(PanelValue::K).unwrap(), 35.5, epsilon = 1.0e-9);
    // 18.5 + 15.5 - 2 * -7.5
    assert_abs_diff_eq!(anal.value(PanelValue::TotalTotals).unwrap(), 49.0, epsilon = 1.0e-9);

    // A moist afternoon profile over South China is unstable from the surface.
    assert!(anal.value(PanelValue::SBCAPE).unwrap() > 0.0);
    assert!(anal.storm_motion().is_some());
}

#[test]
fn test_subtropical_sounding_is_unstable() {
    let snd = make_test_sounding();
    let anal = SoundingAnalysis::analyze(&snd);

    let sbcape = anal.value(PanelValue::SBCAPE).unwrap();
    let mucape = anal.value(PanelValue::MUCAPE).unwrap();
    assert!(sbcape > 100.0);
    assert!(mucape > 0.0);

    for key in &[PanelValue::SRH0to1km, PanelValue::Shear0to1km, PanelValue::Shear0to6km] {
        assert!(anal.value(*key).is_some(), "{}", key);
    }
}
