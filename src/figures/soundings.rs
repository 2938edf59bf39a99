//! Skew-T figures of the radiosonde and the two model soundings.
use super::Inputs;
use crate::{
    analysis::SoundingAnalysis,
    error::{AnalysisError, FigureResult},
    loaders::{column_at, station_sounding},
    map::TORNADO_LABEL,
    skewt::save_skew_t,
    sounding::Sounding,
};
use log::info;
use std::path::PathBuf;

fn draw(inputs: &Inputs, snd: &Sounding, title: &str) -> FigureResult<PathBuf> {
    let anal = SoundingAnalysis::analyze(snd);
    let path = inputs.output_path(title);
    save_skew_t(snd, &anal, title, &inputs.config().font_family, &path)?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// The Qingyuan radiosonde.
pub fn p4_8(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let station = &config.station;
    let snd = station_sounding(&station.path, &station.station_id, station.max_height_dam)?;

    let title = format!(
        "{} | {} 单站探空数据",
        config.station_label,
        config.short_title_time(config.station_time)
    );
    draw(inputs, &snd, &title)
}

/// The ERA5 column nearest Guangzhou.
pub fn p4_9(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let ds = inputs.single_station()?;
    let at = config.era5_station;
    let snd = column_at(ds, at.lat, at.lon, config.sounding_time)?;

    let title = format!(
        "{} | {} 单站模式探空数据",
        config.era5_station_label,
        config.short_title_time(config.sounding_time)
    );
    draw(inputs, &snd, &title)
}

/// The WRF column nearest the tornado.
pub fn p4_10(inputs: &Inputs) -> FigureResult<PathBuf> {
    let config = inputs.config();
    let wrf = inputs.wrf_sounding()?;
    let (j, i) = wrf
        .nearest(config.tornado.lat, config.tornado.lon)
        .ok_or(AnalysisError::MissingValue)?;
    let snd = wrf.column_sounding(j, i)?;

    let title = format!(
        "{} | {} WRF 模拟数据",
        TORNADO_LABEL,
        config.short_title_time(config.sounding_time)
    );
    draw(inputs, &snd, &title)
}
