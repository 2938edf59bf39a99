//! The figures of the case study.
//!
//! Each figure is drawn by one function that takes the shared [`Inputs`] and returns the path of
//! the SVG file it wrote. The files are named after the figure titles.
use crate::{
    boundaries::Boundaries,
    config::CaseConfig,
    error::{FigureError, FigureResult},
    grid::GriddedDataset,
    loaders::{
        era5, open_or_fetch, wrf_path, CommandFetcher, Fetch, NoFetcher, RetrievalRequest,
        WrfOutput,
    },
    map::{Map, MapOptions},
};
use chrono::NaiveDateTime;
use log::{debug, info};
use std::{
    cell::OnceCell,
    path::{Path, PathBuf},
};
use strum_macros::{Display, EnumIter, EnumString};

mod era5_maps;
mod soundings;
mod wrf_maps;

pub use self::{
    era5_maps::{p4_1, p4_2, p4_3, p4_4, p4_5a, p4_5b, p4_6, p4_7_layer1, p4_7_layer2},
    soundings::{p4_10, p4_8, p4_9},
    wrf_maps::{p2_2, p4_11, p4_12},
};

/// Font size of the map titles, points.
const TITLE_SIZE: f64 = 20.0;

/// The figures, named as on the command line.
///
/// # Examples
///
/// ```rust
/// use std::str::FromStr;
/// use strum::IntoEnumIterator;
/// use tornado_figures::figures::FigureId;
///
/// assert_eq!(FigureId::from_str("p4_5a").unwrap(), FigureId::P4_5a);
/// assert_eq!(FigureId::P4_7Layer2.to_string(), "p4_7_layer2");
/// assert_eq!(FigureId::iter().count(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum FigureId {
    /// WRF 300 m above ground reflectivity.
    #[strum(to_string = "p2_2")]
    P2_2,
    /// 500 hPa synoptic chart.
    #[strum(to_string = "p4_1")]
    P4_1,
    /// 700 hPa synoptic chart.
    #[strum(to_string = "p4_2")]
    P4_2,
    /// 850 hPa synoptic chart.
    #[strum(to_string = "p4_3")]
    P4_3,
    /// Sea level synoptic chart.
    #[strum(to_string = "p4_4")]
    P4_4,
    /// Vertically integrated water vapour flux.
    #[strum(to_string = "p4_5a")]
    P4_5a,
    /// Divergence of the vertically integrated water vapour flux.
    #[strum(to_string = "p4_5b")]
    P4_5b,
    /// CAPE over South China.
    #[strum(to_string = "p4_6")]
    P4_6,
    /// Mesoscale analysis, moist and dry zones.
    #[strum(to_string = "p4_7_layer1")]
    P4_7Layer1,
    /// Mesoscale analysis, heights and streamlines of every analysis level.
    #[strum(to_string = "p4_7_layer2")]
    P4_7Layer2,
    /// Radiosonde skew-T.
    #[strum(to_string = "p4_8")]
    P4_8,
    /// ERA5 model sounding skew-T.
    #[strum(to_string = "p4_9")]
    P4_9,
    /// WRF model sounding skew-T.
    #[strum(to_string = "p4_10")]
    P4_10,
    /// WRF 1 km absolute vorticity and the cross section path.
    #[strum(to_string = "p4_11")]
    P4_11,
    /// WRF 1 km reflectivity with wind speed and reflectivity cross sections.
    #[strum(to_string = "p4_12")]
    P4_12,
}

/// Draw a figure, returning every file written.
pub fn draw(id: FigureId, inputs: &Inputs) -> FigureResult<Vec<PathBuf>> {
    debug!("drawing {}", id);
    let one = |path: FigureResult<PathBuf>| path.map(|p| vec![p]);

    match id {
        FigureId::P2_2 => one(p2_2(inputs)),
        FigureId::P4_1 => one(p4_1(inputs)),
        FigureId::P4_2 => one(p4_2(inputs)),
        FigureId::P4_3 => one(p4_3(inputs)),
        FigureId::P4_4 => one(p4_4(inputs)),
        FigureId::P4_5a => one(p4_5a(inputs)),
        FigureId::P4_5b => one(p4_5b(inputs)),
        FigureId::P4_6 => one(p4_6(inputs)),
        FigureId::P4_7Layer1 => one(p4_7_layer1(inputs)),
        FigureId::P4_7Layer2 => inputs
            .config()
            .analysis_levels
            .iter()
            .map(|&level| p4_7_layer2(inputs, level))
            .collect(),
        FigureId::P4_8 => one(p4_8(inputs)),
        FigureId::P4_9 => one(p4_9(inputs)),
        FigureId::P4_10 => one(p4_10(inputs)),
        FigureId::P4_11 => one(p4_11(inputs)),
        FigureId::P4_12 => one(p4_12(inputs)),
    }
}

/// The configuration and the datasets shared by the figures.
///
/// Every dataset is read the first time a figure asks for it and kept for the rest of the run.
pub struct Inputs {
    config: CaseConfig,
    fetcher: Box<dyn Fetch>,
    boundaries: OnceCell<Boundaries>,
    surface: OnceCell<GriddedDataset>,
    geopotential: OnceCell<GriddedDataset>,
    single_station: OnceCell<GriddedDataset>,
    wrf_sounding: OnceCell<WrfOutput>,
    wrf_outer: OnceCell<WrfOutput>,
    wrf_inner: OnceCell<WrfOutput>,
}

impl Inputs {
    /// Inputs for a configuration, fetching missing ERA5 files with its fetch command if it has
    /// one.
    pub fn new(config: CaseConfig) -> Self {
        let fetcher: Box<dyn Fetch> = match config
            .fetch_command
            .as_deref()
            .and_then(CommandFetcher::from_command_line)
        {
            Some(fetcher) => Box::new(fetcher),
            None => Box::new(NoFetcher),
        };
        Self::with_fetcher(config, fetcher)
    }

    /// Inputs that fetch missing ERA5 files with `fetcher`.
    pub fn with_fetcher(config: CaseConfig, fetcher: Box<dyn Fetch>) -> Self {
        Inputs {
            config,
            fetcher,
            boundaries: OnceCell::new(),
            surface: OnceCell::new(),
            geopotential: OnceCell::new(),
            single_station: OnceCell::new(),
            wrf_sounding: OnceCell::new(),
            wrf_outer: OnceCell::new(),
            wrf_inner: OnceCell::new(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &CaseConfig {
        &self.config
    }

    /// The boundary layers, missing layers are left empty.
    pub fn boundaries(&self) -> &Boundaries {
        self.boundaries
            .get_or_init(|| Boundaries::load(&self.config.boundaries))
    }

    /// ERA5 single level fields.
    pub fn surface(&self) -> FigureResult<&GriddedDataset> {
        cached(&self.surface, || {
            open_or_fetch(
                &self.config.paths.surface,
                &RetrievalRequest::single_levels(),
                self.fetcher.as_ref(),
                era5::open_surface,
            )
        })
    }

    /// ERA5 pressure level fields.
    pub fn geopotential(&self) -> FigureResult<&GriddedDataset> {
        cached(&self.geopotential, || {
            open_or_fetch(
                &self.config.paths.geopotential,
                &RetrievalRequest::pressure_levels(),
                self.fetcher.as_ref(),
                era5::open_pressure_levels,
            )
        })
    }

    /// ERA5 pressure level columns around Guangzhou.
    pub fn single_station(&self) -> FigureResult<&GriddedDataset> {
        cached(&self.single_station, || {
            open_or_fetch(
                &self.config.paths.single_station,
                &RetrievalRequest::single_station(),
                self.fetcher.as_ref(),
                era5::open_single_station,
            )
        })
    }

    /// The outer WRF domain at the model sounding time.
    pub fn wrf_sounding(&self) -> FigureResult<&WrfOutput> {
        let config = &self.config;
        cached(&self.wrf_sounding, || {
            self.open_wrf(config.outer_domain, config.sounding_time)
        })
    }

    /// The outer WRF domain at the reflectivity time.
    pub fn wrf_outer(&self) -> FigureResult<&WrfOutput> {
        let config = &self.config;
        cached(&self.wrf_outer, || self.open_wrf(config.outer_domain, config.wrf_time))
    }

    /// The inner WRF domain at the reflectivity time.
    pub fn wrf_inner(&self) -> FigureResult<&WrfOutput> {
        let config = &self.config;
        cached(&self.wrf_inner, || self.open_wrf(config.inner_domain, config.wrf_time))
    }

    fn open_wrf(&self, domain: u8, time: NaiveDateTime) -> FigureResult<WrfOutput> {
        let path = wrf_path(&self.config.paths.wrfout_dir, domain, time);
        let out = WrfOutput::open(&path)?;
        info!("loaded {}", path.display());
        Ok(out)
    }

    /// Map options with the configured font and tornado location.
    pub fn map_options(&self) -> MapOptions {
        MapOptions::default()
            .font_family(self.config.font_family.clone())
            .tornado(self.config.tornado.pair())
    }

    /// Where a figure with this title is written.
    pub fn output_path(&self, title: &str) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}.svg", file_name(title)))
    }

    /// Save a finished map.
    fn save_map(&self, map: Map, path: PathBuf) -> FigureResult<PathBuf> {
        map.save(&path)?;
        info!("wrote {}", path.display());
        Ok(path)
    }
}

fn cached<'a, T, F>(cell: &'a OnceCell<T>, load: F) -> FigureResult<&'a T>
where
    F: FnOnce() -> FigureResult<T>,
{
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = load()?;
    Ok(cell.get_or_init(|| value))
}

/// A title with the characters that are not allowed in file names replaced.
///
/// # Examples
///
/// ```rust
/// use tornado_figures::figures::file_name;
///
/// assert_eq!(
///     file_name("59280 清远 | 2024-04-27 08:00 CST 单站探空数据"),
///     "59280 清远 _ 2024-04-27 08_00 CST 单站探空数据"
/// );
/// ```
pub fn file_name(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Fail unless the figure has somewhere to go.
pub fn ensure_output_dir(dir: &Path) -> FigureResult<()> {
    std::fs::create_dir_all(dir)?;
    if dir.is_dir() {
        Ok(())
    } else {
        Err(FigureError::Usage(format!(
            "{} is not a directory",
            dir.display()
        )))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{cell::Cell, rc::Rc};
    use strum::IntoEnumIterator;

    struct CountingFetcher {
        calls: Rc<Cell<usize>>,
    }

    impl Fetch for CountingFetcher {
        fn fetch(&self, _request: &RetrievalRequest, _target: &Path) -> FigureResult<()> {
            self.calls.set(self.calls.get() + 1);
            Err(FigureError::Fetch("offline".to_owned()))
        }
    }

    fn offline_inputs(dir: &Path) -> (Inputs, Rc<Cell<usize>>) {
        let mut config = CaseConfig::default();
        config.paths.surface = dir.join("surface.nc");
        config.paths.geopotential = dir.join("geopotential.nc");
        config.paths.single_station = dir.join("single_station.nc");
        config.paths.wrfout_dir = dir.join("wrfout");
        config.station.path = dir.join("TLOGP/20240427080000.000");
        config.output_dir = dir.join("images");

        let calls = Rc::new(Cell::new(0));
        let fetcher = CountingFetcher {
            calls: Rc::clone(&calls),
        };
        (Inputs::with_fetcher(config, Box::new(fetcher)), calls)
    }

    #[test]
    fn test_names_round_trip() {
        for id in FigureId::iter() {
            let name = id.to_string();
            assert_eq!(name.parse::<FigureId>().unwrap(), id);
        }
        assert!("p9_9".parse::<FigureId>().is_err());
    }

    #[test]
    fn test_missing_era5_is_fetched_once_per_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let (inputs, calls) = offline_inputs(dir.path());

        assert!(matches!(inputs.surface(), Err(FigureError::Fetch(_))));
        assert_eq!(calls.get(), 1);
        assert!(matches!(draw(FigureId::P4_4, &inputs), Err(FigureError::Fetch(_))));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_missing_inputs_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (inputs, calls) = offline_inputs(dir.path());

        assert!(matches!(
            draw(FigureId::P4_8, &inputs),
            Err(FigureError::LicensedDataMissing(_))
        ));
        assert!(matches!(
            draw(FigureId::P2_2, &inputs),
            Err(FigureError::MissingInput(_))
        ));
        // Neither of these is retrieved automatically.
        assert_eq!(calls.get(), 0);
        assert!(!inputs.output_path("x").exists());
    }

    #[test]
    fn test_output_path() {
        let (inputs, _) = offline_inputs(Path::new("/tmp/case"));
        assert_eq!(
            inputs.output_path("2024-04-27 13:00:00 CST 500hPa"),
            Path::new("/tmp/case/images/2024-04-27 13_00_00 CST 500hPa.svg")
        );
    }
}
