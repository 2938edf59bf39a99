//! Geographic boundaries drawn on the maps.
//!
//! Every layer is read from a shapefile. Administrative layers keep only the records whose
//! attribute table matches a name filter. A missing file, an unreadable file or a filter that
//! matches nothing leaves the layer empty and logs a warning, the maps are drawn without it.
use crate::error::FigureResult;
use log::{info, warn};
use serde::Deserialize;
use shapefile::{dbase::FieldValue, Shape};
use std::path::{Path, PathBuf};

/// A closed ring or an open line of `(longitude, latitude)` points.
pub type Ring = Vec<(f64, f64)>;

/// Provinces and special administrative regions drawn on the regional maps.
pub const PROVINCE_NAMES: &[&str] = &["广东省", "香港特别行政区", "澳门特别行政区"];

/// The city containing the tornado.
pub const CITY_NAME: &str = "广州市";

/// The district containing the tornado.
pub const DISTRICT_NAME: &str = "白云区";

/// An attribute filter, every field must hold one of its allowed values.
#[derive(Debug, Clone, Copy)]
pub struct NameFilter<'a> {
    /// `(field name, allowed values)` pairs.
    pub fields: &'a [(&'a str, &'a [&'a str])],
}

impl<'a> NameFilter<'a> {
    /// A filter that keeps every record.
    pub const ALL: NameFilter<'static> = NameFilter { fields: &[] };

    /// Check a record, `lookup` returns the text value of a field.
    pub fn matches<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.fields.iter().all(|(field, allowed)| match lookup(field) {
            Some(value) => allowed.iter().any(|a| value.trim() == *a),
            None => false,
        })
    }
}

const PROVINCE_FILTER: NameFilter<'static> = NameFilter {
    fields: &[("pr_name", PROVINCE_NAMES)],
};

const CITY_FILTER: NameFilter<'static> = NameFilter {
    fields: &[("ct_name", &[CITY_NAME])],
};

const DISTRICT_FILTER: NameFilter<'static> = NameFilter {
    fields: &[("ct_name", &[CITY_NAME]), ("dt_name", &[DISTRICT_NAME])],
};

/// Locations of the boundary shapefiles.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoundaryFiles {
    /// Natural Earth coastline.
    pub coastline: PathBuf,
    /// Natural Earth land polygons.
    pub land: PathBuf,
    /// Natural Earth ocean polygons.
    pub ocean: PathBuf,
    /// Province polygons with a `pr_name` attribute.
    pub province: PathBuf,
    /// City polygons with a `ct_name` attribute.
    pub city: PathBuf,
    /// District polygons with `ct_name` and `dt_name` attributes.
    pub district: PathBuf,
}

impl Default for BoundaryFiles {
    fn default() -> Self {
        let shapes = PathBuf::from("data/shapefile");
        BoundaryFiles {
            coastline: shapes.join("ne_10m_coastline.shp"),
            land: shapes.join("ne_10m_land.shp"),
            ocean: shapes.join("ne_10m_ocean.shp"),
            province: shapes.join("province.shp"),
            city: shapes.join("city.shp"),
            district: shapes.join("district.shp"),
        }
    }
}

/// All boundary layers, in geodetic coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundaries {
    /// Coastlines.
    pub coastline: Vec<Ring>,
    /// Land polygons.
    pub land: Vec<Ring>,
    /// Ocean polygons.
    pub ocean: Vec<Ring>,
    /// Guangdong, Hong Kong and Macao.
    pub province: Vec<Ring>,
    /// Guangzhou.
    pub city: Vec<Ring>,
    /// Baiyun district.
    pub district: Vec<Ring>,
}

impl Boundaries {
    /// Load every layer, layers that cannot be loaded are left empty.
    pub fn load(files: &BoundaryFiles) -> Self {
        Boundaries {
            coastline: load_layer("coastline", &files.coastline, NameFilter::ALL),
            land: load_layer("land", &files.land, NameFilter::ALL),
            ocean: load_layer("ocean", &files.ocean, NameFilter::ALL),
            province: load_layer("province", &files.province, PROVINCE_FILTER),
            city: load_layer("city", &files.city, CITY_FILTER),
            district: load_layer("district", &files.district, DISTRICT_FILTER),
        }
    }

    /// `true` if no layer has any geometry.
    pub fn is_empty(&self) -> bool {
        self.coastline.is_empty()
            && self.land.is_empty()
            && self.ocean.is_empty()
            && self.province.is_empty()
            && self.city.is_empty()
            && self.district.is_empty()
    }
}

fn load_layer(name: &str, path: &Path, filter: NameFilter) -> Vec<Ring> {
    if !path.exists() {
        warn!("{} boundaries not drawn, {} not found", name, path.display());
        return vec![];
    }

    match read_rings(path, filter) {
        Ok(rings) if rings.is_empty() => {
            warn!(
                "{} boundaries not drawn, no records in {} match {:?}",
                name,
                path.display(),
                filter.fields
            );
            rings
        }
        Ok(rings) => {
            info!("loaded {} {} rings from {}", rings.len(), name, path.display());
            rings
        }
        Err(err) => {
            warn!("{} boundaries not drawn: {}", name, err);
            vec![]
        }
    }
}

/// Read the rings and parts of every matching record in a shapefile.
pub fn read_rings(path: &Path, filter: NameFilter) -> FigureResult<Vec<Ring>> {
    let mut reader = shapefile::Reader::from_path(path)?;

    let mut rings = vec![];
    for shape_record in reader.iter_shapes_and_records() {
        let (shape, record) = shape_record?;

        let keep = filter.matches(|field| match record.get(field) {
            Some(FieldValue::Character(Some(text))) => Some(text.clone()),
            Some(FieldValue::Memo(text)) => Some(text.clone()),
            _ => None,
        });
        if keep {
            rings.extend(shape_rings(&shape));
        }
    }

    Ok(rings)
}

fn shape_rings(shape: &Shape) -> Vec<Ring> {
    macro_rules! rings {
        ($parts:expr) => {
            $parts
                .map(|pnts| pnts.iter().map(|p| (p.x, p.y)).collect::<Ring>())
                .filter(|ring| ring.len() > 1)
                .collect()
        };
    }

    match shape {
        Shape::Polygon(poly) => rings!(poly.rings().iter().map(|r| r.points())),
        Shape::PolygonM(poly) => rings!(poly.rings().iter().map(|r| r.points())),
        Shape::PolygonZ(poly) => rings!(poly.rings().iter().map(|r| r.points())),
        Shape::Polyline(line) => rings!(line.parts().iter()),
        Shape::PolylineM(line) => rings!(line.parts().iter()),
        Shape::PolylineZ(line) => rings!(line.parts().iter()),
        _ => vec![],
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn record(fields: &[(&str, &str)]) -> HashMap<String, String> {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_province_filter() {
        let gd = record(&[("pr_name", "广东省")]);
        let hk = record(&[("pr_name", "香港特别行政区 ")]);
        let gx = record(&[("pr_name", "广西壮族自治区")]);

        assert!(PROVINCE_FILTER.matches(|f| gd.get(f).cloned()));
        assert!(PROVINCE_FILTER.matches(|f| hk.get(f).cloned()));
        assert!(!PROVINCE_FILTER.matches(|f| gx.get(f).cloned()));
    }

    #[test]
    fn test_district_filter_needs_both_fields() {
        let baiyun = record(&[("ct_name", "广州市"), ("dt_name", "白云区")]);
        let tianhe = record(&[("ct_name", "广州市"), ("dt_name", "天河区")]);
        let no_city = record(&[("dt_name", "白云区")]);

        assert!(DISTRICT_FILTER.matches(|f| baiyun.get(f).cloned()));
        assert!(!DISTRICT_FILTER.matches(|f| tianhe.get(f).cloned()));
        assert!(!DISTRICT_FILTER.matches(|f| no_city.get(f).cloned()));
        assert!(CITY_FILTER.matches(|f| tianhe.get(f).cloned()));
    }

    #[test]
    fn test_all_filter() {
        assert!(NameFilter::ALL.matches(|_| None));
    }

    #[test]
    fn test_missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = BoundaryFiles {
            coastline: dir.path().join("coast.shp"),
            land: dir.path().join("land.shp"),
            ocean: dir.path().join("ocean.shp"),
            province: dir.path().join("province.shp"),
            city: dir.path().join("city.shp"),
            district: dir.path().join("district.shp"),
        };

        let boundaries = Boundaries::load(&files);
        assert!(boundaries.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("city.shp");
        std::fs::write(&path, b"not a shapefile").unwrap();

        assert!(read_rings(&path, CITY_FILTER).is_err());
        assert!(load_layer("city", &path, CITY_FILTER).is_empty());
    }
}
