use super::{find_parcel_start_data, ParcelAscentAnalysis, ParcelProfile};
use crate::{
    error::{AnalysisError, Result},
    interpolation::{linear_interp, linear_interpolate_sounding},
    parcel::Parcel,
    sounding::Sounding,
};
use itertools::{izip, Itertools};
use metfor::{self, Celsius, CelsiusDiff, HectoPascal, JpKg, Kelvin, Meters, Quantity};
use optional::{none, some, Optioned};
use std::cmp::Ordering;

pub(super) fn lift_parcel(parcel: Parcel, snd: &Sounding) -> Result<ParcelAscentAnalysis> {
    // Find the LCL
    let (pcl_lcl, lcl_temperature) = parcel_lcl(&parcel, snd)?;

    // The starting level to lift the parcel from
    let (parcel_start_data, parcel) = find_parcel_start_data(snd, &parcel)?;

    // How to calculate a parcel temperature for a given pressure level
    let parcel_calc_t = create_parcel_calc_t(parcel, pcl_lcl)?;
    let level_type_mapping = create_level_type_mapping(pcl_lcl);

    // The parcel profile has all the same pressure levels as the environmental sounding, plus
    // the special levels found along the way.
    let snd_pressure = snd.pressure_profile();
    let hgt = snd.height_profile();
    let env_t = snd.temperature_profile();
    let env_dp = snd.dew_point_profile();

    let mut pressure: Vec<HectoPascal> = Vec::with_capacity(snd_pressure.len() + 5);
    let mut height: Vec<Meters> = Vec::with_capacity(snd_pressure.len() + 5);
    let mut parcel_t: Vec<Celsius> = Vec::with_capacity(snd_pressure.len() + 5);
    let mut environment_t: Vec<Celsius> = Vec::with_capacity(snd_pressure.len() + 5);

    // Start by adding the parcel level
    let p0 = parcel.pressure;
    let h0 = parcel_start_data.height.ok_or(AnalysisError::MissingValue)?;
    let pcl_t0 = parcel.virtual_temperature().map(Celsius::from)?;
    let env_t0 = {
        let t = parcel_start_data
            .temperature
            .ok_or(AnalysisError::InterpolationError)?;
        let dp = parcel_start_data
            .dew_point
            .ok_or(AnalysisError::MissingValue)?;
        metfor::virtual_temperature(t, dp, p0)
            .map(Celsius::from)
            .ok_or(AnalysisError::MetForError)?
    };

    pressure.push(p0);
    height.push(h0);
    parcel_t.push(pcl_t0);
    environment_t.push(env_t0);

    let start_level = AnalLevel {
        pressure: p0,
        height: h0,
        pcl_virt_t: pcl_t0,
        env_virt_t: env_t0,
    };

    // A parcel warmer than its environment from the start is already above its LFC.
    let initial_lfc = if pcl_t0 > env_t0 {
        Some(start_level)
    } else {
        None
    };

    let (lfc, el): (Option<AnalLevel>, Option<AnalLevel>) = izip!(snd_pressure, hgt, env_t, env_dp)
        // Remove rows with missing data
        .filter(|(p, h, t, dp)| p.is_some() && h.is_some() && t.is_some() && dp.is_some())
        // Unpack from the `Optioned` type
        .map(|(p, h, t, dp)| (p.unpack(), h.unpack(), t.unpack(), dp.unpack()))
        // Remove rows at or below the parcel level
        .filter(move |(p, _, _, _)| *p < p0)
        // Calculate the parcel temperature, skip this level if there is an error
        .filter_map(|(p, h, env_t, env_dp)| {
            parcel_calc_t(p).map(|pcl_virt_t| (p, h, env_t, env_dp, pcl_virt_t))
        })
        // Calculate the environment virtual temperature, skip levels with errors
        .filter_map(|(p, h, env_t, env_dp, pcl_virt_t)| {
            metfor::virtual_temperature(env_t, env_dp, p)
                .map(|env_vt| (p, h, Celsius::from(env_vt), pcl_virt_t))
        })
        .map(|(pressure, height, env_virt_t, pcl_virt_t)| AnalLevel {
            pressure,
            height,
            pcl_virt_t,
            env_virt_t,
        })
        // Lift from the starting level through each sounding level
        .scan(start_level, |prev, lvl| {
            let pair = (*prev, lvl);
            *prev = lvl;
            Some(pair)
        })
        // Find the level type and insert special levels if needed.
        .flat_map(|(lvl0, lvl1)| level_type_mapping(lvl0, lvl1))
        // Add every level to the vectors.
        .map(|anal_level_type| {
            let level_data: &AnalLevel = anal_level_type.level();

            pressure.push(level_data.pressure);
            height.push(level_data.height);
            parcel_t.push(level_data.pcl_virt_t);
            environment_t.push(level_data.env_virt_t);

            anal_level_type
        })
        // Analyze the levels to find the LFC and EL
        .fold((initial_lfc, None), |acc, anal_level_type| {
            use AnalLevelType::*;

            let (mut lfc, mut el) = acc;

            match anal_level_type {
                Normal(_) | LCL(_) => {}
                LFC(level_data) => {
                    // A new positive area starts, any earlier EL was only the top of a lower one.
                    el = None;
                    lfc = Some(level_data);
                }
                EL(level_data) => {
                    if lfc.is_some() {
                        el = Some(level_data);
                    }
                }
            };

            (lfc, el)
        });

    let profile = ParcelProfile {
        pressure,
        height,
        parcel_t,
        environment_t,
    };

    // A parcel still buoyant at the top of the sounding has its EL at the top.
    let el = match (lfc, el) {
        (Some(_), None) => izip!(
            &profile.pressure,
            &profile.height,
            &profile.parcel_t,
            &profile.environment_t
        )
        .last()
        .map(|(&pressure, &height, &pcl_virt_t, &env_virt_t)| AnalLevel {
            pressure,
            height,
            pcl_virt_t,
            env_virt_t,
        }),
        (_, el) => el,
    };

    // Finalize the LCL variables.
    let lcl_pressure = some(pcl_lcl.pressure);
    let lcl_temperature = some(lcl_temperature);
    let lcl_height_agl: Optioned<Meters> = snd
        .surface_height()
        .map(|sfc| pcl_lcl.height - sfc)
        .into();

    // Finalize the LFC and EL levels.
    let (lfc_pressure, lfc_virt_temperature) = lfc
        .map(|lfc_level| (some(lfc_level.pressure), some(lfc_level.env_virt_t)))
        .unwrap_or((none(), none()));

    let (el_pressure, el_height_asl) = el
        .map(|el_level| (some(el_level.pressure), some(el_level.height)))
        .unwrap_or((none(), none()));

    let (cape, cin) = match cape_cin(&profile, lcl_pressure, lfc_pressure, el_pressure) {
        Ok((cape, cin)) => (some(cape), some(cin)),
        Err(_) => (none(), none()),
    };

    Ok(ParcelAscentAnalysis {
        parcel,
        profile,
        cape,
        cin,
        lcl_height_agl,
        lcl_pressure,
        lcl_temperature,
        el_pressure,
        el_height_asl,
        lfc_pressure,
        lfc_virt_temperature,
    })
}

// A level in the analysis
#[derive(Clone, Copy, Debug)]
struct AnalLevel {
    pressure: HectoPascal,
    height: Meters,
    pcl_virt_t: Celsius,
    env_virt_t: Celsius,
}

enum AnalLevelType {
    Normal(AnalLevel),
    LFC(AnalLevel),
    LCL(AnalLevel),
    EL(AnalLevel),
}

impl AnalLevelType {
    fn level(&self) -> &AnalLevel {
        use AnalLevelType::*;

        match self {
            Normal(data) | LFC(data) | LCL(data) | EL(data) => data,
        }
    }
}

struct AnalLevelTypeIterator {
    vals: [Option<AnalLevelType>; 4],
    next: usize,
}

fn parcel_lcl(parcel: &Parcel, snd: &Sounding) -> Result<(AnalLevel, Celsius)> {
    let (pressure, temperature) = metfor::pressure_and_temperature_at_lcl(
        parcel.temperature,
        parcel.dew_point,
        parcel.pressure,
    )
    .ok_or(AnalysisError::MetForError)?;

    let temperature = Celsius::from(temperature);
    let lcl_env = linear_interpolate_sounding(snd, pressure)?;
    let height = lcl_env.height.ok_or(AnalysisError::InterpolationError)?;
    let lcl_env_temperature = lcl_env
        .temperature
        .ok_or(AnalysisError::InterpolationError)?;
    let lcl_env_dp = lcl_env.dew_point.ok_or(AnalysisError::InterpolationError)?;
    let env_virt_t = Celsius::from(
        metfor::virtual_temperature(lcl_env_temperature, lcl_env_dp, pressure)
            .ok_or(AnalysisError::MetForError)?,
    );
    let pcl_virt_t = Celsius::from(
        metfor::virtual_temperature(temperature, temperature, pressure)
            .ok_or(AnalysisError::MetForError)?,
    );

    Ok((
        AnalLevel {
            pressure,
            height,
            pcl_virt_t,
            env_virt_t,
        },
        temperature,
    ))
}

fn create_parcel_calc_t(
    parcel: Parcel,
    lcl: AnalLevel,
) -> Result<impl Fn(HectoPascal) -> Option<Celsius>> {
    let theta = parcel.theta();
    let theta_e = parcel.theta_e()?;
    let dry_mw = parcel.mixing_ratio()?;

    Ok(move |tgt_pres| {
        if tgt_pres > lcl.pressure {
            // Dry adiabatic lifting
            let t_k = metfor::temperature_from_pot_temp(theta, tgt_pres);
            metfor::virtual_temperature(
                t_k,
                metfor::dew_point_from_p_and_mw(tgt_pres, dry_mw)?,
                tgt_pres,
            )
            .map(Celsius::from)
        } else {
            // Moist adiabatic lifting
            metfor::temperature_from_equiv_pot_temp_saturated_and_pressure(tgt_pres, theta_e)
                .and_then(|t_c| metfor::virtual_temperature(t_c, t_c, tgt_pres))
                .map(Celsius::from)
        }
    })
}

fn create_level_type_mapping(
    lcl_info: AnalLevel,
) -> impl Fn(AnalLevel, AnalLevel) -> AnalLevelTypeIterator {
    move |lvl0: AnalLevel, lvl1: AnalLevel| -> AnalLevelTypeIterator {
        let mut iter = AnalLevelTypeIterator::default();
        let mut next_idx = 0usize;

        iter.vals[next_idx] = Some(AnalLevelType::Normal(lvl1));
        next_idx += 1;

        let AnalLevel {
            pcl_virt_t: pt0,
            env_virt_t: et0,
            pressure: p0,
            height: h0,
        } = lvl0;

        let AnalLevel {
            pcl_virt_t: pt1,
            env_virt_t: et1,
            pressure: p1,
            height: h1,
        } = lvl1;

        // Crossing from negative to positive buoyancy is an LFC, from positive to negative an EL.
        let into_positive = pt0 <= et0 && pt1 > et1;
        let into_negative = pt0 >= et0 && pt1 < et1;
        if into_positive || into_negative {
            let tgt_p = linear_interp(CelsiusDiff(0.0), pt0 - et0, pt1 - et1, p0, p1);
            let tgt_t = linear_interp(CelsiusDiff(0.0), pt0 - et0, pt1 - et1, pt0, pt1);
            let tgt_h = linear_interp(CelsiusDiff(0.0), pt0 - et0, pt1 - et1, h0, h1);

            let tgt_level = AnalLevel {
                pressure: tgt_p,
                height: tgt_h,
                pcl_virt_t: tgt_t,
                env_virt_t: tgt_t,
            };

            let tgt_level_type = if into_positive {
                AnalLevelType::LFC(tgt_level)
            } else {
                AnalLevelType::EL(tgt_level)
            };

            iter.vals[next_idx] = Some(tgt_level_type);
            next_idx += 1;
        }

        // Check for the LCL, add it
        let AnalLevel {
            pressure: lcl_p, ..
        } = lcl_info;
        if p0 > lcl_p && p1 < lcl_p {
            iter.vals[next_idx] = Some(AnalLevelType::LCL(lcl_info));
        }

        // Sort the vals array in decreasing order by pressure
        iter.vals.sort_by(|a, b| {
            let pa = a
                .as_ref()
                .map(|a| a.level().pressure)
                .unwrap_or(HectoPascal(0.0));
            let pb = b
                .as_ref()
                .map(|b| b.level().pressure)
                .unwrap_or(HectoPascal(0.0));

            // swap order of b and a to get decreasing sort.
            pb.partial_cmp(&pa).unwrap_or(Ordering::Equal)
        });

        iter
    }
}

impl Iterator for AnalLevelTypeIterator {
    type Item = AnalLevelType;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < 4 {
            let item = self.vals[self.next].take();
            self.next += 1;
            if item.is_some() {
                return item;
            }
        }

        None
    }
}

impl Default for AnalLevelTypeIterator {
    fn default() -> Self {
        AnalLevelTypeIterator {
            vals: [None, None, None, None],
            next: 0,
        }
    }
}

/// Convective available potential energy and inhibition of a parcel in J/kg
///
/// Assumes the profile has virtual temperatures in it. CIN is only accumulated below the LFC and
/// a parcel without an LFC has neither.
fn cape_cin(
    profile: &ParcelProfile,
    lcl: Optioned<HectoPascal>,
    lfc: Optioned<HectoPascal>,
    el: Optioned<HectoPascal>,
) -> Result<(JpKg, JpKg)> {
    let lcl = lcl.into_option().ok_or(AnalysisError::MissingValue)?;

    let (lfc, el) = match (lfc.into_option(), el.into_option()) {
        // No cloud, no moist convection
        (Some(_), Some(el)) if el >= lcl => return Ok((JpKg(0.0), JpKg(0.0))),
        (Some(lfc), Some(el)) => (lfc, el),
        (None, _) => return Ok((JpKg(0.0), JpKg(0.0))),
        (Some(_), None) => return Err(AnalysisError::MissingValue),
    };

    let pressure = &profile.pressure;
    let height = &profile.height;
    let parcel_t = &profile.parcel_t;
    let env_t = &profile.environment_t;

    let (cape, cin) = izip!(pressure, height, parcel_t, env_t)
        .take_while(|(&p, _h, _pt, _et)| p >= el)
        .map(|(&p, &h, &pt, &et)| (p, h, Kelvin::from(pt), Kelvin::from(et)))
        .tuple_windows::<(_, _)>()
        .fold(
            (0.0, 0.0),
            |(mut cape, mut cin), ((_p0, h0, pt0, et0), (p1, h1, pt1, et1))| {
                let dz = h1 - h0;
                if dz <= Meters(0.0) {
                    return (cape, cin);
                }

                let bouyancy = ((pt1 - et1).unpack() / et1.unpack()
                    + (pt0 - et0).unpack() / et0.unpack())
                    * dz.unpack();
                if bouyancy > 0.0 && p1 <= lfc {
                    cape += bouyancy;
                } else if bouyancy < 0.0 && p1 >= lfc {
                    cin += bouyancy;
                }

                (cape, cin)
            },
        );

    Ok((
        JpKg(cape / 2.0 * -metfor::g),
        JpKg(cin / 2.0 * -metfor::g),
    ))
}
