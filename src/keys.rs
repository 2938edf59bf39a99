//! Enums used as keys for the values shown in a sounding parameter panel.
use strum_macros::{Display, EnumIter};

/// The entries of the severe weather parameter panel, in display order.
///
/// The `Display` implementation gives the label printed in the panel.
///
/// # Examples
///
/// ```rust
/// use strum::IntoEnumIterator;
/// use tornado_figures::PanelValue;
///
/// assert_eq!(PanelValue::SBCAPE.to_string(), "SBCAPE");
/// assert_eq!(PanelValue::SRH0to1km.to_string(), "0-1km SRH");
/// assert_eq!(PanelValue::iter().count(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PanelValue {
    /// Surface based CAPE (J/kg)
    #[strum(to_string = "SBCAPE")]
    SBCAPE,
    /// Surface based CIN (J/kg)
    #[strum(to_string = "SBCIN")]
    SBCIN,
    /// Mixed layer CAPE (J/kg)
    #[strum(to_string = "MLCAPE")]
    MLCAPE,
    /// Mixed layer CIN (J/kg)
    #[strum(to_string = "MLCIN")]
    MLCIN,
    /// Most unstable CAPE (J/kg)
    #[strum(to_string = "MUCAPE")]
    MUCAPE,
    /// Most unstable CIN (J/kg)
    #[strum(to_string = "MUCIN")]
    MUCIN,
    /// Total-Totals
    #[strum(to_string = "TT-INDEX")]
    TotalTotals,
    /// K-index
    #[strum(to_string = "K-INDEX")]
    K,
    /// 0-1 km storm relative helicity (m²/s²)
    #[strum(to_string = "0-1km SRH")]
    SRH0to1km,
    /// 0-1 km bulk shear (m/s)
    #[strum(to_string = "0-1km SHEAR")]
    Shear0to1km,
    /// 0-3 km storm relative helicity (m²/s²)
    #[strum(to_string = "0-3km SRH")]
    SRH0to3km,
    /// 0-3 km bulk shear (m/s)
    #[strum(to_string = "0-3km SHEAR")]
    Shear0to3km,
    /// 0-6 km storm relative helicity (m²/s²)
    #[strum(to_string = "0-6km SRH")]
    SRH0to6km,
    /// 0-6 km bulk shear (m/s)
    #[strum(to_string = "0-6km SHEAR")]
    Shear0to6km,
    /// Significant tornado parameter
    #[strum(to_string = "SIG TORNADO")]
    SignificantTornado,
    /// Supercell composite parameter
    #[strum(to_string = "SUPERCELL COMP")]
    SupercellComposite,
}

impl PanelValue {
    /// The unit printed after the value, empty for dimensionless values.
    pub fn units(self) -> &'static str {
        use PanelValue::*;

        match self {
            SBCAPE | SBCIN | MLCAPE | MLCIN | MUCAPE | MUCIN => "J/kg",
            TotalTotals | K => "°C",
            SRH0to1km | SRH0to3km | SRH0to6km => "m²/s²",
            Shear0to1km | Shear0to3km | Shear0to6km => "m/s",
            SignificantTornado | SupercellComposite => "",
        }
    }

    /// Thermodynamic values go in the left column of the panel, kinematic ones in the right.
    pub fn is_thermodynamic(self) -> bool {
        use PanelValue::*;

        matches!(
            self,
            SBCAPE | SBCIN | MLCAPE | MLCIN | MUCAPE | MUCIN | TotalTotals | K
        )
    }
}
