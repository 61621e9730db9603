//! Supported SST product types and their source variables.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sst_common::{grids, Grid, GridDef, YFlip};

use crate::context::AggregationContext;
use crate::error::{AggregationError, Result};

/// Depth the SST of a product refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SstDepth {
    #[default]
    #[serde(rename = "skin")]
    Skin,
    #[serde(rename = "depth_20")]
    Depth20,
    #[serde(rename = "depth_100")]
    Depth100,
}

impl SstDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skin => "skin",
            Self::Depth20 => "depth_20",
            Self::Depth100 => "depth_100",
        }
    }
}

impl fmt::Display for SstDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SstDepth {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skin" => Ok(Self::Skin),
            "depth_20" => Ok(Self::Depth20),
            "depth_100" => Ok(Self::Depth100),
            _ => Err(AggregationError::invalid_argument(format!(
                "unknown SST depth '{}'",
                s
            ))),
        }
    }
}

/// Physical quantities read from a product file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Sst,
    Quality,
    RandomUncertainty,
    LargeScaleUncertainty,
    AdjustmentUncertainty,
    SynopticUncertainty,
    SeaIceFraction,
}

/// A variable in a product file, with the index of the layer to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: &'static str,
    pub layer: usize,
}

impl Variable {
    const fn new(name: &'static str) -> Self {
        Self { name, layer: 0 }
    }

    const fn layer(name: &'static str, layer: usize) -> Self {
        Self { name, layer }
    }
}

/// Reads variables of one product file as north-up or south-up grids.
///
/// `Ok(None)` means the file does not carry the variable.
pub trait VariableReader {
    fn read(&self, variable: &Variable) -> Result<Option<Arc<dyn Grid>>>;
}

impl VariableReader for HashMap<Variable, Arc<dyn Grid>> {
    fn read(&self, variable: &Variable) -> Result<Option<Arc<dyn Grid>>> {
        Ok(self.get(variable).cloned())
    }
}

/// The closed set of supported products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    /// ARC L3U, 0.1° daily files
    #[serde(rename = "ARC_L3U")]
    ArcL3U,
    /// SST CCI L3U, 0.05°
    #[serde(rename = "CCI_L3U")]
    CciL3U,
    /// SST CCI L3C, 0.05°
    #[serde(rename = "CCI_L3C")]
    CciL3C,
    /// SST CCI L4 analysis, 0.05°
    #[serde(rename = "CCI_L4")]
    CciL4,
}

impl ProductType {
    pub fn all() -> [ProductType; 4] {
        [Self::ArcL3U, Self::CciL3U, Self::CciL3C, Self::CciL4]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArcL3U => "ARC_L3U",
            Self::CciL3U => "CCI_L3U",
            Self::CciL3C => "CCI_L3C",
            Self::CciL4 => "CCI_L4",
        }
    }

    /// Grid the product's variables are defined on.
    pub fn grid_def(&self) -> GridDef {
        match self {
            Self::ArcL3U => grids::arc_0p1(),
            Self::CciL3U | Self::CciL3C | Self::CciL4 => grids::cci_0p05(),
        }
    }

    fn is_cci_l3(&self) -> bool {
        matches!(self, Self::CciL3U | Self::CciL3C)
    }

    /// L3 products flag pixel quality; only the best level is used.
    pub fn has_quality_levels(&self) -> bool {
        self.is_cci_l3()
    }

    /// Products carrying synoptically correlated and adjustment
    /// uncertainties.
    pub fn has_synoptic_uncertainty(&self) -> bool {
        self.is_cci_l3()
    }

    /// L3 files are stored south-up.
    pub fn is_south_up(&self) -> bool {
        self.is_cci_l3()
    }

    /// Source variable of a quantity, if the product has one.
    pub fn variable(&self, quantity: Quantity, depth: SstDepth) -> Option<Variable> {
        use Quantity::*;
        match (self, quantity) {
            (Self::ArcL3U, Sst) => Some(match depth {
                SstDepth::Skin => Variable::new("sst_skin"),
                SstDepth::Depth20 => Variable::layer("sst_depth", 0),
                SstDepth::Depth100 => Variable::layer("sst_depth", 1),
            }),
            (Self::ArcL3U, RandomUncertainty) => Some(Variable::new("uncertainty")),
            (Self::ArcL3U, _) => None,

            (Self::CciL4, Sst) => Some(Variable::new("analysed_sst")),
            (Self::CciL4, RandomUncertainty) => Some(Variable::new("analysis_error")),
            (Self::CciL4, SeaIceFraction) => Some(Variable::new("sea_ice_fraction")),
            (Self::CciL4, _) => None,

            (_, Sst) => Some(match depth {
                SstDepth::Skin => Variable::new("sea_surface_temperature"),
                SstDepth::Depth20 | SstDepth::Depth100 => {
                    Variable::new("sea_surface_temperature_depth")
                }
            }),
            (_, Quality) => Some(Variable::new("quality_level")),
            (_, RandomUncertainty) => Some(Variable::new("uncorrelated_uncertainty")),
            (_, LargeScaleUncertainty) => Some(Variable::new("large_scale_correlated_uncertainty")),
            (_, SynopticUncertainty) => Some(Variable::new("synoptically_correlated_uncertainty")),
            (_, AdjustmentUncertainty) => Some(Variable::new("adjustment_uncertainty")),
            (_, SeaIceFraction) => None,
        }
    }

    /// Quantities a file of this product must provide.
    pub fn required(&self) -> &'static [Quantity] {
        use Quantity::*;
        match self {
            Self::ArcL3U => &[Sst, RandomUncertainty],
            Self::CciL4 => &[Sst, RandomUncertainty, SeaIceFraction],
            Self::CciL3U | Self::CciL3C => &[
                Sst,
                Quality,
                RandomUncertainty,
                LargeScaleUncertainty,
                SynopticUncertainty,
            ],
        }
    }

    /// Output variable name of a result slot.
    pub fn output_name(&self, slot: usize, depth: SstDepth) -> String {
        use crate::cell::{RESULT_NAMES, SST, SST_ANOMALY};
        match slot {
            SST => format!("sst_{}", depth),
            SST_ANOMALY => format!("sst_{}_anomaly", depth),
            _ => RESULT_NAMES.get(slot).copied().unwrap_or_default().to_string(),
        }
    }

    /// Read the grids of one file into an aggregation context.
    ///
    /// Climatology and sea coverage come from auxiliary data and are
    /// attached by the caller.
    pub fn read_context(
        &self,
        reader: &dyn VariableReader,
        depth: SstDepth,
    ) -> Result<AggregationContext> {
        let mut grids: HashMap<Quantity, Arc<dyn Grid>> = HashMap::new();
        use Quantity::*;
        for quantity in [
            Sst,
            Quality,
            RandomUncertainty,
            LargeScaleUncertainty,
            AdjustmentUncertainty,
            SynopticUncertainty,
            SeaIceFraction,
        ] {
            let Some(variable) = self.variable(quantity, depth) else {
                continue;
            };
            match reader.read(&variable)? {
                Some(grid) => {
                    let grid: Arc<dyn Grid> = if self.is_south_up() {
                        Arc::new(YFlip::new(grid))
                    } else {
                        grid
                    };
                    grids.insert(quantity, grid);
                }
                None if self.required().contains(&quantity) => {
                    return Err(AggregationError::missing_grid(format!(
                        "{} requires variable '{}'",
                        self, variable.name
                    )));
                }
                None => {}
            }
        }

        let sst = grids
            .remove(&Sst)
            .ok_or_else(|| AggregationError::missing_grid(format!("{} SST", self)))?;
        let mut context = AggregationContext::new(sst);
        context.quality = grids.remove(&Quality);
        context.random_uncertainty = grids.remove(&RandomUncertainty);
        context.large_scale_uncertainty = grids.remove(&LargeScaleUncertainty);
        context.adjustment_uncertainty = grids.remove(&AdjustmentUncertainty);
        context.synoptic_uncertainty = grids.remove(&SynopticUncertainty);
        context.sea_ice_fraction = grids.remove(&SeaIceFraction);
        Ok(context)
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_uppercase().replace('-', "_");
        Self::all()
            .into_iter()
            .find(|product| product.as_str() == normalized)
            .ok_or_else(|| {
                AggregationError::invalid_argument(format!("unknown product type '{}'", s))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sst_common::ScalarGrid;

    fn scalar(product: ProductType, value: f64) -> Arc<dyn Grid> {
        Arc::new(ScalarGrid::new(product.grid_def(), value))
    }

    #[test]
    fn test_parse_product_type() {
        assert_eq!("cci_l4".parse::<ProductType>().unwrap(), ProductType::CciL4);
        assert_eq!("ARC-L3U".parse::<ProductType>().unwrap(), ProductType::ArcL3U);
        assert!("L2P".parse::<ProductType>().is_err());
    }

    #[test]
    fn test_variable_names() {
        let depth = SstDepth::Depth100;
        assert_eq!(
            ProductType::ArcL3U.variable(Quantity::Sst, depth),
            Some(Variable::layer("sst_depth", 1))
        );
        assert_eq!(
            ProductType::CciL3C.variable(Quantity::Sst, depth).map(|v| v.name),
            Some("sea_surface_temperature_depth")
        );
        assert_eq!(ProductType::CciL4.variable(Quantity::Quality, depth), None);
    }

    #[test]
    fn test_read_context_l4() {
        let product = ProductType::CciL4;
        let mut vars: HashMap<Variable, Arc<dyn Grid>> = HashMap::new();
        vars.insert(Variable::new("analysed_sst"), scalar(product, 290.0));
        vars.insert(Variable::new("analysis_error"), scalar(product, 0.4));
        vars.insert(Variable::new("sea_ice_fraction"), scalar(product, 0.0));

        let ctx = product.read_context(&vars, SstDepth::Skin).unwrap();
        assert!(ctx.random_uncertainty.is_some());
        assert!(ctx.sea_ice_fraction.is_some());
        assert!(ctx.quality.is_none());
        assert_eq!(ctx.grid_def().width, 7200);
    }

    #[test]
    fn test_read_context_missing_required() {
        let product = ProductType::CciL3U;
        let mut vars: HashMap<Variable, Arc<dyn Grid>> = HashMap::new();
        vars.insert(Variable::new("sea_surface_temperature"), scalar(product, 290.0));

        let err = product.read_context(&vars, SstDepth::Skin).unwrap_err();
        assert!(matches!(err, AggregationError::MissingGrid(_)));
    }

    #[test]
    fn test_read_context_optional_adjustment() {
        let product = ProductType::CciL3C;
        let mut vars: HashMap<Variable, Arc<dyn Grid>> = HashMap::new();
        for name in [
            "sea_surface_temperature",
            "quality_level",
            "uncorrelated_uncertainty",
            "large_scale_correlated_uncertainty",
            "synoptically_correlated_uncertainty",
        ] {
            vars.insert(Variable::new(name), scalar(product, 1.0));
        }
        let ctx = product.read_context(&vars, SstDepth::Skin).unwrap();
        assert!(ctx.adjustment_uncertainty.is_none());
        assert!(ctx.synoptic_uncertainty.is_some());
    }

    #[test]
    fn test_output_names() {
        let product = ProductType::CciL3U;
        assert_eq!(product.output_name(0, SstDepth::Skin), "sst_skin");
        assert_eq!(product.output_name(1, SstDepth::Depth20), "sst_depth_20_anomaly");
        assert_eq!(product.output_name(3, SstDepth::Skin), "coverage_uncertainty");
    }
}
