//! The fixed catalogue of eleven reports and their computation.

mod compute;
mod descriptor;
mod rounding;

use std::fmt;

use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::RecordBatch;
use serde::Serialize;

pub use compute::{compute_report, register_price_ranges};
pub use descriptor::{
    catalogue, descriptor, Aggregate, Field, GroupKey, Input, Predicate, ReportDescriptor, Shape,
    SortColumn, SortKey,
};

/// Identifier of a report; doubles as its sink table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportName {
    AvgPriceByMake,
    CountByYear,
    CountByPriceRange,
    TopModelsByMake,
    LowestMileageVehicles,
    AvgPriceByTransmission,
    CountByFuelType,
    CountByColor,
    AvgCarAgeByMake,
    AvgPriceByEngine,
    VehiculosProcesados,
}

impl ReportName {
    /// Every report, in the order a run computes and writes them.
    pub const ALL: [Self; 11] = [
        Self::AvgPriceByMake,
        Self::CountByYear,
        Self::CountByPriceRange,
        Self::TopModelsByMake,
        Self::LowestMileageVehicles,
        Self::AvgPriceByTransmission,
        Self::CountByFuelType,
        Self::CountByColor,
        Self::AvgCarAgeByMake,
        Self::AvgPriceByEngine,
        Self::VehiculosProcesados,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AvgPriceByMake => "avg_price_by_make",
            Self::CountByYear => "count_by_year",
            Self::CountByPriceRange => "count_by_price_range",
            Self::TopModelsByMake => "top_models_by_make",
            Self::LowestMileageVehicles => "lowest_mileage_vehicles",
            Self::AvgPriceByTransmission => "avg_price_by_transmission",
            Self::CountByFuelType => "count_by_fuel_type",
            Self::CountByColor => "count_by_color",
            Self::AvgCarAgeByMake => "avg_car_age_by_make",
            Self::AvgPriceByEngine => "avg_price_by_engine",
            Self::VehiculosProcesados => "vehiculos_procesados",
        }
    }

    /// Target table name at the sink.
    pub fn table(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ReportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully materialized report result.
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub name: ReportName,
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl ReportTable {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}
