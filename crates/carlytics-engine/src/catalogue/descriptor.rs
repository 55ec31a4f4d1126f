//! Declarative report definitions.
//!
//! A [`ReportDescriptor`] says what to group by, what to aggregate and how
//! to order the result, in terms of typed [`Field`]s. Header names only
//! enter when a descriptor is resolved against a [`ColumnMap`].

use crate::config::ColumnMap;
use crate::transform::{CAR_AGE, PRICE_RANGE, PRICE_USD};

use super::ReportName;

/// A column of the vehicle views, source or derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Make,
    Model,
    Price,
    Year,
    Mileage,
    Transmission,
    FuelType,
    Color,
    Cylinders,
    PriceUsd,
    CarAge,
    PriceRange,
}

impl Field {
    /// Column name in the input view.
    pub fn column<'a>(&self, columns: &'a ColumnMap) -> &'a str {
        match self {
            Self::Make => &columns.make,
            Self::Model => &columns.model,
            Self::Price => &columns.price,
            Self::Year => &columns.year,
            Self::Mileage => &columns.mileage,
            Self::Transmission => &columns.transmission,
            Self::FuelType => &columns.fuel_type,
            Self::Color => &columns.color,
            Self::Cylinders => &columns.cylinders,
            Self::PriceUsd => PRICE_USD,
            Self::CarAge => CAR_AGE,
            Self::PriceRange => PRICE_RANGE,
        }
    }
}

/// Which registered view a report reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Vehicles,
    PriceRanges,
}

/// Row filter; a descriptor's predicates are AND-ed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    NotNull(Field),
    GreaterThan(Field, f64),
    LessThan(Field, f64),
}

impl Predicate {
    pub fn field(&self) -> Field {
        match self {
            Self::NotNull(f) | Self::GreaterThan(f, _) | Self::LessThan(f, _) => *f,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// `count(*)`
    Count { alias: &'static str },
    /// `avg(field)` rounded to two decimals.
    RoundedAvg { field: Field, alias: &'static str },
}

impl Aggregate {
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Count { alias } | Self::RoundedAvg { alias, .. } => alias,
        }
    }
}

/// Grouping column, optionally renamed in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupKey {
    pub field: Field,
    pub rename: Option<&'static str>,
}

impl GroupKey {
    pub const fn of(field: Field) -> Self {
        Self {
            field,
            rename: None,
        }
    }

    pub const fn renamed(field: Field, name: &'static str) -> Self {
        Self {
            field,
            rename: Some(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Grouped {
        keys: Vec<GroupKey>,
        aggregates: Vec<Aggregate>,
    },
    /// Row-level projection, no aggregation.
    Rows { fields: Vec<Field> },
}

/// Column a sort key refers to in the report output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    /// A grouped or projected field, under its output name.
    Field(Field),
    /// An aggregate, by alias.
    Aggregate(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: SortColumn,
    pub descending: bool,
}

impl SortKey {
    pub const fn asc(column: SortColumn) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    pub const fn desc(column: SortColumn) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// Everything needed to compute one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDescriptor {
    pub name: ReportName,
    pub input: Input,
    pub filters: Vec<Predicate>,
    pub shape: Shape,
    pub sort: Vec<SortKey>,
    pub limit: Option<usize>,
}

impl ReportDescriptor {
    /// Every input field the report reads, in first-use order.
    pub fn referenced_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        let mut push = |field: Field| {
            if !fields.contains(&field) {
                fields.push(field);
            }
        };
        for predicate in &self.filters {
            push(predicate.field());
        }
        match &self.shape {
            Shape::Grouped { keys, aggregates } => {
                for key in keys {
                    push(key.field);
                }
                for aggregate in aggregates {
                    if let Aggregate::RoundedAvg { field, .. } = aggregate {
                        push(*field);
                    }
                }
            }
            Shape::Rows { fields: projected } => {
                for field in projected {
                    push(*field);
                }
            }
        }
        fields
    }

    /// Output column names, in order.
    pub fn output_columns(&self, columns: &ColumnMap) -> Vec<String> {
        match &self.shape {
            Shape::Grouped { keys, aggregates } => keys
                .iter()
                .map(|key| key.rename.unwrap_or(key.field.column(columns)).to_string())
                .chain(aggregates.iter().map(|a| a.alias().to_string()))
                .collect(),
            Shape::Rows { fields } => fields
                .iter()
                .map(|field| field.column(columns).to_string())
                .collect(),
        }
    }

    /// Output name of a sort key's column.
    pub fn sort_column_name<'a>(&self, column: SortColumn, columns: &'a ColumnMap) -> &'a str {
        match column {
            SortColumn::Aggregate(alias) => alias,
            SortColumn::Field(field) => {
                if let Shape::Grouped { keys, .. } = &self.shape {
                    if let Some(name) = keys
                        .iter()
                        .find(|key| key.field == field)
                        .and_then(|key| key.rename)
                    {
                        return name;
                    }
                }
                field.column(columns)
            }
        }
    }
}

const MILEAGE_LOW_LIMIT: usize = 5;
const COLOR_LIMIT: usize = 10;
const PROCESSED_MIN_PRICE: f64 = 50_000.0;
const PROCESSED_MAX_MILEAGE: f64 = 100_000.0;

fn grouped(keys: Vec<GroupKey>, aggregates: Vec<Aggregate>) -> Shape {
    Shape::Grouped { keys, aggregates }
}

/// The descriptor for `name`.
pub fn descriptor(name: ReportName) -> ReportDescriptor {
    use Aggregate::{Count, RoundedAvg};
    use SortColumn::Aggregate as Agg;

    let (input, filters, shape, sort, limit) = match name {
        ReportName::AvgPriceByMake => (
            Input::Vehicles,
            vec![],
            grouped(
                vec![GroupKey::of(Field::Make)],
                vec![
                    RoundedAvg {
                        field: Field::PriceUsd,
                        alias: "avg_price",
                    },
                    Count {
                        alias: "total_vehicles",
                    },
                ],
            ),
            vec![SortKey::desc(Agg("avg_price"))],
            None,
        ),
        ReportName::CountByYear => (
            Input::Vehicles,
            vec![],
            grouped(
                vec![GroupKey::of(Field::Year)],
                vec![Count {
                    alias: "total_vehicles",
                }],
            ),
            vec![SortKey::desc(SortColumn::Field(Field::Year))],
            None,
        ),
        ReportName::CountByPriceRange => (
            Input::PriceRanges,
            vec![],
            grouped(
                vec![GroupKey::of(Field::PriceRange)],
                vec![Count { alias: "total" }],
            ),
            vec![SortKey::asc(SortColumn::Field(Field::PriceRange))],
            None,
        ),
        ReportName::TopModelsByMake => (
            Input::Vehicles,
            vec![],
            grouped(
                vec![GroupKey::of(Field::Make), GroupKey::of(Field::Model)],
                vec![Count {
                    alias: "count_models",
                }],
            ),
            vec![
                SortKey::asc(SortColumn::Field(Field::Make)),
                SortKey::desc(Agg("count_models")),
            ],
            None,
        ),
        ReportName::LowestMileageVehicles => (
            Input::Vehicles,
            vec![Predicate::NotNull(Field::Mileage)],
            Shape::Rows {
                fields: vec![Field::Make, Field::Model, Field::Mileage],
            },
            vec![SortKey::asc(SortColumn::Field(Field::Mileage))],
            Some(MILEAGE_LOW_LIMIT),
        ),
        ReportName::AvgPriceByTransmission => (
            Input::Vehicles,
            vec![],
            grouped(
                vec![GroupKey::of(Field::Transmission)],
                vec![
                    RoundedAvg {
                        field: Field::PriceUsd,
                        alias: "avg_price",
                    },
                    Count { alias: "total" },
                ],
            ),
            vec![SortKey::desc(Agg("avg_price"))],
            None,
        ),
        ReportName::CountByFuelType => (
            Input::Vehicles,
            vec![],
            grouped(
                vec![GroupKey::of(Field::FuelType)],
                vec![Count { alias: "total" }],
            ),
            vec![SortKey::desc(Agg("total"))],
            None,
        ),
        ReportName::CountByColor => (
            Input::Vehicles,
            vec![],
            grouped(
                vec![GroupKey::of(Field::Color)],
                vec![Count { alias: "total" }],
            ),
            vec![SortKey::desc(Agg("total"))],
            Some(COLOR_LIMIT),
        ),
        ReportName::AvgCarAgeByMake => (
            Input::Vehicles,
            vec![],
            grouped(
                vec![GroupKey::of(Field::Make)],
                vec![RoundedAvg {
                    field: Field::CarAge,
                    alias: "avg_car_age",
                }],
            ),
            vec![SortKey::desc(Agg("avg_car_age"))],
            None,
        ),
        ReportName::AvgPriceByEngine => (
            Input::Vehicles,
            vec![],
            grouped(
                vec![GroupKey::renamed(Field::Cylinders, "engine_range")],
                vec![
                    RoundedAvg {
                        field: Field::Price,
                        alias: "avg_price",
                    },
                    Count { alias: "total" },
                ],
            ),
            vec![SortKey::asc(SortColumn::Field(Field::Cylinders))],
            None,
        ),
        ReportName::VehiculosProcesados => (
            Input::Vehicles,
            vec![
                Predicate::GreaterThan(Field::PriceUsd, PROCESSED_MIN_PRICE),
                Predicate::LessThan(Field::Mileage, PROCESSED_MAX_MILEAGE),
            ],
            Shape::Rows {
                fields: vec![
                    Field::Make,
                    Field::Model,
                    Field::Year,
                    Field::PriceUsd,
                    Field::Mileage,
                ],
            },
            vec![SortKey::desc(SortColumn::Field(Field::PriceUsd))],
            None,
        ),
    };

    ReportDescriptor {
        name,
        input,
        filters,
        shape,
        sort,
        limit,
    }
}

/// All eleven descriptors in run order.
pub fn catalogue() -> Vec<ReportDescriptor> {
    ReportName::ALL.into_iter().map(descriptor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_in_run_order() {
        let names: Vec<_> = catalogue().iter().map(|d| d.name).collect();
        assert_eq!(names, ReportName::ALL);
    }

    #[test]
    fn test_only_price_range_report_reads_bucketed_view() {
        for d in catalogue() {
            let expected = if d.name == ReportName::CountByPriceRange {
                Input::PriceRanges
            } else {
                Input::Vehicles
            };
            assert_eq!(d.input, expected, "{}", d.name);
        }
    }

    #[test]
    fn test_output_columns_use_source_names_verbatim() {
        let columns = ColumnMap::default();
        assert_eq!(
            descriptor(ReportName::CountByFuelType).output_columns(&columns),
            vec!["Fuel Type", "total"]
        );
        assert_eq!(
            descriptor(ReportName::AvgPriceByEngine).output_columns(&columns),
            vec!["engine_range", "avg_price", "total"]
        );
        assert_eq!(
            descriptor(ReportName::VehiculosProcesados).output_columns(&columns),
            vec!["make", "model", "year", "price_usd", "mileage"]
        );
    }

    #[test]
    fn test_renamed_key_sorts_by_output_name() {
        let columns = ColumnMap::default();
        let d = descriptor(ReportName::AvgPriceByEngine);
        assert_eq!(
            d.sort_column_name(d.sort[0].column, &columns),
            "engine_range"
        );
    }

    #[test]
    fn test_referenced_fields_include_filters() {
        let d = descriptor(ReportName::VehiculosProcesados);
        assert_eq!(
            d.referenced_fields(),
            vec![
                Field::PriceUsd,
                Field::Mileage,
                Field::Make,
                Field::Model,
                Field::Year
            ]
        );
    }

    #[test]
    fn test_limits() {
        assert_eq!(descriptor(ReportName::LowestMileageVehicles).limit, Some(5));
        assert_eq!(descriptor(ReportName::CountByColor).limit, Some(10));
        assert_eq!(descriptor(ReportName::CountByYear).limit, None);
    }
}
