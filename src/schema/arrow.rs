// src/schema/arrow.rs

use anyhow::{Context, Result};
use arrow::{
    array::{
        ArrayRef, Date32Builder, Float64Array, Float64Builder, Int32Builder, StringArray,
        StringBuilder, UInt32Array, UInt64Array,
    },
    datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::element::ElementSet;
use crate::process::WideRecord;
use crate::season::monthly::MonthlyAverage;
use crate::season::NormalizedRecord;

/// Which columns a partition file carries.
///
/// Always `ID`, `DATE`; then optionally `NAME`; one nullable float column per
/// element in configured order; then the season columns when enabled.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub elements: ElementSet,
    pub with_name: bool,
    pub with_seasons: bool,
}

/// Rows of one output file, before or after the seasonal stage.
#[derive(Debug, Clone)]
pub enum OutputRows {
    Wide(Vec<WideRecord>),
    Seasonal(Vec<NormalizedRecord>),
}

impl OutputRows {
    pub fn len(&self) -> usize {
        match self {
            OutputRows::Wide(r) => r.len(),
            OutputRows::Seasonal(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn wide(&self) -> Vec<&WideRecord> {
        match self {
            OutputRows::Wide(r) => r.iter().collect(),
            OutputRows::Seasonal(r) => r
                .iter()
                .map(|n| &n.aggregated.seasoned.record)
                .collect(),
        }
    }
}

/// Days since 1970-01-01, the Arrow `Date32` encoding.
pub fn date32(d: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (d - epoch).num_days() as i32
}

/// Build an ArrowSchema (inside an Arc) for a layout.
pub fn build_arrow_schema(layout: &OutputLayout) -> Arc<ArrowSchema> {
    let mut fields = vec![
        ArrowField::new("ID", DataType::Utf8, false),
        ArrowField::new("DATE", DataType::Date32, false),
    ];
    if layout.with_name {
        fields.push(ArrowField::new("NAME", DataType::Utf8, true));
    }
    for e in layout.elements.iter() {
        fields.push(ArrowField::new(e.as_str(), DataType::Float64, /* nullable = */ true));
    }
    if layout.with_seasons {
        fields.push(ArrowField::new("WINTER_YEAR", DataType::Int32, false));
        fields.push(ArrowField::new("WINTER_SEASON_START", DataType::Date32, false));
        fields.push(ArrowField::new("CUMULATIVE_SNOW", DataType::Float64, false));
        fields.push(ArrowField::new("NORMALIZED_DATE", DataType::Date32, false));
    }
    Arc::new(ArrowSchema::new(fields))
}

/// Lay the rows out column by column.
///
/// Season columns need `OutputRows::Seasonal`; asking for them with plain wide
/// rows is an error.
pub fn to_record_batch(rows: &OutputRows, layout: &OutputLayout) -> Result<RecordBatch> {
    let schema = build_arrow_schema(layout);
    let wide = rows.wide();
    let n = wide.len();

    let mut ids = StringBuilder::new();
    let mut dates = Date32Builder::with_capacity(n);
    for r in &wide {
        ids.append_value(&r.station_id);
        dates.append_value(date32(r.date));
    }
    let mut columns: Vec<ArrayRef> = vec![Arc::new(ids.finish()), Arc::new(dates.finish())];

    if layout.with_name {
        let mut names = StringBuilder::new();
        for r in &wide {
            names.append_option(r.name.as_deref());
        }
        columns.push(Arc::new(names.finish()));
    }

    for e in layout.elements.iter() {
        let mut b = Float64Builder::with_capacity(n);
        for r in &wide {
            b.append_option(r.get(e));
        }
        columns.push(Arc::new(b.finish()));
    }

    if layout.with_seasons {
        let OutputRows::Seasonal(seasonal) = rows else {
            anyhow::bail!("season columns requested for rows without seasons");
        };
        let mut wy = Int32Builder::with_capacity(n);
        let mut start = Date32Builder::with_capacity(n);
        let mut cum = Float64Builder::with_capacity(n);
        let mut norm = Date32Builder::with_capacity(n);
        for r in seasonal {
            let s = &r.aggregated.seasoned;
            wy.append_value(s.winter_year);
            start.append_value(date32(s.winter_season_start));
            cum.append_value(r.aggregated.cumulative_snow);
            norm.append_value(date32(r.normalized_date));
        }
        columns.push(Arc::new(wy.finish()));
        columns.push(Arc::new(start.finish()));
        columns.push(Arc::new(cum.finish()));
        columns.push(Arc::new(norm.finish()));
    }

    RecordBatch::try_new(schema, columns).context("building output RecordBatch")
}

/// Monthly climatology, one row per month in season order.
pub fn monthly_record_batch(months: &[MonthlyAverage]) -> Result<RecordBatch> {
    let schema = Arc::new(ArrowSchema::new(vec![
        ArrowField::new("MONTH", DataType::UInt32, false),
        ArrowField::new("LABEL", DataType::Utf8, false),
        ArrowField::new("SNOW", DataType::Float64, true),
        ArrowField::new("TAVG", DataType::Float64, true),
        ArrowField::new("TMAX", DataType::Float64, true),
        ArrowField::new("TMIN", DataType::Float64, true),
        ArrowField::new("YEARS", DataType::UInt64, false),
    ]));
    let float = |f: fn(&MonthlyAverage) -> Option<f64>| -> ArrayRef {
        Arc::new(months.iter().map(f).collect::<Float64Array>())
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from(months.iter().map(|m| m.month).collect::<Vec<_>>())),
        Arc::new(months.iter().map(|m| Some(m.label)).collect::<StringArray>()),
        float(|m| m.snow),
        float(|m| m.tavg),
        float(|m| m.tmax),
        float(|m| m.tmin),
        Arc::new(UInt64Array::from(
            months.iter().map(|m| m.years as u64).collect::<Vec<_>>(),
        )),
    ];
    RecordBatch::try_new(schema, columns).context("building monthly RecordBatch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::season::seasonal;
    use arrow::array::{Array, Date32Array, Float64Array, Int32Array, StringArray};

    fn layout(with_seasons: bool) -> OutputLayout {
        OutputLayout {
            elements: ElementSet::new([Element::Snow, Element::Tmax]),
            with_name: false,
            with_seasons,
        }
    }

    fn sample() -> Vec<WideRecord> {
        let mut a = WideRecord::new("S1", NaiveDate::from_ymd_opt(2019, 12, 31).unwrap());
        a.values.insert(Element::Snow, 1.97);
        let mut b = WideRecord::new("S1", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        b.values.insert(Element::Snow, 0.98);
        b.values.insert(Element::Tmax, 28.4);
        vec![a, b]
    }

    #[test]
    fn date32_counts_from_epoch() {
        assert_eq!(date32(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
        assert_eq!(date32(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()), -1);
    }

    #[test]
    fn wide_batch_has_null_for_missing_elements() -> Result<()> {
        let batch = to_record_batch(&OutputRows::Wide(sample()), &layout(false))?;
        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["ID", "DATE", "SNOW", "TMAX"]);

        let ids = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(ids.value(1), "S1");
        let tmax = batch.column(3).as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(tmax.is_null(0));
        assert_eq!(tmax.value(1), 28.4);
        Ok(())
    }

    #[test]
    fn seasonal_batch_carries_season_columns() -> Result<()> {
        let rows = OutputRows::Seasonal(seasonal(sample(), (None, None)));
        let batch = to_record_batch(&rows, &layout(true))?;
        assert_eq!(batch.num_columns(), 8);

        let wy = batch.column(4).as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(wy.values().to_vec(), vec![2020, 2020]);
        let cum = batch.column(6).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(cum.values().to_vec(), vec![1.97, 2.95]);
        let norm = batch.column(7).as_any().downcast_ref::<Date32Array>().unwrap();
        assert_eq!(
            norm.value_as_date(0),
            NaiveDate::from_ymd_opt(1999, 12, 31)
        );
        Ok(())
    }

    #[test]
    fn season_columns_need_seasonal_rows() {
        assert!(to_record_batch(&OutputRows::Wide(sample()), &layout(true)).is_err());
    }

    #[test]
    fn monthly_batch_keeps_season_order() -> Result<()> {
        let months = crate::season::monthly::monthly_averages(&sample());
        let batch = monthly_record_batch(&months)?;
        assert_eq!(batch.num_rows(), 12);
        let labels = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(labels.value(0), "Jul");
        assert_eq!(labels.value(6), "Jan");
        let snow = batch.column(2).as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(snow.is_null(0));
        assert_eq!(snow.value(6), 0.98);
        Ok(())
    }
}
