//! Tabular export of computed schedules for report and Gantt feeds.

use crate::schedule::{DatedTaskRecord, ScheduleGraph, ScheduleResult};
use chrono::NaiveDate;
use polars::prelude::*;

const EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn date_to_i32(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn date_column(name: &'static str, dates: impl Iterator<Item = NaiveDate>) -> PolarsResult<Column> {
    let days: Vec<i32> = dates.map(date_to_i32).collect();
    Ok(Series::new(PlSmallStr::from_static(name), days)
        .cast(&DataType::Date)?
        .into_column())
}

/// One row per task with calendar dates, in input order.
pub fn records_to_dataframe(records: &[DatedTaskRecord]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = records.iter().map(|r| r.task_id.as_str()).collect();
    let total_float: Vec<i64> = records.iter().map(|r| r.total_float_days).collect();
    let free_float: Vec<i64> = records.iter().map(|r| r.free_float_days).collect();
    let critical: Vec<bool> = records.iter().map(|r| r.is_critical).collect();

    let columns = vec![
        Series::new(PlSmallStr::from_static("task_id"), ids).into_column(),
        date_column("early_start", records.iter().map(|r| r.early_start))?,
        date_column("early_finish", records.iter().map(|r| r.early_finish))?,
        date_column("late_start", records.iter().map(|r| r.late_start))?,
        date_column("late_finish", records.iter().map(|r| r.late_finish))?,
        Series::new(PlSmallStr::from_static("total_float_days"), total_float).into_column(),
        Series::new(PlSmallStr::from_static("free_float_days"), free_float).into_column(),
        Series::new(PlSmallStr::from_static("is_critical"), critical).into_column(),
    ];
    DataFrame::new(columns)
}

impl ScheduleGraph {
    pub fn to_dataframe(&self, result: &ScheduleResult) -> PolarsResult<DataFrame> {
        let records = self
            .dated_records(result)
            .map_err(|err| PolarsError::ComputeError(err.to_string().into()))?;
        records_to_dataframe(&records)
    }
}
