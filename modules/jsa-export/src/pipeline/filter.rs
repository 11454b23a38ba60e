use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::info;

use jsa_common::{FilterSpec, JsaError, RunContext, Table};

/// Column holding the per-record timestamp the date filter keys on.
const BRIEFING_DATE: &str = "briefing_date";

/// Substring that marks a technician column.
const TECH_MARKER: &str = "tech";

/// Apply the run's filter to the merged table and write the result.
///
/// Every row must carry a `briefing_date` parseable as `YYYY-MM-DD` before
/// the first space; a row that does not is a fatal data error, never a
/// silent drop. The filter parameters are recorded in the output as
/// `start_date`, `end_date` and `criteria` columns, plus the derived `date`
/// column. An empty result is a valid outcome.
pub fn filter_stage(ctx: &RunContext, merged: &Table) -> Result<(Table, PathBuf), JsaError> {
    info!(
        start = %ctx.start_date,
        end = %ctx.end_date,
        field = ctx.filter.field_name(),
        "Querying for records between {} and {}",
        ctx.start_date,
        ctx.end_date
    );

    let mut df = merged.clone();
    df.add_constant_column("start_date", &ctx.start_date.to_string());
    df.add_constant_column("end_date", &ctx.end_date.to_string());
    df.add_constant_column("criteria", &ctx.filter.criteria_joined());

    let briefing_idx = df
        .column_index(BRIEFING_DATE)
        .ok_or_else(|| JsaError::MissingColumn(BRIEFING_DATE.to_string()))?;

    let mut dates: Vec<NaiveDate> = Vec::with_capacity(df.len());
    let mut date_strings: Vec<String> = Vec::with_capacity(df.len());
    for (row_idx, row) in df.rows.iter().enumerate() {
        let raw = &row[briefing_idx];
        let day = raw.split(' ').next().unwrap_or(raw.as_str());
        let parsed =
            NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| JsaError::BadDate {
                row: row_idx,
                value: raw.clone(),
            })?;
        dates.push(parsed);
        date_strings.push(day.to_string());
    }
    df.add_column("date", date_strings);

    let mut filtered = df.empty_like();
    match &ctx.filter {
        FilterSpec::ByTechCriteria { names } => {
            let tech_cols: Vec<usize> = df
                .columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.contains(TECH_MARKER))
                .map(|(i, _)| i)
                .collect();
            for row in &df.rows {
                let values: Vec<&str> = tech_cols.iter().map(|&i| row[i].as_str()).collect();
                // TODO: confirm with the field team whether a row whose
                // second tech column reads "None" should be dropped even
                // when another tech column matches.
                let second_is_real = values.get(1).is_some_and(|v| *v != "None");
                if second_is_real && values.iter().any(|v| names.iter().any(|n| n == v)) {
                    filtered.rows.push(row.clone());
                }
            }
        }
        FilterSpec::ByFieldEquality { field, values } => {
            let field_idx = df
                .column_index(field)
                .ok_or_else(|| JsaError::MissingColumn(field.clone()))?;
            // Union per criterion, in criteria order; no deduplication.
            for value in values {
                for (row, date) in df.rows.iter().zip(&dates) {
                    if ctx.start_date <= *date && *date <= ctx.end_date && row[field_idx] == *value
                    {
                        filtered.rows.push(row.clone());
                    }
                }
            }
        }
    }

    let path = ctx.filtered_file();
    filtered.write_csv(&path)?;
    info!(rows = filtered.len(), file = %path.display(), "Exported filtered table");
    Ok((filtered, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn ctx(dir: &Path, field: &str, criteria: &[&str]) -> RunContext {
        let ctx = RunContext::new(
            "JSA",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            dir,
            NaiveDate::from_ymd_opt(2020, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 7, 2).unwrap(),
            FilterSpec::from_field(field, criteria.iter().map(|c| c.to_string()).collect()),
        );
        ctx.prepare().unwrap();
        ctx
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn equality_filter_keeps_in_range_matches() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "region", &["north"]);
        let merged = table(
            &["briefing_date", "region"],
            &[
                &["2020-06-30 08:00:00", "north"],
                &["2020-07-01 08:00:00", "north"],
                &["2020-07-02 09:30:00", "north"],
                &["2020-07-02 09:30:00", "south"],
            ],
        );

        let (filtered, path) = filter_stage(&ctx, &merged).unwrap();
        assert_eq!(filtered.len(), 2);
        let dates: Vec<&str> = filtered
            .rows
            .iter()
            .map(|r| r[filtered.column_index("date").unwrap()].as_str())
            .collect();
        assert_eq!(dates, ["2020-07-01", "2020-07-02"]);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "0JSA_2020-07-01_to_2020-07-02_region.csv"
        );
    }

    #[test]
    fn equality_filter_unions_without_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "region", &["east", "north", "north"]);
        let merged = table(
            &["briefing_date", "region"],
            &[
                &["2020-07-01", "north"],
                &["2020-07-01", "east"],
            ],
        );

        let (filtered, _) = filter_stage(&ctx, &merged).unwrap();
        // Criterion-major order; the twice-listed criterion matches twice.
        let regions: Vec<&str> = filtered
            .rows
            .iter()
            .map(|r| r[filtered.column_index("region").unwrap()].as_str())
            .collect();
        assert_eq!(regions, ["east", "north", "north"]);
    }

    #[test]
    fn tech_filter_matches_any_tech_column() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "tech", &["Cory Hicks", "Ryan Todd"]);
        let merged = table(
            &["briefing_date", "lead_tech", "backup_tech"],
            &[
                &["2020-07-01", "Cory_Hicks", "Ryan_Todd"],
                &["2020-07-01", "Wade_Salmon", "Cory_Hicks"],
                &["2020-07-01", "Wade_Salmon", "Paul_Wood"],
            ],
        );

        let (filtered, _) = filter_stage(&ctx, &merged).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn tech_filter_drops_rows_with_second_tech_none() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "tech", &["Cory Hicks"]);
        let merged = table(
            &["briefing_date", "lead_tech", "backup_tech"],
            &[
                // Matches on lead_tech but the second tech column is the
                // literal "None", so it is dropped.
                &["2020-07-01", "Cory_Hicks", "None"],
                &["2020-07-01", "Cory_Hicks", "Ryan_Todd"],
            ],
        );

        let (filtered, _) = filter_stage(&ctx, &merged).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows[0][2], "Ryan_Todd");
    }

    #[test]
    fn tech_filter_excludes_rows_with_no_tech_values() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "tech", &["Cory Hicks"]);
        let merged = table(
            &["briefing_date", "lead_tech", "backup_tech"],
            &[&["2020-07-01", "", ""]],
        );

        let (filtered, _) = filter_stage(&ctx, &merged).unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn tech_filter_ignores_date_range() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "tech", &["Cory Hicks"]);
        let merged = table(
            &["briefing_date", "lead_tech", "backup_tech"],
            // Outside the 2020-07-01..2020-07-02 window but still kept.
            &[&["2019-01-15", "Cory_Hicks", "Ryan_Todd"]],
        );

        let (filtered, _) = filter_stage(&ctx, &merged).unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn output_records_filter_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "region", &["north"]);
        let merged = table(&["briefing_date", "region"], &[&["2020-07-01", "north"]]);

        let (filtered, _) = filter_stage(&ctx, &merged).unwrap();
        assert_eq!(
            filtered.columns,
            [
                "briefing_date",
                "region",
                "start_date",
                "end_date",
                "criteria",
                "date"
            ]
        );
        assert_eq!(
            filtered.rows[0],
            [
                "2020-07-01",
                "north",
                "2020-07-01",
                "2020-07-02",
                "north",
                "2020-07-01"
            ]
        );
    }

    #[test]
    fn unparseable_briefing_date_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "region", &["north"]);
        let merged = table(
            &["briefing_date", "region"],
            &[&["2020-07-01", "north"], &["last tuesday", "north"]],
        );

        let err = filter_stage(&ctx, &merged).unwrap_err();
        assert!(matches!(err, JsaError::BadDate { row: 1, .. }));
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), "region", &["west"]);
        let merged = table(&["briefing_date", "region"], &[&["2020-07-01", "north"]]);

        let (filtered, path) = filter_stage(&ctx, &merged).unwrap();
        assert!(filtered.is_empty());
        // The empty table is still written, header and all.
        let reread = Table::read_csv(&path).unwrap();
        assert!(reread.is_empty());
        assert_eq!(reread.columns.len(), 6);
    }
}
