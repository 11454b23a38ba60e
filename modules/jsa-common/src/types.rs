use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;

/// How a pipeline stage filters the merged table. Selected explicitly by the
/// caller; `--field tech` maps to `ByTechCriteria`, anything else to
/// `ByFieldEquality`.
#[derive(Debug, Clone)]
pub enum FilterSpec {
    /// Match any "tech" column against a set of technician names.
    ByTechCriteria { names: Vec<String> },
    /// Date-range plus equality on one named column, one criterion at a time.
    ByFieldEquality { field: String, values: Vec<String> },
}

impl FilterSpec {
    /// Build a spec from the entry-point field name and raw criteria.
    /// Criteria are normalized the way the source data stores names:
    /// apostrophes stripped, spaces replaced with underscores.
    pub fn from_field(field: &str, criteria: Vec<String>) -> Self {
        let values = criteria.into_iter().map(|c| normalize_criterion(&c)).collect();
        if field == "tech" {
            FilterSpec::ByTechCriteria { names: values }
        } else {
            FilterSpec::ByFieldEquality {
                field: field.to_string(),
                values,
            }
        }
    }

    /// Field name used in log lines and the filtered-output filename.
    pub fn field_name(&self) -> &str {
        match self {
            FilterSpec::ByTechCriteria { .. } => "tech",
            FilterSpec::ByFieldEquality { field, .. } => field,
        }
    }

    pub fn criteria(&self) -> &[String] {
        match self {
            FilterSpec::ByTechCriteria { names } => names,
            FilterSpec::ByFieldEquality { values, .. } => values,
        }
    }

    /// Comma-joined criteria, recorded in the filtered output.
    pub fn criteria_joined(&self) -> String {
        self.criteria().join(",")
    }
}

fn normalize_criterion(raw: &str) -> String {
    raw.replace('\'', "").replace(' ', "_")
}

/// Retry behavior for recoverable fetch failures. Fixed delay between
/// attempts; exhausting `max_attempts` short-circuits the fetch loop.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(30),
        }
    }
}

/// Immutable per-run state, constructed once at pipeline start and passed
/// explicitly to every stage.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub search_title: String,
    pub run_date: NaiveDate,
    pub output_dir: PathBuf,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub filter: FilterSpec,
}

impl RunContext {
    pub fn new(
        search_title: &str,
        run_date: NaiveDate,
        download_root: &Path,
        start_date: NaiveDate,
        end_date: NaiveDate,
        filter: FilterSpec,
    ) -> Self {
        let output_dir = download_root.join(format!("{search_title}_{run_date}"));
        Self {
            search_title: search_title.to_string(),
            run_date,
            output_dir,
            start_date,
            end_date,
            filter,
        }
    }

    /// Create the run directory if absent.
    pub fn prepare(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
    }

    /// Per-item cache file: `{item_title}_{run_date}.csv`. Existence of this
    /// file is the idempotence check for same-day re-runs.
    pub fn cache_file(&self, item_title: &str) -> PathBuf {
        self.output_dir
            .join(format!("{item_title}_{}.csv", self.run_date))
    }

    /// Merge output. The leading `0` sorts it ahead of per-item files in a
    /// directory listing.
    pub fn merged_file(&self) -> PathBuf {
        self.output_dir
            .join(format!("0{}_{}_merged.csv", self.search_title, self.run_date))
    }

    /// Filter output, named after the date window and filter field.
    pub fn filtered_file(&self) -> PathBuf {
        self.output_dir.join(format!(
            "0{}_{}_to_{}_{}.csv",
            self.search_title,
            self.start_date,
            self.end_date,
            self.filter.field_name()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn criteria_are_normalized() {
        let spec = FilterSpec::from_field(
            "tech",
            vec!["Tre' Faniel".to_string(), "Cory Hicks".to_string()],
        );
        assert_eq!(spec.criteria(), ["Tre_Faniel", "Cory_Hicks"]);
        assert_eq!(spec.criteria_joined(), "Tre_Faniel,Cory_Hicks");
    }

    #[test]
    fn field_selects_variant() {
        assert!(matches!(
            FilterSpec::from_field("tech", vec![]),
            FilterSpec::ByTechCriteria { .. }
        ));
        assert!(matches!(
            FilterSpec::from_field("region", vec!["north".to_string()]),
            FilterSpec::ByFieldEquality { .. }
        ));
    }

    #[test]
    fn run_context_file_names() {
        let ctx = RunContext::new(
            "JSA",
            date("2024-01-01"),
            Path::new("downloads"),
            date("2020-07-01"),
            date("2022-10-31"),
            FilterSpec::from_field("tech", vec!["Cory Hicks".to_string()]),
        );
        assert_eq!(
            ctx.output_dir,
            PathBuf::from("downloads/JSA_2024-01-01")
        );
        assert_eq!(
            ctx.cache_file("JSA North"),
            PathBuf::from("downloads/JSA_2024-01-01/JSA North_2024-01-01.csv")
        );
        assert_eq!(
            ctx.merged_file(),
            PathBuf::from("downloads/JSA_2024-01-01/0JSA_2024-01-01_merged.csv")
        );
        assert_eq!(
            ctx.filtered_file(),
            PathBuf::from("downloads/JSA_2024-01-01/0JSA_2020-07-01_to_2022-10-31_tech.csv")
        );
    }
}
