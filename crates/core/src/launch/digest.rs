//! Summary of a launch configuration, shown before a job is started.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use super::types::LaunchConfiguration;

/// Observation count per calendar day and hour of day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyCount {
    pub date: NaiveDate,
    pub hour: u32,
    pub count: usize,
}

/// What a configuration would process, plus the options it runs with.
///
/// Unique counts only consider items that carry the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchDigest {
    pub observations: usize,
    pub unique_plants: usize,
    pub unique_dates: usize,
    pub unique_cameras: usize,
    pub unique_view_options: usize,
    /// Sorted by date, then hour.
    pub observations_per_hour: Vec<HourlyCount>,
    pub output_name: String,
    pub overwrite: bool,
    pub generate_series_id: bool,
    pub series_id_time_delta: u32,
    pub thread_count: usize,
    pub build_annotation_csv: bool,
}

impl LaunchConfiguration {
    pub fn digest(&self) -> LaunchDigest {
        let mut plants = BTreeSet::new();
        let mut cameras = BTreeSet::new();
        let mut view_options = BTreeSet::new();
        let mut dates = BTreeSet::new();
        let mut hourly: BTreeMap<(NaiveDate, u32), usize> = BTreeMap::new();

        for item in &self.items {
            plants.extend(item.plant.as_deref());
            cameras.extend(item.camera.as_deref());
            view_options.extend(item.view_option.as_deref());
            if let Some(date_time) = item.date_time {
                dates.insert(date_time.date());
                *hourly.entry((date_time.date(), date_time.hour())).or_default() += 1;
            }
        }

        LaunchDigest {
            observations: self.items.len(),
            unique_plants: plants.len(),
            unique_dates: dates.len(),
            unique_cameras: cameras.len(),
            unique_view_options: view_options.len(),
            observations_per_hour: hourly
                .into_iter()
                .map(|((date, hour), count)| HourlyCount { date, hour, count })
                .collect(),
            output_name: self.output_name.clone(),
            overwrite: self.overwrite,
            generate_series_id: self.generate_series_id,
            series_id_time_delta: self.series_id_time_delta,
            thread_count: self.thread_count,
            build_annotation_csv: self.build_annotation_csv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::InputItem;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_digest_counts_unique_values() {
        let config = LaunchConfiguration::default()
            .with_items(vec![
                InputItem::new("1")
                    .with_plant("p1")
                    .with_camera("vis")
                    .with_view_option("side")
                    .with_date_time(at("2024-03-01 08:10")),
                InputItem::new("2")
                    .with_plant("p1")
                    .with_camera("vis")
                    .with_view_option("top")
                    .with_date_time(at("2024-03-01 08:40")),
                InputItem::new("3")
                    .with_plant("p2")
                    .with_camera("nir")
                    .with_view_option("side")
                    .with_date_time(at("2024-03-02 14:05")),
                InputItem::new("4"),
            ])
            .with_thread_count(3)
            .with_output_name("exp");

        let digest = config.digest();

        assert_eq!(digest.observations, 4);
        assert_eq!(digest.unique_plants, 2);
        assert_eq!(digest.unique_dates, 2);
        assert_eq!(digest.unique_cameras, 2);
        assert_eq!(digest.unique_view_options, 2);
        assert_eq!(
            digest.observations_per_hour,
            vec![
                HourlyCount {
                    date: at("2024-03-01 00:00").date(),
                    hour: 8,
                    count: 2
                },
                HourlyCount {
                    date: at("2024-03-02 00:00").date(),
                    hour: 14,
                    count: 1
                },
            ]
        );
        assert_eq!(digest.output_name, "exp");
        assert_eq!(digest.thread_count, 3);
        assert!(!digest.build_annotation_csv);
    }

    #[test]
    fn test_digest_of_empty_configuration() {
        let digest = LaunchConfiguration::default().digest();

        assert_eq!(digest.observations, 0);
        assert_eq!(digest.unique_plants, 0);
        assert_eq!(digest.unique_dates, 0);
        assert!(digest.observations_per_hour.is_empty());
        assert_eq!(digest.output_name, "data");
        assert_eq!(digest.series_id_time_delta, 20);
    }
}
