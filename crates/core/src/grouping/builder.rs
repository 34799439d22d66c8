use chrono::Duration;

use crate::launch::{InputItem, LaunchConfiguration};
use crate::progress::{ProgressTick, Stage};

use super::ProcessingGroup;

/// How items are partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingOptions {
    /// Group items by series; otherwise every item is its own group.
    pub by_series: bool,
    /// Largest gap, in minutes, between neighbours of the same group.
    pub max_gap_minutes: u32,
}

impl GroupingOptions {
    pub fn singletons() -> Self {
        Self {
            by_series: false,
            max_gap_minutes: 0,
        }
    }

    pub fn series(max_gap_minutes: u32) -> Self {
        Self {
            by_series: true,
            max_gap_minutes,
        }
    }
}

impl From<&LaunchConfiguration> for GroupingOptions {
    fn from(config: &LaunchConfiguration) -> Self {
        Self {
            by_series: config.generate_series_id,
            max_gap_minutes: config.series_id_time_delta,
        }
    }
}

/// An in-progress partition of items.
///
/// Each call to `next` assigns one item and yields a tick with
/// `current` = items assigned so far and `total` = item count. An empty input
/// yields a single `(0, 0)` tick.
pub struct GroupBuild {
    pending: std::vec::IntoIter<InputItem>,
    options: GroupingOptions,
    total: usize,
    assigned: usize,
    empty_tick_sent: bool,
    groups: Vec<ProcessingGroup>,
}

impl GroupBuild {
    pub fn new(mut items: Vec<InputItem>, options: GroupingOptions) -> Self {
        if options.by_series {
            // Stable: equal (series, timestamp) pairs keep their input order.
            items.sort_by_cached_key(|item| (item.series_key(), item.date_time));
        }
        Self {
            total: items.len(),
            pending: items.into_iter(),
            options,
            assigned: 0,
            empty_tick_sent: false,
            groups: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Finish assigning any remaining items and return the groups in order.
    pub fn into_groups(mut self) -> Vec<ProcessingGroup> {
        for _ in self.by_ref() {}
        self.groups
    }

    fn assign(&mut self, item: InputItem) {
        if self.options.by_series {
            if let Some(group) = self.groups.last_mut() {
                if Self::continues(group, &item, self.options.max_gap_minutes) {
                    group.items.push(item);
                    return;
                }
            }
        }
        let index = self.groups.len();
        self.groups
            .push(ProcessingGroup::start(index, item, self.options.by_series));
    }

    /// Whether `item` extends `group` rather than opening a new one.
    fn continues(group: &ProcessingGroup, item: &InputItem, max_gap_minutes: u32) -> bool {
        let Some(last) = group.items.last() else {
            return false;
        };
        if group.series_key.is_none() || group.series_key != item.series_key() {
            return false;
        }
        match (last.date_time, item.date_time) {
            (Some(prev), Some(next)) => {
                next - prev <= Duration::minutes(i64::from(max_gap_minutes))
            }
            _ => false,
        }
    }

    fn tick(&self) -> ProgressTick {
        let tick = ProgressTick::new(Stage::GroupBuild, self.assigned, self.total);
        if self.total == 0 {
            tick.with_message("No items in task")
        } else if self.assigned == self.total {
            tick.with_message(format!("Built {} groups", self.groups.len()))
        } else {
            tick
        }
    }
}

impl Iterator for GroupBuild {
    type Item = ProgressTick;

    fn next(&mut self) -> Option<ProgressTick> {
        if self.total == 0 {
            if self.empty_tick_sent {
                return None;
            }
            self.empty_tick_sent = true;
            return Some(self.tick());
        }
        let item = self.pending.next()?;
        self.assign(item);
        self.assigned += 1;
        Some(self.tick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::build_groups;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashSet;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 5, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn shot(id: &str, plant: &str, hour: u32, minute: u32) -> InputItem {
        InputItem::new(id)
            .with_plant(plant)
            .with_camera("vis")
            .with_view_option("side0")
            .with_date_time(at(hour, minute))
    }

    #[test]
    fn test_singletons_preserve_order() {
        let items: Vec<InputItem> = ["c", "a", "b"].into_iter().map(InputItem::new).collect();
        let groups = build_groups(items, GroupingOptions::singletons());

        let ids: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(groups.iter().all(|g| g.len() == 1));
        assert!(groups.iter().enumerate().all(|(i, g)| g.index == i));
    }

    #[test]
    fn test_singletons_ignore_series_fields() {
        let items = vec![shot("1", "p1", 10, 0), shot("2", "p1", 10, 1)];
        let groups = build_groups(items, GroupingOptions::singletons());
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.series_key.is_none()));
    }

    #[test]
    fn test_series_split_on_gap_and_plant() {
        let items = vec![
            shot("p2-a", "p2", 9, 0),
            shot("p1-c", "p1", 11, 0),
            shot("p1-a", "p1", 10, 0),
            shot("p1-b", "p1", 10, 15),
        ];
        let groups = build_groups(items, GroupingOptions::series(20));

        let members: Vec<Vec<&str>> = groups.iter().map(|g| g.item_ids().collect()).collect();
        assert_eq!(
            members,
            vec![vec!["p1-a", "p1-b"], vec!["p1-c"], vec!["p2-a"]]
        );
        assert_eq!(groups[0].id, "p1/vis/side0@2021-05-10T10:00:00");
        assert_eq!(groups[0].series_key.as_deref(), Some("p1/vis/side0"));
    }

    #[test]
    fn test_gap_equal_to_delta_stays_together() {
        let items = vec![shot("a", "p1", 10, 0), shot("b", "p1", 10, 20)];
        let groups = build_groups(items, GroupingOptions::series(20));
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_equal_timestamps_stay_together_in_input_order() {
        let items = vec![shot("second", "p1", 10, 0), shot("first", "p1", 10, 0)];
        let groups = build_groups(items, GroupingOptions::series(0));
        assert_eq!(groups.len(), 1);
        let ids: Vec<&str> = groups[0].item_ids().collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[test]
    fn test_items_without_timestamp_are_singletons() {
        let items = vec![
            InputItem::new("x").with_plant("p1"),
            InputItem::new("y").with_plant("p1"),
            InputItem::new("z"),
        ];
        let groups = build_groups(items, GroupingOptions::series(60));
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_series_invariants_hold() {
        let mut items = Vec::new();
        for (p, plant) in ["p1", "p2", "p3"].iter().enumerate() {
            for step in 0..12u32 {
                let minute = step * (7 + p as u32 * 5);
                items.push(shot(
                    &format!("{}-{}", plant, step),
                    plant,
                    8 + minute / 60,
                    minute % 60,
                ));
            }
        }
        let total = items.len();
        let delta = 15;
        let groups = build_groups(items, GroupingOptions::series(delta));

        let mut seen = HashSet::new();
        for group in &groups {
            for pair in group.items.windows(2) {
                let gap = pair[1].date_time.unwrap() - pair[0].date_time.unwrap();
                assert!(gap <= Duration::minutes(i64::from(delta)));
                assert!(gap >= Duration::zero());
                assert_eq!(pair[0].series_key(), pair[1].series_key());
            }
            for item in &group.items {
                assert!(seen.insert(item.id.clone()), "{} assigned twice", item.id);
            }
        }
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn test_ticks_are_monotonic_and_end_at_total() {
        let items: Vec<InputItem> = (0..5).map(|i| InputItem::new(i.to_string())).collect();
        let mut build = GroupBuild::new(items, GroupingOptions::singletons());
        let ticks: Vec<ProgressTick> = build.by_ref().collect();

        let currents: Vec<usize> = ticks.iter().map(|t| t.current).collect();
        assert_eq!(currents, vec![1, 2, 3, 4, 5]);
        assert!(ticks.iter().all(|t| t.total == 5 && t.stage == Stage::GroupBuild));
        assert_eq!(ticks.last().unwrap().message.as_deref(), Some("Built 5 groups"));
        assert_eq!(build.into_groups().len(), 5);
    }

    #[test]
    fn test_empty_input_yields_single_zero_tick() {
        let mut build = GroupBuild::new(Vec::new(), GroupingOptions::series(20));
        let ticks: Vec<ProgressTick> = build.by_ref().collect();
        assert_eq!(ticks.len(), 1);
        assert_eq!((ticks[0].current, ticks[0].total), (0, 0));
        assert_eq!(ticks[0].message.as_deref(), Some("No items in task"));
        assert!(build.into_groups().is_empty());
    }

    #[test]
    fn test_options_from_launch_configuration() {
        let config = LaunchConfiguration::default().with_series(true, 45);
        assert_eq!(GroupingOptions::from(&config), GroupingOptions::series(45));
    }
}
