//! Launch configuration and input item types.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// One input item from the catalog.
///
/// Deserializes from either a bare identifier string or a record carrying
/// the descriptive fields used for grouping and annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ItemRepr")]
pub struct InputItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemRepr {
    Id(String),
    Record {
        id: String,
        #[serde(default)]
        plant: Option<String>,
        #[serde(default)]
        camera: Option<String>,
        #[serde(default)]
        view_option: Option<String>,
        #[serde(default)]
        date_time: Option<NaiveDateTime>,
    },
}

impl From<ItemRepr> for InputItem {
    fn from(repr: ItemRepr) -> Self {
        match repr {
            ItemRepr::Id(id) => InputItem::new(id),
            ItemRepr::Record {
                id,
                plant,
                camera,
                view_option,
                date_time,
            } => InputItem {
                id,
                plant,
                camera,
                view_option,
                date_time,
            },
        }
    }
}

impl InputItem {
    /// An item known only by its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plant: None,
            camera: None,
            view_option: None,
            date_time: None,
        }
    }

    pub fn with_plant(mut self, plant: impl Into<String>) -> Self {
        self.plant = Some(plant.into());
        self
    }

    pub fn with_camera(mut self, camera: impl Into<String>) -> Self {
        self.camera = Some(camera.into());
        self
    }

    pub fn with_view_option(mut self, view_option: impl Into<String>) -> Self {
        self.view_option = Some(view_option.into());
        self
    }

    pub fn with_date_time(mut self, date_time: NaiveDateTime) -> Self {
        self.date_time = Some(date_time);
        self
    }

    /// Series this item belongs to: `plant/camera/view_option`.
    ///
    /// `None` when the item carries none of the three fields.
    pub fn series_key(&self) -> Option<String> {
        if self.plant.is_none() && self.camera.is_none() && self.view_option.is_none() {
            return None;
        }
        Some(format!(
            "{}/{}/{}",
            self.plant.as_deref().unwrap_or_default(),
            self.camera.as_deref().unwrap_or_default(),
            self.view_option.as_deref().unwrap_or_default(),
        ))
    }
}

/// Whether `value` can be spliced into a file name without escaping the
/// directory it is joined onto. Empty fragments are allowed.
pub fn is_safe_name_fragment(value: &str) -> bool {
    !value.contains(['/', '\\', '\0']) && value != "." && value != ".."
}

/// A prepared job submission.
///
/// Field aliases accept the keys written by the legacy launch files
/// (`csv_file_name`, `overwrite_existing`, `sub_folder_name`, `current_user`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfiguration {
    #[serde(default)]
    pub items: Vec<InputItem>,
    /// Worker count; 0 disables the processing stage.
    #[serde(
        default = "default_thread_count",
        deserialize_with = "lenient_thread_count"
    )]
    pub thread_count: usize,
    #[serde(default, alias = "overwrite_existing")]
    pub overwrite: bool,
    /// Group items into time series.
    #[serde(default)]
    pub generate_series_id: bool,
    /// Maximum gap in minutes between neighbours of one series.
    #[serde(default = "default_series_delta")]
    pub series_id_time_delta: u32,
    #[serde(default)]
    pub build_annotation_csv: bool,
    /// Base name of the merged result file, without extension.
    #[serde(default = "default_output_name", alias = "csv_file_name")]
    pub output_name: String,
    #[serde(default, alias = "sub_folder_name")]
    pub sub_folder: String,
    #[serde(default, alias = "current_user")]
    pub owner: String,
}

fn default_thread_count() -> usize {
    1
}

fn default_series_delta() -> u32 {
    20
}

fn default_output_name() -> String {
    "data".to_string()
}

/// Negative, fractional or non-numeric thread counts disable processing
/// instead of rejecting the whole configuration.
fn lenient_thread_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize).unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

impl Default for LaunchConfiguration {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            thread_count: default_thread_count(),
            overwrite: false,
            generate_series_id: false,
            series_id_time_delta: default_series_delta(),
            build_annotation_csv: false,
            output_name: default_output_name(),
            sub_folder: String::new(),
            owner: String::new(),
        }
    }
}

impl LaunchConfiguration {
    pub fn with_items(mut self, items: Vec<InputItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_series(mut self, enabled: bool, delta_minutes: u32) -> Self {
        self.generate_series_id = enabled;
        self.series_id_time_delta = delta_minutes;
        self
    }

    pub fn with_annotation_csv(mut self, enabled: bool) -> Self {
        self.build_annotation_csv = enabled;
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Reject values that would place output files outside the data directory.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("owner", &self.owner),
            ("sub_folder", &self.sub_folder),
            ("output_name", &self.output_name),
        ] {
            if !is_safe_name_fragment(value) {
                return Err(format!("{} '{}' must not contain path separators", field, value));
            }
        }
        if self.output_name.is_empty() {
            return Err("output_name must not be empty".to_string());
        }
        Ok(())
    }

    /// Whether the parallel processing stage runs at all.
    pub fn processing_enabled(&self) -> bool {
        self.thread_count > 0
    }

    /// Per-owner output folder: `{data_dir}/{owner}_analysis_{sub_folder}`.
    pub fn output_folder(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}_analysis_{}", self.owner, self.sub_folder))
    }

    /// Path of the merged result file inside `output_folder`.
    pub fn merged_output_path(&self, output_folder: &Path) -> PathBuf {
        output_folder.join(format!("{}.csv", self.output_name))
    }

    /// Path of the annotation CSV inside `output_folder`.
    pub fn annotation_path(&self, output_folder: &Path) -> PathBuf {
        output_folder.join(format!("{}_diseaseindex.csv", self.output_name))
    }
}
