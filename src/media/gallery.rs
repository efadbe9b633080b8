use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::errors::UploadError;
use super::record::{MediaRecord, ResourceKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    All,
    Images,
    Videos,
}

impl FilterKind {
    pub fn matches(&self, kind: ResourceKind) -> bool {
        match self {
            FilterKind::All => true,
            FilterKind::Images => kind == ResourceKind::Image,
            FilterKind::Videos => kind == ResourceKind::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::All => "all",
            FilterKind::Images => "images",
            FilterKind::Videos => "videos",
        }
    }
}

impl FromStr for FilterKind {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(FilterKind::All),
            "images" => Ok(FilterKind::Images),
            "videos" => Ok(FilterKind::Videos),
            other => Err(UploadError::Validation(format!("Unknown filter: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Ordered subsequence of `records` matching the kind filter and the search term.
///
/// The search is a case-insensitive substring match on the display name; an
/// empty term matches everything. Input order is preserved.
pub fn filter_records<'a>(
    records: &'a [MediaRecord],
    filter: FilterKind,
    search: &str,
) -> Vec<&'a MediaRecord> {
    let needle = search.to_lowercase();

    records
        .iter()
        .filter(|record| filter.matches(record.resource_kind))
        .filter(|record| needle.is_empty() || record.display_name().to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GalleryStats {
    pub total: usize,
    pub images: usize,
    pub videos: usize,
}

impl GalleryStats {
    pub fn of(records: &[MediaRecord]) -> Self {
        let videos = records.iter().filter(|r| r.is_video()).count();
        Self {
            total: records.len(),
            images: records.len() - videos,
            videos,
        }
    }
}

/// Derived projection over the current record list. Holds nothing but its
/// parameters, so it is recomputed on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryView {
    pub filter: FilterKind,
    pub search: String,
    pub view_mode: ViewMode,
}

impl GalleryView {
    pub fn new(filter: FilterKind, search: impl Into<String>) -> Self {
        Self {
            filter,
            search: search.into(),
            view_mode: ViewMode::default(),
        }
    }

    pub fn apply<'a>(&self, records: &'a [MediaRecord]) -> Vec<&'a MediaRecord> {
        filter_records(records, self.filter, &self.search)
    }

    pub fn empty_message(&self) -> String {
        if !self.search.is_empty() {
            return format!(
                "No files match \"{}\" in the {} category.",
                self.search,
                self.filter.as_str()
            );
        }

        match self.filter {
            FilterKind::All => "No files found.".to_string(),
            other => format!("No {} found.", other.as_str()),
        }
    }

    pub fn summary(&self, shown: usize, total: usize) -> String {
        let mut summary = format!("Showing {} of {} files", shown, total);
        if !self.search.is_empty() {
            summary.push_str(&format!(" matching \"{}\"", self.search));
        }
        if self.filter != FilterKind::All {
            summary.push_str(&format!(" in {}", self.filter.as_str()));
        }
        summary
    }
}
