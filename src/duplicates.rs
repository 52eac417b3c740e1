/// Duplicate tab grouping and cleanup planning
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::normalize::{NormalizedUrl, normalized_key};
use crate::tab_data::TabInfo;

/// Tabs sharing one normalized URL, in host enumeration order
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub key: NormalizedUrl,
    pub members: Vec<TabInfo>,
}

impl DuplicateGroup {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn is_duplicate(&self) -> bool {
        self.members.len() > 1
    }

    /// The tab that survives cleanup
    pub fn keeper(&self) -> Option<&TabInfo> {
        self.members.first()
    }

    /// Ids of every member after the first
    pub fn removable_ids(&self) -> Vec<i32> {
        self.members.iter().skip(1).map(|tab| tab.id).collect()
    }
}

/// Group tabs by normalized URL (keep first-seen order of keys and members).
/// Tabs whose URL is excluded from normalization appear in no group.
pub fn group_tabs(tabs: &[TabInfo], config: &CoreConfig) -> Vec<DuplicateGroup> {
    let mut index: HashMap<NormalizedUrl, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for tab in tabs {
        let Some(key) = normalized_key(&tab.url, config) else {
            continue;
        };

        match index.get(&key) {
            Some(&i) => groups[i].members.push(tab.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup {
                    key,
                    members: vec![tab.clone()],
                });
            }
        }
    }

    groups
}

/// Only the groups with two or more members
pub fn duplicate_groups(tabs: &[TabInfo], config: &CoreConfig) -> Vec<DuplicateGroup> {
    group_tabs(tabs, config)
        .into_iter()
        .filter(DuplicateGroup::is_duplicate)
        .collect()
}

/// Number of removable duplicates: sum of (members - 1) over duplicate groups
pub fn duplicate_count(groups: &[DuplicateGroup]) -> usize {
    groups
        .iter()
        .filter(|group| group.is_duplicate())
        .map(|group| group.count() - 1)
        .sum()
}

/// Tab ids to close, one batch per duplicate group
pub fn plan_cleanup(groups: &[DuplicateGroup]) -> Vec<Vec<i32>> {
    groups
        .iter()
        .filter(|group| group.is_duplicate())
        .map(DuplicateGroup::removable_ids)
        .collect()
}

/// Popup listing entry for one duplicate group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub key: String,
    pub title: String,
    pub count: usize,
    pub label: String,
}

pub fn summarize(groups: &[DuplicateGroup]) -> Vec<GroupSummary> {
    groups
        .iter()
        .filter(|group| group.is_duplicate())
        .map(|group| GroupSummary {
            key: group.key.to_string(),
            title: group.keeper().map(|tab| tab.title.clone()).unwrap_or_default(),
            count: group.count(),
            label: format!("{} duplicate tabs", group.count()),
        })
        .collect()
}

/// Message for the content-level highlight collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum HighlightSignal {
    #[serde(rename_all = "camelCase")]
    HighlightTab { is_duplicate: bool },
    UnhighlightTab,
}

/// One signal per tab: members of a duplicate group are highlighted,
/// everything else is cleared
pub fn highlight_plan(tabs: &[TabInfo], config: &CoreConfig) -> Vec<(i32, HighlightSignal)> {
    let groups = group_tabs(tabs, config);
    let duplicates: HashSet<i32> = groups
        .iter()
        .filter(|group| group.is_duplicate())
        .flat_map(|group| group.members.iter().map(|tab| tab.id))
        .collect();

    tabs.iter()
        .map(|tab| {
            let signal = if duplicates.contains(&tab.id) {
                HighlightSignal::HighlightTab { is_duplicate: true }
            } else {
                HighlightSignal::UnhighlightTab
            };
            (tab.id, signal)
        })
        .collect()
}
